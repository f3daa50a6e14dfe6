pub mod hash;
pub mod normalize;
