pub mod publish;
pub mod registry;
pub mod report;
