pub mod csv_store;
pub mod reader;
pub mod transaction;
pub mod writer;
