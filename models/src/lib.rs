pub mod error;
pub mod infra;
pub mod logger;
pub mod notify;
pub mod progress;
pub mod storage;
pub mod transactions;
