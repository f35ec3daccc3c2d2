pub mod collector;
pub mod explorer;
pub mod metrics;
pub mod models;
pub mod storage;
pub mod utils;
