pub mod logs;
pub mod purchases;
pub mod transactions;
