pub mod sales_orders;
pub mod tokenizer;
pub mod transactions;
pub mod types;

pub use types::*;
