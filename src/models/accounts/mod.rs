pub mod tree;
pub mod types;

pub use tree::*;
pub use types::*;
