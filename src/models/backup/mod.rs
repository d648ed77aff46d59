pub mod export;
pub mod restore;
pub mod schema;
pub mod types;

pub use export::*;
pub use restore::*;
pub use types::*;
