pub mod accounts;
pub mod backup;
pub mod import;
