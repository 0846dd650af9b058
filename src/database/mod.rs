pub mod binding;
pub mod manager;

pub use manager::{DatabaseError, DatabaseManager};
