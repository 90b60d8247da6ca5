/// Core collection implementation.
pub mod coll;
/// Collection write operations.
pub mod operations;
/// Collection read operations.
pub mod query;

pub use coll::Collection;
