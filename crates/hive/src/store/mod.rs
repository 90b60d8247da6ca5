/// Store collection operations.
pub mod operations;
/// Core store implementation.
pub mod stor;
#[cfg(test)]
/// Store tests.
pub mod tests;
/// Store and collection name validation.
pub mod validation;

pub use stor::Store;
