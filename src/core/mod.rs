// Module declarations
pub mod error;
pub mod row;
pub mod value;

// Re-exports for convenience
pub use error::AqlError;
pub use row::Row;
pub use value::Value;
