/// Executor module - runs AQL statements against a relational backend
///
/// Structure:
/// - backend: Backend trait, bound queries and the row cursor
/// - safe: SafeExecutor and the guarded BAKAR LAHAN
/// - postgres: sqlx-backed Backend (feature `postgres`)

pub mod backend;
pub mod safe;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(test)]
pub(crate) mod mock;

pub use backend::{Backend, BoundQuery, RowCursor};
pub use safe::{DropTableRequest, SafeExecutor};

#[cfg(feature = "postgres")]
pub use postgres::PgBackend;
