// SawitQL - guarded AQL execution against Postgres and SawitDB
// AQL translation, confirmation-gated executor, resilient line-protocol client

// Clippy configuration - allow non-critical warnings
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::format_push_string)]
#![allow(clippy::multiple_crate_versions)]

// Core types (values, rows, errors)
pub mod core;

// AQL statements, builder and AQL-to-SQL translator
pub mod aql;

// Safe executor over relational backends (Postgres via sqlx)
pub mod executor;

// SawitDB line-protocol client
pub mod network;

// Tree repositories for both backends
pub mod repository;

// Settings from file and environment
pub mod config;

// tracing subscriber setup and audit target
pub mod logging;

// Re-export commonly used types for convenience
pub use crate::aql::{
    AqlStatement, Assignment, Predicate, QueryBuilder, StatementKind, TranslationMode, Translator,
};
pub use crate::config::Settings;
pub use crate::core::{AqlError, Row, Value};
pub use crate::executor::{Backend, BoundQuery, DropTableRequest, RowCursor, SafeExecutor};
pub use crate::network::{ClientConfig, RemoteClient};
pub use crate::repository::{
    SawitTreeRepository, SqlTreeRepository, Tree, TreeFilter, TreeRepository, TreeStatus,
};

#[cfg(feature = "postgres")]
pub use crate::executor::PgBackend;
