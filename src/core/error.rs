use crate::aql::StatementKind;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AqlError {
    // Statement construction and translation
    #[error("Unrecognized AQL statement: {0}")]
    UnrecognizedStatement(String),
    #[error("Malformed {kind} statement: {text}")]
    MalformedStatement { kind: StatementKind, text: String },
    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),
    #[error("Empty statement")]
    EmptyStatement,

    // Confirmation gate
    #[error("BAKAR LAHAN blocked: confirmation mismatch for table '{table}'")]
    ConfirmationMismatch { table: String },
    #[error("BAKAR LAHAN blocked: missing {0}")]
    MissingMetadata(&'static str),
    #[error("Failed to execute BAKAR LAHAN on '{table}': {source}")]
    DropFailed {
        table: String,
        #[source]
        source: Box<AqlError>,
    },

    // Relational backend
    #[error("Backend error: {0}")]
    Backend(String),
    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    // Remote engine transport
    #[error("Failed to connect to SawitDB at {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Not connected to SawitDB")]
    NotConnected,
    #[error("Connection closed by SawitDB")]
    ConnectionClosed,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Query error: {0}")]
    Engine(String),
    #[error("Query failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<AqlError>,
    },

    // Repository
    #[error("{entity} with {field} {value} not found")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("No tree code left after C{0}")]
    CodesExhausted(u64),
    #[error("Invalid tree status '{0}'")]
    InvalidStatus(String),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<AqlError>,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}

impl AqlError {
    /// Wraps the error with a message describing the failed operation.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, looking through context and retry wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Context { source, .. }
            | Self::RetriesExhausted { source, .. }
            | Self::DropFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// Transport and framing failures leave the socket in an unknown state.
    #[must_use]
    pub const fn poisons_connection(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::ConnectionClosed
                | Self::Timeout(_)
                | Self::Protocol(_)
                | Self::Parse(_)
        )
    }
}
