use tracing_subscriber::EnvFilter;

/// Target of the audit events emitted around destructive operations.
pub const AUDIT_TARGET: &str = "sawitql::audit";

/// Installs the global fmt subscriber. `RUST_LOG` takes precedence over `filter`.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init(filter: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
