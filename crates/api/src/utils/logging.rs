use std::time::Duration;

use duesync_domain::DueSyncError;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// The filter comes from `RUST_LOG` (default `info`). `DUESYNC_LOG_FORMAT=json`
/// switches to newline-delimited JSON output. Calling this twice is harmless;
/// the second install fails quietly.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("DUESYNC_LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry.with(fmt::layer().json().with_current_span(false)).try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Log the outcome of a command execution with structured fields.
///
/// `command` is a stable identifier such as `"sync::trigger_sync"`; never
/// pass user data through it.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, error: Option<&DueSyncError>) {
    let duration_ms = elapsed.as_millis() as u64;

    match error {
        None => info!(command, duration_ms, "command_execution_success"),
        Some(err) => warn!(
            command,
            duration_ms,
            error_label = error_label(err),
            error = %err,
            "command_execution_failure"
        ),
    }
}

/// Convert a `DueSyncError` into a stable label suitable for logging.
#[inline]
pub fn error_label(error: &DueSyncError) -> &'static str {
    match error {
        DueSyncError::Database(_) => "database",
        DueSyncError::Config(_) => "config",
        DueSyncError::Network(_) => "network",
        DueSyncError::Auth(_) => "auth",
        DueSyncError::Security(_) => "security",
        DueSyncError::NotFound(_) => "not_found",
        DueSyncError::InvalidInput(_) => "invalid_input",
        DueSyncError::Internal(_) => "internal",
        DueSyncError::SyncInProgress(_) => "sync_in_progress",
        DueSyncError::NotConnected(_) => "not_connected",
        DueSyncError::AuthorizationExpired(_) => "authorization_expired",
    }
}
