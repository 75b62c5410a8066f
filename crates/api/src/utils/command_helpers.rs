//! Command execution helpers
//!
//! Every command goes through [`execute_command`] so timing and outcome are
//! logged the same way.

use std::future::Future;
use std::time::Instant;

use duesync_domain::Result as DomainResult;

use crate::utils::logging::log_command_execution;

/// Execute a command, logging its duration and outcome.
///
/// # Example
///
/// ```rust,ignore
/// pub async fn my_command(ctx: &AppContext) -> Result<MyResponse> {
///     execute_command("my_module::my_command", || async {
///         ctx.some_service.do_something().await
///     })
///     .await
/// }
/// ```
pub async fn execute_command<F, Fut, T>(command_name: &str, command_fn: F) -> DomainResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = DomainResult<T>>,
{
    let start = Instant::now();
    let result = command_fn().await;
    log_command_execution(command_name, start.elapsed(), result.as_ref().err());
    result
}

/// Execute a command and flatten its error to a display string.
///
/// For callers that surface errors to a UI as plain text.
pub async fn execute_with_string_error<F, Fut, T>(command_name: &str, command_fn: F) -> Result<T, String>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = DomainResult<T>>,
{
    execute_command(command_name, command_fn).await.map_err(|e| e.to_string())
}
