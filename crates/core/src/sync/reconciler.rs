//! Sync reconciler
//!
//! One pass per student: load assignments, settings, mappings and tokens,
//! compute the minimal set of calendar operations per role, apply them and
//! record the resulting mappings. The two roles run concurrently; calls
//! within a role are sequential.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use duesync_common::{Clock, RetryStrategy};
use duesync_domain::constants::{DEFAULT_PASS_TIMEOUT_MS, MAX_REPORTED_ERRORS};
use duesync_domain::{
    AccessToken, AccountRole, Assignment, DueSyncError, EventMapping, ItemError, PassState,
    Result, RoleOutcome, RoleSummary, SyncConfig, SyncContext, SyncErrorKind, SyncResult,
    SyncSettings,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::locks::StudentLocks;
use super::plan::{diff, planned_events, PlannedEvent};
use super::ports::{
    AssignmentSource, CalendarGateway, GatewayError, GatewayResult, MappingRepository,
    SettingsRepository,
};
use super::retry::{RetryDecision, RetryPolicy};
use crate::tokens::TokenLifecycleManager;

/// Tunables for a sync pass
#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
    /// Wall-clock budget; on expiry no new gateway calls are started
    pub pass_timeout: Duration,
    /// Backoff applied to transient gateway failures within one call
    pub retry: RetryPolicy,
    /// Item errors kept in a [`SyncResult`]; the rest are only counted
    pub max_reported_errors: usize,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            pass_timeout: Duration::from_millis(DEFAULT_PASS_TIMEOUT_MS),
            retry: RetryPolicy::default(),
            max_reported_errors: MAX_REPORTED_ERRORS,
        }
    }
}

impl ReconcilerOptions {
    /// Build options from the loaded [`SyncConfig`].
    ///
    /// The retry strategy takes its attempt count and delay bounds from the
    /// config; everything else falls back to the crate defaults.
    pub fn from_config(config: &SyncConfig) -> Self {
        let strategy = RetryStrategy::new()
            .with_max_attempts(config.max_attempts)
            .with_base_delay(config.base_delay())
            .with_max_delay(config.max_delay());
        Self {
            pass_timeout: config.pass_timeout(),
            retry: RetryPolicy::new(strategy),
            max_reported_errors: config.max_reported_errors,
        }
    }
}

/// What [`SyncReconciler::disconnect_role`] removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleDisconnect {
    /// A token record existed and was deleted
    pub credentials_removed: bool,
    /// Mapping rows dropped for the role
    pub mappings_removed: usize,
}

/// Orchestrates sync passes
///
/// Holds the ports a pass needs and a [`StudentLocks`] registry so that at
/// most one pass (or disconnect) touches a student's mappings at a time.
pub struct SyncReconciler {
    assignments: Arc<dyn AssignmentSource>,
    settings: Arc<dyn SettingsRepository>,
    mappings: Arc<dyn MappingRepository>,
    tokens: Arc<TokenLifecycleManager>,
    gateway: Arc<dyn CalendarGateway>,
    clock: Arc<dyn Clock>,
    locks: StudentLocks,
    options: ReconcilerOptions,
}

impl SyncReconciler {
    /// Create a reconciler with default options and its own lock registry.
    pub fn new(
        assignments: Arc<dyn AssignmentSource>,
        settings: Arc<dyn SettingsRepository>,
        mappings: Arc<dyn MappingRepository>,
        tokens: Arc<TokenLifecycleManager>,
        gateway: Arc<dyn CalendarGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            assignments,
            settings,
            mappings,
            tokens,
            gateway,
            clock,
            locks: StudentLocks::new(),
            options: ReconcilerOptions::default(),
        }
    }

    /// Replace the pass timeout, retry policy and error cap.
    pub fn with_options(mut self, options: ReconcilerOptions) -> Self {
        self.options = options;
        self
    }

    /// Share a lock registry with other components touching mappings.
    pub fn with_locks(mut self, locks: StudentLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Lock registry guarding passes, for status queries.
    pub fn locks(&self) -> &StudentLocks {
        &self.locks
    }

    /// Run one reconciliation pass for a student.
    ///
    /// # Errors
    /// `SyncInProgress` if a pass for the same student is already running.
    /// Every other failure is reported inside the returned [`SyncResult`].
    #[instrument(skip(self), fields(student_id = %ctx.student_id))]
    pub async fn run_pass(&self, ctx: &SyncContext) -> Result<SyncResult> {
        let _guard = self.locks.try_acquire(&ctx.student_id)?;
        let pass_id = Uuid::now_v7();
        let started_at = self.clock.now();
        info!(%pass_id, "sync pass started");

        let cancel = CancellationToken::new();
        let timer = {
            let cancel = cancel.clone();
            let budget = self.options.pass_timeout;
            tokio::spawn(async move {
                tokio::time::sleep(budget).await;
                cancel.cancel();
            })
        };

        let mut errors = ErrorLog::new(self.options.max_reported_errors);
        let (mut state, roles) = self.execute(ctx, &cancel, &mut errors).await;
        timer.abort();

        let timed_out = cancel.is_cancelled();
        if timed_out {
            warn!(budget_ms = self.options.pass_timeout.as_millis() as u64, "sync pass budget exceeded");
            errors.push(ItemError {
                role: None,
                assignment_id: None,
                kind: SyncErrorKind::Timeout,
                message: format!("pass exceeded {:?} budget", self.options.pass_timeout),
            });
            state = PassState::Failed;
        }

        let (errors, suppressed_errors) = errors.into_parts();
        let result = SyncResult {
            pass_id,
            student_id: ctx.student_id.clone(),
            state,
            timed_out,
            roles,
            errors,
            suppressed_errors,
            started_at,
            finished_at: self.clock.now(),
        };

        info!(
            %pass_id,
            state = %result.state,
            created = result.created(),
            updated = result.updated(),
            deleted = result.deleted(),
            errors = result.error_count(),
            "sync pass finished"
        );
        Ok(result)
    }

    /// Disconnect a role: delete its credentials, then every mapping it owns.
    ///
    /// The student lock is held across both steps, so a pass can never start
    /// between them and observe a role with mappings but no credentials.
    /// Calendar events are left in place; the account that owns them is gone.
    ///
    /// # Errors
    /// `SyncInProgress` while a pass for the student is running; nothing is
    /// removed in that case.
    #[instrument(skip(self), fields(student_id = %ctx.student_id, role = %role))]
    pub async fn disconnect_role(
        &self,
        ctx: &SyncContext,
        role: AccountRole,
    ) -> Result<RoleDisconnect> {
        let _guard = self.locks.try_acquire(&ctx.student_id)?;
        let credentials_removed = self.tokens.revoke(ctx, role).await?;
        let mappings_removed = self.mappings.delete_role_mappings(&ctx.student_id, role).await?;
        info!(credentials_removed, mappings_removed, "role disconnected");
        Ok(RoleDisconnect { credentials_removed, mappings_removed })
    }

    async fn execute(
        &self,
        ctx: &SyncContext,
        cancel: &CancellationToken,
        errors: &mut ErrorLog,
    ) -> (PassState, Vec<RoleSummary>) {
        debug!(state = %PassState::Loading);
        let loaded = self.load(ctx).await;
        let (assignments, settings) = match loaded {
            Ok(loaded) => loaded,
            Err(err) => {
                error!(error = %err, "failed to load sync inputs");
                errors.push(ItemError {
                    role: None,
                    assignment_id: None,
                    kind: error_kind(&err),
                    message: err.to_string(),
                });
                return (PassState::Failed, Vec::new());
            }
        };

        if !settings.sync_enabled {
            debug!("sync disabled for student");
            let roles =
                AccountRole::ALL.iter().map(|r| RoleSummary::new(*r, RoleOutcome::Disabled)).collect();
            return (PassState::Done, roles);
        }

        let now = self.clock.now();
        let (parent, student) = tokio::join!(
            self.run_role(ctx, AccountRole::Parent, &assignments, &settings, now, cancel),
            self.run_role(ctx, AccountRole::Student, &assignments, &settings, now, cancel),
        );

        let mut roles = Vec::with_capacity(2);
        for run in [parent, student] {
            for item in run.errors {
                errors.push(item);
            }
            roles.push(run.summary);
        }
        (PassState::Done, roles)
    }

    async fn load(&self, ctx: &SyncContext) -> Result<(Vec<Assignment>, SyncSettings)> {
        let assignments = self.assignments.fetch_assignments(&ctx.student_id).await?;
        let settings = self
            .settings
            .get_settings(ctx)
            .await?
            .unwrap_or_else(|| SyncSettings::defaults(&ctx.user_id, &ctx.student_id));
        debug!(assignments = assignments.len(), "loaded sync inputs");
        Ok((assignments, settings))
    }

    #[instrument(skip_all, fields(role = %role))]
    async fn run_role(
        &self,
        ctx: &SyncContext,
        role: AccountRole,
        assignments: &[Assignment],
        settings: &SyncSettings,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> RoleRun {
        let mut run = RoleRun::new(role);
        let enabled = role.profile().is_enabled(settings);

        let mappings = match self.mappings.list_mappings(&ctx.student_id, role).await {
            Ok(mappings) => mappings,
            Err(err) => return run.abort(error_kind(&err), err.to_string()),
        };
        if !enabled && mappings.is_empty() {
            run.summary.outcome = RoleOutcome::Disabled;
            return run;
        }

        let valid = match self.tokens.get_valid_token(ctx, role).await {
            Ok(valid) => valid,
            Err(DueSyncError::NotConnected(_)) => {
                debug!("role not connected; skipping");
                run.summary.outcome =
                    if enabled { RoleOutcome::NotConnected } else { RoleOutcome::Disabled };
                return run;
            }
            Err(DueSyncError::AuthorizationExpired(message)) => return run.auth_expired(message),
            Err(err) => return run.abort(error_kind(&err), err.to_string()),
        };

        debug!(state = %PassState::Filtering);
        let eligible = planned_events(assignments, settings, role, now);

        debug!(state = %PassState::Diffing, eligible = eligible.len(), mapped = mappings.len());
        let plan = diff(eligible, mappings);
        run.summary.unchanged = plan.unchanged;

        debug!(
            state = %PassState::Applying,
            create = plan.to_create.len(),
            update = plan.to_update.len(),
            delete = plan.to_delete.len()
        );
        let needs_calendar = plan.needs_calendar();
        let mut session = RoleSession { ctx, role, token: valid.token, cancel };

        for mapping in &plan.to_delete {
            if run.stop_if_cancelled(cancel) {
                return run;
            }
            match self.apply_delete(&mut session, mapping).await {
                Ok(()) => run.summary.deleted += 1,
                Err(failure) => {
                    if run.record(failure, &mapping.assignment_id).is_break() {
                        return run;
                    }
                }
            }
        }

        if !enabled {
            run.summary.outcome = RoleOutcome::Disabled;
        }
        if !needs_calendar {
            return run.finish();
        }

        let calendar_id = match valid.calendar_id {
            Some(id) => id,
            None => match self.provision_calendar(&mut session).await {
                Ok(id) => id,
                Err(failure) => {
                    let _ = run.record_role_failure(failure);
                    return run;
                }
            },
        };

        for (mapping, event) in &plan.to_update {
            if run.stop_if_cancelled(cancel) {
                return run;
            }
            match self.apply_update(&mut session, &calendar_id, mapping, event).await {
                Ok(()) => run.summary.updated += 1,
                Err(failure) => {
                    if run.record(failure, &event.assignment_id).is_break() {
                        return run;
                    }
                }
            }
        }

        for event in &plan.to_create {
            if run.stop_if_cancelled(cancel) {
                return run;
            }
            match self.apply_create(&mut session, &calendar_id, event).await {
                Ok(()) => run.summary.created += 1,
                Err(failure) => {
                    if run.record(failure, &event.assignment_id).is_break() {
                        return run;
                    }
                }
            }
        }

        run.finish()
    }

    async fn provision_calendar(&self, session: &mut RoleSession<'_>) -> std::result::Result<String, CallError> {
        let name = session.role.profile().calendar_name;
        let calendar_id = self
            .call(session, move |token| async move { self.gateway.ensure_calendar(&token, name).await })
            .await?;

        self.tokens
            .set_calendar_id(session.ctx, session.role, &calendar_id)
            .await
            .map_err(|err| CallError::Role(error_kind(&err), err.to_string()))?;
        info!(calendar = %calendar_id, "provisioned calendar");
        Ok(calendar_id)
    }

    async fn apply_create(
        &self,
        session: &mut RoleSession<'_>,
        calendar_id: &str,
        event: &PlannedEvent,
    ) -> std::result::Result<(), CallError> {
        let event_id = self
            .call(session, move |token| async move {
                self.gateway.create_event(&token, calendar_id, &event.spec).await
            })
            .await?;

        let recorded = self.record_mapping(session, event, &event_id, calendar_id).await;
        if recorded.is_err() {
            self.discard_unmapped_event(session, calendar_id, &event_id).await;
        }
        recorded
    }

    /// Remove an event whose mapping could not be written. One attempt, no
    /// retry; a failure is only logged.
    async fn discard_unmapped_event(
        &self,
        session: &RoleSession<'_>,
        calendar_id: &str,
        event_id: &str,
    ) {
        match self.gateway.delete_event(&session.token, calendar_id, event_id).await {
            Ok(()) | Err(GatewayError::NotFound) => {
                debug!(event_id, "removed event left without a mapping");
            }
            Err(err) => {
                error!(event_id, error = %err, "event created without a mapping could not be removed");
            }
        }
    }

    async fn apply_update(
        &self,
        session: &mut RoleSession<'_>,
        calendar_id: &str,
        mapping: &EventMapping,
        event: &PlannedEvent,
    ) -> std::result::Result<(), CallError> {
        let target_calendar = mapping.external_calendar_id.as_str();
        let event_id = mapping.external_event_id.as_str();
        let updated = self
            .call(session, move |token| async move {
                self.gateway.update_event(&token, target_calendar, event_id, &event.spec).await
            })
            .await;

        match updated {
            Ok(()) => self.record_mapping(session, event, event_id, target_calendar).await,
            Err(CallError::Gateway(GatewayError::NotFound)) => {
                // Removed on the calendar side; put it back
                debug!(assignment_id = %event.assignment_id, "event vanished remotely; recreating");
                self.apply_create(session, calendar_id, event).await
            }
            Err(failure) => Err(failure),
        }
    }

    async fn apply_delete(
        &self,
        session: &mut RoleSession<'_>,
        mapping: &EventMapping,
    ) -> std::result::Result<(), CallError> {
        let calendar_id = mapping.external_calendar_id.as_str();
        let event_id = mapping.external_event_id.as_str();
        let deleted = self
            .call(session, move |token| async move {
                self.gateway.delete_event(&token, calendar_id, event_id).await
            })
            .await;

        match deleted {
            Ok(()) | Err(CallError::Gateway(GatewayError::NotFound)) => {}
            Err(failure) => return Err(failure),
        }

        self.mappings
            .delete_mapping(&mapping.assignment_id, &mapping.student_id, mapping.role)
            .await
            .map(|_| ())
            .map_err(|err| CallError::Storage(format!("failed to delete mapping: {err}")))
    }

    async fn record_mapping(
        &self,
        session: &RoleSession<'_>,
        event: &PlannedEvent,
        event_id: &str,
        calendar_id: &str,
    ) -> std::result::Result<(), CallError> {
        let mapping = EventMapping {
            assignment_id: event.assignment_id.clone(),
            student_id: session.ctx.student_id.clone(),
            role: session.role,
            external_event_id: event_id.to_string(),
            external_calendar_id: calendar_id.to_string(),
            last_synced_at: self.clock.now(),
            content_fingerprint: event.fingerprint.clone(),
        };
        self.mappings
            .upsert_mapping(&mapping)
            .await
            .map_err(|err| CallError::Storage(format!("failed to record mapping: {err}")))
    }

    /// Run one gateway call under the retry policy.
    ///
    /// Rate limits and transient failures back off and retry; the sleep is
    /// interrupted by cancellation. `Unauthorized` triggers one forced token
    /// refresh; a second `Unauthorized` marks the role invalid.
    async fn call<T, F, Fut>(
        &self,
        session: &mut RoleSession<'_>,
        mut op: F,
    ) -> std::result::Result<T, CallError>
    where
        F: FnMut(AccessToken) -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let mut attempt: u32 = 0;
        let mut refreshed = false;

        loop {
            if session.cancel.is_cancelled() {
                return Err(CallError::Cancelled);
            }
            attempt += 1;

            let err = match op(session.token.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            match self.options.retry.decide(&err, attempt) {
                RetryDecision::RetryAfter(delay) => {
                    warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "gateway call failed; retrying");
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = session.cancel.cancelled() => return Err(CallError::Cancelled),
                    }
                }
                RetryDecision::RefreshToken if !refreshed => {
                    refreshed = true;
                    debug!("gateway rejected token; forcing refresh");
                    match self.tokens.force_refresh(session.ctx, session.role).await {
                        Ok(valid) => session.token = valid.token,
                        Err(DueSyncError::AuthorizationExpired(message)) => {
                            return Err(CallError::AuthExpired(message));
                        }
                        Err(err) => return Err(CallError::Role(error_kind(&err), err.to_string())),
                    }
                }
                RetryDecision::RefreshToken => {
                    if let Err(mark_err) = self.tokens.mark_invalid(session.ctx, session.role).await {
                        error!(error = %mark_err, "failed to mark credentials invalid");
                    }
                    return Err(CallError::AuthExpired(format!(
                        "{} calendar rejected refreshed credentials",
                        session.role
                    )));
                }
                RetryDecision::GiveUp => {
                    debug!(attempt, error = %err, "giving up on gateway call");
                    return Err(CallError::Gateway(err));
                }
            }
        }
    }
}

struct RoleSession<'a> {
    ctx: &'a SyncContext,
    role: AccountRole,
    token: AccessToken,
    cancel: &'a CancellationToken,
}

/// Why a single operation did not complete
#[derive(Debug)]
enum CallError {
    /// Gateway failure after the retry policy gave up
    Gateway(GatewayError),
    /// Remote call succeeded but the mapping write failed
    Storage(String),
    /// Credentials are dead for this role
    AuthExpired(String),
    /// Role-level failure that stops the role
    Role(SyncErrorKind, String),
    /// Pass budget exhausted
    Cancelled,
}

struct RoleRun {
    summary: RoleSummary,
    errors: Vec<ItemError>,
}

impl RoleRun {
    fn new(role: AccountRole) -> Self {
        Self { summary: RoleSummary::new(role, RoleOutcome::Completed), errors: Vec::new() }
    }

    fn push_error(&mut self, assignment_id: Option<&str>, kind: SyncErrorKind, message: String) {
        self.summary.errors += 1;
        self.errors.push(ItemError {
            role: Some(self.summary.role),
            assignment_id: assignment_id.map(str::to_string),
            kind,
            message,
        });
    }

    fn abort(mut self, kind: SyncErrorKind, message: String) -> Self {
        warn!(kind = %kind, message = %message, "role aborted");
        self.summary.outcome = RoleOutcome::Aborted;
        self.push_error(None, kind, message);
        self
    }

    fn auth_expired(mut self, message: String) -> Self {
        warn!(message = %message, "role requires re-authentication");
        self.summary.outcome = RoleOutcome::AuthorizationExpired;
        self.push_error(None, SyncErrorKind::AuthorizationExpired, message);
        self
    }

    fn stop_if_cancelled(&mut self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            self.summary.outcome = RoleOutcome::TimedOut;
            return true;
        }
        false
    }

    /// Record a per-item failure. Breaks when the role cannot continue.
    fn record(&mut self, failure: CallError, assignment_id: &str) -> ControlFlow<()> {
        match failure {
            CallError::Gateway(err) => {
                warn!(assignment_id, error = %err, "calendar operation failed");
                self.push_error(Some(assignment_id), err.kind(), err.to_string());
                ControlFlow::Continue(())
            }
            CallError::Storage(message) => {
                error!(assignment_id, message = %message, "mapping write failed");
                self.push_error(Some(assignment_id), SyncErrorKind::Storage, message);
                ControlFlow::Continue(())
            }
            other => self.record_role_failure(other),
        }
    }

    fn record_role_failure(&mut self, failure: CallError) -> ControlFlow<()> {
        match failure {
            CallError::Cancelled => self.summary.outcome = RoleOutcome::TimedOut,
            CallError::AuthExpired(message) => {
                warn!(message = %message, "role requires re-authentication");
                self.summary.outcome = RoleOutcome::AuthorizationExpired;
                self.push_error(None, SyncErrorKind::AuthorizationExpired, message);
            }
            CallError::Role(kind, message) => {
                self.summary.outcome = RoleOutcome::Aborted;
                self.push_error(None, kind, message);
            }
            CallError::Gateway(err) => {
                self.summary.outcome = RoleOutcome::Aborted;
                self.push_error(None, err.kind(), err.to_string());
            }
            CallError::Storage(message) => {
                self.summary.outcome = RoleOutcome::Aborted;
                self.push_error(None, SyncErrorKind::Storage, message);
            }
        }
        ControlFlow::Break(())
    }

    fn finish(self) -> Self {
        let s = &self.summary;
        info!(
            created = s.created,
            updated = s.updated,
            deleted = s.deleted,
            unchanged = s.unchanged,
            errors = s.errors,
            "role sync finished"
        );
        self
    }
}

/// Error summaries capped at a fixed length; the rest are only counted.
struct ErrorLog {
    items: Vec<ItemError>,
    suppressed: usize,
    cap: usize,
}

impl ErrorLog {
    fn new(cap: usize) -> Self {
        Self { items: Vec::new(), suppressed: 0, cap }
    }

    fn push(&mut self, item: ItemError) {
        if self.items.len() < self.cap {
            self.items.push(item);
        } else {
            self.suppressed += 1;
        }
    }

    fn into_parts(self) -> (Vec<ItemError>, usize) {
        (self.items, self.suppressed)
    }
}

fn error_kind(err: &DueSyncError) -> SyncErrorKind {
    match err {
        DueSyncError::NotConnected(_) => SyncErrorKind::NotConnected,
        DueSyncError::AuthorizationExpired(_) | DueSyncError::Auth(_) => {
            SyncErrorKind::AuthorizationExpired
        }
        DueSyncError::Network(_) => SyncErrorKind::TransientNetwork,
        DueSyncError::InvalidInput(_) => SyncErrorKind::PermanentRejection,
        _ => SyncErrorKind::Storage,
    }
}
