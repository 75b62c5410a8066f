//! Shared test helpers for `duesync-core` integration tests.
//!
//! In-memory implementations of every port plus a [`Harness`] that wires
//! them into a `TokenLifecycleManager` and a `SyncReconciler`.

pub mod calendar;
pub mod repositories;
pub mod tokens;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use duesync_common::{MockClock, RetryStrategy};
use duesync_core::{ReconcilerOptions, RetryPolicy, SyncReconciler, TokenLifecycleManager};
use duesync_domain::{AccountRole, Assignment, SyncContext, SyncSettings, TokenGrant};

pub use calendar::{FakeCalendar, GatewayCall};
pub use repositories::{
    InMemoryAssignments, InMemoryMappings, InMemorySettings, InMemoryTokenRepository,
};
pub use tokens::{PrefixCipher, ScriptedRefresher};

pub const USER_ID: &str = "parent-user-1";
pub const STUDENT_ID: &str = "student-42";

/// Fixed "now" for every test: Monday morning of a school week.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap()
}

/// Builder for a pending, dated assignment.
pub fn assignment(id: &str, due_at: DateTime<Utc>) -> Assignment {
    Assignment {
        student_id: STUDENT_ID.into(),
        plannable_id: id.into(),
        title: format!("Worksheet {id}"),
        course_id: "course-math".into(),
        course_name: "Algebra I".into(),
        due_at: Some(due_at),
        points_possible: Some(20.0),
        current_grade: None,
        submitted: false,
        missing: false,
        late: false,
        graded: false,
    }
}

/// Retry fast so paused-time tests stay readable.
pub fn fast_options() -> ReconcilerOptions {
    let strategy = RetryStrategy::new()
        .with_base_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(1))
        .with_jitter_factor(0.0);
    ReconcilerOptions {
        pass_timeout: Duration::from_secs(60),
        retry: RetryPolicy::new(strategy),
        max_reported_errors: 50,
    }
}

/// Everything a reconciler test needs, backed by in-memory fakes.
pub struct Harness {
    pub ctx: SyncContext,
    pub clock: MockClock,
    pub assignments: Arc<InMemoryAssignments>,
    pub settings: Arc<InMemorySettings>,
    pub mappings: Arc<InMemoryMappings>,
    pub token_repo: Arc<InMemoryTokenRepository>,
    pub refresher: Arc<ScriptedRefresher>,
    pub calendar: Arc<FakeCalendar>,
    pub tokens: Arc<TokenLifecycleManager>,
    pub reconciler: SyncReconciler,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(fast_options())
    }

    pub fn with_options(options: ReconcilerOptions) -> Self {
        let clock = MockClock::new(now());
        let assignments = Arc::new(InMemoryAssignments::default());
        let settings = Arc::new(InMemorySettings::default());
        let mappings = Arc::new(InMemoryMappings::default());
        let token_repo = Arc::new(InMemoryTokenRepository::default());
        let refresher = Arc::new(ScriptedRefresher::new(clock.clone()));
        let calendar = Arc::new(FakeCalendar::default());

        let tokens = Arc::new(TokenLifecycleManager::new(
            token_repo.clone(),
            Arc::new(PrefixCipher),
            refresher.clone(),
            Arc::new(clock.clone()),
        ));
        let reconciler = SyncReconciler::new(
            assignments.clone(),
            settings.clone(),
            mappings.clone(),
            tokens.clone(),
            calendar.clone(),
            Arc::new(clock.clone()),
        )
        .with_options(options);

        Self {
            ctx: SyncContext::new(USER_ID, STUDENT_ID),
            clock,
            assignments,
            settings,
            mappings,
            token_repo,
            refresher,
            calendar,
            tokens,
            reconciler,
        }
    }

    /// Store a fresh, hour-long grant for `role`.
    pub async fn connect(&self, role: AccountRole) {
        let grant = TokenGrant {
            access_token: format!("access-{role}"),
            refresh_token: format!("refresh-{role}"),
            expires_at: now() + chrono::Duration::hours(1),
            account_email: Some(format!("{role}@example.com")),
        };
        self.tokens.store(&self.ctx, role, grant).await.unwrap();
    }

    pub async fn connect_both(&self) {
        self.connect(AccountRole::Parent).await;
        self.connect(AccountRole::Student).await;
    }

    pub fn set_assignments(&self, assignments: Vec<Assignment>) {
        self.assignments.set(STUDENT_ID, assignments);
    }

    pub fn update_settings(&self, edit: impl FnOnce(&mut SyncSettings)) {
        let mut settings = self.settings.get(&self.ctx).unwrap_or_else(|| {
            SyncSettings::defaults(USER_ID, STUDENT_ID)
        });
        edit(&mut settings);
        self.settings.put(settings);
    }
}
