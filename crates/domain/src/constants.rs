//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Token lifecycle
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

// Event content
pub const EVENT_WINDOW_MINUTES: i64 = 60;
pub const EXT_PROP_ASSIGNMENT_ID: &str = "duesync_assignment_id";
pub const EXT_PROP_COURSE_ID: &str = "duesync_course_id";
pub const EXT_PROP_POINTS_POSSIBLE: &str = "duesync_points_possible";

// Reminder validation
pub const MAX_REMINDERS: usize = 5;

// Sync pass defaults
pub const DEFAULT_PASS_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
pub const MAX_REPORTED_ERRORS: usize = 50;

// Auto-sync (tokio-cron-scheduler uses 6-field expressions with seconds)
pub const DEFAULT_AUTO_SYNC_CRON: &str = "0 */30 * * * *";

// Database
pub const DEFAULT_DATABASE_PATH: &str = "duesync.db";
pub const DEFAULT_POOL_SIZE: u32 = 8;

// OAuth
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8765/oauth/callback";
pub const DEFAULT_OAUTH_SCOPES: &[&str] =
    &["openid", "email", "https://www.googleapis.com/auth/calendar"];
