//! Google Calendar and Google OAuth adapters

pub mod calendar;
pub mod oauth;
mod types;

pub use calendar::{GoogleCalendarGateway, GOOGLE_CALENDAR_API_BASE};
pub use oauth::{google_oauth_config, GoogleTokenRefresher};
