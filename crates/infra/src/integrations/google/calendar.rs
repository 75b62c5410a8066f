//! Google Calendar v3 implementation of the calendar gateway
//!
//! Every HTTP outcome is folded into a [`GatewayError`]; retry decisions
//! belong to the reconciler.

use std::time::Duration;

use async_trait::async_trait;
use duesync_core::{CalendarGateway, GatewayError, GatewayResult};
use duesync_domain::{AccessToken, EventSpec};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::types::{ApiErrorBody, CalendarList, Created, EventBody, NewCalendar};

/// Production API root
pub const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];
const CALENDAR_LIST_PAGES: usize = 10;

/// Google Calendar gateway
#[derive(Debug, Clone)]
pub struct GoogleCalendarGateway {
    http: Client,
    base_url: String,
}

impl Default for GoogleCalendarGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleCalendarGateway {
    pub fn new() -> Self {
        Self::with_base_url(GOOGLE_CALENDAR_API_BASE)
    }

    /// Gateway against another API root (a mock server in tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { http, base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!("{}/calendars/{}/events", self.base_url, urlencoding::encode(calendar_id))
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!("{}/{}", self.events_url(calendar_id), urlencoding::encode(event_id))
    }

    /// Calendar owned by this account whose title is `display_name`.
    async fn find_calendar(
        &self,
        token: &AccessToken,
        display_name: &str,
    ) -> GatewayResult<Option<String>> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let mut page_token: Option<String> = None;

        for _ in 0..CALENDAR_LIST_PAGES {
            let mut request = self.http.get(&url).query(&[("minAccessRole", "owner")]);
            if let Some(page) = &page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }
            let list: CalendarList = read_json(send(request, token).await?).await?;

            if let Some(entry) = list
                .items
                .into_iter()
                .find(|entry| entry.summary == display_name && entry.access_role == "owner")
            {
                return Ok(Some(entry.id));
            }
            match list.next_page_token {
                Some(next) => page_token = Some(next),
                None => return Ok(None),
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl CalendarGateway for GoogleCalendarGateway {
    #[instrument(skip(self, token))]
    async fn ensure_calendar(
        &self,
        token: &AccessToken,
        display_name: &str,
    ) -> GatewayResult<String> {
        if let Some(existing) = self.find_calendar(token, display_name).await? {
            debug!(calendar_id = %existing, "reusing existing calendar");
            return Ok(existing);
        }

        let body = NewCalendar { summary: display_name, time_zone: "UTC" };
        let request = self.http.post(format!("{}/calendars", self.base_url)).json(&body);
        let created: Created = read_json(send(request, token).await?).await?;
        debug!(calendar_id = %created.id, "calendar created");
        Ok(created.id)
    }

    #[instrument(skip(self, token, spec), fields(summary = %spec.summary))]
    async fn create_event(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        spec: &EventSpec,
    ) -> GatewayResult<String> {
        let request = self.http.post(self.events_url(calendar_id)).json(&EventBody::from_spec(spec));
        let created: Created = read_json(send(request, token).await?).await?;
        Ok(created.id)
    }

    #[instrument(skip(self, token, spec))]
    async fn update_event(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        event_id: &str,
        spec: &EventSpec,
    ) -> GatewayResult<()> {
        let request = self
            .http
            .put(self.event_url(calendar_id, event_id))
            .json(&EventBody::from_spec(spec));
        send(request, token).await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn delete_event(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        event_id: &str,
    ) -> GatewayResult<()> {
        let request = self.http.delete(self.event_url(calendar_id, event_id));
        match send(request, token).await {
            Ok(_) | Err(GatewayError::NotFound) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

async fn send(request: RequestBuilder, token: &AccessToken) -> GatewayResult<Response> {
    let response = request.bearer_auth(token.secret()).send().await.map_err(|e| {
        warn!(error = %e, "calendar request failed before a response");
        GatewayError::Transient(e.to_string())
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();
    let err = classify(status, retry_after, &body);
    debug!(status = status.as_u16(), error = %err, "calendar request rejected");
    Err(err)
}

async fn read_json<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| GatewayError::Transient(format!("unreadable calendar response: {e}")))
}

/// Map a non-success response to a gateway error.
fn classify(status: StatusCode, retry_after: Option<Duration>, body: &str) -> GatewayError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = if parsed.error.message.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("HTTP {}: {}", status.as_u16(), parsed.error.message)
    };

    match status {
        StatusCode::UNAUTHORIZED => GatewayError::Unauthorized,
        StatusCode::NOT_FOUND | StatusCode::GONE => GatewayError::NotFound,
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited(retry_after),
        StatusCode::FORBIDDEN if parsed.has_reason(RATE_LIMIT_REASONS) => {
            GatewayError::RateLimited(retry_after)
        }
        StatusCode::REQUEST_TIMEOUT => GatewayError::Transient(message),
        s if s.is_server_error() => GatewayError::Transient(message),
        _ => GatewayError::Permanent(message),
    }
}

/// `Retry-After` in delta-seconds form.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(classify(StatusCode::UNAUTHORIZED, None, ""), GatewayError::Unauthorized);
        assert_eq!(classify(StatusCode::GONE, None, ""), GatewayError::NotFound);
        assert_eq!(
            classify(StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(2)), ""),
            GatewayError::RateLimited(Some(Duration::from_secs(2)))
        );
        assert!(matches!(
            classify(StatusCode::SERVICE_UNAVAILABLE, None, ""),
            GatewayError::Transient(_)
        ));
        assert!(matches!(classify(StatusCode::BAD_REQUEST, None, ""), GatewayError::Permanent(_)));
    }

    #[test]
    fn forbidden_is_rate_limit_only_with_rate_limit_reason() {
        let limited = r#"{"error":{"message":"slow down","errors":[{"reason":"userRateLimitExceeded"}]}}"#;
        let denied = r#"{"error":{"message":"no access","errors":[{"reason":"forbidden"}]}}"#;

        assert_eq!(classify(StatusCode::FORBIDDEN, None, limited), GatewayError::RateLimited(None));
        assert_eq!(
            classify(StatusCode::FORBIDDEN, None, denied),
            GatewayError::Permanent("HTTP 403: no access".into())
        );
    }

    #[test]
    fn retry_after_reads_delta_seconds_only() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn ids_are_percent_encoded_in_paths() {
        let gateway = GoogleCalendarGateway::with_base_url("http://localhost:1/");
        assert_eq!(
            gateway.event_url("abc@group.calendar.google.com", "evt 1"),
            "http://localhost:1/calendars/abc%40group.calendar.google.com/events/evt%201"
        );
    }
}
