//! Scriptable in-memory calendar provider

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use duesync_core::{CalendarGateway, GatewayError, GatewayResult};
use duesync_domain::{AccessToken, EventSpec};

/// Which gateway operation a call or scripted failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayCall {
    EnsureCalendar,
    Create,
    Update,
    Delete,
}

#[derive(Default)]
struct State {
    next_id: u64,
    calendars: BTreeMap<String, String>,
    events: BTreeMap<String, (String, EventSpec)>,
    calls: Vec<(GatewayCall, String)>,
    scripted: HashMap<GatewayCall, VecDeque<GatewayError>>,
    reject_summaries: Vec<(String, GatewayError)>,
    rejected_tokens: Vec<String>,
    latency: Option<Duration>,
}

/// Records every call and stores events; failures can be queued per
/// operation, keyed on summary text, or tied to a token.
#[derive(Default)]
pub struct FakeCalendar {
    state: Mutex<State>,
}

impl FakeCalendar {
    /// Fail the next call of `op` with `error`.
    pub fn fail_next(&self, op: GatewayCall, error: GatewayError) {
        self.state.lock().unwrap().scripted.entry(op).or_default().push_back(error);
    }

    /// Fail every create or update whose summary contains `needle`.
    pub fn reject_summary(&self, needle: &str, error: GatewayError) {
        self.state.lock().unwrap().reject_summaries.push((needle.to_string(), error));
    }

    /// Answer `Unauthorized` to any call made with this access token.
    pub fn reject_token(&self, secret: &str) {
        self.state.lock().unwrap().rejected_tokens.push(secret.to_string());
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().unwrap().latency = Some(latency);
    }

    pub fn call_count(&self, op: GatewayCall) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|(c, _)| *c == op).count()
    }

    /// Access tokens presented for `op`, in call order.
    pub fn tokens_used(&self, op: GatewayCall) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(c, _)| *c == op)
            .map(|(_, token)| token.clone())
            .collect()
    }

    pub fn calendar_id(&self, name: &str) -> Option<String> {
        self.state.lock().unwrap().calendars.get(name).cloned()
    }

    pub fn event(&self, event_id: &str) -> Option<(String, EventSpec)> {
        self.state.lock().unwrap().events.get(event_id).cloned()
    }

    /// Events currently stored in `calendar_id`.
    pub fn events_in(&self, calendar_id: &str) -> Vec<EventSpec> {
        self.state
            .lock()
            .unwrap()
            .events
            .values()
            .filter(|(cal, _)| cal == calendar_id)
            .map(|(_, spec)| spec.clone())
            .collect()
    }

    /// Simulate a user deleting an event directly in the calendar.
    pub fn remove_event(&self, event_id: &str) {
        self.state.lock().unwrap().events.remove(event_id);
    }

    async fn begin(&self, op: GatewayCall, token: &AccessToken, spec: Option<&EventSpec>) -> GatewayResult<()> {
        let latency = {
            let mut state = self.state.lock().unwrap();
            state.calls.push((op, token.secret().to_string()));
            state.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock().unwrap();
        if state.rejected_tokens.iter().any(|t| t == token.secret()) {
            return Err(GatewayError::Unauthorized);
        }
        if let Some(error) = state.scripted.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        if let Some(spec) = spec {
            if let Some((_, error)) =
                state.reject_summaries.iter().find(|(needle, _)| spec.summary.contains(needle.as_str()))
            {
                return Err(error.clone());
            }
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        format!("{prefix}-{}", state.next_id)
    }
}

#[async_trait]
impl CalendarGateway for FakeCalendar {
    async fn ensure_calendar(
        &self,
        token: &AccessToken,
        display_name: &str,
    ) -> GatewayResult<String> {
        self.begin(GatewayCall::EnsureCalendar, token, None).await?;
        let id = self.next_id("cal");
        self.state.lock().unwrap().calendars.insert(display_name.to_string(), id.clone());
        Ok(id)
    }

    async fn create_event(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        spec: &EventSpec,
    ) -> GatewayResult<String> {
        self.begin(GatewayCall::Create, token, Some(spec)).await?;
        let id = self.next_id("evt");
        self.state
            .lock()
            .unwrap()
            .events
            .insert(id.clone(), (calendar_id.to_string(), spec.clone()));
        Ok(id)
    }

    async fn update_event(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        event_id: &str,
        spec: &EventSpec,
    ) -> GatewayResult<()> {
        self.begin(GatewayCall::Update, token, Some(spec)).await?;
        let mut state = self.state.lock().unwrap();
        match state.events.get_mut(event_id) {
            Some(entry) => {
                *entry = (calendar_id.to_string(), spec.clone());
                Ok(())
            }
            None => Err(GatewayError::NotFound),
        }
    }

    async fn delete_event(
        &self,
        token: &AccessToken,
        _calendar_id: &str,
        event_id: &str,
    ) -> GatewayResult<()> {
        self.begin(GatewayCall::Delete, token, None).await?;
        self.state.lock().unwrap().events.remove(event_id);
        Ok(())
    }
}
