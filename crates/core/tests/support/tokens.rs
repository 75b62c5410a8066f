//! Cipher and refresher fakes

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Duration;
use duesync_common::{Clock, MockClock};
use duesync_core::{RefreshError, RefreshedToken, TokenCipher, TokenRefresher};
use duesync_domain::{DueSyncError, Result as DomainResult};

/// Reversible "encryption" that makes ciphertext easy to spot in assertions.
pub struct PrefixCipher;

impl TokenCipher for PrefixCipher {
    fn encrypt(&self, plaintext: &str) -> DomainResult<String> {
        Ok(format!("enc:{plaintext}"))
    }

    fn decrypt(&self, ciphertext: &str) -> DomainResult<String> {
        ciphertext
            .strip_prefix("enc:")
            .map(str::to_string)
            .ok_or_else(|| DueSyncError::Security("not produced by PrefixCipher".into()))
    }
}

/// Refresher that replays scripted outcomes, then succeeds with numbered
/// tokens valid for one hour.
pub struct ScriptedRefresher {
    clock: MockClock,
    script: Mutex<VecDeque<Result<RefreshedToken, RefreshError>>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl ScriptedRefresher {
    pub fn new(clock: MockClock) -> Self {
        Self {
            clock,
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, outcome: Result<RefreshedToken, RefreshError>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Refresh tokens presented so far, in order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenRefresher for ScriptedRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, RefreshError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen.lock().unwrap().push(refresh_token.to_string());
        // Yield so concurrent callers can pile up on the refresh lock
        tokio::task::yield_now().await;

        if let Some(outcome) = self.script.lock().unwrap().pop_front() {
            return outcome;
        }
        Ok(RefreshedToken {
            access_token: format!("refreshed-{n}"),
            refresh_token: None,
            expires_at: self.clock.now() + Duration::hours(1),
        })
    }
}
