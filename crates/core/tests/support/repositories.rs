//! In-memory repositories for the core ports

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duesync_core::{AssignmentSource, MappingRepository, SettingsRepository, TokenRepository};
use duesync_domain::{
    AccountRole, Assignment, DueSyncError, EventMapping, Result as DomainResult, SyncContext,
    SyncSettings, TokenRecord, TokenStatus,
};

/// Assignment cache keyed by student.
#[derive(Default)]
pub struct InMemoryAssignments {
    by_student: Mutex<HashMap<String, Vec<Assignment>>>,
}

impl InMemoryAssignments {
    pub fn set(&self, student_id: &str, assignments: Vec<Assignment>) {
        self.by_student.lock().unwrap().insert(student_id.to_string(), assignments);
    }
}

#[async_trait]
impl AssignmentSource for InMemoryAssignments {
    async fn fetch_assignments(&self, student_id: &str) -> DomainResult<Vec<Assignment>> {
        Ok(self.by_student.lock().unwrap().get(student_id).cloned().unwrap_or_default())
    }
}

/// Settings keyed by (user, student).
#[derive(Default)]
pub struct InMemorySettings {
    rows: Mutex<HashMap<(String, String), SyncSettings>>,
}

impl InMemorySettings {
    pub fn get(&self, ctx: &SyncContext) -> Option<SyncSettings> {
        self.rows.lock().unwrap().get(&(ctx.user_id.clone(), ctx.student_id.clone())).cloned()
    }

    pub fn put(&self, settings: SyncSettings) {
        self.rows
            .lock()
            .unwrap()
            .insert((settings.user_id.clone(), settings.student_id.clone()), settings);
    }
}

#[async_trait]
impl SettingsRepository for InMemorySettings {
    async fn get_settings(&self, ctx: &SyncContext) -> DomainResult<Option<SyncSettings>> {
        Ok(self.get(ctx))
    }

    async fn save_settings(&self, settings: &SyncSettings) -> DomainResult<()> {
        self.put(settings.clone());
        Ok(())
    }

    async fn list_auto_sync_targets(&self) -> DomainResult<Vec<SyncContext>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.sync_enabled && s.auto_sync_enabled)
            .map(|s| SyncContext::new(&s.user_id, &s.student_id))
            .collect())
    }
}

type MappingKey = (String, String, AccountRole);

/// Mapping table with an optional write failure switch.
#[derive(Default)]
pub struct InMemoryMappings {
    rows: Mutex<BTreeMap<MappingKey, EventMapping>>,
    fail_upserts: AtomicBool,
    delete_latency: Mutex<Option<Duration>>,
}

impl InMemoryMappings {
    pub fn all(&self, role: AccountRole) -> Vec<EventMapping> {
        self.rows.lock().unwrap().values().filter(|m| m.role == role).cloned().collect()
    }

    pub fn get(&self, assignment_id: &str, role: AccountRole) -> Option<EventMapping> {
        self.rows
            .lock()
            .unwrap()
            .values()
            .find(|m| m.assignment_id == assignment_id && m.role == role)
            .cloned()
    }

    pub fn insert(&self, mapping: EventMapping) {
        let key = (mapping.assignment_id.clone(), mapping.student_id.clone(), mapping.role);
        self.rows.lock().unwrap().insert(key, mapping);
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    /// Delay bulk role deletes by `latency`.
    pub fn set_delete_latency(&self, latency: Duration) {
        *self.delete_latency.lock().unwrap() = Some(latency);
    }
}

#[async_trait]
impl MappingRepository for InMemoryMappings {
    async fn list_mappings(
        &self,
        student_id: &str,
        role: AccountRole,
    ) -> DomainResult<Vec<EventMapping>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.student_id == student_id && m.role == role)
            .cloned()
            .collect())
    }

    async fn upsert_mapping(&self, mapping: &EventMapping) -> DomainResult<()> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(DueSyncError::Database("disk I/O error".into()));
        }
        self.insert(mapping.clone());
        Ok(())
    }

    async fn delete_mapping(
        &self,
        assignment_id: &str,
        student_id: &str,
        role: AccountRole,
    ) -> DomainResult<bool> {
        let key = (assignment_id.to_string(), student_id.to_string(), role);
        Ok(self.rows.lock().unwrap().remove(&key).is_some())
    }

    async fn delete_role_mappings(&self, student_id: &str, role: AccountRole) -> DomainResult<usize> {
        let latency = *self.delete_latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|_, m| !(m.student_id == student_id && m.role == role));
        Ok(before - rows.len())
    }
}

type TokenKey = (String, String, AccountRole);

/// Token rows keyed by (user, student, role).
#[derive(Default)]
pub struct InMemoryTokenRepository {
    rows: Mutex<HashMap<TokenKey, TokenRecord>>,
}

impl InMemoryTokenRepository {
    fn key(ctx: &SyncContext, role: AccountRole) -> TokenKey {
        (ctx.user_id.clone(), ctx.student_id.clone(), role)
    }

    pub fn record(&self, ctx: &SyncContext, role: AccountRole) -> Option<TokenRecord> {
        self.rows.lock().unwrap().get(&Self::key(ctx, role)).cloned()
    }

    /// Rewrite a stored record in place.
    pub fn edit(&self, ctx: &SyncContext, role: AccountRole, f: impl FnOnce(&mut TokenRecord)) {
        if let Some(record) = self.rows.lock().unwrap().get_mut(&Self::key(ctx, role)) {
            f(record);
        }
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn find_token(
        &self,
        ctx: &SyncContext,
        role: AccountRole,
    ) -> DomainResult<Option<TokenRecord>> {
        Ok(self.record(ctx, role))
    }

    async fn upsert_token(&self, record: &TokenRecord) -> DomainResult<()> {
        let key = (record.user_id.clone(), record.student_id.clone(), record.role);
        self.rows.lock().unwrap().insert(key, record.clone());
        Ok(())
    }

    async fn delete_token(&self, ctx: &SyncContext, role: AccountRole) -> DomainResult<bool> {
        Ok(self.rows.lock().unwrap().remove(&Self::key(ctx, role)).is_some())
    }

    async fn update_access_token(
        &self,
        ctx: &SyncContext,
        role: AccountRole,
        encrypted_access: &str,
        encrypted_refresh: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.edit(ctx, role, |record| {
            record.encrypted_access = encrypted_access.to_string();
            if let Some(refresh) = encrypted_refresh {
                record.encrypted_refresh = refresh.to_string();
            }
            record.expires_at = expires_at;
        });
        Ok(())
    }

    async fn set_token_status(
        &self,
        ctx: &SyncContext,
        role: AccountRole,
        status: TokenStatus,
    ) -> DomainResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.get_mut(&Self::key(ctx, role)).map(|record| record.status = status).is_some())
    }

    async fn set_calendar_id(
        &self,
        ctx: &SyncContext,
        role: AccountRole,
        calendar_id: &str,
    ) -> DomainResult<()> {
        self.edit(ctx, role, |record| record.calendar_id = Some(calendar_id.to_string()));
        Ok(())
    }
}
