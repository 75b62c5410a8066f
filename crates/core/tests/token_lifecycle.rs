//! Token lifecycle manager against in-memory ports.

#[allow(dead_code)]
mod support;

use std::sync::Arc;

use chrono::Duration;
use duesync_core::{RefreshError, RefreshedToken};
use duesync_domain::{AccountRole, ConnectionStatus, DueSyncError, TokenGrant, TokenStatus};
use support::{now, Harness};

const PARENT: AccountRole = AccountRole::Parent;

#[tokio::test]
async fn valid_token_is_returned_without_refresh() {
    let h = Harness::new();
    h.connect(PARENT).await;

    let valid = h.tokens.get_valid_token(&h.ctx, PARENT).await.unwrap();

    assert_eq!(valid.token.secret(), "access-parent");
    assert_eq!(h.refresher.calls(), 0);
}

#[tokio::test]
async fn expired_token_is_refreshed_and_persisted() {
    let h = Harness::new();
    h.connect(PARENT).await;
    h.token_repo.edit(&h.ctx, PARENT, |r| r.expires_at = now() - Duration::minutes(10));

    let valid = h.tokens.get_valid_token(&h.ctx, PARENT).await.unwrap();

    assert_eq!(valid.token.secret(), "refreshed-1");
    assert_eq!(valid.token.expires_at(), now() + Duration::hours(1));
    assert_eq!(h.refresher.seen(), vec!["refresh-parent".to_string()]);

    let record = h.token_repo.record(&h.ctx, PARENT).unwrap();
    assert_eq!(record.encrypted_access, "enc:refreshed-1");
    assert_eq!(record.encrypted_refresh, "enc:refresh-parent", "refresh token kept when not rotated");
    assert_eq!(record.status, TokenStatus::Active);
}

#[tokio::test]
async fn token_inside_the_margin_is_refreshed() {
    let h = Harness::new();
    h.connect(PARENT).await;
    h.token_repo.edit(&h.ctx, PARENT, |r| r.expires_at = now() + Duration::minutes(4));

    h.tokens.get_valid_token(&h.ctx, PARENT).await.unwrap();

    assert_eq!(h.refresher.calls(), 1);
}

#[tokio::test]
async fn rotated_refresh_token_replaces_the_stored_one() {
    let h = Harness::new();
    h.connect(PARENT).await;
    h.token_repo.edit(&h.ctx, PARENT, |r| r.expires_at = now());
    h.refresher.push(Ok(RefreshedToken {
        access_token: "new-access".into(),
        refresh_token: Some("new-refresh".into()),
        expires_at: now() + Duration::hours(1),
    }));

    h.tokens.get_valid_token(&h.ctx, PARENT).await.unwrap();

    let record = h.token_repo.record(&h.ctx, PARENT).unwrap();
    assert_eq!(record.encrypted_refresh, "enc:new-refresh");
}

#[tokio::test]
async fn revoked_refresh_token_marks_role_for_reauthentication() {
    let h = Harness::new();
    h.connect(PARENT).await;
    h.token_repo.edit(&h.ctx, PARENT, |r| r.expires_at = now() - Duration::minutes(1));
    h.refresher.push(Err(RefreshError::Revoked("invalid_grant".into())));

    let err = h.tokens.get_valid_token(&h.ctx, PARENT).await.unwrap_err();

    assert!(matches!(err, DueSyncError::AuthorizationExpired(_)));
    let record = h.token_repo.record(&h.ctx, PARENT).unwrap();
    assert_eq!(record.status, TokenStatus::RequiresReauth);
    assert!(matches!(
        h.tokens.connection_status(&h.ctx, PARENT).await.unwrap(),
        ConnectionStatus::RequiresReauth { .. }
    ));

    // No further refresh attempts once flagged
    let err = h.tokens.get_valid_token(&h.ctx, PARENT).await.unwrap_err();
    assert!(matches!(err, DueSyncError::AuthorizationExpired(_)));
    assert_eq!(h.refresher.calls(), 1);
}

#[tokio::test]
async fn transient_refresh_failure_leaves_role_connected() {
    let h = Harness::new();
    h.connect(PARENT).await;
    h.token_repo.edit(&h.ctx, PARENT, |r| r.expires_at = now() - Duration::minutes(1));
    h.refresher.push(Err(RefreshError::Transient("connection reset".into())));

    let err = h.tokens.get_valid_token(&h.ctx, PARENT).await.unwrap_err();

    assert!(matches!(err, DueSyncError::Network(_)));
    assert_eq!(h.token_repo.record(&h.ctx, PARENT).unwrap().status, TokenStatus::Active);
}

#[tokio::test]
async fn missing_record_is_not_connected() {
    let h = Harness::new();

    let err = h.tokens.get_valid_token(&h.ctx, PARENT).await.unwrap_err();

    assert!(matches!(err, DueSyncError::NotConnected(_)));
    assert_eq!(
        h.tokens.connection_status(&h.ctx, PARENT).await.unwrap(),
        ConnectionStatus::Disconnected
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_callers_share_one_refresh() {
    let h = Arc::new(Harness::new());
    h.connect(PARENT).await;
    h.token_repo.edit(&h.ctx, PARENT, |r| r.expires_at = now() - Duration::minutes(1));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let h = Arc::clone(&h);
            tokio::spawn(async move { h.tokens.get_valid_token(&h.ctx, PARENT).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().token.secret(), "refreshed-1");
    }

    assert_eq!(h.refresher.calls(), 1);
}

#[tokio::test]
async fn force_refresh_ignores_expiry() {
    let h = Harness::new();
    h.connect(PARENT).await;

    let valid = h.tokens.force_refresh(&h.ctx, PARENT).await.unwrap();

    assert_eq!(valid.token.secret(), "refreshed-1");
}

#[tokio::test]
async fn revoke_is_idempotent() {
    let h = Harness::new();
    h.connect(PARENT).await;

    assert!(h.tokens.revoke(&h.ctx, PARENT).await.unwrap());
    assert!(!h.tokens.revoke(&h.ctx, PARENT).await.unwrap());
    assert!(h.token_repo.record(&h.ctx, PARENT).is_none());
}

#[tokio::test]
async fn store_encrypts_and_reactivates() {
    let h = Harness::new();
    h.connect(PARENT).await;
    h.tokens.mark_invalid(&h.ctx, PARENT).await.unwrap();

    h.connect(PARENT).await;

    let record = h.token_repo.record(&h.ctx, PARENT).unwrap();
    assert_eq!(record.status, TokenStatus::Active);
    assert_eq!(record.encrypted_access, "enc:access-parent");
    assert_ne!(record.encrypted_refresh, "refresh-parent");
}

#[tokio::test]
async fn reconnecting_same_account_keeps_calendar_and_refresh_token() {
    let h = Harness::new();
    h.connect(PARENT).await;
    h.tokens.set_calendar_id(&h.ctx, PARENT, "cal-1").await.unwrap();

    let grant = TokenGrant {
        access_token: "second-access".into(),
        refresh_token: String::new(),
        expires_at: now() + Duration::hours(1),
        account_email: Some("parent@example.com".into()),
    };
    h.tokens.store(&h.ctx, PARENT, grant).await.unwrap();

    let record = h.token_repo.record(&h.ctx, PARENT).unwrap();
    assert_eq!(record.calendar_id.as_deref(), Some("cal-1"));
    assert_eq!(record.encrypted_refresh, "enc:refresh-parent");
}

#[tokio::test]
async fn connecting_a_different_account_starts_a_new_calendar() {
    let h = Harness::new();
    h.connect(PARENT).await;
    h.tokens.set_calendar_id(&h.ctx, PARENT, "cal-1").await.unwrap();

    let grant = TokenGrant {
        access_token: "other-access".into(),
        refresh_token: "other-refresh".into(),
        expires_at: now() + Duration::hours(1),
        account_email: Some("someone-else@example.com".into()),
    };
    h.tokens.store(&h.ctx, PARENT, grant).await.unwrap();

    assert!(h.token_repo.record(&h.ctx, PARENT).unwrap().calendar_id.is_none());
}

#[tokio::test]
async fn grant_without_refresh_token_for_new_account_is_rejected() {
    let h = Harness::new();
    let grant = TokenGrant {
        access_token: "a".into(),
        refresh_token: String::new(),
        expires_at: now() + Duration::hours(1),
        account_email: None,
    };

    let err = h.tokens.store(&h.ctx, PARENT, grant).await.unwrap_err();

    assert!(matches!(err, DueSyncError::InvalidInput(_)));
}

#[tokio::test]
async fn scenario_expired_parent_token_does_not_block_the_pass() {
    let h = Harness::new();
    h.connect(PARENT).await;
    h.token_repo.edit(&h.ctx, PARENT, |r| r.expires_at = now() - Duration::minutes(10));
    h.set_assignments(vec![support::assignment("a1", now() + Duration::days(2))]);

    let result = h.reconciler.run_pass(&h.ctx).await.unwrap();

    assert!(result.roles_requiring_reauth().is_empty());
    assert_eq!(result.created(), 1);
    assert_eq!(h.refresher.calls(), 1);
}
