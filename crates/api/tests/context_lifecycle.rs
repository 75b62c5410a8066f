//! AppContext startup and shutdown.

mod support;

use duesync_domain::SyncConfig;
use support::TestApp;

#[tokio::test(flavor = "multi_thread")]
async fn context_runs_migrations() {
    let app = TestApp::new().await;

    assert_eq!(
        app.ctx.db.schema_version().unwrap(),
        Some(duesync_infra::database::SCHEMA_VERSION)
    );
    app.ctx.db.health_check().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn auto_sync_starts_and_stops() {
    let app = TestApp::with_sync(SyncConfig {
        auto_sync_cron: "0 0 0 1 1 *".to_string(),
        ..SyncConfig::default()
    })
    .await;

    assert!(app.ctx.start_auto_sync().await.unwrap());
    assert!(app.ctx.auto_sync_running().await);
    // Starting twice is a no-op.
    assert!(app.ctx.start_auto_sync().await.unwrap());

    app.ctx.shutdown().await.unwrap();
    assert!(!app.ctx.auto_sync_running().await);
    app.ctx.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn auto_sync_disabled_by_config() {
    let app = TestApp::with_sync(SyncConfig { auto_sync_enabled: false, ..SyncConfig::default() }).await;

    assert!(!app.ctx.start_auto_sync().await.unwrap());
    assert!(!app.ctx.auto_sync_running().await);
}
