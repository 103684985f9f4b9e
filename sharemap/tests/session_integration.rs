//! Integration tests for map sessions and the async driver.
//!
//! These tests verify the complete session flow including:
//! - Pan gestures → debounce → render
//! - Lazy admission advancing on its own timer
//! - Cluster taps → expansion overlay → contraction
//! - Cancellation and dispose
//!
//! Run with: `cargo test --test session_integration`

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use sharemap::expansion::ExpansionPhase;
use sharemap::session::{spawn_session, SessionCommand};
use sharemap::{EngineConfig, GeoPoint, MapSession, RenderStrategy, Viewport};

// ============================================================================
// Helper Functions
// ============================================================================

fn row(count: usize, spacing: f64) -> Vec<GeoPoint> {
    (0..count)
        .map(|i| GeoPoint::new(format!("p{}", i), 0.0, i as f64 * spacing))
        .collect()
}

// ============================================================================
// Synchronous session
// ============================================================================

#[test]
fn test_pan_gesture_renders_once_after_settling() {
    let mut session = MapSession::new(&EngineConfig::default());
    session.set_listings(row(10, 0.001));
    let start = std::time::Instant::now();

    // A pan delivers many intermediate viewports 16 ms apart.
    let mut now = start;
    for step in 0..20 {
        now = start + Duration::from_millis(16 * step);
        session.on_viewport_changed(Viewport::new(0.0, step as f64 * 0.0005, 0.1, 0.1), now);
        assert!(session.poll(now).is_none());
    }

    let settle = session.next_deadline().unwrap();
    assert_eq!(settle, now + Duration::from_millis(300));
    let plan = session.poll(settle).unwrap();
    assert_eq!(plan.individuals.len(), 10);
    assert_eq!(
        session.viewport().map(|v| v.center_lon),
        Some(19.0 * 0.0005)
    );
}

#[test]
fn test_config_file_forced_strategy_reaches_session() {
    let config = EngineConfig::from_ini_str("[strategy]\nforced = clustered\n").unwrap();
    let mut session = MapSession::new(&config);
    session.set_listings(row(3, 0.00001));
    let plan = session
        .on_viewport_settled(Viewport::new(0.0, 0.0, 11.25, 11.25), std::time::Instant::now())
        .unwrap();
    assert_eq!(plan.strategy, RenderStrategy::Clustered);
    assert_eq!(plan.clusters.len(), 1);
}

// ============================================================================
// Async driver
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_driver_lazy_admission_runs_on_its_own() {
    let config = EngineConfig::default();
    let handle = spawn_session(MapSession::new(&config), CancellationToken::new());
    let mut plans = handle.plans();

    handle
        .send(SessionCommand::ForceStrategy(Some(RenderStrategy::Lazy)))
        .await
        .unwrap();
    handle.send(SessionCommand::SetListings(row(65, 0.0001))).await.unwrap();
    handle
        .send(SessionCommand::ViewportSettled(Viewport::new(0.0, 0.003, 0.1, 0.1)))
        .await
        .unwrap();

    // 65 points arrive in batches of 20 across ticks without further input.
    let mut sizes = Vec::new();
    while sizes.last() != Some(&65) {
        plans.changed().await.unwrap();
        let plan = plans.borrow_and_update().clone();
        if let Some(plan) = plan {
            sizes.push(plan.individuals.len());
        }
    }
    assert_eq!(sizes, vec![20, 40, 60, 65]);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_driver_expand_and_contract_cluster() {
    let handle = spawn_session(
        MapSession::new(&EngineConfig::default()),
        CancellationToken::new(),
    );
    let mut plans = handle.plans();

    handle
        .send(SessionCommand::ForceStrategy(Some(RenderStrategy::Clustered)))
        .await
        .unwrap();
    handle
        .send(SessionCommand::SetListings(vec![
            GeoPoint::new("a", 0.0, 0.0),
            GeoPoint::new("b", 0.0, 0.0001),
            GeoPoint::new("c", 0.0001, 0.0),
            GeoPoint::new("d", 0.0001, 0.0001),
        ]))
        .await
        .unwrap();
    handle
        .send(SessionCommand::ViewportSettled(Viewport::new(0.0, 0.0, 11.25, 11.25)))
        .await
        .unwrap();
    plans.changed().await.unwrap();
    let cluster_id = handle.latest().unwrap().clusters[0].id().to_string();

    let tapped_at = Instant::now();
    handle
        .send(SessionCommand::ClusterTapped(cluster_id.clone()))
        .await
        .unwrap();
    plans.changed().await.unwrap();
    let overlay = plans.borrow_and_update().clone().unwrap().expansion.unwrap();
    assert_eq!(overlay.phase, ExpansionPhase::Expanding);
    assert_eq!(overlay.members.len(), 4);

    // The animation completes on the session's own timer.
    plans.changed().await.unwrap();
    assert!(tapped_at.elapsed() >= Duration::from_millis(300));
    let overlay = plans.borrow_and_update().clone().unwrap().expansion.unwrap();
    assert_eq!(overlay.phase, ExpansionPhase::Expanded);

    handle.send(SessionCommand::ContractRequested).await.unwrap();
    plans.changed().await.unwrap();
    let overlay = plans.borrow_and_update().clone().unwrap().expansion.unwrap();
    assert_eq!(overlay.phase, ExpansionPhase::Contracting);

    plans.changed().await.unwrap();
    assert!(plans.borrow_and_update().clone().unwrap().expansion.is_none());

    let snapshot = handle.shutdown().await.unwrap().unwrap();
    assert_eq!(snapshot.expansions, 1);
}

#[tokio::test(start_paused = true)]
async fn test_driver_cancellation_returns_final_metrics() {
    let token = CancellationToken::new();
    let handle = spawn_session(MapSession::new(&EngineConfig::default()), token.clone());
    handle.send(SessionCommand::SetListings(row(3, 0.001))).await.unwrap();

    token.cancel();
    let snapshot = handle.join().await.unwrap();
    assert!(snapshot.is_some());
}
