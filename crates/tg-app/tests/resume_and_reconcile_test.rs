//! Progress survives restarts and converges across devices.

mod support;

use std::sync::Arc;

use tempfile::TempDir;
use tg_app::TourError;
use tg_core::ports::{EventOutboxPort, LocalStatePort};
use tg_core::{OnboardingEventKind, OnboardingState, TourPhase};
use tg_infra::{FileLocalStateRepository, InMemoryDocumentStore, InMemoryEventOutbox};

use support::{
    at, build_orchestrator, build_orchestrator_with_outbox, dashboard_view, kinds, ManualClock,
    USER,
};

fn in_progress(tour: &str, step: usize, updated_at: i64) -> OnboardingState {
    OnboardingState {
        has_seen_welcome: true,
        current_tour_id: Some(tour.into()),
        current_step: Some(step),
        updated_at: at(updated_at),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn restart_resumes_at_persisted_step() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(InMemoryDocumentStore::new());
    let outbox = Arc::new(InMemoryEventOutbox::new());
    let clock = ManualClock::at(1_700_000_000);

    // First session runs with the backend down: progress reaches the local
    // cache only and analytics wait in the outbox.
    remote.set_offline(true);
    {
        let orchestrator = build_orchestrator_with_outbox(
            Arc::new(FileLocalStateRepository::new(dir.path())),
            remote.clone(),
            outbox.clone(),
            dashboard_view(),
            clock.clone(),
        );
        orchestrator.load_progress().await;
        orchestrator.start(&"first-time-user".into()).await.unwrap();
        orchestrator.next().await.unwrap();
        orchestrator.next().await.unwrap();
        orchestrator.shutdown().await;
    }
    assert!(remote.record(&USER.into()).await.is_none());
    assert!(remote.events().await.is_empty());
    assert!(kinds(&outbox.pending().await.unwrap()).contains(&OnboardingEventKind::TourStarted));

    remote.set_offline(false);
    clock.advance_secs(60);
    let orchestrator = build_orchestrator_with_outbox(
        Arc::new(FileLocalStateRepository::new(dir.path())),
        remote.clone(),
        outbox.clone(),
        dashboard_view(),
        clock,
    );
    let progress = orchestrator.load_progress().await;
    assert_eq!(progress.current_step, Some(2));

    let phase = orchestrator.resume().await.unwrap();
    assert!(matches!(phase, TourPhase::StepActive(ref cursor) if cursor.step() == 2));
    assert_eq!(
        orchestrator.current_step_view().await.unwrap().step.id.as_str(),
        "prompt-library"
    );
    // The remote has no record yet, so the cache stays authoritative.
    assert_eq!(orchestrator.await_remote_reconciliation().await.unwrap(), None);

    orchestrator.shutdown().await;
    // The first session's events arrive late; resuming starts nothing new.
    let started = kinds(&remote.events().await)
        .into_iter()
        .filter(|kind| *kind == OnboardingEventKind::TourStarted)
        .count();
    assert_eq!(started, 1);
    assert!(outbox.pending().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn newer_remote_record_wins_in_full() {
    let dir = TempDir::new().unwrap();
    let local = Arc::new(FileLocalStateRepository::new(dir.path()));
    let remote = Arc::new(InMemoryDocumentStore::new());

    let local_copy = in_progress("first-time-user", 1, 1_700_000_000);
    let mut remote_copy = in_progress("first-time-user", 3, 1_700_000_001);
    remote_copy.selected_path = Some("explorer".into());
    remote_copy.completed_tours.insert("beta-program".into());
    local.store(&USER.into(), &local_copy).await.unwrap();
    remote.insert_record(USER.into(), remote_copy.clone()).await;

    let orchestrator = build_orchestrator(
        local.clone(),
        remote.clone(),
        dashboard_view(),
        ManualClock::at(1_700_000_100),
    );

    // The cache answers first.
    assert_eq!(orchestrator.load_progress().await, local_copy);
    let phase = orchestrator.resume().await.unwrap();
    assert_eq!(phase.cursor().unwrap().step(), 1);

    let phase = orchestrator
        .await_remote_reconciliation()
        .await
        .unwrap()
        .expect("remote record is newer");

    assert!(matches!(phase, TourPhase::StepActive(ref cursor) if cursor.step() == 3));
    assert_eq!(orchestrator.progress().await, remote_copy);
    assert_eq!(local.load(&USER.into()).await.unwrap(), Some(remote_copy));
    assert_eq!(
        orchestrator.current_step_view().await.unwrap().step.id.as_str(),
        "beta-programs"
    );

    orchestrator.shutdown().await;
    assert!(remote.events().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn older_remote_record_is_ignored() {
    let dir = TempDir::new().unwrap();
    let local = Arc::new(FileLocalStateRepository::new(dir.path()));
    let remote = Arc::new(InMemoryDocumentStore::new());

    let local_copy = in_progress("prompt-creation", 2, 1_700_000_001);
    local.store(&USER.into(), &local_copy).await.unwrap();
    remote
        .insert_record(USER.into(), in_progress("prompt-creation", 0, 1_700_000_000))
        .await;

    let orchestrator = build_orchestrator(
        local.clone(),
        remote.clone(),
        dashboard_view(),
        ManualClock::at(1_700_000_100),
    );
    orchestrator.load_progress().await;

    assert_eq!(orchestrator.await_remote_reconciliation().await.unwrap(), None);
    assert_eq!(orchestrator.progress().await, local_copy);
    assert_eq!(local.load(&USER.into()).await.unwrap(), Some(local_copy));
}

#[tokio::test(start_paused = true)]
async fn remote_record_is_used_when_cache_is_empty() {
    let dir = TempDir::new().unwrap();
    let local = Arc::new(FileLocalStateRepository::new(dir.path()));
    let remote = Arc::new(InMemoryDocumentStore::new());
    let remote_copy = in_progress("beta-program", 1, 1_700_000_000);
    remote.insert_record(USER.into(), remote_copy.clone()).await;

    let orchestrator = build_orchestrator(
        local.clone(),
        remote.clone(),
        dashboard_view(),
        ManualClock::at(1_700_000_100),
    );

    assert_eq!(orchestrator.load_progress().await, remote_copy);
    assert_eq!(local.load(&USER.into()).await.unwrap(), Some(remote_copy));
    let phase = orchestrator.resume().await.unwrap();
    assert_eq!(phase.cursor().unwrap().step(), 1);
}

#[tokio::test(start_paused = true)]
async fn unreachable_remote_without_cache_starts_fresh() {
    let dir = TempDir::new().unwrap();
    let remote = Arc::new(InMemoryDocumentStore::new());
    remote.set_offline(true);

    let orchestrator = build_orchestrator(
        Arc::new(FileLocalStateRepository::new(dir.path())),
        remote,
        dashboard_view(),
        ManualClock::at(1_700_000_000),
    );

    assert_eq!(orchestrator.load_progress().await, OnboardingState::default());
    assert_eq!(orchestrator.resume().await.unwrap(), TourPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn remote_outage_never_blocks_the_tour() {
    let dir = TempDir::new().unwrap();
    let local = Arc::new(FileLocalStateRepository::new(dir.path()));
    let remote = Arc::new(InMemoryDocumentStore::new());
    remote.set_offline(true);

    let orchestrator = build_orchestrator(
        local.clone(),
        remote.clone(),
        dashboard_view(),
        ManualClock::at(1_700_000_000),
    );

    orchestrator.start(&"prompt-creation".into()).await.unwrap();
    let phase = orchestrator.next().await.unwrap();
    assert!(matches!(phase, TourPhase::StepActive(ref cursor) if cursor.step() == 1));

    // The cache keeps up even though every remote write fails.
    let cached = local.load(&USER.into()).await.unwrap().unwrap();
    assert_eq!(cached.current_step, Some(1));

    orchestrator.shutdown().await;
    // Two saves, three attempts each, then dropped.
    assert_eq!(remote.put_attempts(), 6);
    assert!(remote.record(&USER.into()).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn stale_progress_is_cleared_on_resume() {
    let dir = TempDir::new().unwrap();
    let local = Arc::new(FileLocalStateRepository::new(dir.path()));

    for (tour, step) in [("retired-tour", 0), ("beta-program", 7)] {
        let remote = Arc::new(InMemoryDocumentStore::new());
        local
            .store(&USER.into(), &in_progress(tour, step, 1_700_000_000))
            .await
            .unwrap();
        let orchestrator = build_orchestrator(
            local.clone(),
            remote,
            dashboard_view(),
            ManualClock::at(1_700_000_100),
        );
        orchestrator.load_progress().await;

        let err = orchestrator.resume().await.unwrap_err();

        assert!(
            matches!(err, TourError::StaleTourReference { ref tour_id, step: s } if tour_id.as_str() == tour && s == step),
            "{err:?}"
        );
        assert_eq!(orchestrator.phase().await, TourPhase::Idle);
        let cached = local.load(&USER.into()).await.unwrap().unwrap();
        assert!(cached.in_progress().is_none());
        assert!(cached.has_seen_welcome);
        orchestrator.shutdown().await;
    }
}

#[tokio::test(start_paused = true)]
async fn completed_tour_is_not_resumed() {
    let dir = TempDir::new().unwrap();
    let local = Arc::new(FileLocalStateRepository::new(dir.path()));
    let remote = Arc::new(InMemoryDocumentStore::new());
    let mut finished = in_progress("first-time-user", 1, 1_700_000_000);
    finished.completed_tours.insert("first-time-user".into());
    local.store(&USER.into(), &finished).await.unwrap();

    let orchestrator = build_orchestrator(
        local.clone(),
        remote.clone(),
        dashboard_view(),
        ManualClock::at(1_700_000_100),
    );
    orchestrator.load_progress().await;

    assert_eq!(orchestrator.resume().await.unwrap(), TourPhase::Idle);
    assert!(orchestrator.current_step_view().await.is_none());

    let cached = local.load(&USER.into()).await.unwrap().unwrap();
    assert!(cached.in_progress().is_none());
    assert!(cached.has_completed(&"first-time-user".into()));

    orchestrator.shutdown().await;
    assert!(remote.events().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn tour_started_before_reconciliation_is_kept() {
    let dir = TempDir::new().unwrap();
    let local = Arc::new(FileLocalStateRepository::new(dir.path()));
    let remote = Arc::new(InMemoryDocumentStore::new());
    local
        .store(&USER.into(), &in_progress("prompt-creation", 0, 1_700_000_000))
        .await
        .unwrap();
    remote
        .insert_record(USER.into(), in_progress("beta-program", 2, 1_700_000_001))
        .await;

    let orchestrator = build_orchestrator(
        local.clone(),
        remote.clone(),
        dashboard_view(),
        ManualClock::at(1_700_000_100),
    );
    orchestrator.load_progress().await;
    orchestrator.start(&"first-time-user".into()).await.unwrap();

    // Whichever way the background fetch settled, the tour just started wins.
    assert_eq!(orchestrator.await_remote_reconciliation().await.unwrap(), None);
    let phase = orchestrator.phase().await;
    assert!(matches!(phase, TourPhase::StepActive(ref cursor) if cursor.step() == 0));
    assert_eq!(
        orchestrator.progress().await.current_tour_id,
        Some("first-time-user".into())
    );

    orchestrator.shutdown().await;
    let cached = local.load(&USER.into()).await.unwrap().unwrap();
    assert_eq!(cached.current_tour_id, Some("first-time-user".into()));
    assert_eq!(
        remote.record(&USER.into()).await.unwrap().current_tour_id,
        Some("first-time-user".into())
    );
}
