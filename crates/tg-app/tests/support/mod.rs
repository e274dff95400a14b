//! Shared harness for tour integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use tg_app::{
    EventRecorder, NavigationCoordinator, PersistenceService, RetryPolicy, TargetResolver,
    TourContext, TourOrchestrator, TourServices,
};
use tg_core::ports::{ClockPort, EventOutboxPort, LocalStatePort};
use tg_core::{
    OnboardingEvent, OnboardingEventKind, OnboardingState, Positioner, Rect, Size, TourCatalog,
    TourConfig,
};
use tg_infra::{InMemoryDocumentStore, InMemoryEventOutbox, SnapshotView, ViewSnapshot};

pub const USER: &str = "user-1";

/// Clock under test control. Every reading ticks by one millisecond so
/// successive writes get distinct timestamps.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(secs: i64) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc.timestamp_opt(secs, 0).unwrap()),
        })
    }

    pub fn advance_secs(&self, secs: i64) {
        *self.now.lock().unwrap() += ChronoDuration::seconds(secs);
    }
}

impl ClockPort for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut now = self.now.lock().unwrap();
        *now += ChronoDuration::milliseconds(1);
        *now
    }
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn config() -> TourConfig {
    TourConfig {
        remote_max_attempts: 3,
        ..TourConfig::default()
    }
}

/// Dashboard with every target of the builtin tours rendered.
pub fn dashboard_view() -> Arc<SnapshotView> {
    let mut snapshot = ViewSnapshot::new(Size::new(1280.0, 800.0), "/dashboard");
    let element = |locator: &str, bounds: Rect| tg_infra::view::ElementSpec {
        locator: locator.into(),
        bounds,
    };

    snapshot.shell = vec![
        element("[data-tour='sidebar-nav']", Rect::new(0.0, 64.0, 240.0, 736.0)),
        element("[data-tour='help-button']", Rect::new(1220.0, 740.0, 40.0, 40.0)),
    ];
    for (route, elements) in [
        (
            "/dashboard",
            vec![element("[data-tour='dashboard-header']", Rect::new(240.0, 0.0, 1040.0, 64.0))],
        ),
        (
            "/dashboard/prompts",
            vec![
                element("[data-tour='prompt-library']", Rect::new(260.0, 120.0, 900.0, 400.0)),
                element("[data-tour='new-prompt-button']", Rect::new(1100.0, 80.0, 140.0, 36.0)),
            ],
        ),
        (
            "/dashboard/prompts/new",
            vec![
                element("[data-tour='prompt-editor']", Rect::new(260.0, 100.0, 600.0, 500.0)),
                element("[data-tour='variables-panel']", Rect::new(900.0, 100.0, 340.0, 500.0)),
                element("[data-tour='save-prompt']", Rect::new(1100.0, 700.0, 120.0, 40.0)),
            ],
        ),
        (
            "/dashboard/beta",
            vec![
                element("[data-tour='beta-programs']", Rect::new(700.0, 100.0, 400.0, 300.0)),
                element("[data-tour='beta-list']", Rect::new(260.0, 100.0, 400.0, 500.0)),
                element("[data-tour='beta-apply']", Rect::new(700.0, 450.0, 160.0, 40.0)),
            ],
        ),
        (
            "/dashboard/beta/feedback",
            vec![element("[data-tour='beta-feedback']", Rect::new(400.0, 500.0, 500.0, 200.0))],
        ),
    ] {
        snapshot.routes.insert(route.into(), elements);
    }

    Arc::new(SnapshotView::new(snapshot))
}

/// Route engine logs to the test harness. `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn build_orchestrator(
    local: Arc<dyn LocalStatePort>,
    remote: Arc<InMemoryDocumentStore>,
    view: Arc<SnapshotView>,
    clock: Arc<ManualClock>,
) -> Arc<TourOrchestrator> {
    build_orchestrator_with_outbox(
        local,
        remote,
        Arc::new(InMemoryEventOutbox::new()),
        view,
        clock,
    )
}

/// Like [`build_orchestrator`], with an outbox that outlives the session.
pub fn build_orchestrator_with_outbox(
    local: Arc<dyn LocalStatePort>,
    remote: Arc<InMemoryDocumentStore>,
    outbox: Arc<dyn EventOutboxPort>,
    view: Arc<SnapshotView>,
    clock: Arc<ManualClock>,
) -> Arc<TourOrchestrator> {
    init_tracing();
    let config = config();
    let positioner = Positioner::new(
        Size::new(config.overlay_width, config.overlay_height),
        config.overlay_gap,
    );
    let remote_policy = RetryPolicy::new(
        config.remote_max_attempts,
        config.remote_base_backoff,
        config.remote_max_backoff,
    );
    let recorder_policy = RetryPolicy::new(
        config.recorder_max_attempts,
        config.recorder_backoff,
        config.recorder_backoff,
    );

    let services = TourServices {
        navigation: NavigationCoordinator::new(view.clone(), config.settle_delay),
        resolver: TargetResolver::new(view.clone(), view, positioner, config.poll_interval),
        persistence: Arc::new(PersistenceService::spawn(local, remote.clone(), remote_policy)),
        recorder: EventRecorder::spawn(
            USER.into(),
            clock.clone(),
            remote,
            outbox,
            recorder_policy,
            config.recorder_queue_capacity,
        ),
        clock,
    };

    Arc::new(TourOrchestrator::new(
        TourContext::new(USER.into(), OnboardingState::default()).arc(),
        Arc::new(TourCatalog::builtin()),
        services,
        config.resolve_timeout,
    ))
}

pub fn kinds(events: &[OnboardingEvent]) -> Vec<OnboardingEventKind> {
    events.iter().map(|event| event.kind).collect()
}
