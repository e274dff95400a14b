//! Dependency wiring.
//!
//! The only place that knows about concrete adapters: builds the file-backed
//! stores, the system clock and the headless view, then hands them to the
//! application layer as trait objects.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use tg_app::{
    EventRecorder, NavigationCoordinator, PersistenceService, RetryPolicy, TargetResolver,
    TourContext, TourOrchestrator, TourServices,
};
use tg_core::{OnboardingState, Positioner, Size, TourCatalog, TourConfig, UserId};
use tg_infra::{
    FileDocumentStore, FileEventOutbox, FileLocalStateRepository, SnapshotView, SystemClock,
};

/// Storage locations after defaults have been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct StoragePaths {
    pub state_dir: PathBuf,
    pub remote_dir: PathBuf,
}

/// Resolve storage directories. Empty config values fall back to the
/// platform data directory.
pub fn resolve_storage_paths(config: &TourConfig) -> anyhow::Result<StoragePaths> {
    let state_dir = if config.state_dir.as_os_str().is_empty() {
        tg_infra::state_dir()?
    } else {
        config.state_dir.clone()
    };
    let remote_dir = if config.remote_dir.as_os_str().is_empty() {
        tg_infra::remote_dir()?
    } else {
        config.remote_dir.clone()
    };
    Ok(StoragePaths {
        state_dir,
        remote_dir,
    })
}

/// Builtin tours, or the TOML catalog named in the config.
pub fn load_catalog(config: &TourConfig) -> anyhow::Result<TourCatalog> {
    let Some(path) = &config.catalog_path else {
        return Ok(TourCatalog::builtin());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
    let catalog = TourCatalog::from_toml_str(&content)
        .with_context(|| format!("Invalid catalog: {}", path.display()))?;
    info!(path = %path.display(), "loaded tour catalog");
    Ok(catalog)
}

/// Concrete stores shared by the commands.
pub struct Stores {
    pub local: Arc<FileLocalStateRepository>,
    pub remote: Arc<FileDocumentStore>,
    /// Undelivered analytics, kept next to the local state cache.
    pub outbox: Arc<FileEventOutbox>,
}

impl Stores {
    pub fn open(paths: &StoragePaths) -> Self {
        debug!(
            state_dir = %paths.state_dir.display(),
            remote_dir = %paths.remote_dir.display(),
            "opening onboarding stores"
        );
        Self {
            local: Arc::new(FileLocalStateRepository::new(&paths.state_dir)),
            remote: Arc::new(FileDocumentStore::new(&paths.remote_dir)),
            outbox: Arc::new(FileEventOutbox::new(&paths.state_dir)),
        }
    }
}

/// Build a tour session for `user_id` over `view`. Must be called inside a
/// tokio runtime: the persistence and analytics workers are spawned here.
pub fn build_session(
    config: &TourConfig,
    catalog: Arc<TourCatalog>,
    stores: &Stores,
    user_id: UserId,
    view: Arc<SnapshotView>,
) -> TourOrchestrator {
    let clock = Arc::new(SystemClock);
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
        persistence: Arc::new(PersistenceService::spawn(
            stores.local.clone(),
            stores.remote.clone(),
            remote_policy,
        )),
        recorder: EventRecorder::spawn(
            user_id.clone(),
            clock.clone(),
            stores.remote.clone(),
            stores.outbox.clone(),
            recorder_policy,
            config.recorder_queue_capacity,
        ),
        clock,
    };

    TourOrchestrator::new(
        TourContext::new(user_id, OnboardingState::default()).arc(),
        catalog,
        services,
        config.resolve_timeout,
    )
}
