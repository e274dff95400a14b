//! Guided tour use cases.

mod context;
mod navigation;
mod orchestrator;
mod persistence;
mod recorder;
mod resolver;
mod retry;

pub use context::TourContext;
pub use navigation::{NavigationCoordinator, NavigationError, ViewOutcome};
pub use orchestrator::{TourError, TourOrchestrator, TourServices};
pub use persistence::{
    LoadedState, PersistenceError, PersistenceService, RemoteWriteWorker, StateSource,
};
pub use recorder::{EventRecorder, EventWorker};
pub use resolver::{ResolveOutcome, StepResolution, TargetResolver};
pub use retry::RetryPolicy;
