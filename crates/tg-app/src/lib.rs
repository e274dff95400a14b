//! tourguide application layer
//!
//! Tour orchestration use cases: navigation, target resolution, persistence,
//! analytics and the orchestrator that ties them to the tour state machine.

pub mod usecases;

pub use usecases::tour::{
    EventRecorder, NavigationCoordinator, PersistenceService, RetryPolicy, TargetResolver,
    TourContext, TourError, TourOrchestrator, TourServices,
};
