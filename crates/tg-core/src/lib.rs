//! # tg-core
//!
//! Core domain models and business logic for tourguide.
//!
//! This crate contains the tour catalog, the pure tour state machine,
//! placement geometry and the port traits the application layer drives.
//! It has no infrastructure dependencies.

pub mod config;
pub mod ids;
pub mod onboarding;
pub mod placement;
pub mod ports;
pub mod tour;

// Re-export commonly used types at the crate root
pub use config::TourConfig;
pub use ids::{ElementHandle, EventId, Locator, PathId, Route, StepId, TourId, UserId};
pub use onboarding::{OnboardingEvent, OnboardingEventKind, OnboardingState};
pub use placement::{Anchor, Placement, Positioner, Rect, Side, Size};
pub use tour::{TourCatalog, TourPhase, TourStateMachine};
