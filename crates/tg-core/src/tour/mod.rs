//! Tour domain module.
//!
//! Catalog definitions and the guided-tour state machine.

pub mod catalog;
pub mod definition;
pub mod error;
pub mod state_machine;
pub mod step_view;

pub use catalog::TourCatalog;
pub use definition::{PathDefinition, StepDefinition, TourDefinition};
pub use error::{CatalogError, TransitionError};
pub use state_machine::{
    SkipReason, TourAction, TourCursor, TourEvent, TourPhase, TourStateMachine,
};
pub use step_view::{StepView, TourSnapshot};
