use thiserror::Error;

use crate::ids::{PathId, StepId, TourId};

/// Catalog lookup and validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("unknown tour: {0}")]
    UnknownTour(TourId),

    #[error("unknown path: {0}")]
    UnknownPath(PathId),

    #[error("tour {0} has no steps")]
    EmptyTour(TourId),

    #[error("tour {tour_id} defines step {step_id} more than once")]
    DuplicateStep { tour_id: TourId, step_id: StepId },

    #[error("tour {0} is defined more than once")]
    DuplicateTour(TourId),

    #[error("path {0} is defined more than once")]
    DuplicatePath(PathId),

    #[error("path {path_id} references unknown tour {tour_id}")]
    DanglingPath { path_id: PathId, tour_id: TourId },

    #[error("failed to parse catalog: {0}")]
    Parse(String),
}

/// Transition rejected by the tour state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("a step transition is already in progress")]
    TransitionInProgress,

    #[error("no tour is active")]
    NoActiveTour,

    #[error("already at the first step")]
    AtFirstStep,

    #[error("event {event} is not valid in phase {phase}")]
    Invalid {
        phase: &'static str,
        event: &'static str,
    },
}
