//! Tour state machine.
//!
//! Defines a pure state transition function for guided tours. Side effects
//! are returned as [`TourAction`]s and executed by the orchestrator.

use serde::{Deserialize, Serialize};

use super::definition::TourDefinition;
use super::error::TransitionError;
use crate::ids::TourId;
use crate::onboarding::{EventDraft, OnboardingEventKind};

/// Position inside a tour. `step <= furthest < step_count` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TourCursor {
    tour_id: TourId,
    step: usize,
    step_count: usize,
    /// Furthest step reached in this run of the tour.
    #[serde(default)]
    furthest: usize,
}

impl TourCursor {
    pub fn first(tour: &TourDefinition) -> Self {
        Self {
            tour_id: tour.id().clone(),
            step: 0,
            step_count: tour.len(),
            furthest: 0,
        }
    }

    /// Cursor at `step`, or `None` if the index is outside the tour.
    /// Steps before `step` count as already viewed.
    pub fn at(tour: &TourDefinition, step: usize) -> Option<Self> {
        (step < tour.len()).then(|| Self {
            tour_id: tour.id().clone(),
            step,
            step_count: tour.len(),
            furthest: step,
        })
    }

    pub fn tour_id(&self) -> &TourId {
        &self.tour_id
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn furthest(&self) -> usize {
        self.furthest
    }

    /// True if no earlier visit of this run reached the current step.
    fn is_first_visit(&self, previous_furthest: usize) -> bool {
        self.step > previous_furthest
    }

    pub fn is_last(&self) -> bool {
        self.step + 1 == self.step_count
    }

    fn advance(&self) -> Option<Self> {
        (!self.is_last()).then(|| Self {
            step: self.step + 1,
            furthest: self.furthest.max(self.step + 1),
            ..self.clone()
        })
    }

    fn retreat(&self) -> Option<Self> {
        (self.step > 0).then(|| Self {
            step: self.step - 1,
            ..self.clone()
        })
    }
}

/// Tour lifecycle phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TourPhase {
    /// No tour active.
    Idle,
    /// Bringing the step's view on screen.
    NavigatingToStep(TourCursor),
    /// Waiting for the step's target to render.
    ResolvingTarget(TourCursor),
    /// Overlay shown, step fully resolved.
    StepActive(TourCursor),
    Completed { tour_id: TourId },
    Skipped { tour_id: TourId, step: usize },
}

impl TourPhase {
    pub fn name(&self) -> &'static str {
        match self {
            TourPhase::Idle => "idle",
            TourPhase::NavigatingToStep(_) => "navigating_to_step",
            TourPhase::ResolvingTarget(_) => "resolving_target",
            TourPhase::StepActive(_) => "step_active",
            TourPhase::Completed { .. } => "completed",
            TourPhase::Skipped { .. } => "skipped",
        }
    }

    /// Cursor of the tour in progress, if any.
    pub fn cursor(&self) -> Option<&TourCursor> {
        match self {
            TourPhase::NavigatingToStep(c)
            | TourPhase::ResolvingTarget(c)
            | TourPhase::StepActive(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            TourPhase::NavigatingToStep(_) | TourPhase::ResolvingTarget(_)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TourPhase::Completed { .. } | TourPhase::Skipped { .. })
    }

    /// `StepActive`, a terminal phase, or `Idle`.
    pub fn is_stable(&self) -> bool {
        !self.is_in_flight()
    }
}

/// Why a tour ended before completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// User dismissed the tour.
    User,
    /// Programmatic termination, e.g. the user navigated away.
    Ended,
    /// Another tour was started.
    Superseded,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::User => "user",
            SkipReason::Ended => "ended",
            SkipReason::Superseded => "superseded",
        }
    }
}

/// Events that drive a tour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TourEvent {
    Start(TourCursor),
    /// Re-enter a persisted tour without announcing a new start.
    Resume(TourCursor),
    /// The step's view has settled.
    ViewReady,
    /// The target resolved, or the step fell back to an unanchored overlay.
    TargetResolved,
    NavigationFailed { reason: String },
    Next,
    Previous,
    Skip(SkipReason),
    /// Terminal phase acknowledged by the UI.
    Acknowledge,
}

impl TourEvent {
    fn name(&self) -> &'static str {
        match self {
            TourEvent::Start(_) => "start",
            TourEvent::Resume(_) => "resume",
            TourEvent::ViewReady => "view_ready",
            TourEvent::TargetResolved => "target_resolved",
            TourEvent::NavigationFailed { .. } => "navigation_failed",
            TourEvent::Next => "next",
            TourEvent::Previous => "previous",
            TourEvent::Skip(_) => "skip",
            TourEvent::Acknowledge => "acknowledge",
        }
    }
}

/// Side effects produced by transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum TourAction {
    /// Replace the attempt cancellation token with a fresh one.
    BeginAttempt,
    /// Cancel the current attempt; pending navigation or resolution is discarded.
    CancelAttempt,
    /// Mirror the new phase into the onboarding state and save it.
    Persist,
    Record(EventDraft),
    NavigateToStep,
    ResolveTarget,
}

/// Pure tour state machine.
pub struct TourStateMachine;

impl TourStateMachine {
    pub fn transition(
        phase: TourPhase,
        event: TourEvent,
    ) -> Result<(TourPhase, Vec<TourAction>), TransitionError> {
        use TourAction::*;

        match (phase, event) {
            (phase, TourEvent::Start(cursor)) => {
                let mut actions = Vec::new();
                if let Some(active) = phase.cursor() {
                    actions.push(Record(skipped(active, &SkipReason::Superseded)));
                }
                actions.extend([
                    BeginAttempt,
                    Persist,
                    Record(EventDraft::new(OnboardingEventKind::TourStarted).tour(cursor.tour_id.clone())),
                    NavigateToStep,
                ]);
                Ok((TourPhase::NavigatingToStep(cursor), actions))
            }
            (TourPhase::Idle, TourEvent::Resume(cursor)) => Ok((
                TourPhase::NavigatingToStep(cursor),
                vec![BeginAttempt, NavigateToStep],
            )),
            (TourPhase::NavigatingToStep(cursor), TourEvent::ViewReady) => {
                Ok((TourPhase::ResolvingTarget(cursor), vec![ResolveTarget]))
            }
            (TourPhase::NavigatingToStep(cursor), TourEvent::NavigationFailed { reason }) => Ok((
                TourPhase::Skipped {
                    tour_id: cursor.tour_id.clone(),
                    step: cursor.step,
                },
                vec![
                    CancelAttempt,
                    Persist,
                    Record(
                        EventDraft::new(OnboardingEventKind::TourSkipped)
                            .tour(cursor.tour_id.clone())
                            .step(cursor.step)
                            .meta("reason", "navigation_failed")
                            .meta("error", reason),
                    ),
                ],
            )),
            (TourPhase::ResolvingTarget(cursor), TourEvent::TargetResolved) => {
                Ok((TourPhase::StepActive(cursor), Vec::new()))
            }
            (TourPhase::StepActive(cursor), TourEvent::Next) => match cursor.advance() {
                Some(next) => {
                    let mut actions = vec![BeginAttempt, Persist];
                    // Revisits after going back are not new views.
                    if next.is_first_visit(cursor.furthest) {
                        actions.push(Record(
                            EventDraft::new(OnboardingEventKind::StepViewed)
                                .tour(next.tour_id.clone())
                                .step(next.step),
                        ));
                    }
                    actions.push(NavigateToStep);
                    Ok((TourPhase::NavigatingToStep(next), actions))
                }
                None => {
                    let completed = EventDraft::new(OnboardingEventKind::TourCompleted)
                        .tour(cursor.tour_id.clone())
                        .meta("steps", cursor.step_count);
                    Ok((
                        TourPhase::Completed {
                            tour_id: cursor.tour_id,
                        },
                        vec![CancelAttempt, Persist, Record(completed)],
                    ))
                }
            },
            (TourPhase::StepActive(cursor), TourEvent::Previous) => {
                let previous = cursor.retreat().ok_or(TransitionError::AtFirstStep)?;
                Ok((
                    TourPhase::NavigatingToStep(previous),
                    vec![BeginAttempt, Persist, NavigateToStep],
                ))
            }
            (
                TourPhase::NavigatingToStep(_) | TourPhase::ResolvingTarget(_),
                TourEvent::Next | TourEvent::Previous,
            ) => Err(TransitionError::TransitionInProgress),
            (
                TourPhase::Idle | TourPhase::Completed { .. } | TourPhase::Skipped { .. },
                TourEvent::Next | TourEvent::Previous,
            ) => Err(TransitionError::NoActiveTour),
            (
                TourPhase::NavigatingToStep(cursor)
                | TourPhase::ResolvingTarget(cursor)
                | TourPhase::StepActive(cursor),
                TourEvent::Skip(reason),
            ) => Ok((
                TourPhase::Skipped {
                    tour_id: cursor.tour_id.clone(),
                    step: cursor.step,
                },
                vec![CancelAttempt, Persist, Record(skipped(&cursor, &reason))],
            )),
            // Skipping with nothing in progress changes nothing.
            (phase, TourEvent::Skip(_)) => Ok((phase, Vec::new())),
            (TourPhase::Completed { .. } | TourPhase::Skipped { .. }, TourEvent::Acknowledge) => {
                Ok((TourPhase::Idle, Vec::new()))
            }
            (phase, TourEvent::Acknowledge) => Ok((phase, Vec::new())),
            (phase, event) => Err(TransitionError::Invalid {
                phase: phase.name(),
                event: event.name(),
            }),
        }
    }
}

fn skipped(cursor: &TourCursor, reason: &SkipReason) -> EventDraft {
    EventDraft::new(OnboardingEventKind::TourSkipped)
        .tour(cursor.tour_id.clone())
        .step(cursor.step)
        .meta("reason", reason.as_str())
}
