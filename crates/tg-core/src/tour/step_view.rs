use serde::Serialize;

use super::definition::StepDefinition;
use super::state_machine::TourPhase;
use crate::ids::TourId;
use crate::placement::Placement;

/// What the tooltip layer renders for the active step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub tour_id: TourId,
    pub step_index: usize,
    pub step_count: usize,
    pub step: StepDefinition,
    pub placement: Placement,
}

/// Published to subscribers after every transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TourSnapshot {
    pub phase: TourPhase,
    pub view: Option<StepView>,
}

impl Default for TourSnapshot {
    fn default() -> Self {
        Self {
            phase: TourPhase::Idle,
            view: None,
        }
    }
}
