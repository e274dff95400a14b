//! Append-only onboarding analytics events.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EventId, PathId, StepId, TourId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingEventKind {
    PathSelected,
    TourStarted,
    StepViewed,
    TourCompleted,
    TourSkipped,
    SuggestionShown,
    SuggestionAccepted,
    SuggestionDismissed,
}

/// How the user reacted to a contextual suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionOutcome {
    Shown,
    Accepted,
    Dismissed,
}

impl SuggestionOutcome {
    pub fn kind(self) -> OnboardingEventKind {
        match self {
            SuggestionOutcome::Shown => OnboardingEventKind::SuggestionShown,
            SuggestionOutcome::Accepted => OnboardingEventKind::SuggestionAccepted,
            SuggestionOutcome::Dismissed => OnboardingEventKind::SuggestionDismissed,
        }
    }
}

/// An event before it is attributed to a user and timestamped.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub kind: OnboardingEventKind,
    pub tour_id: Option<TourId>,
    pub step_id: Option<StepId>,
    pub step_index: Option<usize>,
    pub path_id: Option<PathId>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl EventDraft {
    pub fn new(kind: OnboardingEventKind) -> Self {
        Self {
            kind,
            tour_id: None,
            step_id: None,
            step_index: None,
            path_id: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn tour(mut self, tour_id: TourId) -> Self {
        self.tour_id = Some(tour_id);
        self
    }

    pub fn step(mut self, index: usize) -> Self {
        self.step_index = Some(index);
        self
    }

    pub fn step_id(mut self, step_id: StepId) -> Self {
        self.step_id = Some(step_id);
        self
    }

    pub fn path(mut self, path_id: PathId) -> Self {
        self.path_id = Some(path_id);
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Write-once log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingEvent {
    pub id: EventId,
    pub user_id: UserId,
    pub kind: OnboardingEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tour_id: Option<TourId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<StepId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_id: Option<PathId>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub occurred_at: DateTime<Utc>,
}

impl OnboardingEvent {
    pub fn from_draft(draft: EventDraft, user_id: UserId, occurred_at: DateTime<Utc>) -> Self {
        Self {
            id: EventId::new(),
            user_id,
            kind: draft.kind,
            tour_id: draft.tour_id,
            step_id: draft.step_id,
            step_index: draft.step_index,
            path_id: draft.path_id,
            metadata: draft.metadata,
            occurred_at,
        }
    }
}
