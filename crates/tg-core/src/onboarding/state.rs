//! Per-user onboarding progress.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{PathId, TourId};
use crate::tour::{TourCursor, TourPhase};

/// Onboarding progress of one user.
///
/// Exactly one record exists per user. It is created lazily and only ever
/// superseded, never deleted. `updated_at` is stamped by the writer and
/// decides which copy wins during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingState {
    #[serde(default)]
    pub has_seen_welcome: bool,
    #[serde(default)]
    pub selected_path: Option<PathId>,
    #[serde(default)]
    pub current_tour_id: Option<TourId>,
    #[serde(default)]
    pub current_step: Option<usize>,
    #[serde(default)]
    pub completed_tours: BTreeSet<TourId>,
    #[serde(default)]
    pub dismissed_suggestions: BTreeSet<String>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl OnboardingState {
    /// Tour and step of the tour in progress.
    pub fn in_progress(&self) -> Option<(&TourId, usize)> {
        match (&self.current_tour_id, self.current_step) {
            (Some(tour_id), Some(step)) => Some((tour_id, step)),
            _ => None,
        }
    }

    pub fn has_completed(&self, tour_id: &TourId) -> bool {
        self.completed_tours.contains(tour_id)
    }

    /// Mirror a phase produced by the state machine.
    ///
    /// `Idle` leaves progress untouched.
    pub fn apply_phase(&mut self, phase: &TourPhase, now: DateTime<Utc>) {
        match phase {
            TourPhase::NavigatingToStep(cursor)
            | TourPhase::ResolvingTarget(cursor)
            | TourPhase::StepActive(cursor) => self.set_progress(cursor, now),
            TourPhase::Completed { tour_id } => self.complete_tour(tour_id.clone(), now),
            TourPhase::Skipped { .. } => self.clear_progress(now),
            TourPhase::Idle => {}
        }
    }

    pub fn set_progress(&mut self, cursor: &TourCursor, now: DateTime<Utc>) {
        self.current_tour_id = Some(cursor.tour_id().clone());
        self.current_step = Some(cursor.step());
        self.updated_at = now;
    }

    pub fn complete_tour(&mut self, tour_id: TourId, now: DateTime<Utc>) {
        self.completed_tours.insert(tour_id);
        self.clear_progress(now);
    }

    pub fn clear_progress(&mut self, now: DateTime<Utc>) {
        self.current_tour_id = None;
        self.current_step = None;
        self.updated_at = now;
    }

    pub fn select_path(&mut self, path_id: PathId, now: DateTime<Utc>) {
        self.selected_path = Some(path_id);
        self.has_seen_welcome = true;
        self.updated_at = now;
    }

    pub fn mark_welcome_seen(&mut self, now: DateTime<Utc>) {
        self.has_seen_welcome = true;
        self.updated_at = now;
    }

    pub fn dismiss_suggestion(&mut self, suggestion: impl Into<String>, now: DateTime<Utc>) {
        self.dismissed_suggestions.insert(suggestion.into());
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::Side;
    use crate::tour::{StepDefinition, TourDefinition};
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn cursor(step: usize) -> TourCursor {
        let steps = (0..3)
            .map(|i| StepDefinition::new(format!("s{i}"), "t", "b", "#x", Side::Top))
            .collect();
        TourCursor::at(&TourDefinition::new("tour", steps).unwrap(), step).unwrap()
    }

    #[test]
    fn default_state_has_no_progress() {
        let state = OnboardingState::default();
        assert!(state.in_progress().is_none());
        assert!(!state.has_seen_welcome);
    }

    #[test]
    fn apply_active_phase_records_cursor() {
        let mut state = OnboardingState::default();
        state.apply_phase(&TourPhase::StepActive(cursor(2)), at(10));

        assert_eq!(state.in_progress(), Some((&"tour".into(), 2)));
        assert_eq!(state.updated_at, at(10));
    }

    #[test]
    fn completing_twice_keeps_single_membership() {
        let mut state = OnboardingState::default();
        let done = TourPhase::Completed {
            tour_id: "tour".into(),
        };
        state.apply_phase(&done, at(1));
        state.apply_phase(&done, at(2));

        assert_eq!(state.completed_tours.len(), 1);
        assert!(state.in_progress().is_none());
    }

    #[test]
    fn skipped_clears_progress_but_not_completions() {
        let mut state = OnboardingState::default();
        state.complete_tour("earlier".into(), at(1));
        state.set_progress(&cursor(1), at(2));
        state.apply_phase(
            &TourPhase::Skipped {
                tour_id: "tour".into(),
                step: 1,
            },
            at(3),
        );

        assert!(state.in_progress().is_none());
        assert!(state.has_completed(&"earlier".into()));
    }

    #[test]
    fn serializes_camel_case() {
        let mut state = OnboardingState::default();
        state.set_progress(&cursor(0), at(5));
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["currentTourId"], "tour");
        assert_eq!(json["currentStep"], 0);
        assert_eq!(json["hasSeenWelcome"], false);
    }
}
