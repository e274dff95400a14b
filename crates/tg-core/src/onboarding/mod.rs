//! Onboarding domain models
//!
//! Per-user progress, the analytics event log, and the rule that decides
//! which copy of the progress wins after a device switch.

pub mod event;
pub mod reconcile;
pub mod state;

pub use event::{EventDraft, OnboardingEvent, OnboardingEventKind, SuggestionOutcome};
pub use reconcile::{reconcile, Authority};
pub use state::OnboardingState;
