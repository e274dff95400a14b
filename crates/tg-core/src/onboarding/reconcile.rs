//! Local/remote reconciliation.
//!
//! Last writer wins by `updated_at`, in full. Fields are never merged so a
//! tour id from one copy can never be paired with a step index from the other.

use super::OnboardingState;

/// Which copy of the onboarding state is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    Local,
    Remote,
}

/// The remote copy wins only when strictly newer.
pub fn reconcile(local: &OnboardingState, remote: &OnboardingState) -> Authority {
    if remote.updated_at > local.updated_at {
        Authority::Remote
    } else {
        Authority::Local
    }
}
