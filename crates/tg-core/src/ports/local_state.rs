//! Local onboarding state port
//!
//! Device-local cache of onboarding progress, read first on startup so a
//! tour can resume without waiting for the network.

use async_trait::async_trait;

use crate::ids::UserId;
use crate::onboarding::OnboardingState;

#[async_trait]
pub trait LocalStatePort: Send + Sync {
    /// Cached state, or `None` if nothing was cached for this user.
    async fn load(&self, user_id: &UserId) -> anyhow::Result<Option<OnboardingState>>;

    /// Replace the cached copy. State is only ever superseded, never removed.
    async fn store(&self, user_id: &UserId, state: &OnboardingState) -> anyhow::Result<()>;
}
