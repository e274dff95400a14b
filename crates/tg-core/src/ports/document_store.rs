//! Remote document store port
//!
//! Per-user onboarding records and the append-only event log. Any store with
//! read-after-write on the same node satisfies it.

use async_trait::async_trait;

use crate::ids::UserId;
use crate::onboarding::{OnboardingEvent, OnboardingState};

#[async_trait]
pub trait DocumentStorePort: Send + Sync {
    async fn get_record(&self, user_id: &UserId) -> anyhow::Result<Option<OnboardingState>>;

    async fn put_record(&self, user_id: &UserId, state: &OnboardingState) -> anyhow::Result<()>;

    async fn append_event(&self, event: &OnboardingEvent) -> anyhow::Result<()>;
}
