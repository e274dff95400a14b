//! Durable event outbox port
//!
//! Device-local holding area for analytics events. An event is written here
//! before delivery is attempted and removed once the remote log accepted it,
//! so events survive a crash and are redelivered by the next session.

use async_trait::async_trait;

use crate::ids::EventId;
use crate::onboarding::OnboardingEvent;

#[async_trait]
pub trait EventOutboxPort: Send + Sync {
    async fn push(&self, event: &OnboardingEvent) -> anyhow::Result<()>;

    /// Undelivered events, oldest first.
    async fn pending(&self) -> anyhow::Result<Vec<OnboardingEvent>>;

    /// Forget a delivered event. Unknown ids are ignored.
    async fn remove(&self, id: &EventId) -> anyhow::Result<()>;
}
