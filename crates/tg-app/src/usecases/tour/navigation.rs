//! Navigation coordinator.
//!
//! Brings the application to the view a step lives in and signals when it is
//! safe to resolve the step's target.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tg_core::ports::RouterPort;
use tg_core::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOutcome {
    Ready,
    /// The attempt was cancelled while navigating or settling.
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("navigation to {route} failed: {reason}")]
    NavigationFailed { route: Route, reason: String },
}

pub struct NavigationCoordinator {
    router: Arc<dyn RouterPort>,
    settle_delay: Duration,
}

impl NavigationCoordinator {
    pub fn new(router: Arc<dyn RouterPort>, settle_delay: Duration) -> Self {
        Self {
            router,
            settle_delay,
        }
    }

    /// Ensure `route` is showing. Resolves immediately when it already is,
    /// otherwise navigates and waits for the settle interval.
    pub async fn ensure_view(
        &self,
        route: &Route,
        token: &CancellationToken,
    ) -> Result<ViewOutcome, NavigationError> {
        if token.is_cancelled() {
            return Ok(ViewOutcome::Cancelled);
        }

        if self.router.current_route().await == *route {
            debug!(%route, "already on route");
            return Ok(ViewOutcome::Ready);
        }

        debug!(%route, "navigating");
        tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(ViewOutcome::Cancelled),
            result = self.router.navigate_to(route) => {
                result.map_err(|err| NavigationError::NavigationFailed {
                    route: route.clone(),
                    reason: format!("{err:#}"),
                })?;
            }
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => Ok(ViewOutcome::Cancelled),
            _ = sleep(self.settle_delay) => {
                debug!(%route, settle_ms = self.settle_delay.as_millis() as u64, "view settled");
                Ok(ViewOutcome::Ready)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        pub Router {}

        #[async_trait]
        impl RouterPort for Router {
            async fn navigate_to(&self, route: &Route) -> anyhow::Result<()>;
            async fn current_route(&self) -> Route;
        }
    }

    fn coordinator(router: MockRouter) -> NavigationCoordinator {
        NavigationCoordinator::new(Arc::new(router), Duration::from_millis(150))
    }

    #[tokio::test(start_paused = true)]
    async fn already_on_route_resolves_without_navigating() {
        let mut router = MockRouter::new();
        router
            .expect_current_route()
            .returning(|| Route::new("/dashboard"));
        router.expect_navigate_to().never();

        let started = tokio::time::Instant::now();
        let outcome = coordinator(router)
            .ensure_view(&"/dashboard".into(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, ViewOutcome::Ready);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn navigates_and_waits_for_settle() {
        let mut router = MockRouter::new();
        router.expect_current_route().returning(|| Route::new("/"));
        router
            .expect_navigate_to()
            .withf(|route| route.as_str() == "/dashboard/prompts")
            .times(1)
            .returning(|_| Ok(()));

        let started = tokio::time::Instant::now();
        let outcome = coordinator(router)
            .ensure_view(&"/dashboard/prompts".into(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, ViewOutcome::Ready);
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn router_rejection_is_navigation_failed() {
        let mut router = MockRouter::new();
        router.expect_current_route().returning(|| Route::new("/"));
        router
            .expect_navigate_to()
            .returning(|_| Err(anyhow::anyhow!("route not registered")));

        let err = coordinator(router)
            .ensure_view(&"/missing".into(), &CancellationToken::new())
            .await
            .unwrap_err();

        let NavigationError::NavigationFailed { route, reason } = err;
        assert_eq!(route.as_str(), "/missing");
        assert!(reason.contains("route not registered"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_settle_is_not_an_error() {
        let mut router = MockRouter::new();
        router.expect_current_route().returning(|| Route::new("/"));
        router.expect_navigate_to().returning(|_| Ok(()));

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let outcome = coordinator(router)
            .ensure_view(&"/dashboard".into(), &token)
            .await
            .unwrap();

        assert_eq!(outcome, ViewOutcome::Cancelled);
    }
}
