use async_trait::async_trait;

use crate::ids::Route;

#[async_trait]
pub trait RouterPort: Send + Sync {
    /// Navigate to `route`. An error means the router rejected the route.
    async fn navigate_to(&self, route: &Route) -> anyhow::Result<()>;

    async fn current_route(&self) -> Route;
}
