use async_trait::async_trait;

use crate::ids::ElementHandle;
use crate::placement::{Rect, Size};

#[async_trait]
pub trait GeometryPort: Send + Sync {
    /// Bounds of the element in viewport coordinates.
    async fn bounds(&self, element: &ElementHandle) -> anyhow::Result<Rect>;

    async fn viewport_size(&self) -> anyhow::Result<Size>;
}
