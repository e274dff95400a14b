use async_trait::async_trait;

use crate::ids::{ElementHandle, Locator};

/// Finds elements in the currently rendered view.
///
/// Locators are handed over verbatim; any string-keyed lookup satisfies it.
#[async_trait]
pub trait ElementLookupPort: Send + Sync {
    async fn find_all(&self, locator: &Locator) -> anyhow::Result<Vec<ElementHandle>>;

    /// Bring the element into the visible viewport.
    async fn scroll_into_view(&self, element: &ElementHandle) -> anyhow::Result<()>;
}
