//! Headless view adapter.
//!
//! Implements element lookup, geometry and routing over a declarative
//! description of the rendered UI: which elements exist on which route and
//! where they are. Used by the CLI and by tests; elements and routes can be
//! changed at runtime to simulate late renders and broken navigation.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use tg_core::ports::{ElementLookupPort, GeometryPort, RouterPort};
use tg_core::{ElementHandle, Locator, Rect, Route, Size};

/// One element in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub locator: Locator,
    pub bounds: Rect,
}

/// Serialized view description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub viewport: Size,
    pub initial_route: Route,
    /// Elements rendered on a specific route.
    #[serde(default)]
    pub routes: HashMap<Route, Vec<ElementSpec>>,
    /// Elements rendered on every route, e.g. the app shell.
    #[serde(default)]
    pub shell: Vec<ElementSpec>,
    /// Routes whose navigation fails.
    #[serde(default)]
    pub rejected_routes: HashSet<Route>,
}

impl ViewSnapshot {
    pub fn new(viewport: Size, initial_route: impl Into<Route>) -> Self {
        Self {
            viewport,
            initial_route: initial_route.into(),
            routes: HashMap::new(),
            shell: Vec::new(),
            rejected_routes: HashSet::new(),
        }
    }
}

struct ViewState {
    snapshot: ViewSnapshot,
    current_route: Route,
    scroll_y: f64,
    navigations: Vec<Route>,
}

pub struct SnapshotView {
    state: RwLock<ViewState>,
}

impl SnapshotView {
    pub fn new(snapshot: ViewSnapshot) -> Self {
        let current_route = snapshot.initial_route.clone();
        Self {
            state: RwLock::new(ViewState {
                snapshot,
                current_route,
                scroll_y: 0.0,
                navigations: Vec::new(),
            }),
        }
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let snapshot: ViewSnapshot =
            serde_json::from_str(json).context("Failed to parse view snapshot")?;
        Ok(Self::new(snapshot))
    }

    pub async fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read view snapshot {}", path.display()))?;
        Self::from_json(&content)
    }

    /// Render an element. `route = None` puts it in the shell.
    pub async fn add_element(&self, route: Option<Route>, locator: impl Into<Locator>, bounds: Rect) {
        let spec = ElementSpec {
            locator: locator.into(),
            bounds,
        };
        let mut state = self.state.write().await;
        match route {
            Some(route) => state.snapshot.routes.entry(route).or_default().push(spec),
            None => state.snapshot.shell.push(spec),
        }
    }

    /// Remove every element matching `locator`, on all routes.
    pub async fn remove_elements(&self, locator: &Locator) {
        let mut state = self.state.write().await;
        state.snapshot.shell.retain(|e| &e.locator != locator);
        for elements in state.snapshot.routes.values_mut() {
            elements.retain(|e| &e.locator != locator);
        }
    }

    pub async fn reject_route(&self, route: impl Into<Route>) {
        self.state
            .write()
            .await
            .snapshot
            .rejected_routes
            .insert(route.into());
    }

    /// Routes navigated to so far, in order.
    pub async fn navigations(&self) -> Vec<Route> {
        self.state.read().await.navigations.clone()
    }
}

impl ViewState {
    /// Elements visible on the current route, shell first.
    fn visible(&self) -> impl Iterator<Item = &ElementSpec> {
        self.snapshot.shell.iter().chain(
            self.snapshot
                .routes
                .get(&self.current_route)
                .into_iter()
                .flatten(),
        )
    }

    /// Handles encode the element's position among visible matches.
    fn handle(&self, locator: &Locator, index: usize) -> ElementHandle {
        ElementHandle::new(format!("{}#{}#{}", self.current_route, index, locator))
    }

    fn lookup(&self, handle: &ElementHandle) -> Option<Rect> {
        let mut parts = handle.as_str().splitn(3, '#');
        let route = parts.next()?;
        let index: usize = parts.next()?.parse().ok()?;
        let locator = Locator::new(parts.next()?);
        if route != self.current_route.as_str() {
            return None;
        }
        self.visible()
            .filter(|e| e.locator == locator)
            .nth(index)
            .map(|e| e.bounds)
    }
}

#[async_trait]
impl ElementLookupPort for SnapshotView {
    async fn find_all(&self, locator: &Locator) -> anyhow::Result<Vec<ElementHandle>> {
        let state = self.state.read().await;
        let count = state.visible().filter(|e| &e.locator == locator).count();
        Ok((0..count).map(|i| state.handle(locator, i)).collect())
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> anyhow::Result<()> {
        let mut state = self.state.write().await;
        let bounds = state
            .lookup(element)
            .with_context(|| format!("element {element} is no longer rendered"))?;
        let viewport_height = state.snapshot.viewport.height;
        let top = bounds.y - state.scroll_y;
        if top < 0.0 || top + bounds.height > viewport_height {
            state.scroll_y = (bounds.center_y() - viewport_height / 2.0).max(0.0);
            debug!(%element, scroll_y = state.scroll_y, "scrolled element into view");
        }
        Ok(())
    }
}

#[async_trait]
impl GeometryPort for SnapshotView {
    async fn bounds(&self, element: &ElementHandle) -> anyhow::Result<Rect> {
        let state = self.state.read().await;
        let bounds = state
            .lookup(element)
            .with_context(|| format!("element {element} is no longer rendered"))?;
        Ok(Rect {
            y: bounds.y - state.scroll_y,
            ..bounds
        })
    }

    async fn viewport_size(&self) -> anyhow::Result<Size> {
        Ok(self.state.read().await.snapshot.viewport)
    }
}

#[async_trait]
impl RouterPort for SnapshotView {
    async fn navigate_to(&self, route: &Route) -> anyhow::Result<()> {
        let mut state = self.state.write().await;
        if state.snapshot.rejected_routes.contains(route) {
            anyhow::bail!("route {route} is not available");
        }
        state.current_route = route.clone();
        state.scroll_y = 0.0;
        state.navigations.push(route.clone());
        Ok(())
    }

    async fn current_route(&self) -> Route {
        self.state.read().await.current_route.clone()
    }
}
