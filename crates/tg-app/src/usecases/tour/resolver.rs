//! Target resolver and positioner.
//!
//! Polls the rendered view until a step's locator resolves to exactly one
//! element, scrolls it into view and computes the overlay placement. When the
//! target never shows up the step degrades to an unanchored overlay.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use tg_core::ports::{ElementLookupPort, GeometryPort};
use tg_core::tour::StepDefinition;
use tg_core::{ElementHandle, Locator, Placement, Positioner, Size};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Found(ElementHandle),
    NotFound,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepResolution {
    Anchored {
        element: ElementHandle,
        placement: Placement,
    },
    /// Target not found: shown without highlight in a generic placement.
    Unanchored { placement: Placement },
    Cancelled,
}

impl StepResolution {
    pub fn placement(&self) -> Option<Placement> {
        match self {
            StepResolution::Anchored { placement, .. } | StepResolution::Unanchored { placement } => {
                Some(*placement)
            }
            StepResolution::Cancelled => None,
        }
    }
}

pub struct TargetResolver {
    lookup: Arc<dyn ElementLookupPort>,
    geometry: Arc<dyn GeometryPort>,
    positioner: Positioner,
    poll_interval: Duration,
}

impl TargetResolver {
    pub fn new(
        lookup: Arc<dyn ElementLookupPort>,
        geometry: Arc<dyn GeometryPort>,
        positioner: Positioner,
        poll_interval: Duration,
    ) -> Self {
        Self {
            lookup,
            geometry,
            positioner,
            poll_interval,
        }
    }

    /// Poll until `locator` matches exactly one element, `timeout` elapses or
    /// `token` is cancelled.
    pub async fn resolve(
        &self,
        locator: &Locator,
        timeout: Duration,
        token: &CancellationToken,
    ) -> ResolveOutcome {
        let deadline = Instant::now() + timeout;
        loop {
            if token.is_cancelled() {
                return ResolveOutcome::Cancelled;
            }

            match self.lookup.find_all(locator).await {
                Ok(mut found) if found.len() == 1 => {
                    return ResolveOutcome::Found(found.remove(0));
                }
                Ok(found) => trace!(%locator, matches = found.len(), "target not resolved yet"),
                Err(err) => debug!(%locator, error = %err, "element lookup failed"),
            }

            let now = Instant::now();
            if now >= deadline {
                return ResolveOutcome::NotFound;
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => return ResolveOutcome::Cancelled,
                _ = sleep(self.poll_interval.min(deadline - now)) => {}
            }
        }
    }

    /// Resolve the step's target and place the overlay next to it.
    pub async fn locate(
        &self,
        step: &StepDefinition,
        timeout: Duration,
        token: &CancellationToken,
    ) -> StepResolution {
        let element = match self.resolve(&step.locator, timeout, token).await {
            ResolveOutcome::Cancelled => return StepResolution::Cancelled,
            ResolveOutcome::NotFound => {
                warn!(
                    step_id = %step.id,
                    locator = %step.locator,
                    timeout_ms = timeout.as_millis() as u64,
                    "target not found; showing step without highlight"
                );
                let viewport = self.viewport().await;
                if token.is_cancelled() {
                    return StepResolution::Cancelled;
                }
                return StepResolution::Unanchored {
                    placement: self.positioner.unanchored(viewport),
                };
            }
            ResolveOutcome::Found(element) => element,
        };

        // Placement assumes the element is visible.
        if let Err(err) = self.lookup.scroll_into_view(&element).await {
            debug!(%element, error = %err, "scroll into view failed");
        }

        let bounds = self.geometry.bounds(&element).await;
        let viewport = self.viewport().await;
        if token.is_cancelled() {
            return StepResolution::Cancelled;
        }

        match bounds {
            Ok(bounds) => StepResolution::Anchored {
                placement: self.positioner.compute(bounds, viewport, step.side),
                element,
            },
            Err(err) => {
                warn!(step_id = %step.id, error = %err, "target bounds unavailable; showing step without highlight");
                StepResolution::Unanchored {
                    placement: self.positioner.unanchored(viewport),
                }
            }
        }
    }

    async fn viewport(&self) -> Size {
        self.geometry.viewport_size().await.unwrap_or_else(|err| {
            warn!(error = %err, "viewport size unavailable");
            Size::new(0.0, 0.0)
        })
    }
}
