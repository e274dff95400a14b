//! Tour, step and path definitions.
//!
//! Definitions are immutable once loaded; a [`TourDefinition`] can only be
//! built with at least one step and unique step ids.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::error::CatalogError;
use crate::ids::{Locator, PathId, Route, StepId, TourId};
use crate::placement::Side;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub id: StepId,
    pub title: String,
    pub body: String,
    pub locator: Locator,
    pub side: Side,
    /// View the step lives in. `None` keeps whatever view is current.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<Route>,
}

impl StepDefinition {
    pub fn new(
        id: impl Into<StepId>,
        title: impl Into<String>,
        body: impl Into<String>,
        locator: impl Into<Locator>,
        side: Side,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            locator: locator.into(),
            side,
            route: None,
        }
    }

    pub fn on_route(mut self, route: impl Into<Route>) -> Self {
        self.route = Some(route.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TourDocument", into = "TourDocument")]
pub struct TourDefinition {
    id: TourId,
    steps: Vec<StepDefinition>,
}

impl TourDefinition {
    pub fn new(id: impl Into<TourId>, steps: Vec<StepDefinition>) -> Result<Self, CatalogError> {
        let id = id.into();
        if steps.is_empty() {
            return Err(CatalogError::EmptyTour(id));
        }

        let mut seen = HashSet::with_capacity(steps.len());
        for step in &steps {
            if !seen.insert(&step.id) {
                return Err(CatalogError::DuplicateStep {
                    tour_id: id,
                    step_id: step.id.clone(),
                });
            }
        }

        Ok(Self { id, steps })
    }

    pub fn id(&self) -> &TourId {
        &self.id
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Wire form of a tour; validated into [`TourDefinition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TourDocument {
    id: TourId,
    steps: Vec<StepDefinition>,
}

impl TryFrom<TourDocument> for TourDefinition {
    type Error = CatalogError;

    fn try_from(doc: TourDocument) -> Result<Self, Self::Error> {
        TourDefinition::new(doc.id, doc.steps)
    }
}

impl From<TourDefinition> for TourDocument {
    fn from(tour: TourDefinition) -> Self {
        Self {
            id: tour.id,
            steps: tour.steps,
        }
    }
}

/// Role-oriented entry point offered to first-time users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathDefinition {
    pub id: PathId,
    pub label: String,
    pub initial_route: Route,
    pub tour_id: TourId,
}
