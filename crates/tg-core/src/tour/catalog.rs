//! Tour catalog.
//!
//! Read-only registry of tours and onboarding paths, loaded once at startup.
//! Adding a tour or path only requires a new catalog entry.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::definition::{PathDefinition, StepDefinition, TourDefinition};
use super::error::CatalogError;
use crate::ids::{PathId, TourId};
use crate::placement::Side;

#[derive(Debug, Clone, Default)]
pub struct TourCatalog {
    tours: BTreeMap<TourId, TourDefinition>,
    paths: BTreeMap<PathId, PathDefinition>,
}

/// On-disk catalog document.
#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    tours: Vec<TourDefinition>,
    #[serde(default)]
    paths: Vec<PathDefinition>,
}

impl TourCatalog {
    pub fn new(
        tours: Vec<TourDefinition>,
        paths: Vec<PathDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();

        for tour in tours {
            if catalog.tours.contains_key(tour.id()) {
                return Err(CatalogError::DuplicateTour(tour.id().clone()));
            }
            catalog.tours.insert(tour.id().clone(), tour);
        }

        for path in paths {
            if catalog.paths.contains_key(&path.id) {
                return Err(CatalogError::DuplicatePath(path.id));
            }
            if !catalog.tours.contains_key(&path.tour_id) {
                return Err(CatalogError::DanglingPath {
                    path_id: path.id,
                    tour_id: path.tour_id,
                });
            }
            catalog.paths.insert(path.id.clone(), path);
        }

        Ok(catalog)
    }

    /// Parse a TOML catalog document (`[[tours]]` / `[[paths]]` tables).
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument =
            toml::from_str(content).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::new(doc.tours, doc.paths)
    }

    pub fn get_tour(&self, id: &TourId) -> Result<&TourDefinition, CatalogError> {
        self.tours
            .get(id)
            .ok_or_else(|| CatalogError::UnknownTour(id.clone()))
    }

    pub fn get_path(&self, id: &PathId) -> Result<&PathDefinition, CatalogError> {
        self.paths
            .get(id)
            .ok_or_else(|| CatalogError::UnknownPath(id.clone()))
    }

    pub fn tours(&self) -> impl Iterator<Item = &TourDefinition> {
        self.tours.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathDefinition> {
        self.paths.values()
    }

    /// Tours shipped with the dashboard.
    pub fn builtin() -> Self {
        let first_time_user = TourDefinition::new(
            "first-time-user",
            vec![
                StepDefinition::new(
                    "welcome",
                    "Welcome to your dashboard",
                    "This is where your prompts, beta programs and help live.",
                    "[data-tour='dashboard-header']",
                    Side::Bottom,
                )
                .on_route("/dashboard"),
                StepDefinition::new(
                    "sidebar",
                    "Navigate the workspace",
                    "Use the sidebar to jump between sections.",
                    "[data-tour='sidebar-nav']",
                    Side::Right,
                )
                .on_route("/dashboard"),
                StepDefinition::new(
                    "prompt-library",
                    "Your prompt library",
                    "Every prompt you create is saved here.",
                    "[data-tour='prompt-library']",
                    Side::Bottom,
                )
                .on_route("/dashboard/prompts"),
                StepDefinition::new(
                    "beta-programs",
                    "Join a beta",
                    "Apply to beta programs and leave feedback.",
                    "[data-tour='beta-programs']",
                    Side::Left,
                )
                .on_route("/dashboard/beta"),
                StepDefinition::new(
                    "help-center",
                    "Need help?",
                    "Open the help center at any time.",
                    "[data-tour='help-button']",
                    Side::Top,
                ),
            ],
        );

        let prompt_creation = TourDefinition::new(
            "prompt-creation",
            vec![
                StepDefinition::new(
                    "new-prompt",
                    "Create a prompt",
                    "Start a new prompt from here.",
                    "[data-tour='new-prompt-button']",
                    Side::Bottom,
                )
                .on_route("/dashboard/prompts"),
                StepDefinition::new(
                    "prompt-editor",
                    "Write your prompt",
                    "The editor supports variables and templates.",
                    "[data-tour='prompt-editor']",
                    Side::Right,
                )
                .on_route("/dashboard/prompts/new"),
                StepDefinition::new(
                    "variables-panel",
                    "Add variables",
                    "Variables let you reuse a prompt with different inputs.",
                    "[data-tour='variables-panel']",
                    Side::Left,
                ),
                StepDefinition::new(
                    "save-prompt",
                    "Save it",
                    "Saved prompts appear in your library.",
                    "[data-tour='save-prompt']",
                    Side::Top,
                ),
            ],
        );

        let beta_program = TourDefinition::new(
            "beta-program",
            vec![
                StepDefinition::new(
                    "beta-list",
                    "Open programs",
                    "These programs are accepting applications.",
                    "[data-tour='beta-list']",
                    Side::Bottom,
                )
                .on_route("/dashboard/beta"),
                StepDefinition::new(
                    "beta-apply",
                    "Apply",
                    "Send an application in one click.",
                    "[data-tour='beta-apply']",
                    Side::Left,
                ),
                StepDefinition::new(
                    "beta-feedback",
                    "Share feedback",
                    "Tell the team what works and what doesn't.",
                    "[data-tour='beta-feedback']",
                    Side::Top,
                )
                .on_route("/dashboard/beta/feedback"),
            ],
        );

        let tours = [first_time_user, prompt_creation, beta_program]
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .unwrap_or_default();

        let paths = vec![
            PathDefinition {
                id: "creator".into(),
                label: "I want to build prompts".to_string(),
                initial_route: "/dashboard/prompts".into(),
                tour_id: "prompt-creation".into(),
            },
            PathDefinition {
                id: "tester".into(),
                label: "I want to join beta programs".to_string(),
                initial_route: "/dashboard/beta".into(),
                tour_id: "beta-program".into(),
            },
            PathDefinition {
                id: "explorer".into(),
                label: "Show me around".to_string(),
                initial_route: "/dashboard".into(),
                tour_id: "first-time-user".into(),
            },
        ];

        Self::new(tours, paths).unwrap_or_default()
    }
}
