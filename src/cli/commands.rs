use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};

use tg_app::TourOrchestrator;
use tg_core::ports::{ClockPort, DocumentStorePort, LocalStatePort};
use tg_core::{OnboardingState, PathId, TourCatalog, TourId, TourPhase, UserId};
use tg_infra::{SnapshotView, SystemClock};

use super::{Cli, Commands};
use crate::bootstrap::{self, Stores};

pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = bootstrap::load_or_default(cli.config.as_deref())?;
    let catalog = bootstrap::load_catalog(&config)?;

    match cli.command {
        Commands::Catalog => {
            print_catalog(&catalog);
            Ok(())
        }
        Commands::Status { user } => {
            let stores = Stores::open(&bootstrap::resolve_storage_paths(&config)?);
            let state = reconciled_state(&stores, &user.into()).await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(())
        }
        Commands::Run {
            user,
            tour,
            path,
            snapshot,
            steps,
        } => {
            let stores = Stores::open(&bootstrap::resolve_storage_paths(&config)?);
            let view = Arc::new(SnapshotView::from_file(&snapshot).await?);
            let session = bootstrap::build_session(
                &config,
                Arc::new(catalog),
                &stores,
                user.into(),
                view,
            );
            let result = run_tour(&session, tour, path, steps).await;
            session.shutdown().await;
            result
        }
        Commands::Reset { user } => {
            let stores = Stores::open(&bootstrap::resolve_storage_paths(&config)?);
            reset(&stores, &user.into(), SystemClock.now()).await
        }
    }
}

fn print_catalog(catalog: &TourCatalog) {
    for tour in catalog.tours() {
        println!("tour {} ({} steps)", tour.id(), tour.len());
        for (index, step) in tour.steps().iter().enumerate() {
            let route = step.route.as_ref().map(|r| r.as_str()).unwrap_or("-");
            println!("  {index}. {} [{}] {}", step.id, route, step.title);
        }
    }
    for path in catalog.paths() {
        println!(
            "path {} \"{}\" -> {} at {}",
            path.id, path.label, path.tour_id, path.initial_route
        );
    }
}

/// Local cache, superseded by the remote record if that one is newer.
async fn reconciled_state(stores: &Stores, user_id: &UserId) -> anyhow::Result<OnboardingState> {
    let (persistence, _worker) = tg_app::PersistenceService::new(
        stores.local.clone(),
        stores.remote.clone(),
        // Status only reads; the write worker is never run.
        tg_app::RetryPolicy::new(1, Duration::ZERO, Duration::ZERO),
    );
    let loaded = persistence
        .load(user_id)
        .await
        .context("Failed to load onboarding state")?;
    if let Some(superseded) = loaded.superseded {
        if let Ok(remote) = superseded.await {
            return Ok(remote);
        }
    }
    Ok(loaded.state)
}

async fn run_tour(
    session: &TourOrchestrator,
    tour: Option<String>,
    path: Option<String>,
    max_steps: Option<usize>,
) -> anyhow::Result<()> {
    session.load_progress().await;

    let mut phase = match (tour, path) {
        (Some(tour), _) => session.start(&TourId::from(tour)).await?,
        (None, Some(path)) => session.select_path(&PathId::from(path)).await?,
        (None, None) => {
            let phase = session.resume().await?;
            match session.await_remote_reconciliation().await? {
                Some(reconciled) => reconciled,
                None => phase,
            }
        }
    };

    let mut shown = 0usize;
    loop {
        match &phase {
            TourPhase::StepActive(_) => {
                if let Some(view) = session.current_step_view().await {
                    println!("{}", serde_json::to_string(&view)?);
                }
                shown += 1;
                if max_steps.is_some_and(|max| shown >= max) {
                    info!(shown, "stopping early; tour stays resumable");
                    return Ok(());
                }
                phase = session.next().await?;
            }
            TourPhase::Completed { tour_id } => {
                println!("{}", json!({ "completed": tour_id }));
                session.acknowledge().await?;
                return Ok(());
            }
            TourPhase::Skipped { tour_id, step } => {
                println!("{}", json!({ "skipped": tour_id, "step": step }));
                session.acknowledge().await?;
                return Ok(());
            }
            TourPhase::Idle => {
                println!("{}", json!({ "idle": true }));
                return Ok(());
            }
            in_flight => {
                // Another caller cancelled the attempt; nothing left to drive.
                warn!(phase = in_flight.name(), "tour left in flight");
                return Ok(());
            }
        }
    }
}

/// Overwrite both copies with a fresh state stamped `now`. Other devices
/// pick it up through last-writer-wins like any other update.
async fn reset(stores: &Stores, user_id: &UserId, now: DateTime<Utc>) -> anyhow::Result<()> {
    let fresh = OnboardingState {
        updated_at: now,
        ..OnboardingState::default()
    };
    stores
        .local
        .store(user_id, &fresh)
        .await
        .context("Failed to reset local onboarding state")?;
    stores
        .remote
        .put_record(user_id, &fresh)
        .await
        .context("Failed to reset remote onboarding record")?;
    info!(%user_id, updated_at = %now, "onboarding state reset");
    Ok(())
}
