//! Tour orchestrator.
//!
//! Drives the tour state machine for one user session and executes the side
//! effects it asks for: attempt cancellation, navigation, target resolution,
//! persistence and analytics.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch, Mutex};
use tracing::{debug, error, info, info_span, warn, Instrument};

use tg_core::onboarding::{reconcile, Authority, EventDraft, SuggestionOutcome};
use tg_core::ports::ClockPort;
use tg_core::tour::{
    CatalogError, SkipReason, StepDefinition, StepView, TourAction, TourCursor, TourEvent,
    TourSnapshot, TransitionError,
};
use tg_core::{
    OnboardingEventKind, OnboardingState, PathId, TourCatalog, TourId, TourPhase,
    TourStateMachine,
};

use super::context::TourContext;
use super::navigation::{NavigationCoordinator, NavigationError, ViewOutcome};
use super::persistence::{PersistenceService, StateSource};
use super::recorder::EventRecorder;
use super::resolver::{StepResolution, TargetResolver};

/// Errors produced by the tour orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum TourError {
    #[error("unknown tour: {0}")]
    UnknownTour(TourId),
    #[error("unknown path: {0}")]
    UnknownPath(PathId),
    /// Persisted progress points at a tour or step the catalog no longer has.
    #[error("stored progress references {tour_id} step {step}, which no longer exists")]
    StaleTourReference { tour_id: TourId, step: usize },
    #[error(transparent)]
    NavigationFailed(#[from] NavigationError),
    #[error("a step transition is already in progress")]
    TransitionInProgress,
    #[error("no tour is active")]
    NoActiveTour,
    #[error("already at the first step")]
    AtFirstStep,
    #[error("event {event} is not valid in phase {phase}")]
    InvalidTransition {
        phase: &'static str,
        event: &'static str,
    },
    #[error("catalog error: {0}")]
    Catalog(CatalogError),
}

impl From<TransitionError> for TourError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::TransitionInProgress => TourError::TransitionInProgress,
            TransitionError::NoActiveTour => TourError::NoActiveTour,
            TransitionError::AtFirstStep => TourError::AtFirstStep,
            TransitionError::Invalid { phase, event } => {
                TourError::InvalidTransition { phase, event }
            }
        }
    }
}

impl From<CatalogError> for TourError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownTour(id) => TourError::UnknownTour(id),
            CatalogError::UnknownPath(id) => TourError::UnknownPath(id),
            other => TourError::Catalog(other),
        }
    }
}

/// Services the orchestrator executes actions with.
pub struct TourServices {
    pub navigation: NavigationCoordinator,
    pub resolver: TargetResolver,
    pub persistence: Arc<PersistenceService>,
    pub recorder: EventRecorder,
    pub clock: Arc<dyn ClockPort>,
}

/// What the dispatch loop does after a batch of actions.
enum ActionFlow {
    Continue(Vec<TourEvent>),
    /// The attempt was cancelled; leave the phase for whoever cancelled it.
    Abandoned,
    /// A side effect failed. `event` is fed back into the machine and `error`
    /// is returned once the loop settles.
    Failed { event: TourEvent, error: TourError },
}

/// Orchestrator that drives tour state and side effects.
pub struct TourOrchestrator {
    context: Arc<TourContext>,
    catalog: Arc<TourCatalog>,
    navigation: NavigationCoordinator,
    resolver: TargetResolver,
    persistence: Arc<PersistenceService>,
    recorder: EventRecorder,
    clock: Arc<dyn ClockPort>,
    resolve_timeout: Duration,
    /// Fires when the remote record supersedes the progress loaded at startup.
    pending_resync: Mutex<Option<oneshot::Receiver<OnboardingState>>>,
}

impl TourOrchestrator {
    pub fn new(
        context: Arc<TourContext>,
        catalog: Arc<TourCatalog>,
        services: TourServices,
        resolve_timeout: Duration,
    ) -> Self {
        Self {
            context,
            catalog,
            navigation: services.navigation,
            resolver: services.resolver,
            persistence: services.persistence,
            recorder: services.recorder,
            clock: services.clock,
            resolve_timeout,
            pending_resync: Mutex::new(None),
        }
    }

    /// Load the user's progress into the context.
    ///
    /// A load failure is logged and leaves a fresh `Idle` session.
    pub async fn load_progress(&self) -> OnboardingState {
        let user_id = self.context.user_id();
        let state = match self.persistence.load(user_id).await {
            Ok(loaded) => {
                info!(%user_id, source = ?loaded.source, "onboarding state loaded");
                if loaded.source == StateSource::Local {
                    *self.pending_resync.lock().await = loaded.superseded;
                }
                loaded.state
            }
            Err(err) => {
                error!(%user_id, error = %err, "failed to load onboarding state; starting fresh");
                OnboardingState::default()
            }
        };
        self.context.replace_progress(state.clone()).await;
        self.context.publish().await;
        state
    }

    /// Start `tour_id` from its first step, superseding any active tour.
    pub async fn start(&self, tour_id: &TourId) -> Result<TourPhase, TourError> {
        let tour = self.catalog.get_tour(tour_id)?;
        let cursor = TourCursor::first(tour);
        self.context.cancel_attempt().await;
        let _dispatch_guard = self.context.acquire_dispatch_lock().await;
        self.dispatch(TourEvent::Start(cursor)).await
    }

    pub async fn next(&self) -> Result<TourPhase, TourError> {
        let _dispatch_guard = self
            .context
            .try_acquire_dispatch_lock()
            .ok_or(TourError::TransitionInProgress)?;
        self.dispatch(TourEvent::Next).await
    }

    pub async fn previous(&self) -> Result<TourPhase, TourError> {
        let _dispatch_guard = self
            .context
            .try_acquire_dispatch_lock()
            .ok_or(TourError::TransitionInProgress)?;
        self.dispatch(TourEvent::Previous).await
    }

    /// User dismissed the tour. A no-op when no tour is active.
    pub async fn skip(&self) -> Result<TourPhase, TourError> {
        self.terminate(SkipReason::User).await
    }

    /// Programmatic termination, e.g. the user navigated away.
    pub async fn end(&self) -> Result<TourPhase, TourError> {
        self.terminate(SkipReason::Ended).await
    }

    /// Return a completed or skipped tour to `Idle`.
    pub async fn acknowledge(&self) -> Result<TourPhase, TourError> {
        let _dispatch_guard = self.context.acquire_dispatch_lock().await;
        self.dispatch(TourEvent::Acknowledge).await
    }

    /// Re-enter the tour recorded in the user's progress, if any. Progress
    /// pointing at an already completed tour is cleared instead.
    pub async fn resume(&self) -> Result<TourPhase, TourError> {
        let _dispatch_guard = self.context.acquire_dispatch_lock().await;
        self.resume_locked().await
    }

    /// Adopt a newer remote record and re-enter whatever tour it describes.
    pub async fn resync(&self, remote: OnboardingState) -> Result<TourPhase, TourError> {
        self.context.cancel_attempt().await;
        let _dispatch_guard = self.context.acquire_dispatch_lock().await;

        info!(
            user_id = %self.context.user_id(),
            tour_id = ?remote.current_tour_id,
            step = ?remote.current_step,
            "re-entering tour from remote onboarding state"
        );
        self.context.replace_progress(remote).await;
        self.context.set_phase(TourPhase::Idle).await;
        self.context.set_view(None).await;
        self.context.publish().await;

        self.resume_locked().await
    }

    /// Wait for the background remote fetch started by [`Self::load_progress`]
    /// and resync if the remote record won. Returns `None` when the local
    /// cache stayed authoritative.
    pub async fn await_remote_reconciliation(&self) -> Result<Option<TourPhase>, TourError> {
        let Some(rx) = self.pending_resync.lock().await.take() else {
            return Ok(None);
        };
        let Ok(remote) = rx.await else {
            return Ok(None);
        };
        // The session may have moved on since loading; only a record newer
        // than what it holds now replaces it.
        let current = self.context.progress().await;
        if reconcile(&current, &remote) == Authority::Local {
            debug!(
                user_id = %self.context.user_id(),
                "session progress is newer than the remote record; keeping it"
            );
            return Ok(None);
        }
        self.resync(remote).await.map(Some)
    }

    /// Record the chosen path, bring up its initial view and start its tour.
    pub async fn select_path(&self, path_id: &PathId) -> Result<TourPhase, TourError> {
        let path = self.catalog.get_path(path_id)?;
        let now = self.clock.now();
        self.save_progress(|progress| progress.select_path(path.id.clone(), now))
            .await;
        self.recorder
            .record(
                EventDraft::new(OnboardingEventKind::PathSelected)
                    .path(path.id.clone())
                    .tour(path.tour_id.clone()),
            )
            .await;

        let token = self.context.begin_attempt().await;
        match self.navigation.ensure_view(&path.initial_route, &token).await? {
            ViewOutcome::Ready => self.start(&path.tour_id).await,
            ViewOutcome::Cancelled => {
                debug!(%path_id, "path navigation cancelled before its tour started");
                Ok(self.context.phase().await)
            }
        }
    }

    pub async fn mark_welcome_seen(&self) -> OnboardingState {
        let now = self.clock.now();
        self.save_progress(|progress| progress.mark_welcome_seen(now))
            .await
    }

    /// Record how the user reacted to a contextual suggestion. Dismissed
    /// suggestions are remembered in the user's progress.
    pub async fn record_suggestion(&self, suggestion_id: &str, outcome: SuggestionOutcome) {
        self.recorder
            .record(EventDraft::new(outcome.kind()).meta("suggestion", suggestion_id))
            .await;
        if outcome == SuggestionOutcome::Dismissed {
            let now = self.clock.now();
            self.save_progress(|progress| progress.dismiss_suggestion(suggestion_id, now))
                .await;
        }
    }

    pub async fn current_step_view(&self) -> Option<StepView> {
        self.context.current_view().await
    }

    pub async fn phase(&self) -> TourPhase {
        self.context.phase().await
    }

    pub async fn progress(&self) -> OnboardingState {
        self.context.progress().await
    }

    pub fn subscribe(&self) -> watch::Receiver<TourSnapshot> {
        self.context.subscribe()
    }

    /// Cancel any in-flight attempt and flush queued remote writes and
    /// analytics.
    pub async fn shutdown(&self) {
        self.context.cancel_attempt().await;
        self.persistence.flush().await;
        self.recorder.flush().await;
        info!(user_id = %self.context.user_id(), "tour session shut down");
    }

    async fn terminate(&self, reason: SkipReason) -> Result<TourPhase, TourError> {
        // Abandon any pending navigation or resolution before queueing.
        self.context.cancel_attempt().await;
        let _dispatch_guard = self.context.acquire_dispatch_lock().await;
        self.dispatch(TourEvent::Skip(reason)).await
    }

    /// Must be called while holding `dispatch_lock`.
    async fn resume_locked(&self) -> Result<TourPhase, TourError> {
        let phase = self.context.phase().await;
        if phase != TourPhase::Idle {
            debug!(phase = phase.name(), "tour already running; nothing to resume");
            return Ok(phase);
        }

        let progress = self.context.progress().await;
        let Some((tour_id, step)) = progress.in_progress() else {
            return Ok(TourPhase::Idle);
        };
        if progress.has_completed(tour_id) {
            info!(%tour_id, step, "stored progress points at a completed tour; clearing it");
            let now = self.clock.now();
            self.save_progress(|progress| progress.clear_progress(now))
                .await;
            return Ok(TourPhase::Idle);
        }

        let cursor = self
            .catalog
            .get_tour(tour_id)
            .ok()
            .and_then(|tour| TourCursor::at(tour, step));
        let Some(cursor) = cursor else {
            warn!(%tour_id, step, "stored tour progress is stale; clearing it");
            let tour_id = tour_id.clone();
            let now = self.clock.now();
            self.save_progress(|progress| progress.clear_progress(now))
                .await;
            self.context.publish().await;
            return Err(TourError::StaleTourReference { tour_id, step });
        };

        self.dispatch(TourEvent::Resume(cursor)).await
    }

    /// Run `event` and every follow-up event to a stable phase.
    ///
    /// Must be called while holding `dispatch_lock`.
    async fn dispatch(&self, event: TourEvent) -> Result<TourPhase, TourError> {
        let span = info_span!(
            "usecase.tour_orchestrator.dispatch",
            user_id = %self.context.user_id(),
            event = ?event,
        );
        self.run_dispatch(event).instrument(span).await
    }

    async fn run_dispatch(&self, event: TourEvent) -> Result<TourPhase, TourError> {
        let mut current = self.context.phase().await;
        let mut pending_events = VecDeque::from([event]);
        let mut failure = None;

        while let Some(event) = pending_events.pop_front() {
            let from = current.name();
            let event_name = format!("{event:?}");
            let (next, actions) = TourStateMachine::transition(current, event)?;
            info!(from, to = next.name(), event = %event_name, "tour state transition");

            self.context.set_phase(next.clone()).await;
            self.context.publish().await;
            current = next;
            let flow = self.execute_actions(&current, actions).await;

            match flow {
                ActionFlow::Continue(follow_up_events) => pending_events.extend(follow_up_events),
                ActionFlow::Abandoned => {
                    debug!(phase = current.name(), "attempt cancelled; abandoning dispatch");
                    break;
                }
                ActionFlow::Failed { event, error } => {
                    pending_events.push_back(event);
                    failure = Some(error);
                }
            }
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(current),
        }
    }

    async fn execute_actions(&self, phase: &TourPhase, actions: Vec<TourAction>) -> ActionFlow {
        let mut follow_up_events = Vec::new();
        for action in actions {
            debug!(?action, "tour executing action");
            match action {
                TourAction::BeginAttempt => {
                    self.context.begin_attempt().await;
                }
                TourAction::CancelAttempt => {
                    self.context.cancel_attempt().await;
                    self.context.set_view(None).await;
                }
                TourAction::Persist => {
                    let now = self.clock.now();
                    self.save_progress(|progress| progress.apply_phase(phase, now))
                        .await;
                }
                TourAction::Record(draft) => self.recorder.record(self.enrich(draft)).await,
                TourAction::NavigateToStep => match self.navigate_to_step(phase).await {
                    ActionFlow::Continue(events) => follow_up_events.extend(events),
                    flow => return flow,
                },
                TourAction::ResolveTarget => match self.resolve_target(phase).await {
                    ActionFlow::Continue(events) => follow_up_events.extend(events),
                    flow => return flow,
                },
            }
        }
        ActionFlow::Continue(follow_up_events)
    }

    async fn navigate_to_step(&self, phase: &TourPhase) -> ActionFlow {
        let Some((cursor, step)) = self.step_for(phase) else {
            return ActionFlow::Continue(Vec::new());
        };
        self.context.set_view(None).await;

        let Some(route) = &step.route else {
            return ActionFlow::Continue(vec![TourEvent::ViewReady]);
        };

        let token = self.context.attempt_token().await;
        match self.navigation.ensure_view(route, &token).await {
            Ok(ViewOutcome::Ready) => ActionFlow::Continue(vec![TourEvent::ViewReady]),
            Ok(ViewOutcome::Cancelled) => ActionFlow::Abandoned,
            Err(err) => {
                error!(
                    tour_id = %cursor.tour_id(),
                    step = cursor.step(),
                    error = %err,
                    "navigation failed; skipping tour"
                );
                ActionFlow::Failed {
                    event: TourEvent::NavigationFailed {
                        reason: err.to_string(),
                    },
                    error: err.into(),
                }
            }
        }
    }

    async fn resolve_target(&self, phase: &TourPhase) -> ActionFlow {
        let Some((cursor, step)) = self.step_for(phase) else {
            return ActionFlow::Continue(Vec::new());
        };

        let token = self.context.attempt_token().await;
        let resolution = self.resolver.locate(step, self.resolve_timeout, &token).await;
        let Some(placement) = resolution.placement() else {
            return ActionFlow::Abandoned;
        };
        if matches!(resolution, StepResolution::Unanchored { .. }) {
            debug!(step_id = %step.id, "step shown unanchored");
        }
        if token.is_cancelled() {
            return ActionFlow::Abandoned;
        }

        self.context
            .set_view(Some(StepView {
                tour_id: cursor.tour_id().clone(),
                step_index: cursor.step(),
                step_count: cursor.step_count(),
                step: step.clone(),
                placement,
            }))
            .await;
        ActionFlow::Continue(vec![TourEvent::TargetResolved])
    }

    fn step_for<'a>(&'a self, phase: &'a TourPhase) -> Option<(&'a TourCursor, &'a StepDefinition)> {
        let cursor = phase.cursor()?;
        let step = self
            .catalog
            .get_tour(cursor.tour_id())
            .ok()
            .and_then(|tour| tour.step(cursor.step()));
        if step.is_none() {
            warn!(tour_id = %cursor.tour_id(), step = cursor.step(), "cursor has no catalog step");
        }
        step.map(|step| (cursor, step))
    }

    /// Fill in the step id for drafts that only carry an index.
    fn enrich(&self, draft: EventDraft) -> EventDraft {
        if draft.step_id.is_some() {
            return draft;
        }
        let step_id = match (&draft.tour_id, draft.step_index) {
            (Some(tour_id), Some(index)) => self
                .catalog
                .get_tour(tour_id)
                .ok()
                .and_then(|tour| tour.step(index))
                .map(|step| step.id.clone()),
            _ => None,
        };
        match step_id {
            Some(step_id) => draft.step_id(step_id),
            None => draft,
        }
    }

    /// Read-modify-write the progress record and save it.
    ///
    /// The progress lock is held across the save so local writes land in
    /// mutation order. A failed local write is logged; the in-memory record
    /// stays current.
    async fn save_progress<F>(&self, mutate: F) -> OnboardingState
    where
        F: FnOnce(&mut OnboardingState),
    {
        let mut progress = self.context.lock_progress().await;
        mutate(&mut progress);
        let snapshot = progress.clone();
        if let Err(err) = self
            .persistence
            .save(self.context.user_id(), &snapshot)
            .await
        {
            error!(user_id = %self.context.user_id(), error = %err, "failed to persist onboarding state");
        }
        snapshot
    }
}
