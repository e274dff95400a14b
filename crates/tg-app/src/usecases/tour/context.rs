use std::sync::Arc;

use tokio::sync::{watch, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use tg_core::tour::{StepView, TourSnapshot};
use tg_core::{OnboardingState, TourPhase, UserId};

/// Shared tour context for one user session.
///
/// Owned by the composition root and handed to `TourOrchestrator`; every
/// piece of mutable tour state lives here rather than in globals.
///
/// ## Lock Ordering
/// When acquiring several locks, acquire `dispatch_lock` first, then
/// `progress`, then any of the others.
/// - `dispatch_lock`: serializes transitions. Held for the whole
///   transition + execute_actions loop, including navigation and target
///   resolution.
/// - `attempt`: never held across an await point, so `skip`/`end` can cancel
///   the in-flight attempt while a dispatch holds `dispatch_lock`.
#[derive(Clone)]
pub struct TourContext {
    user_id: UserId,
    phase: Arc<Mutex<TourPhase>>,
    progress: Arc<Mutex<OnboardingState>>,
    /// View of the step being shown. Only meaningful in `StepActive`.
    view: Arc<Mutex<Option<StepView>>>,
    attempt: Arc<Mutex<CancellationToken>>,
    dispatch_lock: Arc<Mutex<()>>,
    snapshots: Arc<watch::Sender<TourSnapshot>>,
}

impl TourContext {
    pub fn new(user_id: UserId, progress: OnboardingState) -> Self {
        let (snapshots, _) = watch::channel(TourSnapshot::default());
        Self {
            user_id,
            phase: Arc::new(Mutex::new(TourPhase::Idle)),
            progress: Arc::new(Mutex::new(progress)),
            view: Arc::new(Mutex::new(None)),
            attempt: Arc::new(Mutex::new(CancellationToken::new())),
            dispatch_lock: Arc::new(Mutex::new(())),
            snapshots: Arc::new(snapshots),
        }
    }

    /// Returns the context wrapped in Arc for shared ownership.
    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub async fn phase(&self) -> TourPhase {
        self.phase.lock().await.clone()
    }

    /// Should only be called while holding `dispatch_lock`.
    pub async fn set_phase(&self, phase: TourPhase) {
        *self.phase.lock().await = phase;
    }

    pub async fn progress(&self) -> OnboardingState {
        self.progress.lock().await.clone()
    }

    /// Lock the progress record for a read-modify-write.
    pub async fn lock_progress(&self) -> MutexGuard<'_, OnboardingState> {
        self.progress.lock().await
    }

    pub async fn replace_progress(&self, progress: OnboardingState) {
        *self.progress.lock().await = progress;
    }

    pub async fn set_view(&self, view: Option<StepView>) {
        *self.view.lock().await = view;
    }

    /// The active step's view; `None` unless the phase is `StepActive`.
    pub async fn current_view(&self) -> Option<StepView> {
        if !matches!(*self.phase.lock().await, TourPhase::StepActive(_)) {
            return None;
        }
        self.view.lock().await.clone()
    }

    /// Cancel the previous attempt and hand out a fresh token.
    pub async fn begin_attempt(&self) -> CancellationToken {
        let mut attempt = self.attempt.lock().await;
        attempt.cancel();
        *attempt = CancellationToken::new();
        attempt.clone()
    }

    pub async fn attempt_token(&self) -> CancellationToken {
        self.attempt.lock().await.clone()
    }

    pub async fn cancel_attempt(&self) {
        self.attempt.lock().await.cancel();
    }

    /// Acquires the dispatch lock, waiting behind any running transition.
    pub async fn acquire_dispatch_lock(&self) -> MutexGuard<'_, ()> {
        self.dispatch_lock.lock().await
    }

    /// Acquires the dispatch lock only if no transition is running.
    pub fn try_acquire_dispatch_lock(&self) -> Option<MutexGuard<'_, ()>> {
        self.dispatch_lock.try_lock().ok()
    }

    pub fn subscribe(&self) -> watch::Receiver<TourSnapshot> {
        self.snapshots.subscribe()
    }

    /// Publish the current phase and view to subscribers.
    pub async fn publish(&self) {
        let snapshot = TourSnapshot {
            phase: self.phase().await,
            view: self.current_view().await,
        };
        self.snapshots.send_replace(snapshot);
    }
}
