//! Persistence and reconciliation of onboarding progress.
//!
//! The local cache is written inside every transition so a reload right after
//! a crash resumes at the latest step. The remote record is written in the
//! background by [`RemoteWriteWorker`]; remote failures are retried and then
//! dropped, never rolled back into the local cache.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, info_span, warn, Instrument};

use tg_core::onboarding::{reconcile, Authority};
use tg_core::ports::{DocumentStorePort, LocalStatePort};
use tg_core::{OnboardingState, UserId};

use super::retry::RetryPolicy;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to load onboarding state: {0:#}")]
    LoadFailed(#[source] anyhow::Error),
    /// Local cache write failed. Non-fatal: the in-memory state stays current.
    #[error("failed to write onboarding state: {0:#}")]
    WriteFailed(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateSource {
    Local,
    Remote,
    /// Nothing stored anywhere yet.
    Fresh,
}

/// Result of [`PersistenceService::load`].
#[derive(Debug)]
pub struct LoadedState {
    pub state: OnboardingState,
    pub source: StateSource,
    /// Fires when the remote record turns out to be strictly newer than the
    /// local cache. The local cache has already been replaced at that point.
    pub superseded: Option<oneshot::Receiver<OnboardingState>>,
}

enum RemoteWrite {
    Put {
        user_id: UserId,
        state: OnboardingState,
    },
    Flush(oneshot::Sender<()>),
}

pub struct PersistenceService {
    local: Arc<dyn LocalStatePort>,
    remote: Arc<dyn DocumentStorePort>,
    writes: mpsc::UnboundedSender<RemoteWrite>,
    /// Serializes local cache writes with the background reconciliation's
    /// read-compare-write.
    cache_lock: Arc<Mutex<()>>,
}

impl PersistenceService {
    /// Build the service and the worker that performs its remote writes.
    /// The worker must be spawned by the caller.
    pub fn new(
        local: Arc<dyn LocalStatePort>,
        remote: Arc<dyn DocumentStorePort>,
        policy: RetryPolicy,
    ) -> (Self, RemoteWriteWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = RemoteWriteWorker {
            rx,
            remote: remote.clone(),
            policy,
        };
        (
            Self {
                local,
                remote,
                writes: tx,
                cache_lock: Arc::new(Mutex::new(())),
            },
            worker,
        )
    }

    /// Build the service and spawn its worker on the current runtime.
    pub fn spawn(
        local: Arc<dyn LocalStatePort>,
        remote: Arc<dyn DocumentStorePort>,
        policy: RetryPolicy,
    ) -> Self {
        let (service, worker) = Self::new(local, remote, policy);
        tokio::spawn(worker.run());
        service
    }

    /// Load the user's state, local cache first.
    ///
    /// With a local copy the call returns immediately and the remote record is
    /// fetched in the background. Without one, the remote record is awaited.
    pub async fn load(&self, user_id: &UserId) -> Result<LoadedState, PersistenceError> {
        let cached = match self.local.load(user_id).await {
            Ok(cached) => cached,
            Err(err) => {
                warn!(%user_id, error = %err, "local onboarding cache unreadable; ignoring it");
                None
            }
        };

        if let Some(state) = cached {
            let (tx, rx) = oneshot::channel();
            let span = info_span!("usecase.persistence.reconcile_remote", %user_id);
            tokio::spawn(
                reconcile_remote(
                    self.local.clone(),
                    self.remote.clone(),
                    self.cache_lock.clone(),
                    user_id.clone(),
                    state.clone(),
                    tx,
                )
                .instrument(span),
            );
            return Ok(LoadedState {
                state,
                source: StateSource::Local,
                superseded: Some(rx),
            });
        }

        match self.remote.get_record(user_id).await {
            Ok(Some(state)) => {
                debug!(%user_id, "no local cache; using remote onboarding state");
                if let Err(err) = self.local.store(user_id, &state).await {
                    warn!(%user_id, error = %err, "failed to seed local cache from remote");
                }
                Ok(LoadedState {
                    state,
                    source: StateSource::Remote,
                    superseded: None,
                })
            }
            Ok(None) => Ok(LoadedState {
                state: OnboardingState::default(),
                source: StateSource::Fresh,
                superseded: None,
            }),
            Err(err) => Err(PersistenceError::LoadFailed(err)),
        }
    }

    /// Write the local cache, then queue the remote write.
    ///
    /// Only a local failure is reported; the remote write is queued either way.
    pub async fn save(
        &self,
        user_id: &UserId,
        state: &OnboardingState,
    ) -> Result<(), PersistenceError> {
        let local = {
            let _cache_guard = self.cache_lock.lock().await;
            self.local.store(user_id, state).await
        };

        let queued = self.writes.send(RemoteWrite::Put {
            user_id: user_id.clone(),
            state: state.clone(),
        });
        if queued.is_err() {
            warn!(%user_id, "remote write worker stopped; remote copy will lag");
        }

        local.map_err(PersistenceError::WriteFailed)
    }

    /// Wait until every queued remote write has been attempted.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.writes.send(RemoteWrite::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

async fn reconcile_remote(
    local: Arc<dyn LocalStatePort>,
    remote: Arc<dyn DocumentStorePort>,
    cache_lock: Arc<Mutex<()>>,
    user_id: UserId,
    loaded: OnboardingState,
    superseded: oneshot::Sender<OnboardingState>,
) {
    let record = match remote.get_record(&user_id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            debug!("no remote onboarding record yet");
            return;
        }
        Err(err) => {
            warn!(error = %err, "remote fetch failed; local cache stays authoritative");
            return;
        }
    };

    // The session may have saved newer progress while the fetch was in flight;
    // no save may land between this read and the write below.
    let _cache_guard = cache_lock.lock().await;
    let current = match local.load(&user_id).await {
        Ok(Some(current)) => current,
        _ => loaded,
    };

    if reconcile(&current, &record) == Authority::Local {
        debug!("local onboarding state is authoritative");
        return;
    }

    info!(
        local_updated_at = %current.updated_at,
        remote_updated_at = %record.updated_at,
        "remote onboarding state is newer; superseding local cache"
    );
    if let Err(err) = local.store(&user_id, &record).await {
        warn!(error = %err, "failed to write remote state into local cache");
    }
    let _ = superseded.send(record);
}

/// Drains queued remote writes in order, retrying each with backoff.
pub struct RemoteWriteWorker {
    rx: mpsc::UnboundedReceiver<RemoteWrite>,
    remote: Arc<dyn DocumentStorePort>,
    policy: RetryPolicy,
}

impl RemoteWriteWorker {
    /// Run until the owning service is dropped.
    pub async fn run(mut self) {
        while let Some(write) = self.rx.recv().await {
            match write {
                RemoteWrite::Put { user_id, state } => {
                    let span = info_span!("usecase.persistence.remote_write", %user_id);
                    let remote = &self.remote;
                    let (user, record) = (&user_id, &state);
                    let result = self
                        .policy
                        .run("put_record", move || remote.put_record(user, record))
                        .instrument(span)
                        .await;
                    if let Err(err) = result {
                        warn!(
                            %user_id,
                            attempts = self.policy.max_attempts,
                            error = %err,
                            "dropping remote onboarding write; local cache stays authoritative"
                        );
                    }
                }
                RemoteWrite::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        debug!("remote write worker stopped");
    }
}
