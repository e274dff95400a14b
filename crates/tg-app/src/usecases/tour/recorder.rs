//! Onboarding event recorder.
//!
//! `record` never fails and never waits on the network. Each event is first
//! written to the device's [`EventOutboxPort`], then queued for
//! [`EventWorker`], which appends it with bounded retries and removes it from
//! the outbox once delivered. Events still in the outbox when a session ends,
//! cleanly or not, are redelivered by the next worker for the same user.
//! Delivery is at-least-once.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, info_span, warn, Instrument};

use tg_core::onboarding::EventDraft;
use tg_core::ports::{ClockPort, DocumentStorePort, EventOutboxPort};
use tg_core::{EventId, OnboardingEvent, UserId};

use super::retry::RetryPolicy;

enum RecorderMessage {
    Append(OnboardingEvent),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct EventRecorder {
    user_id: UserId,
    clock: Arc<dyn ClockPort>,
    outbox: Arc<dyn EventOutboxPort>,
    tx: mpsc::Sender<RecorderMessage>,
}

impl EventRecorder {
    /// Build a recorder for one user session and the worker that drains it.
    pub fn new(
        user_id: UserId,
        clock: Arc<dyn ClockPort>,
        store: Arc<dyn DocumentStorePort>,
        outbox: Arc<dyn EventOutboxPort>,
        policy: RetryPolicy,
        capacity: usize,
    ) -> (Self, EventWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = EventWorker {
            user_id: user_id.clone(),
            rx,
            store,
            outbox: outbox.clone(),
            policy,
            redelivered: HashSet::new(),
        };
        (
            Self {
                user_id,
                clock,
                outbox,
                tx,
            },
            worker,
        )
    }

    pub fn spawn(
        user_id: UserId,
        clock: Arc<dyn ClockPort>,
        store: Arc<dyn DocumentStorePort>,
        outbox: Arc<dyn EventOutboxPort>,
        policy: RetryPolicy,
        capacity: usize,
    ) -> Self {
        let (recorder, worker) = Self::new(user_id, clock, store, outbox, policy, capacity);
        tokio::spawn(worker.run());
        recorder
    }

    /// Stamp the event, keep it in the outbox and queue it for delivery.
    /// Never waits on the remote store.
    pub async fn record(&self, draft: EventDraft) {
        let event = OnboardingEvent::from_draft(draft, self.user_id.clone(), self.clock.now());
        let kind = event.kind;
        let kept = match self.outbox.push(&event).await {
            Ok(()) => true,
            Err(err) => {
                warn!(?kind, error = %err, "event outbox unavailable; event held in memory only");
                false
            }
        };
        match self.tx.try_send(RecorderMessage::Append(event)) {
            Ok(()) => debug!(?kind, "onboarding event queued"),
            Err(TrySendError::Full(_)) if kept => {
                warn!(?kind, "event queue full; event waits in the outbox")
            }
            Err(TrySendError::Closed(_)) if kept => {
                warn!(?kind, "event worker stopped; event waits in the outbox")
            }
            Err(_) => warn!(?kind, "event queue unavailable; dropping onboarding event"),
        }
    }

    /// Wait until every queued event has been attempted.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(RecorderMessage::Flush(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }
}

pub struct EventWorker {
    user_id: UserId,
    rx: mpsc::Receiver<RecorderMessage>,
    store: Arc<dyn DocumentStorePort>,
    outbox: Arc<dyn EventOutboxPort>,
    policy: RetryPolicy,
    /// Events already attempted from the outbox; their queued copies are skipped.
    redelivered: HashSet<EventId>,
}

impl EventWorker {
    pub async fn run(mut self) {
        self.redeliver_pending().await;

        while let Some(message) = self.rx.recv().await {
            match message {
                RecorderMessage::Append(event) => {
                    if self.redelivered.remove(&event.id) {
                        continue;
                    }
                    self.deliver(&event).await;
                }
                RecorderMessage::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        debug!("event worker stopped");
    }

    /// Deliver this user's events left in the outbox, oldest first.
    async fn redeliver_pending(&mut self) {
        let pending = match self.outbox.pending().await {
            Ok(pending) => pending,
            Err(err) => {
                warn!(error = %err, "event outbox unreadable; skipping redelivery");
                return;
            }
        };
        let pending: Vec<_> = pending
            .into_iter()
            .filter(|event| event.user_id == self.user_id)
            .collect();
        if pending.is_empty() {
            return;
        }

        info!(user_id = %self.user_id, count = pending.len(), "redelivering onboarding events from the outbox");
        for event in &pending {
            self.redelivered.insert(event.id.clone());
            self.deliver(event).await;
        }
    }

    async fn deliver(&self, event: &OnboardingEvent) {
        let span = info_span!(
            "usecase.recorder.append",
            event_id = %event.id,
            kind = ?event.kind,
        );
        let store = &self.store;
        let result = self
            .policy
            .run("append_event", move || store.append_event(event))
            .instrument(span)
            .await;
        match result {
            Ok(()) => {
                if let Err(err) = self.outbox.remove(&event.id).await {
                    warn!(event_id = %event.id, error = %err, "delivered event left in the outbox");
                }
            }
            Err(err) => {
                warn!(kind = ?event.kind, error = %err, "event not delivered; kept in the outbox");
            }
        }
    }
}
