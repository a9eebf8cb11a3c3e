//! Shared snapshot store.
//!
//! Holds the published session snapshot and the publication cell. Writes are
//! tagged with the activation epoch of the connection that produced them;
//! writes from a retired connection are discarded, so a late event from an
//! old handle can never overwrite the state of a newer one.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::{
    projector::{self, LifecycleMarker},
    protocol::{InboundMessage, QuestionPublication},
    snapshot::SessionSnapshot,
};

pub(crate) struct SessionStore {
    snapshot: watch::Sender<SessionSnapshot>,
    publication: watch::Sender<Option<QuestionPublication>>,
    /// Epoch of the activation allowed to write. Guards every write.
    epoch: Mutex<u64>,
}

impl SessionStore {
    pub(crate) fn new(room_name: &str) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::new(room_name));
        let (publication, _) = watch::channel(None);
        Self {
            snapshot,
            publication,
            epoch: Mutex::new(0),
        }
    }

    fn lock_epoch(&self) -> MutexGuard<'_, u64> {
        self.epoch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn current(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub(crate) fn subscribe_publications(&self) -> watch::Receiver<Option<QuestionPublication>> {
        self.publication.subscribe()
    }

    /// Start a new activation; writes from older ones are rejected from now on
    pub(crate) fn activate(&self) -> u64 {
        let mut epoch = self.lock_epoch();
        *epoch += 1;
        *epoch
    }

    /// End `epoch` if it is still current: publish `Closed` and reject its later writes
    pub(crate) fn retire(&self, retired: u64) {
        let mut epoch = self.lock_epoch();
        if *epoch != retired {
            return;
        }
        *epoch += 1;
        let current = self.snapshot.borrow().clone();
        self.snapshot
            .send_replace(projector::mark(&current, LifecycleMarker::Closed));
    }

    /// Apply a lifecycle marker; false if `epoch` is stale
    pub(crate) fn mark(&self, epoch: u64, marker: LifecycleMarker) -> bool {
        let guard = self.lock_epoch();
        if *guard != epoch {
            return false;
        }
        let current = self.snapshot.borrow().clone();
        self.snapshot.send_replace(projector::mark(&current, marker));
        true
    }

    /// Fold a decoded message; false if `epoch` is stale.
    ///
    /// Publishes the `Working` snapshot first, then the final one.
    pub(crate) fn receive(&self, epoch: u64, message: InboundMessage) -> bool {
        let guard = self.lock_epoch();
        if *guard != epoch {
            return false;
        }

        let current = self.snapshot.borrow().clone();
        self.snapshot.send_replace(projector::begin(&current));

        let projection = projector::apply(&current, message);
        self.snapshot.send_replace(projection.snapshot);

        if let Some(update) = projection.publication {
            self.publication
                .send_if_modified(|cell| update.apply_to(cell));
        }
        true
    }
}
