// SPDX-License-Identifier: GPL-3.0-only

//! Result handler registration
//!
//! A session has a single handler slot. Registering replaces whatever was
//! there; the returned [`Subscription`] only removes its own registration.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Receives the decoded strings of one frame, in detection order
pub type ResultHandler = Box<dyn FnMut(&[String]) + Send>;

#[derive(Default)]
struct Slot {
    /// Id of the current registration, 0 when empty
    id: u64,
    next_id: u64,
    handler: Option<ResultHandler>,
}

/// The handler slot of a session
#[derive(Clone, Default)]
pub struct HandlerSlot {
    inner: Arc<Mutex<Slot>>,
}

impl HandlerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler`, dropping the previous one
    pub fn replace(&self, handler: ResultHandler) -> Subscription {
        let mut slot = self.inner.lock();
        slot.next_id += 1;
        let id = slot.next_id;
        if slot.handler.is_some() {
            debug!(previous = slot.id, id, "Replacing result handler");
        }
        slot.id = id;
        slot.handler = Some(handler);

        Subscription {
            id,
            slot: Arc::downgrade(&self.inner),
        }
    }

    pub fn is_registered(&self) -> bool {
        self.inner.lock().id != 0
    }

    /// Drop the current handler whatever registered it
    pub fn clear(&self) {
        let mut slot = self.inner.lock();
        slot.id = 0;
        slot.handler = None;
    }

    /// Call the current handler, if any
    ///
    /// The lock is not held during the call, so the handler may unsubscribe
    /// or be replaced from inside. Returns whether a handler ran.
    pub fn invoke(&self, strings: &[String]) -> bool {
        let taken = {
            let mut slot = self.inner.lock();
            let id = slot.id;
            slot.handler.take().map(|handler| (id, handler))
        };
        let Some((id, mut handler)) = taken else {
            return false;
        };

        handler(strings);

        let mut slot = self.inner.lock();
        if slot.id == id && slot.handler.is_none() {
            slot.handler = Some(handler);
        }
        true
    }
}

/// Handle to one handler registration
///
/// Dropping it keeps the handler registered; call [`Subscription::unsubscribe`]
/// to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    slot: Weak<Mutex<Slot>>,
}

impl Subscription {
    /// Whether this registration is still the one receiving results
    pub fn is_active(&self) -> bool {
        self.slot
            .upgrade()
            .is_some_and(|slot| slot.lock().id == self.id)
    }

    /// Remove the handler if it is still the registered one
    ///
    /// Returns false when a newer registration replaced it or the session is
    /// gone.
    pub fn unsubscribe(self) -> bool {
        let Some(slot) = self.slot.upgrade() else {
            return false;
        };
        let mut slot = slot.lock();
        if slot.id != self.id {
            debug!(id = self.id, current = slot.id, "Stale unsubscribe ignored");
            return false;
        }
        slot.id = 0;
        slot.handler = None;
        debug!(id = self.id, "Result handler unsubscribed");
        true
    }
}
