//! Session registry
//!
//! Process-wide table of per-user execution slots. A slot pairs a one-permit
//! gate (the single-flight guarantee) with the handle of the generation that
//! currently runs for the user, so that a cancel request can reach it.
//!
//! Slots are created on first use and live as long as the registry. The map
//! lock is only held for bookkeeping and never across an `.await`; waiting
//! for a busy user happens on that user's own gate, so different users never
//! block each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use turnstile_domain::UserId;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Cancel side of one in-flight generation.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: u64,
    token: CancellationToken,
}

impl TaskHandle {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            token,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }
}

#[derive(Default)]
struct SessionSlot {
    gate: Arc<tokio::sync::Mutex<()>>,
    active: Mutex<Option<TaskHandle>>,
}

impl SessionSlot {
    fn active(&self) -> MutexGuard<'_, Option<TaskHandle>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive hold on a user's slot. Released on drop.
pub struct SlotGuard {
    user: UserId,
    _gate: OwnedMutexGuard<()>,
}

impl SlotGuard {
    pub fn user(&self) -> &UserId {
        &self.user
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        debug!(user = %self.user, "Slot released");
    }
}

/// Registration of a task handle, removed from the slot on drop.
///
/// Dropping also fires the task's cancellation token, so a generation whose
/// owner went away does not keep running detached. Once the task has
/// finished, that cancel is a no-op.
pub struct ActiveTaskGuard<'a> {
    registry: &'a SessionRegistry,
    user: UserId,
    handle: TaskHandle,
}

impl ActiveTaskGuard<'_> {
    pub fn handle(&self) -> &TaskHandle {
        &self.handle
    }
}

impl Drop for ActiveTaskGuard<'_> {
    fn drop(&mut self) {
        self.registry.clear_active_task_if(&self.user, self.handle.id);
        self.handle.cancel();
    }
}

/// Per-user single-flight gates and active task handles.
#[derive(Default)]
pub struct SessionRegistry {
    slots: Mutex<HashMap<UserId, Arc<SessionSlot>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, user: &UserId) -> Arc<SessionSlot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(user.clone()).or_default().clone()
    }

    fn existing_slot(&self, user: &UserId) -> Option<Arc<SessionSlot>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(user).cloned()
    }

    /// Wait until the user's slot is free and take it.
    pub async fn acquire_slot(&self, user: &UserId) -> SlotGuard {
        let gate = self.slot(user).gate.clone();
        let guard = gate.lock_owned().await;
        debug!(user = %user, "Slot acquired");
        SlotGuard {
            user: user.clone(),
            _gate: guard,
        }
    }

    /// Take the user's slot only if nobody holds it.
    pub fn try_acquire_slot(&self, user: &UserId) -> Option<SlotGuard> {
        let gate = self.slot(user).gate.clone();
        gate.try_lock_owned().ok().map(|guard| SlotGuard {
            user: user.clone(),
            _gate: guard,
        })
    }

    /// Register the handle of the generation now running for `user`.
    ///
    /// Callers must hold the user's [`SlotGuard`]. A handle left behind by a
    /// previous task is cancelled and replaced.
    pub fn set_active_task(&self, user: &UserId, handle: TaskHandle) {
        let slot = self.slot(user);
        let previous = slot.active().replace(handle);
        if let Some(previous) = previous {
            warn!(
                user = %user,
                task = previous.id,
                "Replacing a task handle that was never cleared"
            );
            previous.cancel();
        }
    }

    /// Register a handle and return a guard that deregisters it on drop.
    pub fn register_task(&self, user: &UserId, handle: TaskHandle) -> ActiveTaskGuard<'_> {
        self.set_active_task(user, handle.clone());
        ActiveTaskGuard {
            registry: self,
            user: user.clone(),
            handle,
        }
    }

    /// Remove the user's task handle, if any. Idempotent.
    pub fn clear_active_task(&self, user: &UserId) -> Option<TaskHandle> {
        self.existing_slot(user).and_then(|slot| slot.active().take())
    }

    /// Remove the user's task handle only if it is the one with `task_id`.
    pub fn clear_active_task_if(&self, user: &UserId, task_id: u64) -> bool {
        let Some(slot) = self.existing_slot(user) else {
            return false;
        };
        let mut active = slot.active();
        if active.as_ref().is_some_and(|h| h.id == task_id) {
            *active = None;
            true
        } else {
            false
        }
    }

    /// Signal cancellation to the user's running generation.
    ///
    /// Returns `false` when nothing is running; that is not an error.
    pub fn request_cancel(&self, user: &UserId) -> bool {
        let Some(slot) = self.existing_slot(user) else {
            return false;
        };
        match slot.active().as_ref() {
            Some(handle) => {
                debug!(user = %user, task = handle.id, "Cancellation requested");
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a generation is registered for the user.
    pub fn is_busy(&self, user: &UserId) -> bool {
        self.existing_slot(user)
            .is_some_and(|slot| slot.active().is_some())
    }

    /// Number of users with a registered generation.
    pub fn active_tasks(&self) -> usize {
        let slots: Vec<_> = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.values().cloned().collect()
        };
        slots.iter().filter(|slot| slot.active().is_some()).count()
    }
}
