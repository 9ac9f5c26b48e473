//! A lazily computed value whose in-flight computation is shared

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use crate::error::Result;

type SharedResult<V> = Shared<BoxFuture<'static, Result<V>>>;

enum Slot<V> {
    NotStarted,
    Pending(SharedResult<V>),
    Done(V),
}

/// Observable phase of a [`Memo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    NotStarted,
    Pending,
    Done,
}

/// Memoized async value.
///
/// The first caller of [`get_or_try_init`](Memo::get_or_try_init) starts the
/// computation; callers arriving while it runs await the same future. A
/// failure resets the memo so the next caller starts over. Resetting while a
/// computation is pending detaches it: its waiters still get its result but
/// it is not stored. When the last waiter goes away before the computation
/// finishes, the computation is dropped and the memo starts over, so a
/// future that holds the memo's owner cannot keep it alive.
pub struct Memo<V> {
    slot: Mutex<Slot<V>>,
}

impl<V> Default for Memo<V> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(Slot::NotStarted),
        }
    }
}

impl<V> fmt::Debug for Memo<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo").field("state", &self.state()).finish()
    }
}

impl<V> Memo<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot<V>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> MemoState {
        match &*self.lock() {
            Slot::NotStarted => MemoState::NotStarted,
            Slot::Pending(_) => MemoState::Pending,
            Slot::Done(_) => MemoState::Done,
        }
    }

    /// Forget the value and detach any pending computation.
    pub fn reset(&self) {
        *self.lock() = Slot::NotStarted;
    }

    /// Store `value` directly, detaching any pending computation.
    pub fn set(&self, value: V) {
        *self.lock() = Slot::Done(value);
    }
}

impl<V> Memo<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn get(&self) -> Option<V> {
        match &*self.lock() {
            Slot::Done(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Return the memoized value, computing it with `init` if needed.
    ///
    /// `init` runs with the memo locked and must only build the future, not
    /// touch this memo.
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let pending = {
            let mut slot = self.lock();
            match &*slot {
                Slot::Done(value) => return Ok(value.clone()),
                Slot::Pending(pending) => pending.clone(),
                Slot::NotStarted => {
                    let pending = init().boxed().shared();
                    *slot = Slot::Pending(pending.clone());
                    pending
                }
            }
        };

        let mut waiter = Waiter {
            memo: self,
            pending,
            finished: false,
        };
        let result = (&mut waiter.pending).await;
        waiter.finished = true;

        let mut slot = self.lock();
        let is_current =
            matches!(&*slot, Slot::Pending(current) if current.ptr_eq(&waiter.pending));
        if is_current {
            *slot = match &result {
                Ok(value) => Slot::Done(value.clone()),
                Err(_) => Slot::NotStarted,
            };
        }
        result
    }
}

impl<V> Memo<V> {
    /// Called when a waiter is dropped before `pending` resolved. If nobody
    /// else is waiting the computation is detached and dropped, since it may
    /// own the value that owns this memo.
    fn abandon(&self, pending: &SharedResult<V>) {
        let mut slot = self.lock();
        // One handle in the slot, one held by the departing waiter.
        let orphaned = matches!(
            &*slot,
            Slot::Pending(current)
                if current.ptr_eq(pending) && current.strong_count() == Some(2)
        );
        if !orphaned {
            return;
        }
        let detached = std::mem::replace(&mut *slot, Slot::NotStarted);
        drop(slot);
        drop(detached);
    }
}

/// A caller's handle on a pending computation.
struct Waiter<'a, V> {
    memo: &'a Memo<V>,
    pending: SharedResult<V>,
    finished: bool,
}

impl<V> Drop for Waiter<'_, V> {
    fn drop(&mut self) {
        if !self.finished {
            self.memo.abandon(&self.pending);
        }
    }
}
