//! Playlist and studio locks.
//!
//! One exclusive lock per [`LockKey`]. Waiters queue by [`LockPriority`]
//! and then by arrival, so an operator take queued behind a maintenance
//! sweep is served before ingest or cleanup work that arrived earlier.
//! A job may re-acquire a lock it already holds; the lock is released
//! when its outermost [`LockGuard`] drops, including on error paths and
//! panics. A wait that is cancelled gives up its queue slot, and hands on a
//! lock that was passed to it before it could return a guard.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use onair_core::error::{CoreError, CoreResult};
use onair_core::ids::{PlaylistId, StudioId};
use tokio::sync::oneshot;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockKey {
    /// Coarse lock for cross-playlist work: playlist creation, rundown moves,
    /// activation exclusivity.
    Studio(StudioId),
    Playlist(PlaylistId),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Studio(id) => write!(f, "studio:{id}"),
            Self::Playlist(id) => write!(f, "playlist:{id}"),
        }
    }
}

/// Queue priority. Higher variants are served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockPriority {
    Maintenance,
    Ingest,
    UserPlayout,
    Callback,
}

/// Identity of one job, used for re-entrant acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Holder {
    owner: JobId,
    depth: usize,
}

#[derive(Debug)]
struct Waiter {
    owner: JobId,
    priority: LockPriority,
    seq: u64,
    wake: oneshot::Sender<()>,
}

#[derive(Debug, Default)]
struct LockEntry {
    holder: Option<Holder>,
    waiters: Vec<Waiter>,
}

impl LockEntry {
    /// Pass the lock to the best live waiter, if any.
    fn hand_off(&mut self) {
        while !self.waiters.is_empty() {
            let best = self
                .waiters
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| {
                    a.priority
                        .cmp(&b.priority)
                        .then_with(|| b.seq.cmp(&a.seq))
                })
                .map(|(index, _)| index)
                .unwrap_or(0);
            let waiter = self.waiters.swap_remove(best);
            if waiter.wake.send(()).is_ok() {
                self.holder = Some(Holder {
                    owner: waiter.owner,
                    depth: 1,
                });
                return;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// LockManager
// ---------------------------------------------------------------------------

/// In-process lock table shared by every job of one engine.
#[derive(Debug, Default)]
pub struct LockManager {
    entries: Mutex<HashMap<LockKey, LockEntry>>,
    seq: AtomicU64,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<LockKey, LockEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire `key` for `owner`, waiting at most `timeout`.
    pub async fn acquire(
        self: &Arc<Self>,
        key: LockKey,
        priority: LockPriority,
        owner: JobId,
        timeout: Duration,
    ) -> CoreResult<LockGuard> {
        let guard = || LockGuard {
            manager: Arc::clone(self),
            key: key.clone(),
            owner,
        };

        let (receiver, seq) = {
            let mut entries = self.entries();
            let entry = entries.entry(key.clone()).or_default();
            match entry.holder.as_mut() {
                None => {
                    entry.holder = Some(Holder { owner, depth: 1 });
                    return Ok(guard());
                }
                Some(holder) if holder.owner == owner => {
                    holder.depth += 1;
                    return Ok(guard());
                }
                Some(_) => {
                    let (wake, receiver) = oneshot::channel();
                    let seq = self.seq.fetch_add(1, Ordering::Relaxed);
                    entry.waiters.push(Waiter {
                        owner,
                        priority,
                        seq,
                        wake,
                    });
                    (receiver, seq)
                }
            }
        };

        // Dropped with this future: a cancelled wait must not keep its
        // queue slot or a lock handed to it in the meantime.
        let mut pending = PendingWait {
            manager: self.as_ref(),
            key: &key,
            owner,
            seq,
            claimed: false,
        };

        let started = Instant::now();
        tracing::debug!(lock = %key, job_id = %owner, ?priority, "Waiting for lock");

        let outcome = tokio::time::timeout(timeout, receiver).await;
        // A hand-off may have landed between the timer firing and now.
        if matches!(outcome, Ok(Ok(()))) || pending.was_handed_over() {
            pending.claimed = true;
            return Ok(guard());
        }
        drop(pending);
        if outcome.is_ok() {
            return Err(CoreError::Internal(format!("Lock {key} waiter was dropped")));
        }
        tracing::warn!(lock = %key, job_id = %owner, "Lock wait timed out");
        Err(lock_timeout(&key, started))
    }

    pub fn is_locked(&self, key: &LockKey) -> bool {
        self.entries()
            .get(key)
            .is_some_and(|entry| entry.holder.is_some())
    }

    fn release(&self, key: &LockKey, owner: JobId) {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        match entry.holder.as_mut() {
            Some(holder) if holder.owner == owner => {
                holder.depth -= 1;
                if holder.depth > 0 {
                    return;
                }
                entry.holder = None;
                entry.hand_off();
            }
            _ => return,
        }
        if entry.holder.is_none() && entry.waiters.is_empty() {
            entries.remove(key);
        }
    }
}

/// A queued acquisition that has not produced a [`LockGuard`] yet.
struct PendingWait<'a> {
    manager: &'a LockManager,
    key: &'a LockKey,
    owner: JobId,
    seq: u64,
    claimed: bool,
}

impl PendingWait<'_> {
    fn was_handed_over(&self) -> bool {
        self.manager
            .entries()
            .get(self.key)
            .and_then(|entry| entry.holder.as_ref())
            .is_some_and(|holder| holder.owner == self.owner)
    }
}

impl Drop for PendingWait<'_> {
    fn drop(&mut self) {
        if self.claimed {
            return;
        }
        let handed_over = {
            let mut entries = self.manager.entries();
            let Some(entry) = entries.get_mut(self.key) else {
                return;
            };
            entry.waiters.retain(|w| w.seq != self.seq);
            entry.holder.as_ref().is_some_and(|h| h.owner == self.owner)
        };
        if handed_over {
            tracing::debug!(lock = %self.key, job_id = %self.owner, "Releasing lock of abandoned wait");
            self.manager.release(self.key, self.owner);
        }
    }
}

fn lock_timeout(key: &LockKey, started: Instant) -> CoreError {
    CoreError::LockTimeout {
        resource: key.to_string(),
        waited_ms: started.elapsed().as_millis() as u64,
    }
}

/// Holds one level of a lock. Dropping it releases that level.
#[derive(Debug)]
pub struct LockGuard {
    manager: Arc<LockManager>,
    key: LockKey,
    owner: JobId,
}

impl LockGuard {
    pub fn key(&self) -> &LockKey {
        &self.key
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.manager.release(&self.key, self.owner);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
