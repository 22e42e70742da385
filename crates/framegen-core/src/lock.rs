//! Owner-tracked, re-entrant-by-token exclusion between the submission and present phases.

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

/// Logical phase holding the swapchain lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Owner {
    Submission = 1,
    Present = 2,
}

impl Owner {
    #[inline]
    pub const fn token(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LockError {
    #[error("release by {caller:?} rejected, lock is not held")]
    NotHeld { caller: Owner },

    #[error("release by {caller:?} rejected, lock is held by {holder:?}")]
    NotOwner { caller: Owner, holder: Owner },
}

#[derive(Debug, Default)]
struct LockState {
    owner: Option<Owner>,
    depth: u32,
}

/// Mutual exclusion keyed by [`Owner`] rather than by thread.
///
/// Acquiring with the token that already holds the lock re-enters without blocking;
/// a different token waits until the holder fully releases. Release is only accepted
/// from the recorded owner.
#[derive(Debug, Default)]
pub struct OwnerLock {
    state: Mutex<LockState>,
    released: Condvar,
}

impl OwnerLock {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, owner: Owner) {
        let mut st = self.state.lock();
        loop {
            match st.owner {
                None => {
                    st.owner = Some(owner);
                    st.depth = 1;
                    return;
                }
                Some(holder) if holder == owner => {
                    st.depth += 1;
                    return;
                }
                Some(_) => self.released.wait(&mut st),
            }
        }
    }

    pub fn try_acquire(&self, owner: Owner) -> bool {
        let mut st = self.state.lock();
        match st.owner {
            None => {
                st.owner = Some(owner);
                st.depth = 1;
                true
            }
            Some(holder) if holder == owner => {
                st.depth += 1;
                true
            }
            Some(_) => false,
        }
    }

    pub fn release(&self, owner: Owner) -> Result<(), LockError> {
        let mut st = self.state.lock();
        match st.owner {
            None => Err(LockError::NotHeld { caller: owner }),
            Some(holder) if holder != owner => Err(LockError::NotOwner {
                caller: owner,
                holder,
            }),
            Some(_) => {
                st.depth -= 1;
                if st.depth == 0 {
                    st.owner = None;
                    drop(st);
                    self.released.notify_all();
                }
                Ok(())
            }
        }
    }

    /// Blocks until `owner` holds the lock and returns a guard releasing one level on drop.
    pub fn lock(&self, owner: Owner) -> OwnerGuard<'_> {
        self.acquire(owner);
        OwnerGuard { lock: self, owner }
    }

    /// Non-blocking [`lock`](Self::lock).
    pub fn try_lock(&self, owner: Owner) -> Option<OwnerGuard<'_>> {
        self.try_acquire(owner).then(|| OwnerGuard { lock: self, owner })
    }

    #[inline]
    pub fn owner(&self) -> Option<Owner> {
        self.state.lock().owner
    }

    /// Current holder as the numeric token, `0` when unowned.
    #[inline]
    pub fn owner_token(&self) -> u32 {
        self.owner().map_or(0, Owner::token)
    }
}

#[must_use = "the lock is released when the guard is dropped"]
#[derive(Debug)]
pub struct OwnerGuard<'a> {
    lock: &'a OwnerLock,
    owner: Owner,
}

impl OwnerGuard<'_> {
    #[inline]
    pub fn owner(&self) -> Owner {
        self.owner
    }
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.release(self.owner) {
            log::error!(target: "framegen", "swapchain lock guard: {e}");
        }
    }
}
