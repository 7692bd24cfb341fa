//! Caller-supplied critical-section hook.
//!
//! The pool contains no atomics and no synchronization of its own. When a
//! lock/unlock pair is installed via [`Pool::set_sync`], every
//! state-mutating region (and the stats snapshot) runs between `lock(ctx)`
//! and `unlock(ctx)`. What the pair actually does is the integrator's
//! choice: a mutex, a spinlock, or an interrupt disable/restore pair on
//! bare-metal targets. If the pool can be touched from interrupt context,
//! the hook must implement an interrupt-safe critical section.
//!
//! [`Pool::set_sync`]: crate::pool::Pool::set_sync

/// Callback invoked before entering a state-mutating region.
pub type LockFn = fn(ctx: *mut ());

/// Callback invoked after leaving a state-mutating region.
pub type UnlockFn = fn(ctx: *mut ());

/// Installed hook state, stored inside the control block.
#[derive(Clone, Copy)]
pub(crate) struct HookRecord {
    pub(crate) lock: Option<LockFn>,
    pub(crate) unlock: Option<UnlockFn>,
    pub(crate) ctx: *mut (),
    /// True only when both callbacks are present.
    pub(crate) enabled: bool,
}

impl HookRecord {
    /// A record with no callbacks installed.
    pub(crate) const fn cleared() -> Self {
        Self {
            lock: None,
            unlock: None,
            ctx: core::ptr::null_mut(),
            enabled: false,
        }
    }

    /// Enters the critical section, returning a guard that leaves it on
    /// drop. Unlock therefore runs on every exit path, early returns
    /// included.
    #[must_use]
    pub(crate) fn enter(&self) -> CriticalSection {
        if self.enabled {
            if let Some(lock) = self.lock {
                lock(self.ctx);
            }
            CriticalSection {
                unlock: self.unlock,
                ctx: self.ctx,
            }
        } else {
            CriticalSection {
                unlock: None,
                ctx: core::ptr::null_mut(),
            }
        }
    }
}

/// Guard for a hook-protected region.
pub(crate) struct CriticalSection {
    unlock: Option<UnlockFn>,
    ctx: *mut (),
}

impl Drop for CriticalSection {
    fn drop(&mut self) {
        if let Some(unlock) = self.unlock {
            unlock(self.ctx);
        }
    }
}
