//! # blockpool
//!
//! Deterministic fixed-size block memory pool for embedded and
//! safety-relevant systems that forbid dynamic memory.
//!
//! The pool lives entirely inside two caller-owned byte regions: a state
//! region holding the control block and a pool region holding an
//! allocation bitmap followed by the blocks. Allocation and free are
//! O(1) over an intrusive LIFO free list; a one-bit-per-block bitmap
//! detects double frees without scanning. The crate performs no heap
//! allocation anywhere.
//!
//! ## Quick start
//!
//! ```rust
//! use blockpool::{Pool, STATE_SIZE};
//!
//! #[repr(C, align(16))]
//! struct State([u8; STATE_SIZE]);
//!
//! #[repr(C, align(8))]
//! struct Storage([u8; 4096]);
//!
//! let mut state = State([0; STATE_SIZE]);
//! let mut storage = Storage([0; 4096]);
//!
//! // SAFETY: both buffers outlive the pool and are only accessed
//! // through it.
//! let pool = unsafe {
//!     Pool::init(
//!         state.0.as_mut_ptr(),
//!         STATE_SIZE,
//!         storage.0.as_mut_ptr(),
//!         4096,
//!         64, // block size
//!         8,  // alignment
//!     )
//! }?;
//!
//! let block = pool.alloc()?;
//! pool.free(block.as_ptr())?;
//! # Ok::<(), blockpool::PoolError>(())
//! ```
//!
//! ## Concurrency
//!
//! The core contains no atomics and no locks. Sharing a pool across
//! threads (or with interrupt handlers) requires installing a caller
//! supplied lock/unlock pair via [`Pool::set_sync`]; the pool then wraps
//! every state-mutating operation and the stats snapshot in that
//! critical section.
//!
//! ## Features
//!
//! - `std` (default): `std::error::Error` for [`PoolError`].
//! - `logging`: `log`-facade debug events on init and reset. Operation
//!   paths never log; errors are only ever reported through return
//!   values.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod layout;
pub mod pool;
pub mod sync;
pub mod utils;

pub use crate::error::{strerror, PoolError, PoolResult};
pub use crate::layout::PoolLayout;
pub use crate::pool::{Pool, PoolConfig, PoolStats, STATE_SIZE};
pub use crate::sync::{LockFn, UnlockFn};

/// Convenient re-exports of the whole public surface.
pub mod prelude {
    pub use crate::error::{strerror, PoolError, PoolResult};
    pub use crate::layout::PoolLayout;
    pub use crate::pool::{Pool, PoolConfig, PoolStats, STATE_SIZE};
    pub use crate::sync::{LockFn, UnlockFn};
}
