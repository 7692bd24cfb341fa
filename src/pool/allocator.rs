//! The pool handle and its alloc/free/reset state machine.

use core::mem;
use core::ptr::{self, NonNull};

use crate::error::{PoolError, PoolResult};
use crate::layout::PoolLayout;
use crate::pool::config::PoolConfig;
use crate::pool::control::{FreeNode, PoolControl};
use crate::pool::stats::PoolStats;
use crate::sync::{HookRecord, LockFn, UnlockFn};
use crate::utils::is_aligned;

#[cfg(feature = "logging")]
use log::debug;

/// Handle to a pool living in caller-owned storage.
///
/// A `Pool` is a thin pointer to the control block that [`Pool::init`]
/// wrote into the caller's state region. Handles are `Copy`; every copy
/// refers to the same pool.
///
/// # Concurrency
///
/// The pool contains no internal synchronization. Without an installed
/// hook it must be used from a single thread; with a mutual-exclusion
/// hook installed via [`Pool::set_sync`] before the pool is shared, the
/// mutating operations and the stats snapshot are serialized at the
/// caller's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pool {
    ctrl: NonNull<PoolControl>,
}

// SAFETY: Pool is a pointer to caller-owned storage.
// - init's contract gives the pool exclusive ownership of both regions
// - cross-thread mutation requires an installed hook, which serializes
//   every mutating operation at the caller's lock
// - without a hook the single-threaded contract applies
unsafe impl Send for Pool {}

// SAFETY: shared references only reach the control block through the
// operations above; the hook contract serializes the mutating ones.
unsafe impl Sync for Pool {}

impl Pool {
    /// Bytes required for the control block in the state region.
    ///
    /// Always at most [`STATE_SIZE`](crate::STATE_SIZE), which a
    /// compile-time assertion enforces.
    #[inline]
    pub const fn state_size() -> usize {
        mem::size_of::<PoolControl>()
    }

    /// Initializes a pool over two caller-owned regions with the default
    /// configuration.
    ///
    /// See [`Pool::init_with_config`] for the full contract.
    ///
    /// # Safety
    ///
    /// Same as [`Pool::init_with_config`].
    pub unsafe fn init(
        state: *mut u8,
        state_len: usize,
        region: *mut u8,
        region_len: usize,
        block_size: usize,
        alignment: usize,
    ) -> PoolResult<Pool> {
        // SAFETY: forwarded contract.
        unsafe {
            Self::init_with_config(
                state,
                state_len,
                region,
                region_len,
                block_size,
                alignment,
                PoolConfig::default(),
            )
        }
    }

    /// Initializes a pool over two caller-owned regions.
    ///
    /// Writes a fresh control block into `state`, zeroes the bitmap at
    /// the head of `region`, and threads the free list through the
    /// blocks. Nothing read from either region survives; prior contents
    /// are ignored. The first `total_blocks` allocations return blocks in
    /// descending index order.
    ///
    /// # Errors
    ///
    /// - [`PoolError::NullPointer`] if either region pointer is null.
    /// - [`PoolError::InvalidSize`] if `state_len` is smaller than
    ///   [`Pool::state_size`], a size is zero, `block_size` is smaller
    ///   than a free-list link, or no block fits the region.
    /// - [`PoolError::Alignment`] if `alignment` is not a power of two or
    ///   either region is misaligned (`region` to `alignment`, `state` to
    ///   the control block's own alignment).
    ///
    /// # Safety
    ///
    /// The caller must guarantee, for as long as any handle to this pool
    /// is used:
    ///
    /// - `state` is valid for reads and writes of `state_len` bytes and
    ///   `region` for `region_len` bytes,
    /// - the two regions do not overlap,
    /// - neither region is read or written through any other path, except
    ///   block pointers returned by [`Pool::alloc`] while they remain
    ///   allocated.
    pub unsafe fn init_with_config(
        state: *mut u8,
        state_len: usize,
        region: *mut u8,
        region_len: usize,
        block_size: usize,
        alignment: usize,
        config: PoolConfig,
    ) -> PoolResult<Pool> {
        if state.is_null() || region.is_null() {
            return Err(PoolError::NullPointer);
        }
        if state_len < mem::size_of::<PoolControl>() {
            return Err(PoolError::InvalidSize);
        }
        if !is_aligned(state as usize, mem::align_of::<PoolControl>()) {
            return Err(PoolError::Alignment);
        }
        if region_len == 0 || block_size == 0 {
            return Err(PoolError::InvalidSize);
        }
        if !crate::utils::is_power_of_two(alignment) {
            return Err(PoolError::Alignment);
        }
        if !is_aligned(region as usize, alignment) {
            return Err(PoolError::Alignment);
        }

        let layout = PoolLayout::plan(region_len, block_size, alignment)?;

        let ctrl = state.cast::<PoolControl>();
        let control = PoolControl {
            bitmap: region,
            // SAFETY: blocks_offset + total_blocks * block_size fits in
            // region_len by construction of the layout.
            blocks_start: unsafe { region.add(layout.blocks_offset) },
            free_list: ptr::null_mut(),
            bitmap_bytes: layout.bitmap_bytes as u32,
            block_size: layout.block_size as u32,
            total_blocks: layout.total_blocks as u32,
            free_blocks: layout.total_blocks as u32,
            alignment: alignment as u32,
            stats: PoolStats {
                total_blocks: layout.total_blocks as u32,
                free_blocks: layout.total_blocks as u32,
                block_size: layout.block_size as u32,
                ..PoolStats::default()
            },
            config,
            hooks: HookRecord::cleared(),
            initialized: false,
        };
        // SAFETY: state is non-null, sufficiently large, and aligned for
        // PoolControl; all checked above.
        unsafe { ptr::write(ctrl, control) };

        // SAFETY: just written, non-null.
        let control = unsafe { &mut *ctrl };
        control.clear_bitmap();
        control.thread_free_list();
        // Set last; every other operation keys off this flag.
        control.initialized = true;

        #[cfg(feature = "logging")]
        debug!(
            "pool initialized: {} blocks of {} bytes, bitmap {} bytes, blocks at offset {}",
            layout.total_blocks, layout.block_size, layout.bitmap_bytes, layout.blocks_offset
        );

        // SAFETY: ctrl was derived from the non-null state pointer.
        Ok(Pool {
            ctrl: unsafe { NonNull::new_unchecked(ctrl) },
        })
    }

    /// Allocates one block.
    ///
    /// Pops the LIFO free-list head, marks its bitmap bit, and updates
    /// the stats. O(1). Allocating a block that was just freed returns
    /// that same block unless other allocations intervened.
    ///
    /// # Errors
    ///
    /// - [`PoolError::NotInitialized`] on a stale handle.
    /// - [`PoolError::OutOfMemory`] when every block is handed out; the
    ///   pool is left unchanged.
    pub fn alloc(&self) -> PoolResult<NonNull<u8>> {
        // SAFETY: the handle points at the control block written by init;
        // the init contract keeps it readable.
        if !unsafe { (*self.ctrl.as_ptr()).initialized } {
            return Err(PoolError::NotInitialized);
        }
        // SAFETY: exclusive access per the concurrency contract; the hook
        // serializes mutating operations when the pool is shared.
        let ctrl = unsafe { &mut *self.ctrl.as_ptr() };

        let _cs = ctrl.hooks.enter();

        if ctrl.free_list.is_null() {
            return Err(PoolError::OutOfMemory);
        }
        debug_assert!(ctrl.free_blocks > 0);

        let node = ctrl.free_list;
        // SAFETY: node is a non-null free-list entry, so it points at a
        // free block whose first word holds the next link; the read is
        // unaligned because blocks only carry the caller's alignment.
        ctrl.free_list = unsafe { node.read_unaligned().next };
        ctrl.free_blocks -= 1;

        ctrl.stats.alloc_count = ctrl.stats.alloc_count.wrapping_add(1);
        ctrl.stats.used_blocks = ctrl.total_blocks - ctrl.free_blocks;
        ctrl.stats.free_blocks = ctrl.free_blocks;
        if ctrl.stats.used_blocks > ctrl.stats.peak_usage {
            ctrl.stats.peak_usage = ctrl.stats.used_blocks;
        }

        let block = node.cast::<u8>();
        let index = ctrl.block_index(block);
        ctrl.set_bit(index);

        if let Some(pattern) = ctrl.config.alloc_pattern {
            // SAFETY: block spans block_size bytes inside the pool region
            // and is now exclusively the caller's.
            unsafe { ptr::write_bytes(block, pattern, ctrl.block_size as usize) };
        }

        // SAFETY: node came off the free list non-null.
        Ok(unsafe { NonNull::new_unchecked(block) })
    }

    /// Returns a block to the pool.
    ///
    /// Validates the pointer before entering the critical section: it
    /// must lie inside the blocks region and sit on a block boundary.
    /// Inside the critical section the bitmap bit decides between a live
    /// block and a double free; nothing is mutated on any error path.
    ///
    /// # Errors
    ///
    /// - [`PoolError::NullPointer`] for a null `block`.
    /// - [`PoolError::NotInitialized`] on a stale handle.
    /// - [`PoolError::InvalidBlock`] for a pointer outside the blocks
    ///   region or off a block boundary.
    /// - [`PoolError::DoubleFree`] when the block is already free, which
    ///   also covers boundary pointers that were never allocated.
    pub fn free(&self, block: *mut u8) -> PoolResult<()> {
        if block.is_null() {
            return Err(PoolError::NullPointer);
        }
        // SAFETY: as in alloc.
        if !unsafe { (*self.ctrl.as_ptr()).initialized } {
            return Err(PoolError::NotInitialized);
        }
        // SAFETY: as in alloc.
        let ctrl = unsafe { &mut *self.ctrl.as_ptr() };

        let addr = block as usize;
        let start = ctrl.blocks_start as usize;
        if addr < start || addr >= ctrl.blocks_end() {
            return Err(PoolError::InvalidBlock);
        }
        // Every block boundary is aligned, so a misaligned pointer is
        // never a boundary.
        if !is_aligned(addr, ctrl.alignment as usize) {
            return Err(PoolError::InvalidBlock);
        }
        if (addr - start) % ctrl.block_size as usize != 0 {
            return Err(PoolError::InvalidBlock);
        }

        let _cs = ctrl.hooks.enter();

        let index = ctrl.block_index(block);
        if !ctrl.bit_is_set(index) {
            return Err(PoolError::DoubleFree);
        }

        // Reconstruct the block address from the validated index so every
        // write below goes through the pool's own region pointer.
        // SAFETY: index < total_blocks, so the offset stays in the region.
        let reclaimed = unsafe {
            ctrl.blocks_start
                .add(index as usize * ctrl.block_size as usize)
        };

        if let Some(pattern) = ctrl.config.dealloc_pattern {
            // SAFETY: the block is in range, block-aligned, and currently
            // allocated; ownership returns to the pool here.
            unsafe { ptr::write_bytes(reclaimed, pattern, ctrl.block_size as usize) };
        }

        let node = reclaimed.cast::<FreeNode>();
        // SAFETY: the block is at least one pointer wide; its first word
        // becomes the free-list link, written unaligned because blocks
        // only carry the caller's alignment.
        unsafe { node.write_unaligned(FreeNode { next: ctrl.free_list }) };
        ctrl.free_list = node;
        if ctrl.free_blocks < ctrl.total_blocks {
            ctrl.free_blocks += 1;
        }

        ctrl.stats.free_count = ctrl.stats.free_count.wrapping_add(1);
        ctrl.stats.used_blocks = ctrl.total_blocks - ctrl.free_blocks;
        ctrl.stats.free_blocks = ctrl.free_blocks;

        ctrl.clear_bit(index);
        Ok(())
    }

    /// Returns every block to the pool and zeroes the counters.
    ///
    /// The bitmap is cleared and the free list is rebuilt in the same
    /// canonical order init uses, so the allocation sequence after a
    /// reset matches the one after init. Structural fields
    /// (`total_blocks`, `block_size`) survive; every outstanding block
    /// pointer is invalidated and a later free of one reports
    /// [`PoolError::DoubleFree`].
    pub fn reset(&self) -> PoolResult<()> {
        // SAFETY: as in alloc.
        if !unsafe { (*self.ctrl.as_ptr()).initialized } {
            return Err(PoolError::NotInitialized);
        }
        // SAFETY: as in alloc.
        let ctrl = unsafe { &mut *self.ctrl.as_ptr() };

        let _cs = ctrl.hooks.enter();

        ctrl.clear_bitmap();
        ctrl.thread_free_list();
        ctrl.stats = PoolStats {
            total_blocks: ctrl.total_blocks,
            free_blocks: ctrl.total_blocks,
            block_size: ctrl.block_size,
            ..PoolStats::default()
        };

        #[cfg(feature = "logging")]
        debug!("pool reset: {} blocks reclaimed", ctrl.total_blocks);

        Ok(())
    }

    /// Whether `ptr` points into this pool's blocks region.
    ///
    /// A pure range test: it ignores block boundaries and the bitmap, so
    /// it does not distinguish allocated from free. Null pointers and
    /// stale handles yield `false`.
    pub fn contains(&self, ptr: *const u8) -> bool {
        if ptr.is_null() {
            return false;
        }
        let ctrl = self.ctrl.as_ptr();
        // SAFETY: reads only; the handle points at the control block
        // written by init.
        unsafe {
            if !(*ctrl).initialized {
                return false;
            }
            let start = (*ctrl).blocks_start as usize;
            let end = start + (*ctrl).total_blocks as usize * (*ctrl).block_size as usize;
            let addr = ptr as usize;
            addr >= start && addr < end
        }
    }

    /// Snapshot of the usage counters.
    ///
    /// Taken under the critical section when a hook is installed, so the
    /// record is internally consistent even while other threads allocate.
    pub fn stats(&self) -> PoolResult<PoolStats> {
        // SAFETY: as in alloc.
        if !unsafe { (*self.ctrl.as_ptr()).initialized } {
            return Err(PoolError::NotInitialized);
        }
        // SAFETY: as in alloc.
        let ctrl = unsafe { &mut *self.ctrl.as_ptr() };

        let _cs = ctrl.hooks.enter();
        Ok(ctrl.stats)
    }

    /// Installs or clears the critical-section hook.
    ///
    /// Both callbacks must be present for synchronization to engage; if
    /// either is `None`, the hook record is cleared and the pool runs
    /// unsynchronized. Call this after init and before the pool is
    /// observed by any other thread. Allocations may already have
    /// happened, but reinstalling while concurrent access is in progress
    /// is not supported.
    pub fn set_sync(
        &self,
        lock: Option<LockFn>,
        unlock: Option<UnlockFn>,
        ctx: *mut (),
    ) -> PoolResult<()> {
        // SAFETY: as in alloc.
        if !unsafe { (*self.ctrl.as_ptr()).initialized } {
            return Err(PoolError::NotInitialized);
        }
        // SAFETY: set_sync runs before the pool is shared, per its
        // contract, so exclusive access holds.
        let ctrl = unsafe { &mut *self.ctrl.as_ptr() };

        ctrl.hooks = match (lock, unlock) {
            (Some(lock), Some(unlock)) => HookRecord {
                lock: Some(lock),
                unlock: Some(unlock),
                ctx,
                enabled: true,
            },
            _ => HookRecord::cleared(),
        };
        Ok(())
    }
}
