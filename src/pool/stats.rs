//! Pool statistics record.

/// Snapshot of pool usage counters.
///
/// Returned by value from [`Pool::stats`]; the pool's internal counters
/// are never exposed by reference. All fields are 32-bit so the record
/// has the same shape on every target.
///
/// [`Pool::stats`]: crate::pool::Pool::stats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total number of blocks in the pool.
    pub total_blocks: u32,
    /// Blocks currently handed out.
    pub used_blocks: u32,
    /// Blocks currently on the free list.
    pub free_blocks: u32,
    /// High-water mark of simultaneously allocated blocks since the last
    /// init or reset.
    pub peak_usage: u32,
    /// Successful allocations since the last init or reset.
    pub alloc_count: u32,
    /// Successful frees since the last init or reset.
    pub free_count: u32,
    /// Block stride in bytes, after alignment rounding.
    pub block_size: u32,
}
