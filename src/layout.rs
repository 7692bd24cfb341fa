//! Pool-region layout planning.
//!
//! The planner turns a region size, a requested block size, and an
//! alignment into concrete pool geometry: how many blocks fit, how large
//! the allocation bitmap is, and where block 0 starts. The bitmap sits at
//! the head of the region with one bit per block; padding after it brings
//! block 0 up to the requested alignment.

use core::mem;

use crate::error::{PoolError, PoolResult};
use crate::utils::{align_up, is_power_of_two, padding_needed};

/// Computed geometry for a pool region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLayout {
    /// Block stride after rounding the requested size up to the alignment.
    pub block_size: usize,
    /// Number of blocks that fit alongside their bitmap.
    pub total_blocks: usize,
    /// Bytes of allocation bitmap at the head of the region.
    pub bitmap_bytes: usize,
    /// Offset of block 0 from the start of the region.
    pub blocks_offset: usize,
}

impl PoolLayout {
    /// Plans the geometry for a region of `region_len` bytes.
    ///
    /// Finds the largest `n >= 1` such that the bitmap for `n` blocks,
    /// the padding that realigns the end of the bitmap, and `n` blocks of
    /// the rounded-up size all fit in the region. The search starts from
    /// the bitmap-less upper bound and descends, so it is monotone and
    /// finishes in at most `region_len / block_size` steps.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidSize`] for a zero region or block size, a
    ///   block size smaller than a free-list link, geometry where no block
    ///   fits, or counts that do not fit in 32 bits.
    /// - [`PoolError::Alignment`] when `alignment` is not a power of two.
    pub fn plan(region_len: usize, block_size: usize, alignment: usize) -> PoolResult<Self> {
        if region_len == 0 || block_size == 0 {
            return Err(PoolError::InvalidSize);
        }
        if !is_power_of_two(alignment) {
            return Err(PoolError::Alignment);
        }
        if block_size < mem::size_of::<*mut u8>() {
            return Err(PoolError::InvalidSize);
        }

        let block_size = align_up(block_size, alignment);
        if block_size > u32::MAX as usize {
            return Err(PoolError::InvalidSize);
        }

        let mut n = region_len / block_size;
        while n > 0 {
            let bitmap_bytes = (n + 7) / 8;
            let blocks_offset = bitmap_bytes + padding_needed(bitmap_bytes, alignment);

            let required = blocks_offset
                .checked_add(n.checked_mul(block_size).unwrap_or(usize::MAX))
                .unwrap_or(usize::MAX);

            if required <= region_len {
                if n > u32::MAX as usize || bitmap_bytes > u32::MAX as usize {
                    return Err(PoolError::InvalidSize);
                }
                return Ok(Self {
                    block_size,
                    total_blocks: n,
                    bitmap_bytes,
                    blocks_offset,
                });
            }
            n -= 1;
        }

        Err(PoolError::InvalidSize)
    }

    /// Total bytes occupied by the bitmap, padding, and all blocks.
    #[inline]
    pub const fn required_bytes(&self) -> usize {
        self.blocks_offset + self.total_blocks * self.block_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_zero_sizes() {
        assert_eq!(
            PoolLayout::plan(0, 64, 8).unwrap_err(),
            PoolError::InvalidSize
        );
        assert_eq!(
            PoolLayout::plan(4096, 0, 8).unwrap_err(),
            PoolError::InvalidSize
        );
    }

    #[test]
    fn rejects_bad_alignment() {
        assert_eq!(
            PoolLayout::plan(4096, 64, 0).unwrap_err(),
            PoolError::Alignment
        );
        assert_eq!(
            PoolLayout::plan(4096, 64, 12).unwrap_err(),
            PoolError::Alignment
        );
    }

    #[test]
    fn rejects_block_smaller_than_link() {
        let too_small = mem::size_of::<*mut u8>() - 1;
        assert_eq!(
            PoolLayout::plan(4096, too_small, 1).unwrap_err(),
            PoolError::InvalidSize
        );
    }

    #[test]
    fn rounds_block_size_up_to_alignment() {
        let layout = PoolLayout::plan(4096, 60, 16).unwrap();
        assert_eq!(layout.block_size, 64);
    }

    #[test]
    fn single_block_region() {
        // One block plus its one-byte bitmap and padding, nothing more.
        let layout = PoolLayout::plan(8 + 64, 64, 8).unwrap();
        assert_eq!(layout.total_blocks, 1);
        assert_eq!(layout.bitmap_bytes, 1);
        assert_eq!(layout.blocks_offset, 8);
    }

    #[test]
    fn region_too_small_for_any_block() {
        assert_eq!(
            PoolLayout::plan(63, 64, 8).unwrap_err(),
            PoolError::InvalidSize
        );
        // The block itself fits but its bitmap does not.
        assert_eq!(
            PoolLayout::plan(64, 64, 8).unwrap_err(),
            PoolError::InvalidSize
        );
    }

    #[test]
    fn unit_alignment_has_no_padding() {
        let layout = PoolLayout::plan(1024, 10, 1).unwrap();
        assert_eq!(layout.blocks_offset, layout.bitmap_bytes);
        assert_eq!(layout.block_size, 10);
    }

    #[test]
    fn bitmap_accounts_for_lost_blocks() {
        // 4096 / 64 = 64 raw blocks, but the bitmap plus padding steals one.
        let layout = PoolLayout::plan(4096, 64, 8).unwrap();
        assert_eq!(layout.total_blocks, 63);
        assert_eq!(layout.bitmap_bytes, 8);
        assert_eq!(layout.blocks_offset, 8);
        assert!(layout.required_bytes() <= 4096);
    }

    proptest! {
        #[test]
        fn planned_geometry_is_consistent(
            region_len in 1usize..16384,
            block_size in 1usize..512,
            align_shift in 0u32..7,
        ) {
            let alignment = 1usize << align_shift;
            if let Ok(layout) = PoolLayout::plan(region_len, block_size, alignment) {
                prop_assert!(layout.total_blocks >= 1);
                prop_assert_eq!(layout.block_size % alignment, 0);
                prop_assert!(layout.block_size >= block_size);
                prop_assert_eq!(layout.bitmap_bytes, (layout.total_blocks + 7) / 8);
                prop_assert_eq!(layout.blocks_offset % alignment, 0);
                prop_assert!(layout.blocks_offset >= layout.bitmap_bytes);
                prop_assert!(layout.required_bytes() <= region_len);
            }
        }

        #[test]
        fn planned_block_count_is_maximal(
            region_len in 1usize..16384,
            block_size in 8usize..256,
            align_shift in 0u32..7,
        ) {
            let alignment = 1usize << align_shift;
            if let Ok(layout) = PoolLayout::plan(region_len, block_size, alignment) {
                let n = layout.total_blocks + 1;
                let bitmap = (n + 7) / 8;
                let offset = bitmap + crate::utils::padding_needed(bitmap, alignment);
                prop_assert!(offset + n * layout.block_size > region_len);
            }
        }
    }
}
