//! Pool error taxonomy.
//!
//! Every operation reports failure through [`PoolError`]; success is the
//! `Ok` arm of [`PoolResult`]. The discriminants are stable and match the
//! numeric codes used by integrations that exchange raw error values, so
//! the enum is `#[repr(u32)]` and must never be reordered.

use core::fmt;

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors reported by pool operations.
///
/// The numeric values are part of the stable surface; `0` is reserved for
/// success and is only observable through [`strerror`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PoolError {
    /// A required pointer argument was null.
    NullPointer = 1,
    /// A size argument was invalid or no pool geometry fits the region.
    InvalidSize = 2,
    /// All blocks are currently allocated.
    OutOfMemory = 3,
    /// The pointer is outside the blocks region or not on a block boundary.
    InvalidBlock = 4,
    /// The alignment is not a power of two, or a region is misaligned.
    Alignment = 5,
    /// The block's bitmap bit is already clear.
    ///
    /// Covers both a genuine double free and a block-boundary pointer that
    /// was never handed out by the pool.
    DoubleFree = 6,
    /// The pool handle does not refer to an initialized control block.
    NotInitialized = 7,
}

impl PoolError {
    /// Returns a stable, human-readable description of the error.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PoolError::NullPointer => "Null pointer",
            PoolError::InvalidSize => "Invalid size",
            PoolError::OutOfMemory => "Out of memory",
            PoolError::InvalidBlock => "Invalid block",
            PoolError::Alignment => "Alignment error",
            PoolError::DoubleFree => "Double free detected",
            PoolError::NotInitialized => "Pool not initialized",
        }
    }

    /// Returns the stable numeric code for this error.
    #[inline]
    pub const fn code(&self) -> u32 {
        *self as u32
    }

    /// Maps a numeric code back to an error, if the code names one.
    ///
    /// `0` is the success code and does not name an error.
    pub const fn from_code(code: u32) -> Option<PoolError> {
        match code {
            1 => Some(PoolError::NullPointer),
            2 => Some(PoolError::InvalidSize),
            3 => Some(PoolError::OutOfMemory),
            4 => Some(PoolError::InvalidBlock),
            5 => Some(PoolError::Alignment),
            6 => Some(PoolError::DoubleFree),
            7 => Some(PoolError::NotInitialized),
            _ => None,
        }
    }
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PoolError {}

/// Describes a numeric status code, including success and unknown values.
///
/// Returns `"Success"` for `0`, the matching [`PoolError::as_str`] string
/// for known error codes, and a generic non-empty string otherwise.
pub const fn strerror(code: u32) -> &'static str {
    if code == 0 {
        return "Success";
    }
    match PoolError::from_code(code) {
        Some(err) => err.as_str(),
        None => "Unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(PoolError::NullPointer.code(), 1);
        assert_eq!(PoolError::InvalidSize.code(), 2);
        assert_eq!(PoolError::OutOfMemory.code(), 3);
        assert_eq!(PoolError::InvalidBlock.code(), 4);
        assert_eq!(PoolError::Alignment.code(), 5);
        assert_eq!(PoolError::DoubleFree.code(), 6);
        assert_eq!(PoolError::NotInitialized.code(), 7);
    }

    #[test]
    fn from_code_round_trips() {
        for code in 1..=7 {
            let err = PoolError::from_code(code).expect("known code");
            assert_eq!(err.code(), code);
        }
        assert_eq!(PoolError::from_code(0), None);
        assert_eq!(PoolError::from_code(8), None);
    }

    #[test]
    fn strerror_is_total() {
        assert_eq!(strerror(0), "Success");
        assert_eq!(strerror(6), "Double free detected");
        assert_eq!(strerror(999), "Unknown error");
        for code in 0..=10 {
            assert!(!strerror(code).is_empty());
        }
    }

    #[test]
    fn display_matches_as_str() {
        let err = PoolError::OutOfMemory;
        assert_eq!(format!("{err}"), err.as_str());
    }
}
