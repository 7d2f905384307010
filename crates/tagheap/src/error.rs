//! Allocator error types.

use std::error::Error;
use std::fmt;

use crate::handle::BlockPtr;

/// Errors returned by allocator operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// No free region is large enough for the request.
    ///
    /// This is ordinary backpressure: release something and retry.
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
        /// Largest free region at the time of the request.
        largest_free: usize,
    },
    /// The supplied buffer cannot hold even a single header and footer.
    InvalidArena {
        /// Length of the supplied buffer.
        size: usize,
        /// Minimum accepted length.
        minimum: usize,
    },
    /// A zero-byte allocation was requested and the config forbids it.
    InvalidSize {
        /// The rejected request.
        requested: usize,
    },
    /// The handle does not identify a live allocation of this arena.
    InvalidPointer {
        /// The rejected handle.
        ptr: BlockPtr,
    },
    /// The handle points into memory that is already free.
    DoubleFree {
        /// The rejected handle.
        ptr: BlockPtr,
    },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory {
                requested,
                largest_free,
            } => {
                write!(
                    f,
                    "out of memory: requested {requested} bytes, largest free region {largest_free} bytes"
                )
            }
            Self::InvalidArena { size, minimum } => {
                write!(
                    f,
                    "arena too small: {size} bytes, need at least {minimum} bytes"
                )
            }
            Self::InvalidSize { requested } => {
                write!(f, "invalid allocation size: {requested} bytes")
            }
            Self::InvalidPointer { ptr } => {
                write!(f, "pointer {ptr} is not a live allocation")
            }
            Self::DoubleFree { ptr } => {
                write!(f, "pointer {ptr} was already released")
            }
        }
    }
}

impl Error for AllocError {}

/// A broken tag invariant found by
/// [`Allocator::check_invariants`](crate::Allocator::check_invariants).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A tag would extend past the end of the buffer.
    OutOfBounds {
        /// Offset of the tag that does not fit.
        offset: usize,
    },
    /// Header and footer of one region disagree on length or free state.
    TagMismatch {
        /// Header offset of the region.
        offset: usize,
    },
    /// A start/end flag is missing where required or present elsewhere.
    MisplacedBoundaryFlag {
        /// Header offset of the region.
        offset: usize,
    },
    /// Two neighbouring regions are both free.
    AdjacentFree {
        /// Header offset of the left region.
        left: usize,
        /// Header offset of the right region.
        right: usize,
    },
    /// The region chain does not tile the buffer exactly.
    CoverageMismatch {
        /// Bytes covered by the chain.
        covered: usize,
        /// Buffer length.
        capacity: usize,
    },
    /// A tracked live allocation is not the payload of an allocated region.
    LiveSetMismatch {
        /// The stale entry.
        ptr: BlockPtr,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { offset } => {
                write!(f, "tag at offset {offset} extends past the arena")
            }
            Self::TagMismatch { offset } => {
                write!(f, "header and footer disagree for region at {offset}")
            }
            Self::MisplacedBoundaryFlag { offset } => {
                write!(f, "misplaced start/end flag on region at {offset}")
            }
            Self::AdjacentFree { left, right } => {
                write!(f, "adjacent free regions at {left} and {right}")
            }
            Self::CoverageMismatch { covered, capacity } => {
                write!(
                    f,
                    "regions cover {covered} bytes of a {capacity}-byte arena"
                )
            }
            Self::LiveSetMismatch { ptr } => {
                write!(f, "live allocation {ptr} has no allocated region")
            }
        }
    }
}

impl Error for InvariantViolation {}
