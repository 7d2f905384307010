//! Payload handles.
//!
//! A [`BlockPtr`] is what `allocate` hands out and `release` takes back:
//! the byte offset of a payload within its arena. Offsets replace native
//! pointers so every access can be bounds-checked against the buffer.

use std::fmt;

/// Byte offset of an allocation's payload within the arena.
///
/// A handle is only meaningful for the allocator that produced it, and only
/// until it is released. After release its bytes may be merged into a
/// larger free region and the offset stops identifying anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPtr(pub usize);

impl BlockPtr {
    /// The raw byte offset.
    pub fn offset(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{:#x}", self.0)
    }
}

impl From<usize> for BlockPtr {
    fn from(v: usize) -> Self {
        Self(v)
    }
}
