//! Boundary tags and their on-arena encoding.
//!
//! Every region carries two identical [`Tag`]s: a header at its first byte
//! and a footer right after its payload. Whether a tag is a header or a
//! footer is purely positional; the record itself is the same.
//!
//! Encoding (`TAG_SIZE` = 16 bytes):
//!
//! ```text
//! 0               8    9                   16
//! ├───────────────┼────┼────────────────────┤
//! │ length (u64)  │flag│      padding       │
//! └───────────────┴────┴────────────────────┘
//! flag bit 0: free   bit 1: region start   bit 2: region end
//! ```

/// Encoded size of one boundary tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Smallest arena that can hold a region: one header plus one footer.
pub const MIN_ARENA_SIZE: usize = 2 * TAG_SIZE;

const FLAG_FREE: u8 = 1 << 0;
const FLAG_REGION_START: u8 = 1 << 1;
const FLAG_REGION_END: u8 = 1 << 2;

const LENGTH_BYTES: usize = 8;
const FLAGS_BYTE: usize = LENGTH_BYTES;

/// Size and flag metadata stored at both ends of a region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tag {
    /// Whether the region is available for allocation.
    pub is_free: bool,
    /// Set only on the header at the very first byte of the arena.
    pub is_region_start: bool,
    /// Set only on the footer at the very last bytes of the arena.
    pub is_region_end: bool,
    /// Usable payload bytes, excluding both tags.
    pub length: usize,
}

impl Tag {
    /// A free tag with no boundary flags.
    pub fn free(length: usize) -> Self {
        Self {
            is_free: true,
            is_region_start: false,
            is_region_end: false,
            length,
        }
    }

    /// An allocated tag with no boundary flags.
    pub fn allocated(length: usize) -> Self {
        Self {
            is_free: false,
            ..Self::free(length)
        }
    }

    /// Returns a copy with `is_region_start` set to `flag`.
    pub fn with_region_start(mut self, flag: bool) -> Self {
        self.is_region_start = flag;
        self
    }

    /// Returns a copy with `is_region_end` set to `flag`.
    pub fn with_region_end(mut self, flag: bool) -> Self {
        self.is_region_end = flag;
        self
    }

    /// Decode a tag from the first [`TAG_SIZE`] bytes of `bytes`.
    ///
    /// Returns `None` if `bytes` is too short or the stored length does not
    /// fit in `usize`.
    pub fn read(bytes: &[u8]) -> Option<Self> {
        let raw = bytes.get(..TAG_SIZE)?;
        let mut length = [0u8; LENGTH_BYTES];
        length.copy_from_slice(&raw[..LENGTH_BYTES]);
        let length = usize::try_from(u64::from_le_bytes(length)).ok()?;
        let flags = raw[FLAGS_BYTE];
        Some(Self {
            is_free: flags & FLAG_FREE != 0,
            is_region_start: flags & FLAG_REGION_START != 0,
            is_region_end: flags & FLAG_REGION_END != 0,
            length,
        })
    }

    /// Encode this tag into the first [`TAG_SIZE`] bytes of `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out` is shorter than [`TAG_SIZE`].
    pub fn write(&self, out: &mut [u8]) {
        let raw = &mut out[..TAG_SIZE];
        raw[..LENGTH_BYTES].copy_from_slice(&(self.length as u64).to_le_bytes());
        let mut flags = 0u8;
        if self.is_free {
            flags |= FLAG_FREE;
        }
        if self.is_region_start {
            flags |= FLAG_REGION_START;
        }
        if self.is_region_end {
            flags |= FLAG_REGION_END;
        }
        raw[FLAGS_BYTE] = flags;
        raw[FLAGS_BYTE + 1..].fill(0);
    }

    /// Whether `other` carries the same `length` and `is_free` state.
    ///
    /// Header and footer of one region must always agree; boundary flags
    /// legitimately differ between them.
    pub fn agrees_with(&self, other: &Tag) -> bool {
        self.length == other.length && self.is_free == other.is_free
    }
}
