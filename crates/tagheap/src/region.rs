//! Logical region views.
//!
//! A [`Region`] is rebuilt from the two boundary tags every time the arena
//! is traversed. Nothing about it is stored besides the tags themselves.

use crate::handle::BlockPtr;
use crate::tag::{Tag, TAG_SIZE};

/// Transient view of one region: its header offset plus both tags.
///
/// Valid for one traversal step or one allocator operation; any mutation of
/// the arena may invalidate it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub(crate) offset: usize,
    pub(crate) header: Tag,
    pub(crate) footer: Tag,
}

impl Region {
    /// Byte offset of the header within the arena.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The header tag as read from the arena.
    pub fn header(&self) -> Tag {
        self.header
    }

    /// The footer tag as read from the arena.
    pub fn footer(&self) -> Tag {
        self.footer
    }

    /// Handle to the first payload byte.
    pub fn payload(&self) -> BlockPtr {
        BlockPtr(self.offset + TAG_SIZE)
    }

    /// Usable payload bytes.
    pub fn len(&self) -> usize {
        self.header.length
    }

    /// Whether the payload is zero bytes long.
    pub fn is_empty(&self) -> bool {
        self.header.length == 0
    }

    /// Whether the region is available for allocation.
    pub fn is_free(&self) -> bool {
        self.header.is_free
    }

    /// Whether this is the arena's first region.
    pub fn is_first(&self) -> bool {
        self.header.is_region_start
    }

    /// Whether this is the arena's last region.
    pub fn is_last(&self) -> bool {
        self.footer.is_region_end
    }

    /// Byte offset of the footer tag.
    pub fn footer_offset(&self) -> usize {
        self.offset + TAG_SIZE + self.header.length
    }

    /// One past the footer; the next region's header starts here.
    pub fn end_offset(&self) -> usize {
        self.offset + 2 * TAG_SIZE + self.header.length
    }

    /// Whether `offset` falls anywhere inside this region, tags included.
    pub fn contains(&self, offset: usize) -> bool {
        (self.offset..self.end_offset()).contains(&offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(offset: usize, length: usize) -> Region {
        Region {
            offset,
            header: Tag::allocated(length),
            footer: Tag::allocated(length),
        }
    }

    #[test]
    fn offsets_follow_layout() {
        let r = region(32, 10);
        assert_eq!(r.payload(), BlockPtr(48));
        assert_eq!(r.footer_offset(), 58);
        assert_eq!(r.end_offset(), 74);
    }

    #[test]
    fn contains_spans_both_tags() {
        let r = region(0, 8);
        assert!(r.contains(0));
        assert!(r.contains(r.footer_offset() + TAG_SIZE - 1));
        assert!(!r.contains(r.end_offset()));
    }

    #[test]
    fn boundary_flags_come_from_the_right_tag() {
        let r = Region {
            offset: 0,
            header: Tag::free(4).with_region_start(true),
            footer: Tag::free(4).with_region_end(true),
        };
        assert!(r.is_first());
        assert!(r.is_last());
        assert!(r.is_free());
        assert!(!r.is_empty());
    }
}
