//! Tag invariant checking.
//!
//! [`Allocator::check_invariants`] walks the arena from the first header to
//! the last footer and confirms the layout the allocator relies on:
//!
//! - header and footer of every region agree on length and free state,
//! - regions tile the buffer with no gaps,
//! - only the first header carries the start flag and only the last footer
//!   carries the end flag,
//! - no two neighbouring regions are both free,
//! - every tracked live allocation heads an allocated region.
//!
//! Nothing here repairs state. It exists for tests and for callers chasing
//! a suspected misuse.

use std::collections::HashSet;

use crate::error::InvariantViolation;
use crate::handle::BlockPtr;
use crate::heap::Allocator;
use crate::region::Region;
use crate::tag::TAG_SIZE;

impl<B: AsRef<[u8]>> Allocator<B> {
    /// Report the first broken tag invariant, if any.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let capacity = self.capacity();
        let mut allocated: HashSet<BlockPtr> = HashSet::new();
        let mut prev: Option<Region> = None;
        let mut offset = 0usize;

        loop {
            let header = self
                .tag_at(offset)
                .ok_or(InvariantViolation::OutOfBounds { offset })?;
            let footer_offset = offset
                .checked_add(TAG_SIZE)
                .and_then(|o| o.checked_add(header.length))
                .ok_or(InvariantViolation::OutOfBounds { offset })?;
            let footer = self
                .tag_at(footer_offset)
                .ok_or(InvariantViolation::OutOfBounds {
                    offset: footer_offset,
                })?;
            let region = Region {
                offset,
                header,
                footer,
            };

            if !header.agrees_with(&footer) {
                return Err(InvariantViolation::TagMismatch { offset });
            }
            if header.is_region_start != (offset == 0)
                || header.is_region_end
                || footer.is_region_start
            {
                return Err(InvariantViolation::MisplacedBoundaryFlag { offset });
            }
            if let Some(prev) = prev {
                if prev.is_free() && region.is_free() {
                    return Err(InvariantViolation::AdjacentFree {
                        left: prev.offset,
                        right: offset,
                    });
                }
            }
            if !region.is_free() {
                allocated.insert(region.payload());
            }

            let end = region.end_offset();
            if footer.is_region_end {
                if end != capacity {
                    return Err(InvariantViolation::CoverageMismatch {
                        covered: end,
                        capacity,
                    });
                }
                break;
            }
            if end == capacity {
                return Err(InvariantViolation::MisplacedBoundaryFlag { offset });
            }

            prev = Some(region);
            offset = end;
        }

        match self.live.iter().find(|ptr| !allocated.contains(*ptr)) {
            Some(&ptr) => Err(InvariantViolation::LiveSetMismatch { ptr }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::Tag;

    fn write(buf: &mut [u8], offset: usize, tag: Tag) {
        tag.write(&mut buf[offset..]);
    }

    #[test]
    fn fresh_arena_is_consistent() {
        let heap = Allocator::with_capacity(128).unwrap();
        assert_eq!(heap.check_invariants(), Ok(()));
    }

    #[test]
    fn detects_header_footer_mismatch() {
        let mut buf = Allocator::with_capacity(128).unwrap().into_inner();
        write(&mut buf, 128 - TAG_SIZE, Tag::allocated(96).with_region_end(true));
        let heap = Allocator::adopt(buf);
        assert_eq!(
            heap.check_invariants(),
            Err(InvariantViolation::TagMismatch { offset: 0 })
        );
    }

    #[test]
    fn detects_adjacent_free_regions() {
        // Two free regions of 32 bytes each in a 128-byte arena.
        let mut buf = vec![0u8; 128];
        write(&mut buf, 0, Tag::free(32).with_region_start(true));
        write(&mut buf, 48, Tag::free(32));
        write(&mut buf, 64, Tag::free(32));
        write(&mut buf, 112, Tag::free(32).with_region_end(true));
        let heap = Allocator::adopt(buf);
        assert_eq!(
            heap.check_invariants(),
            Err(InvariantViolation::AdjacentFree { left: 0, right: 64 })
        );
    }

    #[test]
    fn detects_length_running_off_the_end() {
        let mut buf = vec![0u8; 128];
        write(&mut buf, 0, Tag::free(500).with_region_start(true));
        let heap = Allocator::adopt(buf);
        assert!(matches!(
            heap.check_invariants(),
            Err(InvariantViolation::OutOfBounds { .. })
        ));
    }

    #[test]
    fn detects_early_end_flag() {
        let mut buf = vec![0u8; 128];
        write(&mut buf, 0, Tag::allocated(32).with_region_start(true));
        write(&mut buf, 48, Tag::allocated(32).with_region_end(true));
        let heap = Allocator::adopt(buf);
        assert_eq!(
            heap.check_invariants(),
            Err(InvariantViolation::CoverageMismatch {
                covered: 64,
                capacity: 128,
            })
        );
    }

    #[test]
    fn detects_missing_start_flag() {
        let mut buf = vec![0u8; 64];
        write(&mut buf, 0, Tag::free(32));
        write(&mut buf, 48, Tag::free(32).with_region_end(true));
        let heap = Allocator::adopt(buf);
        assert_eq!(
            heap.check_invariants(),
            Err(InvariantViolation::MisplacedBoundaryFlag { offset: 0 })
        );
    }
}
