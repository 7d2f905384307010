//! The boundary-tag allocator.
//!
//! [`Allocator`] owns (or mutably borrows) one caller-supplied byte buffer
//! and carves it into regions:
//!
//! ```text
//! [header][payload ...][footer][header][payload ...][footer] ...
//!  ^ region start flag                              ^ region end flag (last footer)
//! ```
//!
//! Allocation is a first-fit scan in address order that splits the winning
//! region when the leftover can hold its own pair of tags. Release flips the
//! tags to free and merges with a free predecessor and successor, each found
//! in O(1) through its adjacent tag.
//!
//! All addressing is by byte offset and every tag read is bounds-checked, so
//! a misbehaving caller can at worst corrupt the arena's bookkeeping, never
//! memory outside it.

use std::fmt;

use indexmap::IndexSet;
use tracing::{debug, trace, warn};

use crate::config::AllocatorConfig;
use crate::error::AllocError;
use crate::handle::BlockPtr;
use crate::region::Region;
use crate::stats::ArenaStats;
use crate::tag::{Tag, MIN_ARENA_SIZE, TAG_SIZE};

/// Fixed-arena boundary-tag allocator.
///
/// `B` is the backing buffer: anything that derefs to a byte slice, such as
/// `Vec<u8>`, `Box<[u8]>`, `[u8; N]` or `&mut [u8]`. The arena never grows;
/// its capacity is the buffer's length at construction.
///
/// # Example
///
/// ```
/// use tagheap::{AllocError, Allocator};
///
/// let mut heap = Allocator::with_capacity(256)?;
/// let ptr = heap.allocate(24)?;
/// heap.payload_mut(ptr)?[..3].copy_from_slice(b"abc");
/// assert_eq!(&heap.payload(ptr)?[..3], b"abc");
/// heap.release(ptr)?;
/// # Ok::<(), AllocError>(())
/// ```
pub struct Allocator<B = Vec<u8>> {
    buffer: B,
    config: AllocatorConfig,
    /// Payload offsets handed out and not yet released. Empty unless
    /// `config.validate_release` is set.
    pub(crate) live: IndexSet<BlockPtr>,
}

impl Allocator<Vec<u8>> {
    /// Create an allocator over a freshly zeroed `Vec<u8>` of `size` bytes.
    pub fn with_capacity(size: usize) -> Result<Self, AllocError> {
        Self::new(vec![0; size])
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Allocator<B> {
    /// Take over `buffer` as a single free region, with default config.
    ///
    /// # Errors
    ///
    /// [`AllocError::InvalidArena`] if the buffer is shorter than
    /// [`MIN_ARENA_SIZE`].
    pub fn new(buffer: B) -> Result<Self, AllocError> {
        Self::with_config(buffer, AllocatorConfig::default())
    }

    /// Take over `buffer` as a single free region.
    ///
    /// Existing buffer contents are ignored and partly overwritten by the
    /// two initial tags.
    pub fn with_config(buffer: B, config: AllocatorConfig) -> Result<Self, AllocError> {
        let size = buffer.as_ref().len();
        if size < MIN_ARENA_SIZE {
            return Err(AllocError::InvalidArena {
                size,
                minimum: MIN_ARENA_SIZE,
            });
        }
        let mut heap = Self {
            buffer,
            config,
            live: IndexSet::new(),
        };
        heap.carve_initial_region();
        Ok(heap)
    }

    /// Reset the arena to one free region spanning the whole buffer.
    ///
    /// Every outstanding [`BlockPtr`] becomes invalid. With validation on,
    /// later use of such a handle is reported as
    /// [`AllocError::InvalidPointer`] or [`AllocError::DoubleFree`].
    pub fn reinitialize(&mut self) {
        self.live.clear();
        self.carve_initial_region();
    }

    fn carve_initial_region(&mut self) {
        let capacity = self.capacity();
        let usable = capacity - 2 * TAG_SIZE;
        self.write_tag(0, Tag::free(usable).with_region_start(true));
        self.write_tag(
            capacity - TAG_SIZE,
            Tag::free(usable).with_region_end(true),
        );
        debug!(capacity, usable, "arena initialised");
    }

    /// Allocate at least `requested` bytes.
    ///
    /// Picks the lowest-address free region that is large enough. If the
    /// leftover after `requested` bytes can hold two tags, it is split off
    /// as a new free region; otherwise the caller gets the whole region and
    /// [`usable_size`](Self::usable_size) reports more than was asked for.
    ///
    /// # Errors
    ///
    /// - [`AllocError::OutOfMemory`] if no free region fits. The arena is
    ///   unchanged and the call may be retried after a release.
    /// - [`AllocError::InvalidSize`] for a zero-byte request unless
    ///   [`AllocatorConfig::allow_zero_size`] is set.
    pub fn allocate(&mut self, requested: usize) -> Result<BlockPtr, AllocError> {
        if requested == 0 && !self.config.allow_zero_size {
            debug!("rejected zero-size allocation");
            return Err(AllocError::InvalidSize { requested });
        }

        let Some(region) = self
            .regions()
            .find(|r| r.is_free() && r.len() >= requested)
        else {
            let largest_free = self.largest_free();
            debug!(requested, largest_free, "out of memory");
            return Err(AllocError::OutOfMemory {
                requested,
                largest_free,
            });
        };

        let ptr = self.take(region, requested);
        if self.config.validate_release {
            self.live.insert(ptr);
        }
        Ok(ptr)
    }

    /// Mark `region` allocated, splitting off the tail when it is big enough.
    fn take(&mut self, region: Region, requested: usize) -> BlockPtr {
        let remainder = region.len() - requested;

        if remainder >= 2 * TAG_SIZE {
            let rest = remainder - 2 * TAG_SIZE;
            let footer_offset = region.offset + TAG_SIZE + requested;
            let split_offset = footer_offset + TAG_SIZE;

            self.write_tag(
                region.offset,
                Tag::allocated(requested).with_region_start(region.header.is_region_start),
            );
            self.write_tag(footer_offset, Tag::allocated(requested));
            self.write_tag(split_offset, Tag::free(rest));
            self.write_tag(
                region.footer_offset(),
                Tag::free(rest).with_region_end(region.footer.is_region_end),
            );
            trace!(
                ptr = %region.payload(),
                requested,
                split_at = split_offset,
                remainder = rest,
                "allocated with split"
            );
        } else {
            self.write_tag(
                region.offset,
                Tag {
                    is_free: false,
                    ..region.header
                },
            );
            self.write_tag(
                region.footer_offset(),
                Tag {
                    is_free: false,
                    ..region.footer
                },
            );
            trace!(
                ptr = %region.payload(),
                requested,
                length = region.len(),
                "allocated whole region"
            );
        }

        region.payload()
    }

    /// Return an allocation to the arena and merge it with free neighbours.
    ///
    /// After this returns no two adjacent regions are both free.
    ///
    /// # Errors
    ///
    /// - [`AllocError::DoubleFree`] if `ptr` points into free memory.
    /// - [`AllocError::InvalidPointer`] if `ptr` is not a live allocation.
    ///
    /// On error the arena is untouched.
    pub fn release(&mut self, ptr: BlockPtr) -> Result<(), AllocError> {
        let region = match self.resolve(ptr) {
            Ok(region) => region,
            Err(err) => {
                warn!(ptr = %ptr, error = %err, "rejected release");
                return Err(err);
            }
        };
        self.live.swap_remove(&ptr);

        let mut current = Region {
            header: Tag {
                is_free: true,
                ..region.header
            },
            footer: Tag {
                is_free: true,
                ..region.footer
            },
            ..region
        };
        self.write_tag(current.offset, current.header);
        self.write_tag(current.footer_offset(), current.footer);

        let prev = self.prev_block(&current);
        let next = self.next_block(&current);

        if let Some(prev) = prev.filter(Region::is_free) {
            let length = prev.len() + current.len() + 2 * TAG_SIZE;
            let header = Tag::free(length).with_region_start(prev.header.is_region_start);
            let footer = Tag::free(length).with_region_end(current.footer.is_region_end);
            self.write_tag(prev.offset, header);
            self.write_tag(current.footer_offset(), footer);
            trace!(left = prev.offset, right = current.offset, length, "coalesced left");
            current = Region {
                offset: prev.offset,
                header,
                footer,
            };
        }

        if let Some(next) = next.filter(Region::is_free) {
            let length = current.len() + next.len() + 2 * TAG_SIZE;
            let header = Tag::free(length).with_region_start(current.header.is_region_start);
            let footer = Tag::free(length).with_region_end(next.footer.is_region_end);
            self.write_tag(current.offset, header);
            self.write_tag(next.footer_offset(), footer);
            trace!(left = current.offset, right = next.offset, length, "coalesced right");
            current = Region {
                offset: current.offset,
                header,
                footer,
            };
        }

        trace!(ptr = %ptr, region = current.offset, length = current.len(), "released");
        Ok(())
    }

    /// Mutable view of an allocation's usable bytes.
    ///
    /// The slice spans the whole region, which can be longer than the
    /// original request when the allocation was not split.
    pub fn payload_mut(&mut self, ptr: BlockPtr) -> Result<&mut [u8], AllocError> {
        let region = self.resolve(ptr)?;
        let start = region.payload().offset();
        Ok(&mut self.buffer.as_mut()[start..start + region.len()])
    }

    /// Give the buffer back to the caller.
    pub fn into_inner(self) -> B {
        self.buffer
    }

    fn write_tag(&mut self, offset: usize, tag: Tag) {
        tag.write(&mut self.buffer.as_mut()[offset..]);
    }
}

impl<B: AsRef<[u8]>> Allocator<B> {
    /// Total buffer length in bytes, tags included.
    pub fn capacity(&self) -> usize {
        self.buffer.as_ref().len()
    }

    /// The configuration this allocator was built with.
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Read the tag stored at `offset`, if it fits in the buffer.
    pub(crate) fn tag_at(&self, offset: usize) -> Option<Tag> {
        Tag::read(self.buffer.as_ref().get(offset..)?)
    }

    /// Rebuild the region whose header sits at `offset`.
    pub(crate) fn region_at(&self, offset: usize) -> Option<Region> {
        let header = self.tag_at(offset)?;
        let footer_offset = offset.checked_add(TAG_SIZE)?.checked_add(header.length)?;
        let footer = self.tag_at(footer_offset)?;
        Some(Region {
            offset,
            header,
            footer,
        })
    }

    /// The region at the start of the arena.
    ///
    /// Only `None` if the arena's tags have been corrupted.
    pub fn first_block(&self) -> Option<Region> {
        self.region_at(0)
    }

    /// The region physically after `region`, or `None` if it is the last.
    pub fn next_block(&self, region: &Region) -> Option<Region> {
        if region.footer.is_region_end {
            return None;
        }
        self.region_at(region.end_offset())
    }

    /// The region physically before `region`, or `None` if it is the first.
    ///
    /// Found through the predecessor's footer, which sits immediately before
    /// `region`'s header.
    pub fn prev_block(&self, region: &Region) -> Option<Region> {
        if region.header.is_region_start {
            return None;
        }
        let footer_offset = region.offset.checked_sub(TAG_SIZE)?;
        let footer = self.tag_at(footer_offset)?;
        let header_offset = footer_offset
            .checked_sub(footer.length)?
            .checked_sub(TAG_SIZE)?;
        self.region_at(header_offset)
    }

    /// Iterate over all regions in address order.
    pub fn regions(&self) -> Regions<'_, B> {
        Regions {
            heap: self,
            next: self.first_block(),
        }
    }

    /// Read-only view of an allocation's usable bytes.
    pub fn payload(&self, ptr: BlockPtr) -> Result<&[u8], AllocError> {
        let region = self.resolve(ptr)?;
        let start = region.payload().offset();
        Ok(&self.buffer.as_ref()[start..start + region.len()])
    }

    /// Usable bytes behind `ptr`; at least what was requested.
    pub fn usable_size(&self, ptr: BlockPtr) -> Result<usize, AllocError> {
        self.resolve(ptr).map(|region| region.len())
    }

    /// Whether `ptr` currently identifies a live allocation.
    pub fn is_live(&self, ptr: BlockPtr) -> bool {
        self.resolve(ptr).is_ok()
    }

    /// Live allocations tracked by the validation layer.
    ///
    /// Always empty when [`AllocatorConfig::validate_release`] is off.
    pub fn live_allocations(&self) -> impl Iterator<Item = BlockPtr> + '_ {
        self.live.iter().copied()
    }

    /// Payload length of the largest free region, 0 if none.
    pub fn largest_free(&self) -> usize {
        self.regions()
            .filter(Region::is_free)
            .map(|r| r.len())
            .max()
            .unwrap_or(0)
    }

    /// Walk the arena and summarise its occupancy.
    pub fn stats(&self) -> ArenaStats {
        let mut stats = ArenaStats {
            capacity: self.capacity(),
            live_allocations: self.live.len(),
            ..ArenaStats::default()
        };
        for region in self.regions() {
            stats.region_count += 1;
            stats.tag_bytes += 2 * TAG_SIZE;
            if region.is_free() {
                stats.free_regions += 1;
                stats.free_bytes += region.len();
                stats.largest_free = stats.largest_free.max(region.len());
            } else {
                stats.allocated_regions += 1;
                stats.allocated_bytes += region.len();
            }
        }
        stats
    }

    /// Map a handle to its allocated region, or explain why it has none.
    fn resolve(&self, ptr: BlockPtr) -> Result<Region, AllocError> {
        if self.config.validate_release && !self.live.contains(&ptr) {
            return Err(self.classify_unknown(ptr));
        }

        let region = ptr
            .offset()
            .checked_sub(TAG_SIZE)
            .and_then(|offset| self.region_at(offset))
            .ok_or(AllocError::InvalidPointer { ptr })?;
        if !region.header.agrees_with(&region.footer) {
            return Err(AllocError::InvalidPointer { ptr });
        }
        if region.is_free() {
            return Err(AllocError::DoubleFree { ptr });
        }
        Ok(region)
    }

    /// An untracked handle inside free memory was most likely released
    /// already; anything else was never handed out.
    fn classify_unknown(&self, ptr: BlockPtr) -> AllocError {
        let in_free_region = self
            .regions()
            .any(|r| r.is_free() && r.contains(ptr.offset()));
        if in_free_region {
            AllocError::DoubleFree { ptr }
        } else {
            AllocError::InvalidPointer { ptr }
        }
    }
}

#[cfg(test)]
impl<B> Allocator<B> {
    /// Wrap `buffer` as-is, trusting whatever tags it already holds.
    pub(crate) fn adopt(buffer: B) -> Self {
        Self {
            buffer,
            config: AllocatorConfig::default(),
            live: IndexSet::new(),
        }
    }
}

impl<B: AsRef<[u8]>> fmt::Debug for Allocator<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocator")
            .field("capacity", &self.capacity())
            .field("config", &self.config)
            .field("live", &self.live.len())
            .finish()
    }
}

/// Address-order iterator over an arena's regions.
///
/// Created by [`Allocator::regions`].
pub struct Regions<'a, B> {
    heap: &'a Allocator<B>,
    next: Option<Region>,
}

impl<B: AsRef<[u8]>> Iterator for Regions<'_, B> {
    type Item = Region;

    fn next(&mut self) -> Option<Region> {
        let current = self.next.take()?;
        self.next = self.heap.next_block(&current);
        Some(current)
    }
}
