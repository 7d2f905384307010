//! Fixed-arena boundary-tag allocation.
//!
//! Hands out and reclaims sub-regions of one caller-supplied byte buffer.
//! Each region is bracketed by a header and a footer tag carrying the same
//! length and free flag, so neighbours in both directions are reachable by
//! offset arithmetic alone. No free list, no side links.
//!
//! # Architecture
//!
//! ```text
//! Allocator<B> (owns or borrows the buffer)
//! ├── Tag         16-byte boundary record, used as header and footer
//! ├── Region      transient view rebuilt from a header/footer pair
//! ├── BlockPtr    payload offset handed to callers
//! ├── live set    IndexSet<BlockPtr> for release validation (optional)
//! └── verify      invariant walker for tests and debugging
//! ```
//!
//! # Operations
//!
//! - **initialize:** [`Allocator::new`] carves the buffer into one free
//!   region.
//! - **allocate:** first-fit scan in address order; the winner is split when
//!   the leftover can hold its own two tags.
//! - **release:** flip both tags to free, then merge with a free predecessor
//!   and successor in O(1).
//!
//! # Safety
//!
//! No `unsafe`. Regions are addressed by byte offset and every tag access
//! is bounds-checked. Single-threaded by construction: mutation needs
//! `&mut self`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handle;
pub mod heap;
pub mod region;
pub mod stats;
pub mod tag;
mod verify;

// Public re-exports for the primary API surface.
pub use config::AllocatorConfig;
pub use error::{AllocError, InvariantViolation};
pub use handle::BlockPtr;
pub use heap::{Allocator, Regions};
pub use region::Region;
pub use stats::ArenaStats;
pub use tag::{Tag, MIN_ARENA_SIZE, TAG_SIZE};
