//! Workload generators and a shadow model for tagheap development.
//!
//! - [`Workload`] produces deterministic allocate/release scripts from a
//!   seed, so failures reproduce without an RNG dependency.
//! - [`ShadowHeap`] replays a script against an [`Allocator`], stamps every
//!   allocation with its own byte pattern, and checks on release that no
//!   other allocation wrote over it.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::collections::BTreeMap;

use tagheap::{AllocError, Allocator, BlockPtr};

/// One step of a workload script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Allocate this many bytes.
    Alloc(usize),
    /// Release the live allocation at `index % live_count` (in address
    /// order). Ignored when nothing is live.
    Release(usize),
}

/// A deterministic sequence of [`Op`]s.
#[derive(Clone, Debug, Default)]
pub struct Workload {
    pub ops: Vec<Op>,
}

impl Workload {
    /// Mixed allocate/release traffic: roughly three allocations for every
    /// two releases, sizes in `1..=max_size`.
    pub fn churn(seed: u64, len: usize, max_size: usize) -> Self {
        let max_size = max_size.max(1) as u64;
        let ops = (0..len as u64)
            .map(|i| {
                let x = i.wrapping_add(seed);
                // Deterministic pseudo-random mixing.
                let kind = x.wrapping_mul(6364136223846793007) >> 33;
                let size = x.wrapping_mul(1442695040888963407) >> 17;
                let pick = x.wrapping_mul(2862933555777941757) >> 21;
                if kind % 5 < 3 {
                    Op::Alloc((size % max_size + 1) as usize)
                } else {
                    Op::Release(pick as usize)
                }
            })
            .collect();
        Self { ops }
    }

    /// `count` allocations of `size` bytes followed by releasing every other
    /// one, leaving the arena checkerboarded.
    pub fn checkerboard(count: usize, size: usize) -> Self {
        let mut ops: Vec<Op> = (0..count).map(|_| Op::Alloc(size)).collect();
        // Releasing index i shifts later entries down by one.
        ops.extend((0..count / 2).map(Op::Release));
        Self { ops }
    }
}

/// Outcome counters from [`ShadowHeap::replay`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub allocations: usize,
    pub releases: usize,
    pub out_of_memory: usize,
}

/// Shadow bookkeeping of live allocations: `ptr -> (requested, stamp)`.
#[derive(Debug, Default)]
pub struct ShadowHeap {
    live: BTreeMap<BlockPtr, (usize, u8)>,
    next_stamp: u8,
}

impl ShadowHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live allocations in address order.
    pub fn live(&self) -> impl Iterator<Item = BlockPtr> + '_ {
        self.live.keys().copied()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Run `ops` against `heap`, checking the allocator invariants after
    /// every step.
    ///
    /// # Panics
    ///
    /// Panics on an invariant violation, on a stamp that was overwritten,
    /// or on any allocator error other than `OutOfMemory`.
    pub fn replay<B>(&mut self, heap: &mut Allocator<B>, ops: &[Op]) -> ReplayReport
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        let mut report = ReplayReport::default();
        for (step, &op) in ops.iter().enumerate() {
            match op {
                Op::Alloc(size) => match heap.allocate(size) {
                    Ok(ptr) => {
                        self.stamp(heap, ptr, size);
                        report.allocations += 1;
                    }
                    Err(AllocError::OutOfMemory { .. }) => report.out_of_memory += 1,
                    Err(err) => panic!("step {step}: allocate({size}) failed: {err}"),
                },
                Op::Release(index) => {
                    let Some(ptr) = self.nth_live(index) else {
                        continue;
                    };
                    self.release(heap, ptr);
                    report.releases += 1;
                }
            }
            if let Err(violation) = heap.check_invariants() {
                panic!("step {step} ({op:?}): {violation}");
            }
        }
        report
    }

    /// Verify and release every live allocation.
    pub fn drain<B>(&mut self, heap: &mut Allocator<B>)
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        while let Some(ptr) = self.nth_live(0) {
            self.release(heap, ptr);
        }
    }

    /// Confirm every live allocation still holds its stamp.
    pub fn verify<B: AsRef<[u8]>>(&self, heap: &Allocator<B>) {
        for (&ptr, &(size, stamp)) in &self.live {
            let bytes = heap
                .payload(ptr)
                .unwrap_or_else(|err| panic!("live allocation {ptr} unreadable: {err}"));
            assert!(
                bytes[..size].iter().all(|&b| b == stamp),
                "allocation {ptr} was overwritten"
            );
        }
    }

    fn nth_live(&self, index: usize) -> Option<BlockPtr> {
        if self.live.is_empty() {
            return None;
        }
        self.live.keys().nth(index % self.live.len()).copied()
    }

    fn stamp<B>(&mut self, heap: &mut Allocator<B>, ptr: BlockPtr, size: usize)
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        // Skip 0 so a stamp never matches zeroed memory.
        self.next_stamp = self.next_stamp.wrapping_add(1).max(1);
        let stamp = self.next_stamp;
        let bytes = heap
            .payload_mut(ptr)
            .unwrap_or_else(|err| panic!("fresh allocation {ptr} unwritable: {err}"));
        bytes[..size].fill(stamp);
        let previous = self.live.insert(ptr, (size, stamp));
        assert!(previous.is_none(), "allocator returned live pointer {ptr} twice");
    }

    fn release<B>(&mut self, heap: &mut Allocator<B>, ptr: BlockPtr)
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        let (size, stamp) = self.live.remove(&ptr).expect("tracked pointer");
        let bytes = heap
            .payload(ptr)
            .unwrap_or_else(|err| panic!("live allocation {ptr} unreadable: {err}"));
        assert!(
            bytes[..size].iter().all(|&b| b == stamp),
            "allocation {ptr} was overwritten before release"
        );
        if let Err(err) = heap.release(ptr) {
            panic!("release({ptr}) failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn churn_is_deterministic() {
        let a = Workload::churn(7, 200, 64);
        let b = Workload::churn(7, 200, 64);
        assert_eq!(a.ops, b.ops);
        assert_ne!(a.ops, Workload::churn(8, 200, 64).ops);
    }

    #[test]
    fn churn_respects_size_bounds() {
        let w = Workload::churn(1, 500, 32);
        for op in &w.ops {
            if let Op::Alloc(size) = op {
                assert!((1..=32).contains(size));
            }
        }
        assert!(w.ops.iter().any(|op| matches!(op, Op::Release(_))));
    }

    #[test]
    fn checkerboard_leaves_half_live() {
        let mut heap = Allocator::with_capacity(4096).unwrap();
        let mut shadow = ShadowHeap::new();
        let report = shadow.replay(&mut heap, &Workload::checkerboard(10, 24).ops);
        assert_eq!(report.allocations, 10);
        assert_eq!(report.releases, 5);
        assert_eq!(shadow.live_count(), 5);
        shadow.verify(&heap);
    }

    #[test]
    fn drain_empties_the_arena() {
        let mut heap = Allocator::with_capacity(2048).unwrap();
        let mut shadow = ShadowHeap::new();
        shadow.replay(&mut heap, &Workload::churn(3, 100, 48).ops);
        shadow.drain(&mut heap);
        assert_eq!(shadow.live_count(), 0);
        assert_eq!(heap.regions().count(), 1);
    }
}
