//! Long-running churn against a shadow model.
//!
//! Every allocation is stamped with its own byte pattern; the shadow checks
//! the stamp on release, and the allocator's tag invariants are verified
//! after every step.

use tagheap::{Allocator, AllocatorConfig};
use tagheap_test_utils::{Op, ShadowHeap, Workload};

#[test]
fn churn_keeps_invariants_and_payloads_intact() {
    for seed in 0..8 {
        let mut heap = Allocator::with_capacity(8 * 1024).unwrap();
        let mut shadow = ShadowHeap::new();
        let report = shadow.replay(&mut heap, &Workload::churn(seed, 2_000, 256).ops);
        assert!(report.allocations > 0);
        assert!(report.releases > 0);
        shadow.verify(&heap);

        shadow.drain(&mut heap);
        let stats = heap.stats();
        assert_eq!(stats.region_count, 1, "seed {seed}");
        assert_eq!(stats.free_bytes, 8 * 1024 - 2 * tagheap::TAG_SIZE);
    }
}

#[test]
fn small_arena_hits_out_of_memory_and_recovers() {
    let mut heap = Allocator::with_capacity(512).unwrap();
    let mut shadow = ShadowHeap::new();
    let report = shadow.replay(&mut heap, &Workload::churn(42, 1_000, 128).ops);
    assert!(report.out_of_memory > 0);
    assert!(report.allocations > 0);
    shadow.drain(&mut heap);
    assert_eq!(heap.regions().count(), 1);
}

#[test]
fn checkerboard_fragments_until_neighbours_return() {
    let mut heap = Allocator::with_capacity(4096).unwrap();
    let mut shadow = ShadowHeap::new();
    shadow.replay(&mut heap, &Workload::checkerboard(20, 64).ops);

    let fragmented = heap.stats();
    assert!(fragmented.free_regions >= 10);
    assert!(fragmented.fragmentation() > 0.2);
    // Every interior hole is exactly one released block.
    let holes: Vec<_> = heap
        .regions()
        .filter(|r| r.is_free() && !r.is_last())
        .map(|r| r.len())
        .collect();
    assert!(holes.iter().all(|&len| len == 64));

    shadow.drain(&mut heap);
    assert_eq!(heap.stats().fragmentation(), 0.0);
}

#[test]
fn unchecked_mode_survives_the_same_churn() {
    let mut heap =
        Allocator::with_config(vec![0u8; 8 * 1024], AllocatorConfig::unchecked()).unwrap();
    let mut shadow = ShadowHeap::new();
    shadow.replay(&mut heap, &Workload::churn(11, 2_000, 200).ops);
    shadow.drain(&mut heap);
    assert_eq!(heap.regions().count(), 1);
}

#[test]
fn releasing_in_address_order_merges_left_each_time() {
    let mut heap = Allocator::with_capacity(2048).unwrap();
    let mut shadow = ShadowHeap::new();
    let allocs: Vec<Op> = (0..10).map(|_| Op::Alloc(48)).collect();
    shadow.replay(&mut heap, &allocs);
    let releases: Vec<Op> = (0..10).map(|_| Op::Release(0)).collect();
    shadow.replay(&mut heap, &releases);
    assert_eq!(heap.regions().count(), 1);
}
