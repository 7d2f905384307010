//! Fragmentation walkthrough: checkerboard an arena, print its region map,
//! then release the survivors and watch the free space merge back.
//!
//! Run with `cargo run -p tagheap-bench --example fragmentation`.

use tagheap::{AllocError, Allocator, AllocatorConfig, ArenaStats};
use tagheap_bench::{reference_profile, run_profile, stress_profile};

fn print_map<B: AsRef<[u8]>>(heap: &Allocator<B>) {
    for region in heap.regions() {
        println!(
            "  {:>6}  {:>6} bytes  {}",
            region.offset(),
            region.len(),
            if region.is_free() { "free" } else { "used" }
        );
    }
}

fn print_stats(label: &str, stats: &ArenaStats) {
    println!(
        "[{label}] regions={} free={}B used={}B tags={}B largest_free={}B fragmentation={:.3}",
        stats.region_count,
        stats.free_bytes,
        stats.allocated_bytes,
        stats.tag_bytes,
        stats.largest_free,
        stats.fragmentation(),
    );
}

fn main() -> Result<(), AllocError> {
    let mut heap = Allocator::with_capacity(1024)?;

    // --------------------------------------------------------------------
    // 1) Fill the arena with 48-byte blocks until it refuses.
    // --------------------------------------------------------------------
    let mut blocks = Vec::new();
    loop {
        match heap.allocate(48) {
            Ok(ptr) => blocks.push(ptr),
            Err(AllocError::OutOfMemory { largest_free, .. }) => {
                println!(
                    "\n[1] {} blocks allocated; out of memory (largest free {largest_free}B)",
                    blocks.len()
                );
                break;
            }
            Err(err) => return Err(err),
        }
    }
    print_map(&heap);

    // --------------------------------------------------------------------
    // 2) Release every other block. Plenty of bytes are free, but no hole
    //    can serve a 100-byte request.
    // --------------------------------------------------------------------
    for ptr in blocks.iter().step_by(2) {
        heap.release(*ptr)?;
    }
    println!("\n[2] released every other block");
    print_map(&heap);
    print_stats("2", &heap.stats());
    match heap.allocate(100) {
        Err(err) => println!("[2] allocate(100): {err}"),
        Ok(ptr) => println!("[2] allocate(100) unexpectedly succeeded at {ptr}"),
    }

    // --------------------------------------------------------------------
    // 3) Release the rest; neighbours coalesce into one region.
    // --------------------------------------------------------------------
    for ptr in blocks.iter().skip(1).step_by(2) {
        heap.release(*ptr)?;
    }
    println!("\n[3] released the remaining blocks");
    print_map(&heap);
    print_stats("3", &heap.stats());
    if let Err(violation) = heap.check_invariants() {
        panic!("arena corrupted: {violation}");
    }

    // --------------------------------------------------------------------
    // 4) Longer mixed workloads.
    // --------------------------------------------------------------------
    println!();
    print_stats(
        "reference",
        &run_profile(&reference_profile(7), AllocatorConfig::default())?,
    );
    print_stats(
        "stress",
        &run_profile(&stress_profile(7), AllocatorConfig::unchecked())?,
    );

    Ok(())
}
