//! Benchmark profiles for the tagheap allocator.
//!
//! - [`reference_profile`]: 64 KiB arena, 10K mixed operations
//! - [`stress_profile`]: 1 MiB arena, 100K mixed operations
//! - [`run_profile`]: replay a profile without shadow checks and report
//!   the final occupancy

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use tagheap::{AllocError, Allocator, AllocatorConfig, ArenaStats, BlockPtr};
use tagheap_test_utils::{Op, Workload};

/// An arena size paired with the workload to run against it.
#[derive(Clone, Debug)]
pub struct BenchProfile {
    /// Arena length in bytes.
    pub arena_bytes: usize,
    /// Operations to replay.
    pub workload: Workload,
}

/// Build a reference benchmark profile: 64 KiB arena, 10K operations,
/// requests up to 512 bytes.
pub fn reference_profile(seed: u64) -> BenchProfile {
    BenchProfile {
        arena_bytes: 64 * 1024,
        workload: Workload::churn(seed, 10_000, 512),
    }
}

/// Build a stress benchmark profile: 1 MiB arena, 100K operations,
/// requests up to 4 KiB.
pub fn stress_profile(seed: u64) -> BenchProfile {
    BenchProfile {
        arena_bytes: 1024 * 1024,
        workload: Workload::churn(seed, 100_000, 4096),
    }
}

/// Replay `profile` on a fresh arena and return the final stats.
///
/// Out-of-memory results are counted as normal outcomes; any other error
/// is returned.
pub fn run_profile(
    profile: &BenchProfile,
    config: AllocatorConfig,
) -> Result<ArenaStats, AllocError> {
    let mut heap = Allocator::with_config(vec![0u8; profile.arena_bytes], config)?;
    let mut live: Vec<BlockPtr> = Vec::new();
    for op in &profile.workload.ops {
        match *op {
            Op::Alloc(size) => match heap.allocate(size) {
                Ok(ptr) => live.push(ptr),
                Err(AllocError::OutOfMemory { .. }) => {}
                Err(err) => return Err(err),
            },
            Op::Release(index) => {
                if !live.is_empty() {
                    let ptr = live.swap_remove(index % live.len());
                    heap.release(ptr)?;
                }
            }
        }
    }
    Ok(heap.stats())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_profile_runs_clean() {
        let stats = run_profile(&reference_profile(1), AllocatorConfig::default()).unwrap();
        assert_eq!(stats.capacity, 64 * 1024);
        assert_eq!(
            stats.free_bytes + stats.allocated_bytes + stats.tag_bytes,
            stats.capacity
        );
    }

    #[test]
    fn validation_does_not_change_layout() {
        let profile = reference_profile(9);
        let mut checked = run_profile(&profile, AllocatorConfig::default()).unwrap();
        let unchecked = run_profile(&profile, AllocatorConfig::unchecked()).unwrap();
        checked.live_allocations = 0;
        assert_eq!(checked, unchecked);
    }
}
