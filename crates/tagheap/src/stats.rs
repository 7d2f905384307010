//! Arena occupancy statistics.
//!
//! [`ArenaStats`] is a point-in-time snapshot computed by walking every
//! region once. Useful for telemetry and for fragmentation tests.

/// Occupancy snapshot of one arena.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArenaStats {
    /// Total buffer length in bytes.
    pub capacity: usize,
    /// Number of regions, free and allocated.
    pub region_count: usize,
    /// Number of free regions.
    pub free_regions: usize,
    /// Number of allocated regions.
    pub allocated_regions: usize,
    /// Payload bytes across all free regions.
    pub free_bytes: usize,
    /// Payload bytes across all allocated regions.
    pub allocated_bytes: usize,
    /// Bytes spent on boundary tags.
    pub tag_bytes: usize,
    /// Payload length of the largest free region.
    pub largest_free: usize,
    /// Allocations tracked by the validation layer (0 when it is off).
    pub live_allocations: usize,
}

impl ArenaStats {
    /// External fragmentation: `1 - largest_free / free_bytes`.
    ///
    /// 0.0 when all free space is one region or nothing is free.
    pub fn fragmentation(&self) -> f64 {
        if self.free_bytes == 0 {
            return 0.0;
        }
        1.0 - self.largest_free as f64 / self.free_bytes as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let s = ArenaStats::default();
        assert_eq!(s.capacity, 0);
        assert_eq!(s.region_count, 0);
        assert_eq!(s.fragmentation(), 0.0);
    }

    #[test]
    fn single_free_region_is_unfragmented() {
        let s = ArenaStats {
            free_bytes: 100,
            largest_free: 100,
            ..Default::default()
        };
        assert_eq!(s.fragmentation(), 0.0);
    }

    #[test]
    fn split_free_space_is_fragmented() {
        let s = ArenaStats {
            free_bytes: 100,
            largest_free: 25,
            ..Default::default()
        };
        assert!((s.fragmentation() - 0.75).abs() < 1e-12);
    }
}
