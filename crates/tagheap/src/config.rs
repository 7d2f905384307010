//! Allocator configuration parameters.

/// Configuration for an [`Allocator`](crate::Allocator).
///
/// Fixed at construction; `reinitialize` keeps the same configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Track live allocations so that `release` and payload access can tell
    /// a valid handle from a foreign or already-released one.
    ///
    /// Default: `true`. When off, release falls back to structural checks
    /// on the tags around the handle, which catch most double frees but
    /// cannot tell a forged offset from a real one if it happens to land
    /// on consistent-looking tags.
    pub validate_release: bool,

    /// Accept `allocate(0)` and hand out a zero-length region.
    ///
    /// Default: `false`, which rejects zero-size requests with
    /// [`AllocError::InvalidSize`](crate::AllocError::InvalidSize).
    pub allow_zero_size: bool,
}

impl AllocatorConfig {
    /// Default for [`validate_release`](Self::validate_release).
    pub const DEFAULT_VALIDATE_RELEASE: bool = true;

    /// Default for [`allow_zero_size`](Self::allow_zero_size).
    pub const DEFAULT_ALLOW_ZERO_SIZE: bool = false;

    /// Create a config with default values.
    pub fn new() -> Self {
        Self {
            validate_release: Self::DEFAULT_VALIDATE_RELEASE,
            allow_zero_size: Self::DEFAULT_ALLOW_ZERO_SIZE,
        }
    }

    /// A config with live-allocation tracking disabled.
    ///
    /// Matches the bare boundary-tag design: no side table, release trusts
    /// the tags it finds.
    pub fn unchecked() -> Self {
        Self {
            validate_release: false,
            ..Self::new()
        }
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self::new()
    }
}
