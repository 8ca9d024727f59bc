//! Default constants for bridge configuration.

/// Maximum nesting depth of a single value conversion.
pub const DEFAULT_MAX_CONVERSION_DEPTH: usize = 128;

/// Default number of collection passes `gc_until` runs before giving up.
pub const DEFAULT_MAX_GC_PASSES: usize = 10;

/// Bridge configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Nesting limit for conversions in either direction
    pub max_conversion_depth: usize,

    /// Pass limit for `gc_until`
    pub max_gc_passes: usize,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            max_conversion_depth: DEFAULT_MAX_CONVERSION_DEPTH,
            max_gc_passes: DEFAULT_MAX_GC_PASSES,
        }
    }
}
