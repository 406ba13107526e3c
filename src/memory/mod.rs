/*!
 * Memory Module
 * Capacity accounting, segment tracking, and fragmentation modeling
 */

pub mod allocator;
pub mod calculator;
pub mod types;

// Re-export for convenience
pub use allocator::{AllocatorSnapshot, MemoryAllocator, SegmentRequest};
pub use calculator::{AllocatorView, BlockSizeOptions, FragmentationOptions, ValidationOptions};
pub use types::*;
