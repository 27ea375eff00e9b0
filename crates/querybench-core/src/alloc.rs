//! Process-wide allocation accounting.
//!
//! Install [`TrackingAllocator`] as the global allocator of the benchmark
//! binary (or test crate). The runner takes an [`AllocationSnapshot`] before
//! each timed iteration and reads the delta afterwards. Without the allocator
//! installed all counters stay at zero.
//!
//! Counters are cumulative and never reset, so concurrent readers cannot
//! corrupt each other's deltas. Allocations made by driver background threads
//! during an iteration are attributed to that iteration.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};

static ALLOCATED_BYTES: AtomicU64 = AtomicU64::new(0);
static ALLOCATION_COUNT: AtomicU64 = AtomicU64::new(0);

/// Counting wrapper around the system allocator.
pub struct TrackingAllocator;

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            record(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            record(layout.size());
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            // Only growth counts as newly allocated memory.
            record(new_size.saturating_sub(layout.size()));
        }
        new_ptr
    }
}

#[inline]
fn record(size: usize) {
    ALLOCATED_BYTES.fetch_add(size as u64, Ordering::Relaxed);
    ALLOCATION_COUNT.fetch_add(1, Ordering::Relaxed);
}

/// Total bytes allocated by the process since start.
pub fn allocated_bytes() -> u64 {
    ALLOCATED_BYTES.load(Ordering::Relaxed)
}

/// Total number of allocations made by the process since start.
pub fn allocation_count() -> u64 {
    ALLOCATION_COUNT.load(Ordering::Relaxed)
}

/// Point-in-time reading of the allocation counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationSnapshot {
    bytes: u64,
    count: u64,
}

/// Allocation activity between two snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationDelta {
    pub bytes: u64,
    pub count: u64,
}

impl AllocationSnapshot {
    /// Read the counters now.
    #[inline]
    pub fn take() -> Self {
        Self {
            bytes: allocated_bytes(),
            count: allocation_count(),
        }
    }

    /// Activity since this snapshot was taken.
    #[inline]
    pub fn delta(&self) -> AllocationDelta {
        let now = Self::take();
        AllocationDelta {
            bytes: now.bytes.saturating_sub(self.bytes),
            count: now.count.saturating_sub(self.count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_is_monotonic() {
        let snapshot = AllocationSnapshot::take();
        let delta = snapshot.delta();
        // The lib test binary uses the system allocator, so nothing is recorded.
        assert_eq!(delta, AllocationDelta::default());
    }
}
