//! Scoped allocation tracking.
//!
//! [`TrackingAllocator`] forwards to the system allocator and counts
//! allocations made on the current thread while a [`LeakProbe`] scope is
//! open. Outside a scope it only forwards. Only blocks allocated inside the
//! scope are tracked, so freeing older memory never balances a new leak. Binaries that want leak reports
//! install it as their `#[global_allocator]`; without it every report comes
//! back with `tracked == false`.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

/// In-scope allocations a single check may hold live at once. A scope that
/// exceeds it is reported untracked.
const LIVE_SLOTS: usize = 256;

thread_local! {
    static SCOPE_ACTIVE: Cell<bool> = const { Cell::new(false) };
    static ALLOCATIONS: Cell<u64> = const { Cell::new(0) };
    static DEALLOCATIONS: Cell<u64> = const { Cell::new(0) };
    // (address, size) of every block allocated in the scope and not yet
    // freed; address 0 marks a free slot.
    static LIVE: [Cell<(usize, usize)>; LIVE_SLOTS] =
        const { [const { Cell::new((0, 0)) }; LIVE_SLOTS] };
    static LIVE_OVERFLOW: Cell<bool> = const { Cell::new(false) };
}

// Set the first time a scoped allocation reaches the tracking allocator.
static TRACKING_SEEN: AtomicBool = AtomicBool::new(false);

fn scope_active() -> bool {
    SCOPE_ACTIVE.try_with(Cell::get).unwrap_or(false)
}

fn bump(counter: &'static std::thread::LocalKey<Cell<u64>>, by: u64) {
    let _ = counter.try_with(|c| c.set(c.get().saturating_add(by)));
}

fn record_alloc(ptr: *mut u8, size: usize) {
    if !scope_active() {
        return;
    }
    TRACKING_SEEN.store(true, Ordering::Relaxed);
    bump(&ALLOCATIONS, 1);

    let addr = ptr as usize;
    let stored = LIVE
        .try_with(|slots| match slots.iter().find(|slot| slot.get().0 == 0) {
            Some(slot) => {
                slot.set((addr, size));
                true
            }
            None => false,
        })
        .unwrap_or(false);
    if !stored {
        let _ = LIVE_OVERFLOW.try_with(|flag| flag.set(true));
    }
}

/// Frees count only for blocks the scope itself allocated; releasing memory
/// that predates the scope cannot offset a leak made inside it.
fn record_dealloc(ptr: *mut u8) {
    if !scope_active() {
        return;
    }
    let addr = ptr as usize;
    let owned = LIVE
        .try_with(|slots| match slots.iter().find(|slot| slot.get().0 == addr) {
            Some(slot) => {
                slot.set((0, 0));
                true
            }
            None => false,
        })
        .unwrap_or(false);
    if owned {
        bump(&DEALLOCATIONS, 1);
    }
}

/// Global allocator wrapper that feeds the leak probe.
pub struct TrackingAllocator;

// SAFETY: every method forwards to `System` unchanged; the bookkeeping only
// touches const-initialized thread-locals and never allocates.
unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded caller contract.
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            record_alloc(ptr, layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded caller contract.
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            record_alloc(ptr, layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        record_dealloc(ptr);
        // SAFETY: forwarded caller contract.
        unsafe { System.dealloc(ptr, layout) }
    }

    // A block resized inside the scope counts as allocated there.
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: forwarded caller contract.
        let out = unsafe { System.realloc(ptr, layout, new_size) };
        if !out.is_null() {
            record_dealloc(ptr);
            record_alloc(out, new_size);
        }
        out
    }
}

/// Allocation balance observed over one probe scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LeakReport {
    /// Whether the tracking allocator was installed and observed the scope.
    pub tracked: bool,
    pub allocations: u64,
    pub deallocations: u64,
    /// Bytes allocated in the scope and not freed before it closed.
    pub outstanding_bytes: u64,
}

impl LeakReport {
    /// Report for a scope that could not be tracked.
    #[must_use]
    pub const fn untracked() -> Self {
        Self {
            tracked: false,
            allocations: 0,
            deallocations: 0,
            outstanding_bytes: 0,
        }
    }

    /// No bytes left outstanding. Untracked reports count as clean.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.outstanding_bytes == 0
    }
}

/// Counting context covering exactly one check.
pub struct LeakProbe;

struct ScopeGuard;

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let _ = SCOPE_ACTIVE.try_with(|active| active.set(false));
    }
}

fn reset_counters() {
    for counter in [&ALLOCATIONS, &DEALLOCATIONS] {
        let _ = counter.try_with(|c| c.set(0));
    }
    let _ = LIVE.try_with(|slots| slots.iter().for_each(|slot| slot.set((0, 0))));
    let _ = LIVE_OVERFLOW.try_with(|flag| flag.set(false));
}

fn read(counter: &'static std::thread::LocalKey<Cell<u64>>) -> u64 {
    counter.try_with(Cell::get).unwrap_or(0)
}

fn live_bytes() -> u64 {
    LIVE.try_with(|slots| {
        slots
            .iter()
            .map(|slot| slot.get().1 as u64)
            .sum::<u64>()
    })
    .unwrap_or(0)
}

impl LeakProbe {
    /// Run `f` inside a fresh counting scope on the current thread.
    ///
    /// A nested call runs `f` without counting and returns
    /// [`LeakReport::untracked`]; the outer scope keeps ownership of the
    /// counters.
    pub fn measure<T>(f: impl FnOnce() -> T) -> (T, LeakReport) {
        if scope_active() {
            return (f(), LeakReport::untracked());
        }

        let _ = SCOPE_ACTIVE.try_with(|active| active.set(true));
        let guard = ScopeGuard;

        // One throwaway allocation tells us whether the tracker is installed.
        drop(std::hint::black_box(Box::new(0_u8)));
        let installed = TRACKING_SEEN.load(Ordering::Relaxed);
        reset_counters();

        let value = f();

        let report = LeakReport {
            tracked: true,
            allocations: read(&ALLOCATIONS),
            deallocations: read(&DEALLOCATIONS),
            outstanding_bytes: live_bytes(),
        };
        let overflowed = LIVE_OVERFLOW.try_with(Cell::get).unwrap_or(true);
        drop(guard);

        if installed && !overflowed {
            (value, report)
        } else {
            (value, LeakReport::untracked())
        }
    }
}
