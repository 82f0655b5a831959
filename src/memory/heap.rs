//! Kernel heap bootstrap.
//!
//! Immediately after the firmware map is reconciled, a fixed run of frames
//! is carved out of the frame allocator and handed to the Talc allocator as
//! the kernel's initial heap. There is no fallback heap: if the reservation
//! fails, boot cannot continue.

use crate::constants::memory::{FRAME_SIZE, HEAP_FRAMES};
use crate::error::{Error, ErrorKind, Result};
use crate::memory::bitmap_frame_allocator::BitmapFrameAllocator;
use crate::memory::with_frame_allocator;
use spin::Once;
use talc::{ErrOnOom, Span, Talc, Talck};
use x86_64::PhysAddr;

#[cfg_attr(not(test), global_allocator)]
static ALLOCATOR: Talck<spin::Mutex<()>, ErrOnOom> = Talc::new(ErrOnOom).lock();

/// Bounds of the heap reservation, published once at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapRegion {
    pub start: PhysAddr,
    /// One past the last byte of the heap.
    pub end: PhysAddr,
}

static HEAP_REGION: Once<HeapRegion> = Once::new();

/// Reserves the heap's frame run from the given allocator.
fn reserve_heap_frames(allocator: &mut BitmapFrameAllocator) -> Result<HeapRegion> {
    let start_frame = allocator.allocate(HEAP_FRAMES)?;
    let start = start_frame.address();
    Ok(HeapRegion {
        start,
        end: start + (HEAP_FRAMES * FRAME_SIZE) as u64,
    })
}

/// Reserves the kernel heap and hands its span to the global allocator.
///
/// Called once by [`crate::memory::init`] after reconciliation; the heap
/// span is claimed through the identity mapping the boot stage establishes.
/// Failure here is a non-recoverable boot condition and is escalated by the
/// caller.
pub fn init_heap() -> Result<HeapRegion> {
    let region = with_frame_allocator(reserve_heap_frames)?;

    let span = Span::from_base_size(
        region.start.as_u64() as *mut u8,
        HEAP_FRAMES * FRAME_SIZE,
    );
    unsafe {
        ALLOCATOR
            .lock()
            .claim(span)
            .map_err(|_| Error::new(ErrorKind::NoEnoughMemory))?;
    }

    HEAP_REGION.call_once(|| region);
    log::info!(
        "kernel heap at {:#x}..{:#x}",
        region.start.as_u64(),
        region.end.as_u64()
    );
    Ok(region)
}

/// The published heap bounds, once [`init_heap`] has run.
pub fn heap_region() -> Option<HeapRegion> {
    HEAP_REGION.get().copied()
}
