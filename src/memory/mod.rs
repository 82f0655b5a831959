//! Physical memory management.
//!
//! The frame allocator is a single bitmap instance shared by the whole
//! kernel. [`init`] runs exactly once, single-threaded, before interrupts
//! are enabled: it reconciles the firmware memory map into the bitmap,
//! restricts the allocation range to the memory the firmware confirmed
//! usable, and carves out the initial kernel heap. Afterwards any subsystem
//! may allocate and free frames through the module functions below; the
//! spinlock around the bitmap is the only synchronization.

pub mod bitmap_frame_allocator;
pub mod frame;
pub mod heap;
pub mod memory_map;

use crate::constants::memory::{FRAME_SIZE, UEFI_PAGE_SIZE};
use crate::error::Result;
use bitmap_frame_allocator::BitmapFrameAllocator;
use frame::FrameId;
use memory_map::MemoryMap;
use spin::{Mutex, Once};

/// The kernel's frame allocator. Const-built so the 4 MiB bitmap lives in
/// `.bss` and is ready before any dynamic allocation exists.
static FRAME_ALLOCATOR: Mutex<BitmapFrameAllocator> = Mutex::new(BitmapFrameAllocator::new());

static INIT: Once = Once::new();

/// One-time boot initialization of the memory subsystem.
///
/// Consumes the firmware memory map snapshot, then bootstraps the kernel
/// heap. Must run before any other function in this module; later calls are
/// no-ops. A failed heap bootstrap is fatal: it is logged and boot is
/// halted by panic, since every later subsystem assumes a working heap.
pub fn init(memory_map: &MemoryMap<'_>) {
    INIT.call_once(|| {
        let available_end = initialize(&mut *FRAME_ALLOCATOR.lock(), memory_map);
        log::info!("usable physical memory up to {:#x}", available_end);

        if let Err(err) = heap::init_heap() {
            log::error!("failed to bootstrap the kernel heap: {err}");
            panic!("failed to bootstrap the kernel heap: {err}");
        }
    });
}

/// Reconciles the firmware map into `allocator` and sets the operative
/// range. Returns the availability watermark.
fn initialize(allocator: &mut BitmapFrameAllocator, memory_map: &MemoryMap<'_>) -> u64 {
    let available_end = reconcile(allocator, memory_map);
    // Frame 0 stays out of the range as a guard, whatever its
    // classification.
    allocator.set_memory_range(
        FrameId::new(1),
        FrameId::new((available_end / FRAME_SIZE as u64) as usize),
    );
    available_end
}

/// Walks the descriptor records once, in firmware order, marking every
/// frame outside the contiguously available region as used.
///
/// `available_end` is the watermark: the highest address confirmed
/// contiguously available so far. A descriptor starting above it reveals a
/// gap the firmware never described, which is conservatively marked used.
/// Available descriptors advance the watermark and leave their frames
/// free; unavailable ones are marked used in place. Descriptor order and
/// disjointness are firmware guarantees and are not re-validated.
fn reconcile(allocator: &mut BitmapFrameAllocator, memory_map: &MemoryMap<'_>) -> u64 {
    let mut available_end: u64 = 0;
    for descriptor in memory_map.descriptors() {
        if available_end < descriptor.physical_start {
            allocator.mark_allocated(
                FrameId::new((available_end / FRAME_SIZE as u64) as usize),
                ((descriptor.physical_start - available_end) / FRAME_SIZE as u64) as usize,
            );
        }

        if descriptor.memory_type().is_available() {
            available_end = descriptor.physical_end();
        } else {
            allocator.mark_allocated(
                FrameId::new((descriptor.physical_start / FRAME_SIZE as u64) as usize),
                descriptor.number_of_pages as usize * UEFI_PAGE_SIZE / FRAME_SIZE,
            );
        }
    }
    available_end
}

/// Allocates a contiguous run of frames from the global allocator.
pub fn allocate_frames(num_frames: usize) -> Result<FrameId> {
    FRAME_ALLOCATOR.lock().allocate(num_frames)
}

/// Returns a previously allocated run to the global allocator.
pub fn free_frames(start_frame: FrameId, num_frames: usize) -> Result<()> {
    FRAME_ALLOCATOR.lock().free(start_frame, num_frames)
}

/// Marks a run as used without going through allocation; administrative,
/// for regions claimed outside the allocator's control.
pub fn mark_allocated(start_frame: FrameId, num_frames: usize) {
    FRAME_ALLOCATOR.lock().mark_allocated(start_frame, num_frames)
}

/// Restricts the global allocator's search range.
pub fn set_memory_range(range_begin: FrameId, range_end: FrameId) {
    FRAME_ALLOCATOR.lock().set_memory_range(range_begin, range_end)
}

/// Runs `f` with the global allocator locked.
pub fn with_frame_allocator<F, R>(f: F) -> R
where
    F: FnOnce(&mut BitmapFrameAllocator) -> R,
{
    f(&mut *FRAME_ALLOCATOR.lock())
}
