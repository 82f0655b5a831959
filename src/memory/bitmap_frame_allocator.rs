//! Bit-per-frame physical memory allocator.
//!
//! One bit tracks each 4 KiB frame up to the 128 GiB ceiling: 0 is free,
//! 1 is used. Allocation is a first-fit scan for a contiguous free run,
//! restricted to the operative range established at boot. The frame whose
//! bit lives at line `n`, bit `m` starts at physical address
//! `FRAME_SIZE * (n * BITS_PER_MAP_LINE + m)`.

use crate::constants::memory::{BITS_PER_MAP_LINE, FRAME_COUNT, MAP_LINE_COUNT};
use crate::error::{Error, ErrorKind, Result};
use crate::memory::frame::FrameId;

type MapLine = u64;

pub struct BitmapFrameAllocator {
    alloc_map: [MapLine; MAP_LINE_COUNT],
    range_begin: FrameId,
    range_end: FrameId,
}

impl BitmapFrameAllocator {
    /// An all-free allocator covering every representable frame.
    ///
    /// `const` so the kernel's single instance can live in `.bss` instead of
    /// being built on a stack that cannot hold the map.
    pub const fn new() -> Self {
        Self {
            alloc_map: [0; MAP_LINE_COUNT],
            range_begin: FrameId::new(0),
            range_end: FrameId::new(FRAME_COUNT),
        }
    }

    /// Restricts subsequent [`allocate`](Self::allocate) scans to
    /// `[range_begin, range_end)`. Bitmap contents are untouched.
    pub fn set_memory_range(&mut self, range_begin: FrameId, range_end: FrameId) {
        self.range_begin = range_begin;
        self.range_end = range_end;
    }

    /// Allocates `num_frames` consecutive free frames, first fit from the
    /// start of the operative range.
    ///
    /// When a candidate run hits a used frame at offset `k`, the search
    /// resumes at `candidate + k + 1`, directly past the obstruction.
    /// Returns [`ErrorKind::NoEnoughMemory`] once the scan reaches the end
    /// of the range, leaving the bitmap unchanged.
    pub fn allocate(&mut self, num_frames: usize) -> Result<FrameId> {
        let mut start_frame_id = self.range_begin.id();
        loop {
            let mut offset = 0;
            while offset < num_frames {
                if start_frame_id + offset >= self.range_end.id() {
                    return Err(Error::new(ErrorKind::NoEnoughMemory));
                }
                if self.get_bit(FrameId::new(start_frame_id + offset)) {
                    break;
                }
                offset += 1;
            }

            if offset == num_frames {
                let start_frame = FrameId::new(start_frame_id);
                self.mark_allocated(start_frame, num_frames);
                return Ok(start_frame);
            }

            // Resume just past the used frame that cut the run short.
            start_frame_id += offset + 1;
        }
    }

    /// Clears the bits for `num_frames` frames starting at `start_frame`.
    ///
    /// Clearing an already-free bit is a silent no-op; no record of prior
    /// state is kept. Callers are responsible for only freeing runs they
    /// previously allocated.
    pub fn free(&mut self, start_frame: FrameId, num_frames: usize) -> Result<()> {
        for i in 0..num_frames {
            self.set_bit(FrameId::new(start_frame.id() + i), false);
        }
        Ok(())
    }

    /// Sets the bits for `num_frames` frames starting at `start_frame`,
    /// regardless of their prior state.
    ///
    /// Used both by [`allocate`](Self::allocate) and by boot-time
    /// reservation of regions the firmware map rules out. Callers must stay
    /// below [`FRAME_COUNT`].
    pub fn mark_allocated(&mut self, start_frame: FrameId, num_frames: usize) {
        for i in 0..num_frames {
            self.set_bit(FrameId::new(start_frame.id() + i), true);
        }
    }

    /// Whether the frame is currently marked used.
    pub fn is_allocated(&self, frame: FrameId) -> bool {
        self.get_bit(frame)
    }

    fn get_bit(&self, frame: FrameId) -> bool {
        let line_index = frame.id() / BITS_PER_MAP_LINE;
        let bit_index = frame.id() % BITS_PER_MAP_LINE;
        (self.alloc_map[line_index] >> bit_index) & 1 == 1
    }

    fn set_bit(&mut self, frame: FrameId, allocated: bool) {
        let line_index = frame.id() / BITS_PER_MAP_LINE;
        let bit_index = frame.id() % BITS_PER_MAP_LINE;
        if allocated {
            self.alloc_map[line_index] |= 1 << bit_index;
        } else {
            self.alloc_map[line_index] &= !(1 << bit_index);
        }
    }
}

impl Default for BitmapFrameAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloc::boxed::Box;

    /// A fresh all-free allocator on the test heap; the 4 MiB map does not
    /// fit on the default test-thread stack. All-zero bytes are exactly the
    /// `new()` state except for the operative range, which every test sets
    /// explicitly.
    pub(crate) fn boxed_allocator() -> Box<BitmapFrameAllocator> {
        unsafe { Box::<BitmapFrameAllocator>::new_zeroed().assume_init() }
    }

    #[test]
    fn first_fit_starts_at_range_begin() {
        let mut allocator = boxed_allocator();
        allocator.set_memory_range(FrameId::new(1), FrameId::new(128));

        let frame = allocator.allocate(4).unwrap();
        assert_eq!(frame, FrameId::new(1));
    }

    #[test]
    fn single_frame_allocations_are_strictly_increasing_until_exhaustion() {
        let mut allocator = boxed_allocator();
        allocator.set_memory_range(FrameId::new(1), FrameId::new(9));

        for expected in 1..9 {
            let frame = allocator.allocate(1).unwrap();
            assert_eq!(frame, FrameId::new(expected));
        }
        let err = allocator.allocate(1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoEnoughMemory);
    }

    #[test]
    fn live_allocations_never_overlap() {
        let mut allocator = boxed_allocator();
        allocator.set_memory_range(FrameId::new(1), FrameId::new(256));

        let mut runs: alloc::vec::Vec<(usize, usize)> = alloc::vec::Vec::new();
        for &num_frames in &[3usize, 1, 7, 2, 5, 8, 1, 4] {
            let start = allocator.allocate(num_frames).unwrap().id();
            for &(other_start, other_len) in &runs {
                let disjoint = start + num_frames <= other_start || other_start + other_len <= start;
                assert!(disjoint, "run {start}+{num_frames} overlaps {other_start}+{other_len}");
            }
            runs.push((start, num_frames));
        }
    }

    #[test]
    fn allocate_then_free_restores_affected_frames() {
        let mut allocator = boxed_allocator();
        allocator.set_memory_range(FrameId::new(1), FrameId::new(64));

        let frame = allocator.allocate(5).unwrap();
        for i in 0..5 {
            assert!(allocator.is_allocated(FrameId::new(frame.id() + i)));
        }

        allocator.free(frame, 5).unwrap();
        for i in 0..5 {
            assert!(!allocator.is_allocated(FrameId::new(frame.id() + i)));
        }

        // The same run is handed out again.
        assert_eq!(allocator.allocate(5).unwrap(), frame);
    }

    #[test]
    fn blocked_search_resumes_directly_past_the_obstruction() {
        let mut allocator = boxed_allocator();
        allocator.set_memory_range(FrameId::new(1), FrameId::new(64));
        allocator.mark_allocated(FrameId::new(5), 1);

        // Candidate 1 is cut short at offset 4 (frame 5), so the next
        // candidate is frame 6, not frame 2.
        let frame = allocator.allocate(10).unwrap();
        assert_eq!(frame, FrameId::new(6));
    }

    #[test]
    fn consecutive_obstructions_skip_by_blocked_offset() {
        let mut allocator = boxed_allocator();
        allocator.set_memory_range(FrameId::new(1), FrameId::new(64));
        allocator.mark_allocated(FrameId::new(5), 1);
        allocator.mark_allocated(FrameId::new(7), 1);

        // Candidates: 1 (blocked by 5), 6 (blocked by 7 at offset 1), 8.
        let frame = allocator.allocate(10).unwrap();
        assert_eq!(frame, FrameId::new(8));
    }

    #[test]
    fn failed_allocation_leaves_every_bit_unchanged() {
        let mut allocator = boxed_allocator();
        allocator.set_memory_range(FrameId::new(1), FrameId::new(32));
        allocator.mark_allocated(FrameId::new(10), 2);
        allocator.allocate(3).unwrap();

        let before: alloc::vec::Vec<bool> =
            (0..32).map(|i| allocator.is_allocated(FrameId::new(i))).collect();

        let err = allocator.allocate(31).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoEnoughMemory);

        let after: alloc::vec::Vec<bool> =
            (0..32).map(|i| allocator.is_allocated(FrameId::new(i))).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn allocation_never_leaves_the_operative_range() {
        let mut allocator = boxed_allocator();
        allocator.set_memory_range(FrameId::new(4), FrameId::new(12));

        let frame = allocator.allocate(8).unwrap();
        assert_eq!(frame, FrameId::new(4));
        assert_eq!(
            allocator.allocate(1).unwrap_err().kind(),
            ErrorKind::NoEnoughMemory
        );
        // Frames outside the range stay untouched even though they are free.
        assert!(!allocator.is_allocated(FrameId::new(3)));
        assert!(!allocator.is_allocated(FrameId::new(12)));
    }

    #[test]
    fn free_is_unconditional_and_idempotent() {
        let mut allocator = boxed_allocator();
        allocator.set_memory_range(FrameId::new(1), FrameId::new(16));

        // Freeing never-allocated frames is a no-op.
        allocator.free(FrameId::new(4), 4).unwrap();
        for i in 4..8 {
            assert!(!allocator.is_allocated(FrameId::new(i)));
        }

        allocator.mark_allocated(FrameId::new(4), 4);
        allocator.free(FrameId::new(4), 4).unwrap();
        allocator.free(FrameId::new(4), 4).unwrap();
        for i in 4..8 {
            assert!(!allocator.is_allocated(FrameId::new(i)));
        }
    }

    #[test]
    fn mark_allocated_reserves_frames_against_allocation() {
        let mut allocator = boxed_allocator();
        allocator.set_memory_range(FrameId::new(1), FrameId::new(10));
        allocator.mark_allocated(FrameId::new(1), 9);

        assert_eq!(
            allocator.allocate(1).unwrap_err().kind(),
            ErrorKind::NoEnoughMemory
        );
    }

    #[test]
    fn bits_pack_across_map_line_boundaries() {
        let mut allocator = boxed_allocator();
        allocator.set_memory_range(FrameId::new(60), FrameId::new(80));

        // A run straddling the first 64-bit line boundary.
        let frame = allocator.allocate(10).unwrap();
        assert_eq!(frame, FrameId::new(60));
        assert!(allocator.is_allocated(FrameId::new(63)));
        assert!(allocator.is_allocated(FrameId::new(64)));
        assert!(!allocator.is_allocated(FrameId::new(70)));
    }
}
