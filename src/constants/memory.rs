/// Size of a single physical memory frame in bytes.
pub const FRAME_SIZE: usize = 4096;

/// Size of one firmware page as counted by UEFI memory descriptors.
pub const UEFI_PAGE_SIZE: usize = 4096;

/// Largest amount of physical memory the frame bitmap can track.
pub const MAX_PHYSICAL_MEMORY: usize = 128 * 1024 * 1024 * 1024;

/// Number of frames needed to cover `MAX_PHYSICAL_MEMORY`.
pub const FRAME_COUNT: usize = MAX_PHYSICAL_MEMORY / FRAME_SIZE;

/// Frames tracked per line of the allocation bitmap.
pub const BITS_PER_MAP_LINE: usize = u64::BITS as usize;

/// Number of lines in the allocation bitmap.
pub const MAP_LINE_COUNT: usize = FRAME_COUNT / BITS_PER_MAP_LINE;

/// Frames reserved for the kernel heap at boot (64 * 512 frames = 128 MiB).
pub const HEAP_FRAMES: usize = 64 * 512;
