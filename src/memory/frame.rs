//! Typed physical frame indices.

use crate::constants::memory::FRAME_SIZE;
use x86_64::PhysAddr;

/// Index of a single 4 KiB physical memory frame.
///
/// A `FrameId` is a plain value; multiplying it by [`FRAME_SIZE`] yields the
/// physical address of the frame's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FrameId(usize);

/// Sentinel frame returned alongside allocation failures.
///
/// The null frame has no address; [`FrameId::address`] must not be called
/// on it.
pub const NULL_FRAME: FrameId = FrameId(usize::MAX);

impl FrameId {
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    pub const fn id(self) -> usize {
        self.0
    }

    /// Physical address of the first byte of this frame.
    pub fn address(self) -> PhysAddr {
        PhysAddr::new((self.0 * FRAME_SIZE) as u64)
    }

    /// The frame containing the given physical address.
    pub fn containing_address(address: PhysAddr) -> Self {
        Self(address.as_u64() as usize / FRAME_SIZE)
    }

    pub const fn is_null(self) -> bool {
        self.0 == usize::MAX
    }
}
