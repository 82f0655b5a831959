//! Read-only view of the firmware memory map.
//!
//! The boot stage hands the kernel a snapshot of the UEFI memory map taken
//! just before `ExitBootServices`. The buffer is an array of descriptor
//! records whose stride (`descriptor_size`) is reported by the firmware and
//! may exceed `size_of::<MemoryDescriptor>()` on newer firmware revisions,
//! so iteration must advance by the reported stride, never by the nominal
//! record size.

use core::mem;

use crate::constants::memory::UEFI_PAGE_SIZE;

/// One UEFI memory descriptor record.
///
/// Field layout follows `EFI_MEMORY_DESCRIPTOR`; `virtual_start` and
/// `attribute` are carried for layout fidelity but not consulted here.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct MemoryDescriptor {
    pub ty: u32,
    pub physical_start: u64,
    pub virtual_start: u64,
    pub number_of_pages: u64,
    pub attribute: u64,
}

impl MemoryDescriptor {
    pub fn memory_type(&self) -> MemoryType {
        MemoryType::from_raw(self.ty)
    }

    /// Physical address one past the last byte the descriptor covers.
    pub fn physical_end(&self) -> u64 {
        self.physical_start + self.number_of_pages * UEFI_PAGE_SIZE as u64
    }
}

/// UEFI memory type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MemoryType {
    Reserved = 0,
    LoaderCode = 1,
    LoaderData = 2,
    BootServicesCode = 3,
    BootServicesData = 4,
    RuntimeServicesCode = 5,
    RuntimeServicesData = 6,
    Conventional = 7,
    Unusable = 8,
    AcpiReclaim = 9,
    AcpiNvs = 10,
    Mmio = 11,
    MmioPortSpace = 12,
    PalCode = 13,
    Persistent = 14,
}

impl MemoryType {
    /// Decodes a raw firmware type code. Unrecognized codes fold into
    /// `Reserved`, which classifies as unavailable.
    pub fn from_raw(value: u32) -> Self {
        match value {
            1 => MemoryType::LoaderCode,
            2 => MemoryType::LoaderData,
            3 => MemoryType::BootServicesCode,
            4 => MemoryType::BootServicesData,
            5 => MemoryType::RuntimeServicesCode,
            6 => MemoryType::RuntimeServicesData,
            7 => MemoryType::Conventional,
            8 => MemoryType::Unusable,
            9 => MemoryType::AcpiReclaim,
            10 => MemoryType::AcpiNvs,
            11 => MemoryType::Mmio,
            12 => MemoryType::MmioPortSpace,
            13 => MemoryType::PalCode,
            14 => MemoryType::Persistent,
            _ => MemoryType::Reserved,
        }
    }

    /// Whether memory of this type belongs to the kernel once boot services
    /// have exited: conventional memory plus the boot-services regions the
    /// firmware no longer needs.
    pub fn is_available(self) -> bool {
        matches!(
            self,
            MemoryType::BootServicesCode
                | MemoryType::BootServicesData
                | MemoryType::Conventional
        )
    }
}

/// Strided view over the firmware descriptor buffer.
///
/// Descriptors are read by value with unaligned loads, so the view places no
/// alignment requirement on the buffer. A trailing record that does not fit
/// entirely within the buffer is not yielded.
#[derive(Debug, Clone, Copy)]
pub struct MemoryMap<'a> {
    buffer: &'a [u8],
    descriptor_size: usize,
}

impl<'a> MemoryMap<'a> {
    /// Creates a view over `buffer` whose records repeat every
    /// `descriptor_size` bytes.
    pub fn new(buffer: &'a [u8], descriptor_size: usize) -> Self {
        assert!(descriptor_size >= mem::size_of::<MemoryDescriptor>());
        Self {
            buffer,
            descriptor_size,
        }
    }

    /// Creates a view over the raw buffer reported by the boot stage.
    ///
    /// # Safety
    ///
    /// `buffer` must point to `map_size` readable bytes that stay valid and
    /// unmodified for the `'static` lifetime of the view.
    pub unsafe fn from_raw(
        buffer: *const u8,
        map_size: usize,
        descriptor_size: usize,
    ) -> MemoryMap<'static> {
        MemoryMap::new(
            core::slice::from_raw_parts(buffer, map_size),
            descriptor_size,
        )
    }

    /// Iterates the descriptor records in firmware order.
    pub fn descriptors(&self) -> Descriptors<'a> {
        Descriptors {
            buffer: self.buffer,
            descriptor_size: self.descriptor_size,
            offset: 0,
        }
    }
}

/// Iterator over the records of a [`MemoryMap`].
pub struct Descriptors<'a> {
    buffer: &'a [u8],
    descriptor_size: usize,
    offset: usize,
}

impl Iterator for Descriptors<'_> {
    type Item = MemoryDescriptor;

    fn next(&mut self) -> Option<MemoryDescriptor> {
        if self.offset + mem::size_of::<MemoryDescriptor>() > self.buffer.len() {
            return None;
        }
        let record = unsafe {
            self.buffer[self.offset..]
                .as_ptr()
                .cast::<MemoryDescriptor>()
                .read_unaligned()
        };
        self.offset += self.descriptor_size;
        Some(record)
    }
}
