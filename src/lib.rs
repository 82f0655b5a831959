//! Physical-memory subsystem of the Borealis kernel.
//!
//! Turns the one-shot UEFI memory map handed over by the boot stage into a
//! frame-granular allocation bitmap, serves contiguous physical frame
//! allocation for the rest of the kernel, and bootstraps the initial kernel
//! heap. The boot stage itself, paging, and the display/event subsystems
//! live elsewhere; this crate owns physical frames and nothing else.

#![no_std]

extern crate alloc;

pub mod constants;
pub mod devices;
pub mod error;
pub mod logging;
pub mod memory;

pub use devices::serial;
