//! Error values returned by the memory subsystem.
//!
//! Failures are ordinary values, not panics: every fallible operation
//! returns a [`Result`] whose error records what went wrong and where it
//! was raised.

use core::panic::Location;

use thiserror::Error;

/// The kinds of failure the memory subsystem can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// The requested contiguous frame run is unavailable within the
    /// configured range.
    #[error("NoEnoughMemory")]
    NoEnoughMemory,
}

/// An error kind together with the source location that raised it.
#[derive(Debug, Clone, Copy, Error)]
#[error("{kind} at {location}")]
pub struct Error {
    kind: ErrorKind,
    location: &'static Location<'static>,
}

impl Error {
    /// Wraps `kind` with the caller's source location.
    #[track_caller]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: Location::caller(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Where the error was raised.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

pub type Result<T> = core::result::Result<T, Error>;
