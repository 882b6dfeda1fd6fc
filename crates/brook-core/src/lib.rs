#![no_std]
#![forbid(unsafe_code)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod trace;
pub mod wire;

pub use trace::{default_trace, parse_trace, TraceEntry};

/// Hard ceiling on symbols per generation. A frame that fragments into more
/// symbols than this is a configuration error, not a bigger matrix.
pub const MAX_GENERATION_SYMBOLS: usize = 512;

pub type BrookResult<T> = Result<T, BrookError>;

/// Error taxonomy shared by every crate in the workspace.
///
/// Only `Configuration` is meant to stop a stream, and only before it
/// starts. Everything observed mid-stream is counted and reported by the
/// component that saw it; the stream keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrookError {
    /// Invalid startup input: empty trace, zero MTU, bad loss-window size.
    Configuration,
    /// Planned packet size disagrees with the size the codec declares or
    /// the packet actually built. Diagnostic only.
    SizeMismatch,
    /// The delivery substrate refused a datagram.
    SendFailure,
    /// Bytes do not fit the wire layout, or a value cannot be encoded in it.
    WireFormat,
    /// A component was driven outside its contract.
    InvalidState,
}

impl core::fmt::Display for BrookError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            BrookError::Configuration => "invalid configuration",
            BrookError::SizeMismatch => "planned and declared packet sizes disagree",
            BrookError::SendFailure => "delivery substrate refused the datagram",
            BrookError::WireFormat => "bytes do not fit the wire layout",
            BrookError::InvalidState => "component driven outside its contract",
        };
        write!(f, "{}", msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BrookError {}
