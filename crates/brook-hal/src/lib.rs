#![no_std]
#![forbid(unsafe_code)]

use brook_core::BrookError;

/// The delivery substrate under the coded stream.
///
/// INVARIANT: Must be non-blocking. The stream runs on one thread and a
/// blocked send would stall every pending generation.
///
/// `WouldBlock` means the substrate cannot take the datagram right now.
/// Callers count the refusal and move on; a coded stream never retries a
/// packet because redundancy already covers the hole.
pub trait Datalink {
    /// Hands one composed datagram and its outgoing sequence number to the
    /// substrate. Returns the number of bytes accepted.
    fn send(&mut self, seq: u32, frame: &[u8]) -> nb::Result<usize, BrookError>;
}
