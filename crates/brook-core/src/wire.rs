//! Wire layout of a coded packet.
//!
//! Every datagram of a generation shares one fixed layout:
//!
//! ```text
//! [0 .. symbolSize)                   coded symbol bytes
//! [symbolSize]                        generation tag
//! [symbolSize+1 .. +symbolCount)      coefficient vector, one byte per symbol
//! [.. wireLen)                        frame-id suffix, base-255 little-endian
//! ```
//!
//! The symbol slot is always MTU-sized, so a receiver that knows the MTU and
//! the suffix width recovers the symbol count from the datagram length alone.

use crate::{BrookError, BrookResult};

/// Width of the generation tag field.
pub const TAG_BYTES: usize = 1;

/// Number of suffix bytes needed to carry any frame id of a clip with
/// `total_frames` frames. Never zero; a clip of unknown length still
/// carries one digit.
pub fn frame_suffix_len(total_frames: u32) -> usize {
    let digits = (total_frames as usize + 254) / 255;
    digits.max(1)
}

/// Writes `frame_id` into `out` as base-255 digits, least significant first.
/// Digit values stay below 255 so a stray 0xFF byte is detectable.
pub fn encode_frame_id(frame_id: u32, out: &mut [u8]) -> BrookResult<()> {
    let mut rest = frame_id;
    for digit in out.iter_mut() {
        *digit = (rest % 255) as u8;
        rest /= 255;
    }
    if rest != 0 {
        return Err(BrookError::WireFormat);
    }
    Ok(())
}

/// Reads a base-255 suffix written by [`encode_frame_id`].
pub fn decode_frame_id(suffix: &[u8]) -> BrookResult<u32> {
    let mut value: u64 = 0;
    let mut scale: u64 = 1;
    for &digit in suffix {
        if digit == 255 {
            return Err(BrookError::WireFormat);
        }
        value += digit as u64 * scale;
        if value > u32::MAX as u64 {
            return Err(BrookError::WireFormat);
        }
        // The last digit never uses the next scale step.
        scale = scale.saturating_mul(255);
    }
    Ok(value as u32)
}

/// Field offsets of one coded packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketLayout {
    pub symbol_size: usize,
    pub symbol_count: usize,
    pub suffix_len: usize,
}

impl PacketLayout {
    pub fn wire_len(&self) -> usize {
        self.symbol_size + TAG_BYTES + self.symbol_count + self.suffix_len
    }

    /// Splits a scratch buffer into the symbol, tag, coefficient and suffix
    /// fields. The buffer must be exactly one wire length long.
    pub fn split_mut<'a>(
        &self,
        buf: &'a mut [u8],
    ) -> BrookResult<(&'a mut [u8], &'a mut u8, &'a mut [u8], &'a mut [u8])> {
        if buf.len() != self.wire_len() {
            return Err(BrookError::WireFormat);
        }
        let (symbol, rest) = buf.split_at_mut(self.symbol_size);
        let (tag, rest) = rest.split_at_mut(TAG_BYTES);
        let (coefficients, suffix) = rest.split_at_mut(self.symbol_count);
        Ok((symbol, &mut tag[0], coefficients, suffix))
    }
}

/// Borrowed view of a received coded packet.
#[derive(Debug, Clone, Copy)]
pub struct CodedPacketRef<'a> {
    pub symbol: &'a [u8],
    pub tag: u8,
    pub coefficients: &'a [u8],
    pub frame_id: u32,
}

impl<'a> CodedPacketRef<'a> {
    pub fn symbol_count(&self) -> usize {
        self.coefficients.len()
    }
}

/// Parses a datagram against a known symbol size and suffix width. The
/// coefficient width, and with it the symbol count, falls out of the
/// datagram length.
pub fn parse_coded_packet<'a>(
    datagram: &'a [u8],
    symbol_size: usize,
    suffix_len: usize,
) -> BrookResult<CodedPacketRef<'a>> {
    // At least one coefficient, or the datagram carries no generation.
    let min_len = symbol_size + TAG_BYTES + 1 + suffix_len;
    if datagram.len() < min_len {
        return Err(BrookError::WireFormat);
    }
    let symbol_count = datagram.len() - symbol_size - TAG_BYTES - suffix_len;
    let (symbol, rest) = datagram.split_at(symbol_size);
    let tag = rest[0];
    let coefficients = &rest[TAG_BYTES..TAG_BYTES + symbol_count];
    let frame_id = decode_frame_id(&rest[TAG_BYTES + symbol_count..])?;
    Ok(CodedPacketRef { symbol, tag, coefficients, frame_id })
}

/// Transport header the delivery substrate prepends to every datagram:
/// the outgoing sequence number and the emission timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportHeader {
    pub seq: u32,
    pub tx_time_us: u64,
}

impl TransportHeader {
    pub const SIZE: usize = 12;

    pub fn to_bytes(&self, buf: &mut [u8]) -> BrookResult<()> {
        if buf.len() < Self::SIZE {
            return Err(BrookError::WireFormat);
        }
        buf[0..4].copy_from_slice(&self.seq.to_be_bytes());
        buf[4..12].copy_from_slice(&self.tx_time_us.to_be_bytes());
        Ok(())
    }

    pub fn from_bytes(buf: &[u8]) -> BrookResult<Self> {
        if buf.len() < Self::SIZE {
            return Err(BrookError::WireFormat);
        }
        Ok(Self {
            seq: u32::from_be_bytes(buf[0..4].try_into().unwrap()),
            tx_time_us: u64::from_be_bytes(buf[4..12].try_into().unwrap()),
        })
    }
}
