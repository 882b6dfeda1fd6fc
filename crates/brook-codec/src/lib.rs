#![no_std]
#![forbid(unsafe_code)]

extern crate alloc;

mod decoder;
mod encoder;

pub use decoder::RlncDecoder;
pub use encoder::RlncEncoder;

use brook_core::{BrookError, BrookResult, MAX_GENERATION_SYMBOLS};

/// Produces coded symbols for one generation.
///
/// An encoder is built once per generation and reused for every packet of
/// it: seed, load the source block, then call [`encode`](Self::encode) once
/// per transmission. With the systematic phase disabled every output is a
/// random linear combination of all source symbols.
pub trait GenerationEncoder {
    fn symbols(&self) -> usize;
    fn symbol_size(&self) -> usize;

    /// Source block length in bytes.
    fn block_len(&self) -> usize {
        self.symbols() * self.symbol_size()
    }

    /// Declared length of symbol plus coefficient vector on the wire.
    fn coded_len(&self) -> usize {
        self.symbol_size() + self.symbols()
    }

    /// Re-keys the coefficient draw. Same seed, same coefficient sequence.
    fn reseed(&mut self, seed: u64);

    /// Loads the source block. Must be exactly [`block_len`](Self::block_len)
    /// bytes.
    fn set_symbols(&mut self, block: &[u8]) -> BrookResult<()>;

    /// Disables the systematic phase so every packet is fully coded.
    fn set_systematic_off(&mut self);

    /// Writes one coded symbol and its coefficient vector.
    fn encode(&mut self, symbol_out: &mut [u8], coefficients_out: &mut [u8]) -> BrookResult<()>;

    /// The loaded source block, for delivery verification.
    fn block(&self) -> &[u8];
}

/// Collects coded symbols of one generation and solves for the source block.
pub trait GenerationDecoder {
    fn symbols(&self) -> usize;
    fn symbol_size(&self) -> usize;

    /// Feeds one coded symbol. Returns whether it raised the rank.
    /// Duplicates and other dependent inputs return `Ok(false)`.
    fn decode(&mut self, coefficients: &[u8], symbol: &[u8]) -> BrookResult<bool>;

    fn rank(&self) -> usize;

    fn is_complete(&self) -> bool {
        self.rank() == self.symbols()
    }

    /// Copies the solved source block into `out`, which must be exactly
    /// `symbols * symbol_size` bytes. Fails before full rank.
    fn copy_decoded_symbols(&mut self, out: &mut [u8]) -> BrookResult<()>;
}

/// Builds encoder/decoder pairs with matching dimensions.
pub trait CodecFactory {
    type Encoder: GenerationEncoder;
    type Decoder: GenerationDecoder;

    fn build_encoder(&self, symbols: usize, symbol_size: usize) -> BrookResult<Self::Encoder>;
    fn build_decoder(&self, symbols: usize, symbol_size: usize) -> BrookResult<Self::Decoder>;
}

fn check_dimensions(symbols: usize, symbol_size: usize) -> BrookResult<()> {
    if symbols == 0 || symbols > MAX_GENERATION_SYMBOLS || symbol_size == 0 {
        return Err(BrookError::Configuration);
    }
    Ok(())
}

/// The full-vector RLNC codec: a dense coefficient byte per source symbol.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullVectorRlnc;

impl CodecFactory for FullVectorRlnc {
    type Encoder = RlncEncoder;
    type Decoder = RlncDecoder;

    fn build_encoder(&self, symbols: usize, symbol_size: usize) -> BrookResult<Self::Encoder> {
        check_dimensions(symbols, symbol_size)?;
        Ok(RlncEncoder::new(symbols, symbol_size))
    }

    fn build_decoder(&self, symbols: usize, symbol_size: usize) -> BrookResult<Self::Decoder> {
        check_dimensions(symbols, symbol_size)?;
        Ok(RlncDecoder::new(symbols, symbol_size))
    }
}
