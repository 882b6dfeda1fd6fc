use alloc::vec;
use alloc::vec::Vec;

use brook_core::{BrookError, BrookResult};
use brook_math::{row_add_scaled, GfSymbol};
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

use crate::GenerationEncoder;

/// Full-vector RLNC encoder over one generation's source block.
///
/// Starts in systematic mode; the stream turns that off so every emitted
/// packet is a dense random combination.
pub struct RlncEncoder {
    symbols: usize,
    symbol_size: usize,
    block: Vec<u8>,
    loaded: bool,
    systematic: bool,
    next_source: usize,
    rng: ChaCha20Rng,
}

impl RlncEncoder {
    pub fn new(symbols: usize, symbol_size: usize) -> Self {
        Self {
            symbols,
            symbol_size,
            block: vec![0u8; symbols * symbol_size],
            loaded: false,
            systematic: true,
            next_source: 0,
            rng: ChaCha20Rng::seed_from_u64(0),
        }
    }

    fn source_symbol(&self, i: usize) -> &[u8] {
        &self.block[i * self.symbol_size..(i + 1) * self.symbol_size]
    }
}

impl GenerationEncoder for RlncEncoder {
    fn symbols(&self) -> usize {
        self.symbols
    }

    fn symbol_size(&self) -> usize {
        self.symbol_size
    }

    fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha20Rng::seed_from_u64(seed);
    }

    fn set_symbols(&mut self, block: &[u8]) -> BrookResult<()> {
        if block.len() != self.block.len() {
            return Err(BrookError::InvalidState);
        }
        self.block.copy_from_slice(block);
        self.loaded = true;
        self.next_source = 0;
        Ok(())
    }

    fn set_systematic_off(&mut self) {
        self.systematic = false;
    }

    fn encode(&mut self, symbol_out: &mut [u8], coefficients_out: &mut [u8]) -> BrookResult<()> {
        if symbol_out.len() != self.symbol_size || coefficients_out.len() != self.symbols {
            return Err(BrookError::InvalidState);
        }
        if !self.loaded {
            return Err(BrookError::InvalidState);
        }

        if self.systematic && self.next_source < self.symbols {
            // Systematic phase: the source symbol itself, unit coefficients.
            coefficients_out.fill(0);
            coefficients_out[self.next_source] = 1;
            symbol_out.copy_from_slice(self.source_symbol(self.next_source));
            self.next_source += 1;
            return Ok(());
        }

        // An all-zero draw codes nothing, so redraw.
        loop {
            self.rng.fill_bytes(coefficients_out);
            if coefficients_out.iter().any(|&c| c != 0) {
                break;
            }
        }

        symbol_out.fill(0);
        for (i, &c) in coefficients_out.iter().enumerate() {
            row_add_scaled(symbol_out, self.source_symbol(i), GfSymbol(c));
        }
        Ok(())
    }

    fn block(&self) -> &[u8] {
        &self.block
    }
}
