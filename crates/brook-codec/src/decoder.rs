use alloc::vec::Vec;

use brook_core::{BrookError, BrookResult};
use brook_math::{row_add_scaled, row_scale, GfMatrix, GfSymbol};

use crate::GenerationDecoder;

/// Gaussian-elimination decoder for one generation.
///
/// Coefficient rows live in a K x K matrix, payload rows in a K x S matrix,
/// and every row operation hits both so they stay consistent. Row slot `r`
/// holds the pivot for column `r`; a slot is taken once its diagonal is one.
pub struct RlncDecoder {
    symbols: usize,
    symbol_size: usize,
    coeffs: GfMatrix,
    data: GfMatrix,
    rank: usize,
}

impl RlncDecoder {
    pub fn new(symbols: usize, symbol_size: usize) -> Self {
        Self {
            symbols,
            symbol_size,
            coeffs: GfMatrix::new(symbols, symbols),
            data: GfMatrix::new(symbols, symbol_size),
            rank: 0,
        }
    }

    fn pivot_taken(&self, r: usize) -> bool {
        self.coeffs.get(r, r) == Some(GfSymbol::ONE)
    }
}

impl GenerationDecoder for RlncDecoder {
    fn symbols(&self) -> usize {
        self.symbols
    }

    fn symbol_size(&self) -> usize {
        self.symbol_size
    }

    fn decode(&mut self, coefficients: &[u8], symbol: &[u8]) -> BrookResult<bool> {
        if coefficients.len() != self.symbols || symbol.len() != self.symbol_size {
            return Err(BrookError::InvalidState);
        }

        let mut cand_coeffs: Vec<u8> = coefficients.to_vec();
        let mut cand_data: Vec<u8> = symbol.to_vec();

        for r in 0..self.symbols {
            if self.pivot_taken(r) {
                let factor = GfSymbol(cand_coeffs[r]);
                if factor != GfSymbol::ZERO {
                    // Eliminate against the stored pivot row. Columns left
                    // of r are already zero in both rows.
                    row_add_scaled(&mut cand_coeffs[r..], &self.coeffs.row(r)[r..], factor);
                    row_add_scaled(&mut cand_data, self.data.row(r), factor);
                }
            } else {
                if cand_coeffs[r] == 0 {
                    continue;
                }
                // Claim the pivot: normalize, then store.
                let inv = GfSymbol(cand_coeffs[r]).inv();
                row_scale(&mut cand_coeffs[r..], inv);
                row_scale(&mut cand_data, inv);
                self.coeffs.row_mut(r).copy_from_slice(&cand_coeffs);
                self.data.row_mut(r).copy_from_slice(&cand_data);
                self.rank += 1;
                return Ok(true);
            }
        }

        // Reduced to zero: linearly dependent on what we already hold.
        Ok(false)
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn copy_decoded_symbols(&mut self, out: &mut [u8]) -> BrookResult<()> {
        if !self.is_complete() {
            return Err(BrookError::InvalidState);
        }
        if out.len() != self.symbols * self.symbol_size {
            return Err(BrookError::InvalidState);
        }

        // Back substitution, bottom row first. The coefficient entry is
        // cleared along with the data so repeated extraction stays stable.
        for r in (0..self.symbols).rev() {
            for above in 0..r {
                let factor = GfSymbol(self.coeffs.row(above)[r]);
                if factor != GfSymbol::ZERO {
                    let (dst, src) = self.data.rows_pair_mut(above, r);
                    row_add_scaled(dst, src, factor);
                    let (dst, src) = self.coeffs.rows_pair_mut(above, r);
                    row_add_scaled(&mut dst[r..], &src[r..], factor);
                }
            }
        }

        for r in 0..self.symbols {
            out[r * self.symbol_size..(r + 1) * self.symbol_size]
                .copy_from_slice(self.data.row(r));
        }
        Ok(())
    }
}
