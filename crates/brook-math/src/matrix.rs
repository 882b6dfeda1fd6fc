use alloc::vec;
use alloc::vec::Vec;

use crate::GfSymbol;

/// Dense row-major matrix over GF(2^8). Rows are exposed as raw byte
/// slices so elimination can run the row kernels on them directly.
#[derive(Debug, Clone)]
pub struct GfMatrix {
    rows: usize,
    cols: usize,
    data: Vec<u8>,
}

impl GfMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: vec![0u8; rows * cols] }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, r: usize, c: usize) -> Option<GfSymbol> {
        if r >= self.rows || c >= self.cols {
            return None;
        }
        Some(GfSymbol(self.data[r * self.cols + c]))
    }

    pub fn set(&mut self, r: usize, c: usize, val: GfSymbol) {
        if r < self.rows && c < self.cols {
            self.data[r * self.cols + c] = val.0;
        }
    }

    pub fn row(&self, r: usize) -> &[u8] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn row_mut(&mut self, r: usize) -> &mut [u8] {
        &mut self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Mutable destination row paired with a shared source row.
    /// `dst` and `src` must differ.
    pub fn rows_pair_mut(&mut self, dst: usize, src: usize) -> (&mut [u8], &[u8]) {
        debug_assert_ne!(dst, src);
        let cols = self.cols;
        if dst < src {
            let (head, tail) = self.data.split_at_mut(src * cols);
            (&mut head[dst * cols..(dst + 1) * cols], &tail[..cols])
        } else {
            let (head, tail) = self.data.split_at_mut(dst * cols);
            (&mut tail[..cols], &head[src * cols..(src + 1) * cols])
        }
    }
}
