#![no_std]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod tables;

mod matrix;

pub use matrix::GfMatrix;
pub use tables::TABLES;

/// One element of GF(2^8) under the Rijndael polynomial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct GfSymbol(pub u8);

impl GfSymbol {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(1);

    #[inline(always)]
    pub fn add(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }

    #[inline(always)]
    pub fn sub(self, rhs: Self) -> Self {
        self.add(rhs)
    }

    #[inline]
    pub fn mul(self, rhs: Self) -> Self {
        if self.0 == 0 || rhs.0 == 0 {
            return Self::ZERO;
        }
        let idx = TABLES.log[self.0 as usize] as usize + TABLES.log[rhs.0 as usize] as usize;
        Self(TABLES.exp[idx])
    }

    /// Bitwise carry-less multiply. Slow; kept as a cross-check on TABLES.
    pub fn mul_bitwise(self, rhs: Self) -> Self {
        let mut p = 0u8;
        let mut a = self.0;
        let mut b = rhs.0;
        for _ in 0..8 {
            if b & 1 != 0 {
                p ^= a;
            }
            let carry = a & 0x80 != 0;
            a <<= 1;
            if carry {
                a ^= 0x1B;
            }
            b >>= 1;
        }
        Self(p)
    }

    pub fn inv(self) -> Self {
        if self.0 == 0 {
            return Self::ZERO;
        }
        let idx = 255 - TABLES.log[self.0 as usize] as usize;
        Self(TABLES.exp[idx])
    }
}

/// dest ^= src * factor, over the shorter of the two rows.
#[inline(always)]
pub fn row_add_scaled(dest: &mut [u8], src: &[u8], factor: GfSymbol) {
    if factor.0 == 0 {
        return;
    }
    if factor.0 == 1 {
        for (d, s) in dest.iter_mut().zip(src) {
            *d ^= *s;
        }
        return;
    }
    for (d, s) in dest.iter_mut().zip(src) {
        *d ^= GfSymbol(*s).mul(factor).0;
    }
}

/// row *= factor, in place.
#[inline(always)]
pub fn row_scale(row: &mut [u8], factor: GfSymbol) {
    if factor.0 == 1 {
        return;
    }
    for b in row.iter_mut() {
        *b = GfSymbol(*b).mul(factor).0;
    }
}

impl core::ops::Add for GfSymbol {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.add(rhs)
    }
}
impl core::ops::Sub for GfSymbol {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.sub(rhs)
    }
}
impl core::ops::Mul for GfSymbol {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        self.mul(rhs)
    }
}
