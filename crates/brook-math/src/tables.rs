/// Rijndael reduction polynomial: x^8 + x^4 + x^3 + x + 1.
const POLY: u16 = 0x11B;

pub struct GfTables {
    /// Powers of the generator, doubled so `log a + log b` needs no modulo.
    pub exp: [u8; 512],
    pub log: [u8; 256],
}

/// Builds the log/exp pair at compile time from generator 3, which
/// generates the multiplicative group of GF(2^8) mod 0x11B.
const fn build() -> GfTables {
    let mut exp = [0u8; 512];
    let mut log = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;

    while i < 255 {
        exp[i] = x as u8;
        exp[i + 255] = x as u8;
        log[x as usize] = i as u8;

        // Step by the generator: x * 3 = xtime(x) ^ x.
        let mut doubled = x << 1;
        if doubled & 0x100 != 0 {
            doubled ^= POLY;
        }
        x = doubled ^ x;
        i += 1;
    }

    exp[510] = exp[0];
    exp[511] = exp[1];

    GfTables { exp, log }
}

/// Lives in .rodata. `log[0]` stays 0 and is never consulted.
pub static TABLES: GfTables = build();
