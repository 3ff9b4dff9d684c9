use phf::phf_map;

/// The number of canonical amino acid residues.
pub const AMINO_ALPHABET_SIZE: usize = 20;
/// Canonical residues followed by the degenerate symbols O, U, X, B, Z, J.
pub const AMINO_DEGENERATE_ALPHABET_SIZE: usize = 26;

/// The digital byte stored at index 0 of every sequence so residue positions start at 1.
pub const DIGITAL_PAD: u8 = 255;

pub const AMINO_ALPHABET: [&str; 20] = [
    "A", "C", "D", "E", "F", "G", "H", "I", "K", "L", "M", "N", "P", "Q", "R", "S", "T", "V", "W",
    "Y",
];

pub const UTF8_TO_DIGITAL_AMINO: phf::Map<u8, u8> = phf_map! {
    // upper case
    65u8 => 0,    // A
    67u8 => 1,    // C
    68u8 => 2,    // D
    69u8 => 3,    // E
    70u8 => 4,    // F
    71u8 => 5,    // G
    72u8 => 6,    // H
    73u8 => 7,    // I
    75u8 => 8,    // K
    76u8 => 9,    // L
    77u8 => 10,   // M
    78u8 => 11,   // N
    80u8 => 12,   // P
    81u8 => 13,   // Q
    82u8 => 14,   // R
    83u8 => 15,   // S
    84u8 => 16,   // T
    86u8 => 17,   // V
    87u8 => 18,   // W
    89u8 => 19,   // Y
    // lower case
    97u8 => 0,    // a
    99u8 => 1,    // c
    100u8 => 2,   // d
    101u8 => 3,   // e
    102u8 => 4,   // f
    103u8 => 5,   // g
    104u8 => 6,   // h
    105u8 => 7,   // i
    107u8 => 8,   // k
    108u8 => 9,   // l
    109u8 => 10,  // m
    110u8 => 11,  // n
    112u8 => 12,  // p
    113u8 => 13,  // q
    114u8 => 14,  // r
    115u8 => 15,  // s
    116u8 => 16,  // t
    118u8 => 17,  // v
    119u8 => 18,  // w
    121u8 => 19,  // y
    // degenerate characters
    79u8 => 20,   // O
    85u8 => 21,   // U
    88u8 => 22,   // X
    66u8 => 23,   // B
    90u8 => 24,   // Z
    74u8 => 25,   // J
    111u8 => 20,  // o
    117u8 => 21,  // u
    120u8 => 22,  // x
    98u8 => 23,   // b
    122u8 => 24,  // z
    106u8 => 25,  // j
};

pub const DIGITAL_TO_UTF8_AMINO: [u8; AMINO_DEGENERATE_ALPHABET_SIZE] = [
    b'A', b'C', b'D', b'E', b'F', b'G', b'H', b'I', b'K', b'L', b'M', b'N', b'P', b'Q', b'R', b'S',
    b'T', b'V', b'W', b'Y', b'O', b'U', b'X', b'B', b'Z', b'J',
];

pub const AMINO_BACKGROUND_FREQUENCIES: [f32; AMINO_ALPHABET_SIZE] = [
    0.0787945, // A
    0.0151600, // C
    0.0535222, // D
    0.0668298, // E
    0.0397062, // F
    0.0695071, // G
    0.0229198, // H
    0.0590092, // I
    0.0594422, // K
    0.0963728, // L
    0.0237718, // M
    0.0414386, // N
    0.0482904, // P
    0.0395639, // Q
    0.0540978, // R
    0.0683364, // S
    0.0540687, // T
    0.0673417, // V
    0.0114135, // W
    0.0304133, // Y
];

#[inline]
pub fn digital_to_utf8(digital_byte: u8) -> Option<u8> {
    DIGITAL_TO_UTF8_AMINO.get(digital_byte as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    #[test]
    fn test_maps_agree() {
        for (digital, &utf8) in DIGITAL_TO_UTF8_AMINO.iter().enumerate() {
            check!(UTF8_TO_DIGITAL_AMINO.get(&utf8) == Some(&(digital as u8)));
            check!(UTF8_TO_DIGITAL_AMINO.get(&utf8.to_ascii_lowercase()) == Some(&(digital as u8)));
        }
        check!(digital_to_utf8(DIGITAL_PAD).is_none());
    }

    #[test]
    fn test_background_sums_to_one() {
        let sum: f32 = AMINO_BACKGROUND_FREQUENCIES.iter().sum();
        check!((sum - 1.0).abs() < 1e-3);
    }
}
