use std::fmt::{Debug, Display, Formatter};

use anyhow::Result;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use thiserror::Error;

use crate::alphabet::{
    digital_to_utf8, AMINO_BACKGROUND_FREQUENCIES, DIGITAL_PAD, UTF8_TO_DIGITAL_AMINO,
};

#[derive(Error, Debug)]
#[error("unknown UTF8 sequence byte: {byte}")]
pub struct UnknownUtf8SequenceByteError {
    byte: u8,
}

#[derive(Error, Debug)]
#[error("unknown digital sequence byte: {byte}")]
pub struct UnknownDigitalSequenceByteError {
    byte: u8,
}

/// This holds the both the "digital" data and string data of a biological sequence.
#[derive(Clone, PartialEq, Eq)]
pub struct Sequence {
    /// The name of the sequence
    pub name: String,
    /// The length of the sequence
    pub length: usize,
    /// The "digital" data of the sequence. These are the string bytes,
    /// but mapped to [0u8..26u8], with a pad byte at index 0
    pub digital_bytes: Vec<u8>,
    /// The UTF8 bytes of the sequence, with a pad byte at index 0
    pub utf8_bytes: Vec<u8>,
}

impl Sequence {
    pub fn from_utf8(bytes: &[u8]) -> Result<Self> {
        // we want position 1 of the sequence to be at index 1, so we'll buffer with a pad
        let mut digital_bytes: Vec<u8> = Vec::with_capacity(bytes.len() + 1);
        digital_bytes.push(DIGITAL_PAD);

        for utf8_byte in bytes {
            match UTF8_TO_DIGITAL_AMINO.get(utf8_byte) {
                Some(b) => digital_bytes.push(*b),
                None => return Err(UnknownUtf8SequenceByteError { byte: *utf8_byte }.into()),
            }
        }

        let mut utf8_bytes = vec![b' '];
        utf8_bytes.extend(bytes.iter().map(u8::to_ascii_uppercase));

        Ok(Sequence {
            name: String::new(),
            length: bytes.len(),
            digital_bytes,
            utf8_bytes,
        })
    }

    pub fn from_digital(bytes: &[u8]) -> Result<Self> {
        let mut utf8_bytes: Vec<u8> = Vec::with_capacity(bytes.len() + 1);
        utf8_bytes.push(b' ');

        for digital_byte in bytes {
            match digital_to_utf8(*digital_byte) {
                Some(b) => utf8_bytes.push(b),
                None => {
                    return Err(UnknownDigitalSequenceByteError {
                        byte: *digital_byte,
                    }
                    .into())
                }
            }
        }

        let mut digital_bytes = vec![DIGITAL_PAD];
        digital_bytes.extend_from_slice(bytes);

        Ok(Sequence {
            name: String::new(),
            length: bytes.len(),
            digital_bytes,
            utf8_bytes,
        })
    }

    /// Draw a sequence of canonical residues from the background distribution.
    pub fn random_amino(length: usize, rng: &mut impl Rng) -> Result<Self> {
        let background = WeightedIndex::new(AMINO_BACKGROUND_FREQUENCIES)?;

        let mut digital_bytes = vec![DIGITAL_PAD];
        digital_bytes.extend((0..length).map(|_| background.sample(rng) as u8));

        let utf8_bytes = digital_bytes
            .iter()
            .map(|&b| digital_to_utf8(b).unwrap_or(b' '))
            .collect();

        Ok(Sequence {
            name: String::new(),
            length,
            digital_bytes,
            utf8_bytes,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The digital residue at 1-based position `idx`.
    #[inline(always)]
    pub fn residue(&self, idx: usize) -> usize {
        debug_assert!(idx >= 1 && idx <= self.length);
        self.digital_bytes[idx] as usize
    }

    pub fn residues(&self) -> &str {
        // every stored byte came from the ASCII alphabet map
        std::str::from_utf8(&self.utf8_bytes[1..]).unwrap_or_default()
    }
}

impl Display for Sequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, ">{}", self.name)?;

        let mut iter = self.residues().as_bytes().chunks(80).peekable();
        while let Some(chunk) = iter.next() {
            write!(f, "{}", String::from_utf8_lossy(chunk))?;
            if iter.peek().is_some() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

impl Debug for Sequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.residues())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    #[test]
    fn test_from_utf8() {
        let_assert!(Ok(seq) = Sequence::from_utf8(b"ACdy"));
        check!(seq.length == 4);
        check!(seq.digital_bytes == vec![DIGITAL_PAD, 0, 1, 2, 19]);
        check!(seq.residues() == "ACDY");
        check!(seq.residue(3) == 2);
    }

    #[test]
    fn test_from_utf8_rejects_unknown() {
        check!(Sequence::from_utf8(b"AC1").is_err());
    }

    #[test]
    fn test_from_digital() {
        let_assert!(Ok(seq) = Sequence::from_digital(&[0, 22, 19]));
        check!(seq.residues() == "AXY");
        check!(Sequence::from_digital(&[40]).is_err());
    }

    #[test]
    fn test_random_amino() {
        let mut rng = Pcg64::seed_from_u64(3);
        let_assert!(Ok(seq) = Sequence::random_amino(50, &mut rng));
        check!(seq.length == 50);
        check!(seq.digital_bytes.len() == 51);
        check!(seq.digital_bytes[1..].iter().all(|&b| b < 20));
    }
}
