//! Mutable bit vectors over u64 blocks.
//!
//! [`BitVec`] backs the row, column and element masks of the masking layer.
//! Bits are packed 64 to a block and counted with `u64::count_ones()`.

use crate::{ExprMatError, Result};

/// A fixed-length, mutable bit vector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BitVec {
    blocks: Vec<u64>,
    len: usize,
}

impl BitVec {
    /// An all-zero bit vector of `len` bits.
    pub fn zeros(len: usize) -> Self {
        Self {
            blocks: vec![0u64; len.div_ceil(64)],
            len,
        }
    }

    /// Build a bit vector from a slice of booleans.
    pub fn build(bits: &[bool]) -> Self {
        let mut bv = Self::zeros(bits.len());
        for (i, &b) in bits.iter().enumerate() {
            if b {
                bv.blocks[i / 64] |= 1u64 << (i % 64);
            }
        }
        bv
    }

    /// Get the bit at position `i`. Bits past the end read as unset.
    pub fn get(&self, i: usize) -> bool {
        i < self.len && (self.blocks[i / 64] >> (i % 64)) & 1 == 1
    }

    /// Set or clear the bit at position `i`.
    pub fn set(&mut self, i: usize, value: bool) -> Result<()> {
        ExprMatError::check_index(i, self.len)?;
        if value {
            self.blocks[i / 64] |= 1u64 << (i % 64);
        } else {
            self.blocks[i / 64] &= !(1u64 << (i % 64));
        }
        Ok(())
    }

    /// Positions of all 1-bits, ascending.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocks.iter().enumerate().flat_map(|(b, &block)| {
            let mut word = block;
            std::iter::from_fn(move || {
                if word == 0 {
                    return None;
                }
                let bit = word.trailing_zeros() as usize;
                word &= word - 1;
                Some(b * 64 + bit)
            })
        })
    }

    /// Total number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the bit vector has zero length.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total number of 1-bits.
    pub fn count_ones(&self) -> usize {
        self.blocks.iter().map(|b| b.count_ones() as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let bv = BitVec::zeros(130);
        assert_eq!(bv.len(), 130);
        assert_eq!(bv.count_ones(), 0);
        assert!(!bv.get(129));
    }

    #[test]
    fn test_build_and_get() {
        let bv = BitVec::build(&[true, false, true, true]);
        assert!(bv.get(0));
        assert!(!bv.get(1));
        assert!(bv.get(3));
        assert!(!bv.get(4));
        assert_eq!(bv.count_ones(), 3);
    }

    #[test]
    fn test_set_and_clear() {
        let mut bv = BitVec::zeros(100);
        bv.set(70, true).unwrap();
        assert!(bv.get(70));
        assert_eq!(bv.count_ones(), 1);
        bv.set(70, false).unwrap();
        assert!(!bv.get(70));
        assert!(bv.set(100, true).is_err());
    }

    #[test]
    fn test_count_ones_across_blocks() {
        let bits: Vec<bool> = (0..200).map(|i| i % 3 == 0).collect();
        let bv = BitVec::build(&bits);
        assert_eq!(bv.count_ones(), bits.iter().filter(|&&b| b).count());
    }

    #[test]
    fn test_iter_ones() {
        let mut bv = BitVec::zeros(150);
        for i in [3, 64, 65, 149] {
            bv.set(i, true).unwrap();
        }
        assert_eq!(bv.iter_ones().collect::<Vec<_>>(), vec![3, 64, 65, 149]);
    }

    #[test]
    fn test_empty() {
        let bv = BitVec::build(&[]);
        assert!(bv.is_empty());
        assert_eq!(bv.count_ones(), 0);
        assert_eq!(bv.iter_ones().count(), 0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn iter_ones_matches_get(bits in proptest::collection::vec(any::<bool>(), 0..300)) {
                let bv = BitVec::build(&bits);
                let expected: Vec<usize> = bits.iter().enumerate().filter(|(_, &b)| b).map(|(i, _)| i).collect();
                prop_assert_eq!(bv.count_ones(), expected.len());
                prop_assert_eq!(bv.iter_ones().collect::<Vec<_>>(), expected);
            }
        }
    }
}
