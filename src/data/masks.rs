//! # PRG Masks
//!
//! Position-aligned companions of the encoded PRG: which positions are
//! variant markers, which site and allele each base belongs to. The site
//! and allele masks are produced by a single left-to-right scan with a
//! small state machine tracking site entry and allele separation.

use bitvec::prelude::*;

use crate::data::alphabet::{self, AlleleId, Marker};
use crate::error::{PrgmapError, Result};

/// A bit-vector with sampled rank support.
///
/// Rank samples are stored every 512 bits; a query adds popcounts over the
/// remaining whole words plus a masked partial word.
#[derive(Debug, Clone)]
pub struct RankBits {
    bits: BitVec<u64, Lsb0>,
    samples: Vec<u32>,
}

const RANK_BLOCK_BITS: usize = 512;
const WORDS_PER_BLOCK: usize = RANK_BLOCK_BITS / 64;

impl RankBits {
    pub fn new(bits: BitVec<u64, Lsb0>) -> Self {
        let words = bits.as_raw_slice();
        let num_blocks = bits.len() / RANK_BLOCK_BITS + 1;
        let mut samples = Vec::with_capacity(num_blocks);
        let mut running = 0u32;
        for block in 0..num_blocks {
            samples.push(running);
            let start = block * WORDS_PER_BLOCK;
            let end = ((block + 1) * WORDS_PER_BLOCK).min(words.len());
            for &word in &words[start..end] {
                running += word.count_ones();
            }
        }
        Self { bits, samples }
    }

    /// Build from a predicate over `0..len`
    pub fn from_fn(len: usize, f: impl Fn(usize) -> bool) -> Self {
        let mut bits = BitVec::with_capacity(len);
        for i in 0..len {
            bits.push(f(i));
        }
        Self::new(bits)
    }

    #[inline]
    pub fn get(&self, index: usize) -> bool {
        self.bits[index]
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of set bits in `[0, pos)`
    pub fn rank(&self, pos: usize) -> usize {
        debug_assert!(pos <= self.bits.len());
        let words = self.bits.as_raw_slice();
        let block = pos / RANK_BLOCK_BITS;
        let mut count = self.samples[block] as usize;
        let full_words = pos / 64;
        for &word in &words[block * WORDS_PER_BLOCK..full_words] {
            count += word.count_ones() as usize;
        }
        let rem = pos % 64;
        if rem > 0 {
            count += (words[full_words] & ((1u64 << rem) - 1)).count_ones() as usize;
        }
        count
    }

    /// Total number of set bits
    pub fn count_ones(&self) -> usize {
        self.rank(self.bits.len())
    }
}

/// Masks derived from an encoded PRG
#[derive(Debug, Clone)]
pub struct Masks {
    /// Site marker of the site containing each position, `0` outside sites
    /// and on markers
    pub sites: Vec<Marker>,
    /// 1-based allele index of each position within its site, `0` outside
    /// sites and on markers
    pub alleles: Vec<AlleleId>,
    /// Bit per PRG position, set on variant markers
    pub prg_markers: RankBits,
    /// Sorted PRG positions of all variant markers (rank/select backing)
    marker_positions: Vec<u32>,
}

impl Masks {
    /// Build all masks from the encoded PRG in one pass each
    pub fn from_prg(encoded: &[u32]) -> Self {
        let sites = sites_mask(encoded);
        let alleles = allele_mask(encoded);
        let prg_markers = RankBits::from_fn(encoded.len(), |i| alphabet::is_marker(encoded[i]));
        let marker_positions = encoded
            .iter()
            .enumerate()
            .filter(|(_, &sym)| alphabet::is_marker(sym))
            .map(|(i, _)| i as u32)
            .collect();
        Self {
            sites,
            alleles,
            prg_markers,
            marker_positions,
        }
    }

    /// Reassemble from persisted site/allele masks, deriving the marker
    /// structures from the encoded PRG
    pub fn from_parts(
        encoded: &[u32],
        sites: Vec<Marker>,
        alleles: Vec<AlleleId>,
    ) -> Result<Self> {
        if sites.len() != encoded.len() || alleles.len() != encoded.len() {
            return Err(PrgmapError::parse(format!(
                "mask length mismatch: PRG {}, sites {}, alleles {}",
                encoded.len(),
                sites.len(),
                alleles.len()
            )));
        }
        let prg_markers = RankBits::from_fn(encoded.len(), |i| alphabet::is_marker(encoded[i]));
        let marker_positions = encoded
            .iter()
            .enumerate()
            .filter(|(_, &sym)| alphabet::is_marker(sym))
            .map(|(i, _)| i as u32)
            .collect();
        Ok(Self {
            sites,
            alleles,
            prg_markers,
            marker_positions,
        })
    }

    /// Number of variant markers in the PRG
    pub fn num_markers(&self) -> usize {
        self.marker_positions.len()
    }

    /// Number of markers strictly before `pos`
    pub fn marker_rank(&self, pos: usize) -> usize {
        self.marker_positions.partition_point(|&p| (p as usize) < pos)
    }

    /// Position of the `count`-th marker (1-based, as in a select query)
    pub fn marker_position(&self, count: usize) -> usize {
        debug_assert!(count >= 1 && count <= self.marker_positions.len());
        self.marker_positions[count - 1] as usize
    }

    /// Site marker at a position, `0` if none
    #[inline]
    pub fn site_at(&self, pos: usize) -> Marker {
        self.sites.get(pos).copied().unwrap_or(0)
    }

    /// Allele id at a position, `0` if none
    #[inline]
    pub fn allele_at(&self, pos: usize) -> AlleleId {
        self.alleles.get(pos).copied().unwrap_or(0)
    }

    /// Whether a position lies inside a variant site region, markers included
    #[inline]
    pub fn within_site_region(&self, pos: usize) -> bool {
        self.allele_at(pos) != 0 || self.prg_markers.get(pos)
    }

    /// Check the mutual consistency of the site and allele masks
    pub fn validate(&self) -> Result<()> {
        for (i, (&site, &allele)) in self.sites.iter().zip(&self.alleles).enumerate() {
            if (site == 0) != (allele == 0) {
                return Err(PrgmapError::malformed_prg(format!(
                    "site/allele mask disagreement at position {i}: site {site}, allele {allele}"
                )));
            }
        }
        Ok(())
    }
}

/// Site marker per position via the entry/exit state machine
fn sites_mask(encoded: &[u32]) -> Vec<Marker> {
    let mut mask = vec![0u32; encoded.len()];
    let mut current_site: Marker = 0;
    let mut within_site = false;

    for (i, &symbol) in encoded.iter().enumerate() {
        if alphabet::is_site_marker(symbol) {
            if within_site {
                within_site = false;
            } else {
                within_site = true;
                current_site = symbol;
            }
        } else if !alphabet::is_marker(symbol) && within_site {
            mask[i] = current_site;
        }
    }
    mask
}

/// 1-based allele id per position; the even separator bumps the counter
fn allele_mask(encoded: &[u32]) -> Vec<AlleleId> {
    let mut mask = vec![0u32; encoded.len()];
    let mut current_allele: AlleleId = 1;
    let mut within_site = false;

    for (i, &symbol) in encoded.iter().enumerate() {
        if alphabet::is_site_marker(symbol) {
            if within_site {
                within_site = false;
            } else {
                within_site = true;
                current_allele = 1;
            }
        } else if alphabet::is_allele_marker(symbol) {
            current_allele += 1;
        } else if within_site {
            mask[i] = current_allele;
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::alphabet::encode_prg;

    #[test]
    fn test_sites_mask_two_sites() {
        let encoded = encode_prg(b"gct5c6g6t5ac7cc8a7").unwrap();
        let masks = Masks::from_prg(&encoded);
        assert_eq!(
            masks.sites,
            vec![0, 0, 0, 0, 5, 0, 5, 0, 5, 0, 0, 0, 0, 7, 7, 0, 7, 0]
        );
    }

    #[test]
    fn test_allele_mask_two_sites() {
        let encoded = encode_prg(b"gct5c6g6t5ac7cc8a7").unwrap();
        let masks = Masks::from_prg(&encoded);
        assert_eq!(
            masks.alleles,
            vec![0, 0, 0, 0, 1, 0, 2, 0, 3, 0, 0, 0, 0, 1, 1, 0, 2, 0]
        );
    }

    #[test]
    fn test_masks_agree_everywhere() {
        let encoded = encode_prg(b"aca5g6t5gcatt").unwrap();
        let masks = Masks::from_prg(&encoded);
        masks.validate().unwrap();
    }

    #[test]
    fn test_marker_rank_and_select() {
        let encoded = encode_prg(b"a5g6t5c").unwrap();
        let masks = Masks::from_prg(&encoded);
        assert_eq!(masks.num_markers(), 3);
        assert_eq!(masks.marker_position(1), 1);
        assert_eq!(masks.marker_position(2), 3);
        assert_eq!(masks.marker_position(3), 5);
        assert_eq!(masks.marker_rank(0), 0);
        assert_eq!(masks.marker_rank(2), 1);
        assert_eq!(masks.marker_rank(6), 3);
    }

    #[test]
    fn test_rank_bits_across_blocks() {
        let len = 2000;
        let rb = RankBits::from_fn(len, |i| i % 3 == 0);
        let mut expected = 0usize;
        for pos in 0..=len {
            assert_eq!(rb.rank(pos), expected, "rank mismatch at {pos}");
            if pos < len && pos % 3 == 0 {
                expected += 1;
            }
        }
        assert_eq!(rb.count_ones(), (0..len).filter(|i| i % 3 == 0).count());
    }

    #[test]
    fn test_no_sites_prg() {
        let encoded = encode_prg(b"acgtacgt").unwrap();
        let masks = Masks::from_prg(&encoded);
        assert!(masks.sites.iter().all(|&s| s == 0));
        assert_eq!(masks.num_markers(), 0);
        assert_eq!(masks.prg_markers.count_ones(), 0);
    }
}
