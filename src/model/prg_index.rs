//! # Immutable PRG Context
//!
//! Everything built once during `build` and consumed read-only during
//! quasimap: the encoded PRG, its FM-index, and the masks. Passed by
//! shared reference into the search engine, kmer indexer and coverage
//! recorders.

use std::collections::HashMap;

use crate::data::alphabet;
use crate::data::masks::Masks;
use crate::data::prg::Prg;
use crate::error::{PrgmapError, Result};
use crate::model::fm_index::FmIndex;

/// The immutable shared state of one indexed PRG
#[derive(Debug)]
pub struct PrgIndex {
    pub prg: Prg,
    pub fm: FmIndex,
    pub masks: Masks,
}

impl PrgIndex {
    /// Build the FM-index and masks for a PRG and validate the result
    pub fn build(prg: Prg) -> Result<Self> {
        let masks = Masks::from_prg(&prg.encoded);
        let fm = FmIndex::build(&prg.encoded);
        let index = Self { prg, fm, masks };
        index.validate()?;
        Ok(index)
    }

    /// Assemble from persisted parts and re-validate
    pub fn from_parts(prg: Prg, fm: FmIndex, masks: Masks) -> Result<Self> {
        let index = Self { prg, fm, masks };
        index.validate()?;
        Ok(index)
    }

    /// Structural PRG invariants checked after every build or load
    fn validate(&self) -> Result<()> {
        self.masks.validate()?;

        let mut site_occurrences: HashMap<u32, usize> = HashMap::new();
        for &symbol in &self.prg.encoded {
            if alphabet::is_site_marker(symbol) {
                *site_occurrences.entry(symbol).or_insert(0) += 1;
            }
        }
        for (&marker, &count) in &site_occurrences {
            if count != 2 {
                return Err(PrgmapError::malformed_prg(format!(
                    "site marker {marker} occurs {count} times, expected exactly 2"
                )));
            }
        }

        let prg_marker_bits = self.masks.prg_markers.count_ones();
        let bwt_marker_bits = self.fm.bwt_marker_count();
        if prg_marker_bits != bwt_marker_bits {
            return Err(PrgmapError::malformed_prg(format!(
                "marker mask popcount mismatch: {prg_marker_bits} in PRG, {bwt_marker_bits} in BWT"
            )));
        }
        Ok(())
    }

    /// Number of variant sites
    pub fn num_sites(&self) -> usize {
        self.prg.num_sites()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_valid_prg() {
        let prg = Prg::parse(b"gct5c6g6t5ac7cc8a7").unwrap();
        let index = PrgIndex::build(prg).unwrap();
        assert_eq!(index.num_sites(), 2);
    }

    #[test]
    fn test_unpaired_site_marker_rejected() {
        let prg = Prg::parse(b"gct5c6g6t").unwrap();
        let err = PrgIndex::build(prg).unwrap_err();
        assert!(matches!(err, PrgmapError::MalformedPrg { .. }));
    }

    #[test]
    fn test_plain_prg_without_sites() {
        let prg = Prg::parse(b"acgtacgt").unwrap();
        let index = PrgIndex::build(prg).unwrap();
        assert_eq!(index.num_sites(), 0);
    }
}
