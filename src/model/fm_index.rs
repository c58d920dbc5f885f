//! # FM-Index over the PRG
//!
//! Backward-search support for the full PRG alphabet. DNA rank queries go
//! through four sampled-rank bit-vectors over the BWT, one per base; marker
//! rank queries binary-search a per-marker occurrence list (each marker
//! appears only a handful of times, so positional lists beat a dense
//! occurrence table over the whole marker alphabet).

use std::collections::HashMap;

use crate::data::alphabet::{self, Base};
use crate::data::masks::RankBits;
use crate::model::suffix_array::{build_bwt, build_suffix_array};

/// Inclusive suffix-array interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SaInterval {
    pub start: usize,
    pub end: usize,
}

impl SaInterval {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Single-row interval
    pub fn row(row: usize) -> Self {
        Self {
            start: row,
            end: row,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn rows(&self) -> impl Iterator<Item = usize> {
        self.start..=self.end
    }
}

/// FM-index of the sentinel-terminated PRG text
#[derive(Debug)]
pub struct FmIndex {
    /// Encoded PRG plus the trailing sentinel `0`
    text: Vec<u32>,
    /// Full suffix array
    sa: Vec<u32>,
    /// Burrows-Wheeler transform of the text
    bwt: Vec<u32>,
    /// `c[s]` = number of text symbols `< s`; the suffix-array interval of
    /// symbol `v` is `[c[v], c[v+1] - 1]`
    c: Vec<u64>,
    /// Bit per BWT row, set where the row holds a variant marker
    bwt_markers: RankBits,
    /// Sampled rank per DNA base over the BWT
    dna_ranks: [RankBits; 4],
    /// Sorted BWT rows per marker symbol
    marker_occs: HashMap<u32, Vec<u32>>,
}

impl FmIndex {
    /// Build the index from an encoded PRG (sentinel appended here)
    pub fn build(encoded_prg: &[u32]) -> Self {
        let mut text = Vec::with_capacity(encoded_prg.len() + 1);
        text.extend_from_slice(encoded_prg);
        text.push(0);
        let sa = build_suffix_array(&text);
        Self::from_parts(text, sa)
    }

    /// Assemble the index from its persisted parts, deriving the rest
    pub fn from_parts(text: Vec<u32>, sa: Vec<u32>) -> Self {
        let bwt = build_bwt(&text, &sa);
        let max_symbol = text.iter().copied().max().unwrap_or(0) as usize;

        let mut counts = vec![0u64; max_symbol + 2];
        for &sym in &text {
            counts[sym as usize + 1] += 1;
        }
        let mut c = counts;
        for i in 1..c.len() {
            c[i] += c[i - 1];
        }

        let bwt_markers = RankBits::from_fn(bwt.len(), |i| alphabet::is_marker(bwt[i]));
        let dna_ranks = [1u32, 2, 3, 4].map(|base| RankBits::from_fn(bwt.len(), |i| bwt[i] == base));

        let mut marker_occs: HashMap<u32, Vec<u32>> = HashMap::new();
        for (row, &sym) in bwt.iter().enumerate() {
            if alphabet::is_marker(sym) {
                marker_occs.entry(sym).or_default().push(row as u32);
            }
        }

        Self {
            text,
            sa,
            bwt,
            c,
            bwt_markers,
            dna_ranks,
            marker_occs,
        }
    }

    /// Number of suffix-array rows (text length including the sentinel)
    pub fn len(&self) -> usize {
        self.sa.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sa.is_empty()
    }

    /// Text position of a suffix-array row
    #[inline]
    pub fn sa(&self, row: usize) -> usize {
        self.sa[row] as usize
    }

    /// BWT symbol at a row
    #[inline]
    pub fn bwt_symbol(&self, row: usize) -> u32 {
        self.bwt[row]
    }

    /// Sentinel-terminated text
    pub fn text(&self) -> &[u32] {
        &self.text
    }

    /// Raw suffix array
    pub fn sa_slice(&self) -> &[u32] {
        &self.sa
    }

    /// First suffix-array row whose suffix starts with `symbol`
    #[inline]
    pub fn first_row(&self, symbol: u32) -> usize {
        self.c[symbol as usize] as usize
    }

    /// Full suffix-array interval of a symbol, `None` when absent
    pub fn symbol_interval(&self, symbol: u32) -> Option<SaInterval> {
        let sym = symbol as usize;
        if sym + 1 >= self.c.len() {
            return None;
        }
        let start = self.c[sym] as usize;
        let end = self.c[sym + 1] as usize;
        if start == end {
            return None;
        }
        Some(SaInterval::new(start, end - 1))
    }

    /// Occurrences of a DNA base in `BWT[0, pos)`
    #[inline]
    pub fn rank_dna(&self, base: Base, pos: usize) -> usize {
        self.dna_ranks[base as usize - 1].rank(pos)
    }

    /// Occurrences of a marker symbol in `BWT[0, pos)`
    pub fn rank_marker(&self, marker: u32, pos: usize) -> usize {
        match self.marker_occs.get(&marker) {
            Some(rows) => rows.partition_point(|&r| (r as usize) < pos),
            None => 0,
        }
    }

    /// One backward-search step: prepend `base` to the matched pattern.
    ///
    /// Returns `None` when the extended pattern no longer occurs.
    pub fn extend_dna(&self, base: Base, interval: &SaInterval) -> Option<SaInterval> {
        let first = self.first_row(base as u32);
        let start = first + self.rank_dna(base, interval.start);
        let end = (first + self.rank_dna(base, interval.end + 1)).checked_sub(1)?;
        if start > end {
            return None;
        }
        Some(SaInterval::new(start, end))
    }

    /// Whether a BWT row holds a variant marker
    #[inline]
    pub fn is_bwt_marker(&self, row: usize) -> bool {
        self.bwt_markers.get(row)
    }

    /// Number of marker rows in the BWT
    pub fn bwt_marker_count(&self) -> usize {
        self.bwt_markers.count_ones()
    }
}
