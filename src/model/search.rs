//! # vBWT Backward Search
//!
//! FM-index backward search extended to fork at variant markers. Before
//! each DNA extension, every suffix-array row holding a marker in its BWT
//! cell is resolved: an odd marker either enters the site (one new state
//! per allele) or exits it at the site's entry point; an even marker exits
//! mid-site from a non-final allele. The original states stay alive
//! alongside the marker-derived ones, and the DNA step prunes whatever no
//! longer occurs.

use crate::data::alphabet::{AlleleId, Base, Marker};
use crate::model::fm_index::SaInterval;
use crate::model::kmer_index::KmerIndex;
use crate::model::prg_index::PrgIndex;

/// One traversed `(site, allele)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantLocus {
    pub site: Marker,
    pub allele: AlleleId,
}

/// Traversed loci in PRG order, earliest first.
///
/// Backward search walks right-to-left, so loci are recorded by
/// prepending.
pub type VariantSitePath = Vec<VariantLocus>;

/// Where a search state sits relative to variant sites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariantSiteState {
    #[default]
    Outside,
    Within,
    /// States reloaded from a serialized kmer index lose this knowledge
    Unknown,
}

/// One branch of a backward search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    pub sa_interval: SaInterval,
    pub path: VariantSitePath,
    pub site_state: VariantSiteState,
}

/// All branches of one read's mapping
pub type SearchStates = Vec<SearchState>;

impl SearchState {
    fn prepend(&mut self, locus: VariantLocus) {
        self.path.insert(0, locus);
    }
}

/// Map a full read: seed from the kmer index, then extend base by base.
///
/// Returns the empty set when the trailing kmer is not indexed, the read
/// is shorter than the kmer size, or any extension dies out.
pub fn map_read(
    read: &[Base],
    kmer_index: &KmerIndex,
    index: &PrgIndex,
) -> SearchStates {
    let kmer_size = kmer_index.kmer_size();
    if read.len() < kmer_size {
        return Vec::new();
    }
    let kmer = &read[read.len() - kmer_size..];
    let mut states = match kmer_index.get(kmer) {
        Some(states) if !states.is_empty() => states.to_vec(),
        _ => return Vec::new(),
    };

    for &base in read[..read.len() - kmer_size].iter().rev() {
        states = extend(base, &states, index);
        if states.is_empty() {
            break;
        }
    }
    resolve_encapsulated_states(states, index)
}

/// Backward-search a kmer over the whole PRG (kmer index construction).
///
/// The last kmer base seeds the search directly from that symbol's full
/// suffix-array interval; marker resolution begins with the second
/// consumed base. A marker adjacent to an empty match carries no
/// traversal information, so resolving markers over the full interval
/// would only fabricate paths for sites the pattern never touches.
pub fn search_kmer(kmer: &[Base], index: &PrgIndex) -> SearchStates {
    let Some((&last, rest)) = kmer.split_last() else {
        return Vec::new();
    };
    let Some(sa_interval) = index.fm.symbol_interval(last as u32) else {
        return Vec::new();
    };
    let mut states = vec![SearchState {
        sa_interval,
        path: Vec::new(),
        site_state: VariantSiteState::Outside,
    }];
    for &base in rest.iter().rev() {
        states = extend(base, &states, index);
        if states.is_empty() {
            break;
        }
    }
    states
}

/// Extend every state by one read base: marker resolution, then the DNA
/// step
pub fn extend(base: Base, states: &SearchStates, index: &PrgIndex) -> SearchStates {
    let mut expanded = states.clone();
    for state in states {
        process_marker_state(state, index, &mut expanded);
    }

    expanded
        .into_iter()
        .filter_map(|state| {
            index
                .fm
                .extend_dna(base, &state.sa_interval)
                .map(|sa_interval| SearchState {
                    sa_interval,
                    ..state
                })
        })
        .collect()
}

/// What a marker found in a BWT cell means for the search
enum MarkerClass {
    /// Odd marker at the site's end position: the search enters the site
    SiteEntry(SiteBoundary),
    /// Odd marker at the site's start position: the search leaves the site
    SiteExit(SiteBoundary),
    /// Even marker: the search leaves mid-site from a non-final allele
    AlleleExit { site_marker: Marker, sa_row: usize },
}

struct SiteBoundary {
    marker: Marker,
    /// Suffix-array row of the marker occurrence itself
    row: usize,
}

/// Scan a state's interval for marker rows and emit the derived states
fn process_marker_state(state: &SearchState, index: &PrgIndex, out: &mut SearchStates) {
    for row in state.sa_interval.rows() {
        if !index.fm.is_bwt_marker(row) {
            continue;
        }
        let marker = index.fm.bwt_symbol(row);
        match classify_marker(marker, row, index) {
            MarkerClass::SiteEntry(boundary) => enter_site(&boundary, state, index, out),
            MarkerClass::SiteExit(boundary) => out.push(exit_site(&boundary, state)),
            MarkerClass::AlleleExit {
                site_marker,
                sa_row,
            } => out.push(exit_allele(site_marker, sa_row, state, index)),
        }
    }
}

fn classify_marker(marker: Marker, sa_row_right_of_marker: usize, index: &PrgIndex) -> MarkerClass {
    if marker % 2 == 0 {
        return MarkerClass::AlleleExit {
            site_marker: marker - 1,
            sa_row: sa_row_right_of_marker,
        };
    }
    // The two occurrences of a site marker sit adjacent in the suffix
    // array; the one at the smaller text position is the site start.
    let first_row = index.fm.first_row(marker);
    let row = first_row + index.fm.rank_marker(marker, sa_row_right_of_marker);
    let other_row = if row == first_row {
        first_row + 1
    } else {
        first_row
    };
    let boundary = SiteBoundary { marker, row };
    if index.fm.sa(row) <= index.fm.sa(other_row) {
        MarkerClass::SiteExit(boundary)
    } else {
        MarkerClass::SiteEntry(boundary)
    }
}

/// 1-based allele id of an allele-marker row: the base just left of the
/// separator lies inside the allele it terminates
fn allele_id_at(allele_marker_row: usize, index: &PrgIndex) -> AlleleId {
    let text_pos = index.fm.sa(allele_marker_row) - 1;
    let allele = index.masks.allele_at(text_pos);
    debug_assert!(allele > 0, "allele separator not preceded by allele base");
    allele
}

/// Fork into one state per allele of the entered site
fn enter_site(boundary: &SiteBoundary, current: &SearchState, index: &PrgIndex, out: &mut SearchStates) {
    let allele_interval = index.fm.symbol_interval(boundary.marker + 1);
    let num_alleles = allele_interval.map_or(1, |iv| iv.len() + 1) as AlleleId;

    if let Some(interval) = allele_interval {
        for row in interval.rows() {
            let mut state = current.clone();
            state.sa_interval = SaInterval::row(row);
            state.site_state = VariantSiteState::Within;
            state.prepend(VariantLocus {
                site: boundary.marker,
                allele: allele_id_at(row, index),
            });
            out.push(state);
        }
    }

    // The final allele ends at the site marker itself, not at a separator
    let mut state = current.clone();
    state.sa_interval = SaInterval::row(boundary.row);
    state.site_state = VariantSiteState::Within;
    state.prepend(VariantLocus {
        site: boundary.marker,
        allele: num_alleles,
    });
    out.push(state);
}

/// Leave a site through its entry point.
///
/// A state with an empty path entered this site before the read started;
/// by convention that is recorded as allele 1 (the base right of the entry
/// marker is the first base of allele 1).
fn exit_site(boundary: &SiteBoundary, current: &SearchState) -> SearchState {
    let mut state = current.clone();
    if state.site_state != VariantSiteState::Within && state.path.is_empty() {
        state.prepend(VariantLocus {
            site: boundary.marker,
            allele: 1,
        });
    }
    state.sa_interval = SaInterval::row(boundary.row);
    state.site_state = VariantSiteState::Outside;
    state
}

/// Leave a site mid-allele through an even separator
fn exit_allele(
    site_marker: Marker,
    sa_row_right_of_marker: usize,
    current: &SearchState,
    index: &PrgIndex,
) -> SearchState {
    let first_row = index.fm.first_row(site_marker);
    let second_row = first_row + 1;
    let entry_row = if index.fm.sa(first_row) < index.fm.sa(second_row) {
        first_row
    } else {
        second_row
    };

    let mut state = current.clone();
    if state.site_state != VariantSiteState::Within && state.path.is_empty() {
        // Started inside this allele: read the id off the allele mask at
        // the position right of the separator we are leaving through.
        let text_pos = index.fm.sa(sa_row_right_of_marker);
        let allele = index.masks.allele_at(text_pos);
        state.prepend(VariantLocus {
            site: site_marker,
            allele,
        });
    }
    state.sa_interval = SaInterval::row(entry_row);
    state.site_state = VariantSiteState::Outside;
    state
}

/// Resolve states that finished with an empty path.
///
/// Such a mapping may still lie strictly inside a single allele (the
/// search never crossed a marker). Each suffix-array row is looked up in
/// the site/allele masks; consecutive rows sharing a locus coalesce into
/// one state.
pub fn resolve_encapsulated_states(states: SearchStates, index: &PrgIndex) -> SearchStates {
    let mut resolved = Vec::with_capacity(states.len());
    for state in states {
        if !state.path.is_empty() {
            resolved.push(state);
            continue;
        }
        resolve_encapsulated_state(&state, index, &mut resolved);
    }
    resolved
}

fn resolve_encapsulated_state(state: &SearchState, index: &PrgIndex, out: &mut SearchStates) {
    let mut cache: Option<SearchState> = None;

    for row in state.sa_interval.rows() {
        let text_pos = index.fm.sa(row);
        let site = index.masks.site_at(text_pos);
        if site == 0 {
            if let Some(cached) = cache.take() {
                out.push(cached);
            }
            out.push(SearchState {
                sa_interval: SaInterval::row(row),
                path: Vec::new(),
                site_state: VariantSiteState::Outside,
            });
            continue;
        }

        let locus = VariantLocus {
            site,
            allele: index.masks.allele_at(text_pos),
        };
        match cache.as_mut() {
            Some(cached) if cached.path[0] == locus => {
                debug_assert_eq!(cached.sa_interval.end + 1, row);
                cached.sa_interval.end = row;
            }
            _ => {
                if let Some(cached) = cache.take() {
                    out.push(cached);
                }
                cache = Some(SearchState {
                    sa_interval: SaInterval::row(row),
                    path: vec![locus],
                    site_state: VariantSiteState::Within,
                });
            }
        }
    }
    if let Some(cached) = cache {
        out.push(cached);
    }
}
