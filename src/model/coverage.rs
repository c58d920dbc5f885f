//! # Coverage Recording
//!
//! Maps a read's resolved search states onto the three coverage
//! structures. The base-level recorder walks the read over the PRG,
//! advancing through inter-site stretches and traversed alleles; a
//! per-read boundary map stops a read with several mapping instances
//! through the same locus from covering the same bases twice.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::data::alphabet::{site_index, AlleleId};
use crate::data::coverage::Coverage;
use crate::model::prg_index::PrgIndex;
use crate::model::search::{SearchState, SearchStates, VariantLocus};

/// For a `VariantLocus`, the last allele base position already covered by
/// this read
type SitesCoverageBoundaries = HashMap<VariantLocus, usize>;

/// Record one read's mapping into all three coverage structures
pub fn record_read_coverage(
    coverage: &Coverage,
    states: &SearchStates,
    read_length: usize,
    index: &PrgIndex,
) {
    if states.is_empty() {
        return;
    }
    record_allele_sum(coverage, states);
    record_allele_base(coverage, states, read_length, index);
    record_grouped_counts(coverage, states);
}

/// Per-allele read counts: one increment per state per traversed locus
fn record_allele_sum(coverage: &Coverage, states: &SearchStates) {
    for state in states {
        let mut seen_sites: Vec<u32> = Vec::with_capacity(state.path.len());
        for locus in &state.path {
            // a path cannot revisit a site under this encoding; guard anyway
            if seen_sites.contains(&locus.site) {
                continue;
            }
            seen_sites.push(locus.site);
            coverage.add_allele_sum(site_index(locus.site), locus.allele as usize - 1);
        }
    }
}

/// Grouped allele counts: per site, the set of alleles the read's states
/// passed through, one increment per read
fn record_grouped_counts(coverage: &Coverage, states: &SearchStates) {
    let mut site_groups: BTreeMap<usize, BTreeSet<AlleleId>> = BTreeMap::new();
    for state in states {
        for locus in &state.path {
            site_groups
                .entry(site_index(locus.site))
                .or_default()
                .insert(locus.allele - 1);
        }
    }
    for (site_idx, group) in site_groups {
        coverage.add_group(site_idx, group.into_iter().collect());
    }
}

/// Base-level coverage for every mapping instance of every state
fn record_allele_base(
    coverage: &Coverage,
    states: &SearchStates,
    read_length: usize,
    index: &PrgIndex,
) {
    let mut boundaries = SitesCoverageBoundaries::new();
    for state in states {
        if state.path.is_empty() {
            continue;
        }
        for row in state.sa_interval.rows() {
            instance_allele_base(coverage, &mut boundaries, row, read_length, state, index);
        }
    }
}

/// `(start, end)` PRG positions of a site's two boundary markers
fn site_marker_prg_indexes(site_marker: u32, index: &PrgIndex) -> (usize, usize) {
    let first_row = index.fm.first_row(site_marker);
    let first_pos = index.fm.sa(first_row);
    let second_pos = index.fm.sa(first_row + 1);
    (first_pos.min(second_pos), first_pos.max(second_pos))
}

/// Offset of a within-allele position from its allele's start
fn allele_start_offset(within_allele_pos: usize, index: &PrgIndex) -> usize {
    // the nearest marker to the left is the allele's opening boundary
    let markers_before = index.masks.marker_rank(within_allele_pos);
    let marker_index = index.masks.marker_position(markers_before);
    within_allele_pos - marker_index - 1
}

/// Cover bases of one traversed allele, clipped by the read's remaining
/// length and by what this read already covered at the locus.
///
/// Returns the number of read bases consumed over the allele.
fn set_site_base_coverage(
    coverage: &Coverage,
    boundaries: &mut SitesCoverageBoundaries,
    locus: &VariantLocus,
    allele_offset: usize,
    max_bases_to_set: usize,
) -> usize {
    let site_idx = site_index(locus.site);
    let allele_idx = locus.allele as usize - 1;
    let allele_len = coverage.allele_base[site_idx][allele_idx].len();

    let end = (allele_offset + max_bases_to_set).min(allele_len);
    debug_assert!(end >= allele_offset);
    let consumed = end - allele_offset;

    let mut start = allele_offset;
    if let Some(&previous_end) = boundaries.get(locus) {
        start = start.max(previous_end);
    }
    boundaries.insert(*locus, end);

    for base_idx in start..end {
        coverage.add_base(site_idx, allele_idx, base_idx);
    }
    consumed
}

/// Walk one mapping instance (one suffix-array row) over the PRG
fn instance_allele_base(
    coverage: &Coverage,
    boundaries: &mut SitesCoverageBoundaries,
    sa_row: usize,
    read_length: usize,
    state: &SearchState,
    index: &PrgIndex,
) {
    let read_start = index.fm.sa(sa_row);
    let mut consumed = 0usize;
    let mut path_iter = state.path.iter();
    let mut last_site_span: Option<(usize, usize)> = None;

    let starts_within_site = index.masks.site_at(read_start) != 0;
    if starts_within_site {
        let Some(locus) = path_iter.next() else {
            return;
        };
        last_site_span = Some(site_marker_prg_indexes(locus.site, index));
        let offset = allele_start_offset(read_start, index);
        consumed += set_site_base_coverage(coverage, boundaries, locus, offset, read_length);
    } else {
        // consume the inter-site bases up to the first traversed site
        let Some(locus) = state.path.first() else {
            return;
        };
        let span = site_marker_prg_indexes(locus.site, index);
        consumed += span.0 - read_start;
    }

    for locus in path_iter {
        if consumed >= read_length {
            break;
        }
        let span = site_marker_prg_indexes(locus.site, index);
        if let Some(last_span) = last_site_span {
            // bases between the previous site's exit and this site's entry
            consumed += span.0 - last_span.1 - 1;
        }
        last_site_span = Some(span);

        if consumed >= read_length {
            break;
        }
        let max_bases = read_length - consumed;
        consumed += set_site_base_coverage(coverage, boundaries, locus, 0, max_bases);
    }
}
