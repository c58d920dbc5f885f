//! # Kmer Index
//!
//! Precomputed backward-search states for every kmer that can overlap the
//! neighborhood of a variant site, so read mapping can skip its trailing
//! `k` bases. Regions worth indexing are the variant sites extended
//! rightward by `max_read_size - 1` bases; within a region, kmers crossing
//! sites are enumerated by assembling region parts (alleles, inter-site
//! stretches) and walking every combination with a mixed-radix counter.

use std::collections::{BTreeSet, HashMap};

use crate::data::alphabet::{self, Base};
use crate::model::prg_index::PrgIndex;
use crate::model::search::{self, SearchStates};

/// Kmer-to-states map, keyed in forward orientation.
///
/// A kmer stored with an empty state set is "indexed but unmappable",
/// distinct from an absent kmer.
#[derive(Debug)]
pub struct KmerIndex {
    kmer_size: usize,
    map: HashMap<Vec<Base>, SearchStates>,
}

impl KmerIndex {
    /// Enumerate and backward-search all kmers worth indexing
    pub fn build(
        kmer_size: usize,
        max_read_size: usize,
        all_kmers: bool,
        index: &PrgIndex,
    ) -> Self {
        let kmers = if all_kmers {
            generate_all_kmers(kmer_size)
        } else {
            prg_overlap_kmers(kmer_size, max_read_size, index)
        };
        let map = kmers
            .into_iter()
            .map(|kmer| {
                let states = search::search_kmer(&kmer, index);
                (kmer, states)
            })
            .collect();
        Self { kmer_size, map }
    }

    /// Reassemble from deserialized entries
    pub fn from_entries(kmer_size: usize, entries: Vec<(Vec<Base>, SearchStates)>) -> Self {
        Self {
            kmer_size,
            map: entries.into_iter().collect(),
        }
    }

    pub fn kmer_size(&self) -> usize {
        self.kmer_size
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// States precomputed for a kmer, `None` when the kmer is not indexed
    pub fn get(&self, kmer: &[Base]) -> Option<&SearchStates> {
        self.map.get(kmer)
    }

    /// Entries ordered so consecutive kmers share maximal suffixes
    /// (reversed-sequence lexicographic order), the order the on-disk
    /// prefix-diff stream requires
    pub fn ordered_entries(&self) -> Vec<(&Vec<Base>, &SearchStates)> {
        let mut entries: Vec<_> = self.map.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.iter().rev().cmp(b.iter().rev()));
        entries
    }
}

/// All kmers overlapping variant-site neighborhoods, in forward
/// orientation ordered by reversed sequence
fn prg_overlap_kmers(kmer_size: usize, max_read_size: usize, index: &PrgIndex) -> Vec<Vec<Base>> {
    let site_regions = site_marker_regions(index);
    let ranges = combine_overlapping_ranges(kmer_region_ranges(
        &site_regions,
        max_read_size,
        index,
    ));

    let mut reverse_kmers: BTreeSet<Vec<Base>> = BTreeSet::new();
    for &(start, end) in &ranges {
        collect_region_reverse_kmers(start, end, kmer_size, index, &mut reverse_kmers);
    }
    reverse_kmers
        .into_iter()
        .map(|mut kmer| {
            kmer.reverse();
            kmer
        })
        .collect()
}

/// `(start_marker_index, end_marker_index)` of every variant site
fn site_marker_regions(index: &PrgIndex) -> Vec<(usize, usize)> {
    let mut open: HashMap<u32, usize> = HashMap::new();
    let mut regions = Vec::new();
    for count in 1..=index.masks.num_markers() {
        let marker_index = index.masks.marker_position(count);
        let symbol = index.prg.symbol(marker_index);
        if !alphabet::is_site_marker(symbol) {
            continue;
        }
        match open.remove(&symbol) {
            Some(start) => regions.push((start, marker_index)),
            None => {
                open.insert(symbol, marker_index);
            }
        }
    }
    regions
}

/// Extend each site region rightward to cover every kmer a read of
/// `max_read_size` ending there could need
fn kmer_region_ranges(
    site_regions: &[(usize, usize)],
    max_read_size: usize,
    index: &PrgIndex,
) -> Vec<(usize, usize)> {
    let last = index.prg.len() - 1;
    site_regions
        .iter()
        .map(|&(start, end)| {
            let mut region_end = (end + max_read_size - 1).min(last);
            if index.masks.within_site_region(region_end) {
                region_end = find_site_end_boundary(region_end, index);
            }
            (start, region_end)
        })
        .collect()
}

/// Merge overlapping index ranges
fn combine_overlapping_ranges(mut ranges: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    ranges.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Rightmost index of the site containing `within_idx` (which may itself
/// be a marker)
pub(crate) fn find_site_end_boundary(within_idx: usize, index: &PrgIndex) -> usize {
    let last = index.prg.len() - 1;
    let markers_before = index.masks.marker_rank(within_idx);
    for count in (markers_before + 1)..=index.masks.num_markers() {
        let marker_index = index.masks.marker_position(count);
        if !alphabet::is_site_marker(index.prg.symbol(marker_index)) {
            continue;
        }
        if marker_index == last {
            return marker_index;
        }
        if index.masks.allele_at(marker_index + 1) != 0 {
            // start boundary: the next position is allele content
            continue;
        }
        return marker_index;
    }
    0
}

/// Matching start-boundary index of a site's end boundary
fn find_site_start_boundary(end_idx: usize, index: &PrgIndex) -> usize {
    let target = index.prg.symbol(end_idx);
    let mut count = index.masks.marker_rank(end_idx);
    while count >= 1 {
        let marker_index = index.masks.marker_position(count);
        if index.prg.symbol(marker_index) == target {
            return marker_index;
        }
        count -= 1;
    }
    0
}

/// Whether `idx` is a site's end boundary marker
fn is_site_end_boundary(idx: usize, index: &PrgIndex) -> bool {
    if !alphabet::is_marker(index.prg.symbol(idx)) {
        return false;
    }
    if idx == index.prg.len() - 1 {
        return true;
    }
    index.masks.allele_at(idx + 1) == 0
}

/// The alleles of a site in PRG order
fn site_ordered_alleles(within_idx: usize, index: &PrgIndex) -> Vec<Vec<Base>> {
    let end_idx = find_site_end_boundary(within_idx, index);
    let boundary = index.prg.symbol(end_idx);

    let mut alleles = Vec::new();
    let mut allele: Vec<Base> = Vec::new();
    let mut i = end_idx;
    while i > 0 {
        i -= 1;
        let symbol = index.prg.symbol(i);
        if symbol == boundary || alphabet::is_allele_marker(symbol) {
            allele.reverse();
            alleles.push(std::mem::take(&mut allele));
            if symbol == boundary {
                break;
            }
            continue;
        }
        allele.push(symbol as Base);
    }
    alleles.reverse();
    alleles
}

/// Non-variant stretch right of a site's end boundary, up to the next
/// marker
fn nonvariant_region_after(end_idx: usize, index: &PrgIndex) -> Option<(usize, usize)> {
    let last = index.prg.len() - 1;
    if end_idx >= last {
        return None;
    }
    let start = end_idx + 1;
    let next_marker_offset = index.masks.marker_rank(end_idx) + 2;
    let end = if next_marker_offset > index.masks.num_markers() {
        last
    } else {
        index.masks.marker_position(next_marker_offset) - 1
    };
    if end < start {
        return None;
    }
    Some((start, end))
}

/// Site end boundaries reachable leftward from `scan_start` by a kmer of
/// `kmer_size`, leftmost first.
///
/// Distances are collapsed: a fully traversed site contributes one base
/// regardless of allele lengths, which intentionally overestimates
/// reachability.
fn sites_in_range_left(scan_start: usize, kmer_size: usize, index: &PrgIndex) -> Vec<usize> {
    let mut markers_before = index.masks.marker_rank(scan_start);
    if is_site_end_boundary(scan_start, index) {
        // rank is non-inclusive; a scan starting on an end boundary must
        // process that boundary itself
        markers_before += 1;
    }

    let mut inrange: Vec<usize> = Vec::new();
    let mut last_marker_index = 0usize;
    let mut handled_sites = 0usize;
    let mut total_intersite = 0usize;

    for count in (1..=markers_before).rev() {
        let marker_index = index.masks.marker_position(count);
        let symbol = index.prg.symbol(marker_index);

        if inrange.is_empty() {
            total_intersite = scan_start - marker_index;
            if total_intersite + handled_sites + 1 > kmer_size {
                break;
            }
            inrange.push(marker_index);
            last_marker_index = marker_index;
            continue;
        }

        if alphabet::is_allele_marker(symbol) {
            last_marker_index = marker_index;
            continue;
        }

        // Odd marker. If the marker processed just right of here was also
        // odd it must have been a site entry, so this one ends the next
        // site to the left; otherwise we are at the entry of the site
        // whose alleles we just walked.
        let last_was_site = alphabet::is_site_marker(index.prg.symbol(last_marker_index));
        if last_was_site {
            total_intersite += last_marker_index - marker_index - 1;
            if total_intersite + handled_sites + 1 > kmer_size {
                break;
            }
            inrange.push(marker_index);
        } else {
            handled_sites += 1;
        }
        last_marker_index = marker_index;
    }

    inrange.reverse();
    inrange
}

/// Assemble the alternative parts a kmer ending near `inrange` sites can
/// be built from: pre-site tail, alleles and inter-site stretches, and
/// the post-site tail
fn region_parts(inrange: &[usize], kmer_size: usize, index: &PrgIndex) -> Vec<Vec<Vec<Base>>> {
    let mut parts: Vec<Vec<Vec<Base>>> = Vec::new();

    // Up to kmer_size - 1 bases left of the leftmost reachable site; any
    // longer tail could only produce kmers that never overlap the site.
    let first_start = find_site_start_boundary(inrange[0], index);
    if first_start > 0 {
        let mut pre: Vec<Base> = Vec::new();
        let mut i = first_start;
        while i > 0 && pre.len() < kmer_size - 1 {
            i -= 1;
            let symbol = index.prg.symbol(i);
            if alphabet::is_marker(symbol) {
                break;
            }
            pre.push(symbol as Base);
        }
        pre.reverse();
        if !pre.is_empty() {
            parts.push(vec![pre]);
        }
    }

    for (i, &end_idx) in inrange.iter().enumerate() {
        parts.push(site_ordered_alleles(end_idx, index));
        if i + 1 < inrange.len() {
            if let Some((start, end)) = nonvariant_region_after(end_idx, index) {
                let stretch: Vec<Base> =
                    (start..=end).map(|p| index.prg.symbol(p) as Base).collect();
                parts.push(vec![stretch]);
            }
        }
    }

    add_post_site_parts(&mut parts, *inrange.last().expect("inrange sites"), kmer_size, index);
    parts
}

/// Append the region right of the rightmost reachable site, consuming up
/// to `kmer_size + 1` bases with each traversed site counting one
fn add_post_site_parts(
    parts: &mut Vec<Vec<Vec<Base>>>,
    end_idx: usize,
    kmer_size: usize,
    index: &PrgIndex,
) {
    let last = index.prg.len() - 1;
    if end_idx >= last {
        return;
    }

    let mut i = end_idx + 1;
    let mut consumed = 0usize;
    let mut nonvariant: Vec<Base> = Vec::new();

    while consumed < kmer_size + 1 && i <= last {
        if !index.masks.within_site_region(i) {
            nonvariant.push(index.prg.symbol(i) as Base);
            i += 1;
            consumed += 1;
            continue;
        }
        if !nonvariant.is_empty() {
            parts.push(vec![std::mem::take(&mut nonvariant)]);
        }
        let site_end = find_site_end_boundary(i, index);
        parts.push(site_ordered_alleles(site_end, index));
        if site_end == last {
            break;
        }
        i = site_end + 1;
        consumed += 1;
    }
    if !nonvariant.is_empty() {
        parts.push(vec![nonvariant]);
    }
}

/// Pull iterator over every choice-per-part concatenation.
///
/// A mixed-radix counter over the per-part alternative counts; the
/// consumer requests the next path, nothing is materialized up front.
struct PathIterator<'a> {
    parts: &'a [Vec<Vec<Base>>],
    digits: Vec<usize>,
    done: bool,
}

impl<'a> PathIterator<'a> {
    fn new(parts: &'a [Vec<Vec<Base>>]) -> Self {
        Self {
            parts,
            digits: vec![0; parts.len()],
            done: parts.iter().any(|alternatives| alternatives.is_empty()),
        }
    }
}

impl Iterator for PathIterator<'_> {
    type Item = Vec<Base>;

    fn next(&mut self) -> Option<Vec<Base>> {
        if self.done {
            return None;
        }
        let path: Vec<Base> = self
            .parts
            .iter()
            .zip(&self.digits)
            .flat_map(|(alternatives, &digit)| alternatives[digit].iter().copied())
            .collect();

        // advance the rightmost incrementable digit, reset everything
        // right of it
        let mut i = self.parts.len();
        loop {
            if i == 0 {
                self.done = true;
                break;
            }
            i -= 1;
            if self.digits[i] + 1 < self.parts[i].len() {
                self.digits[i] += 1;
                self.digits[i + 1..].fill(0);
                break;
            }
        }
        Some(path)
    }
}

/// Every length-k window of a path, stored back to front
fn collect_path_reverse_kmers(
    path: &[Base],
    kmer_size: usize,
    out: &mut BTreeSet<Vec<Base>>,
) {
    if path.len() < kmer_size {
        return;
    }
    for end in (kmer_size - 1..path.len()).rev() {
        let reverse_kmer: Vec<Base> = (0..kmer_size).map(|j| path[end - j]).collect();
        out.insert(reverse_kmer);
    }
}

/// Plain reverse kmer ending at `end_idx`, `None` when it cannot fit or
/// touches a marker
fn simple_reverse_kmer(end_idx: usize, kmer_size: usize, index: &PrgIndex) -> Option<Vec<Base>> {
    let start_idx = (end_idx + 1).checked_sub(kmer_size)?;
    let mut reverse_kmer = Vec::with_capacity(kmer_size);
    for i in (start_idx..=end_idx).rev() {
        let symbol = index.prg.symbol(i);
        if alphabet::is_marker(symbol) {
            return None;
        }
        reverse_kmer.push(symbol as Base);
    }
    Some(reverse_kmer)
}

/// Right-to-left scan of one merged region, collecting reverse kmers
fn collect_region_reverse_kmers(
    region_start: usize,
    region_end: usize,
    kmer_size: usize,
    index: &PrgIndex,
    out: &mut BTreeSet<Vec<Base>>,
) {
    let mut end_index = region_end;
    while end_index >= region_start {
        if end_index + 1 < kmer_size {
            break;
        }

        let inrange = sites_in_range_left(end_index, kmer_size, index);
        if !inrange.is_empty() {
            let parts = region_parts(&inrange, kmer_size, index);
            for path in PathIterator::new(&parts) {
                collect_path_reverse_kmers(&path, kmer_size, out);
            }
            // resume just left of the leftmost reachable site
            let first_start = find_site_start_boundary(inrange[0], index);
            if first_start == 0 {
                break;
            }
            end_index = first_start - 1;
            continue;
        }

        if !index.masks.within_site_region(end_index) {
            if let Some(reverse_kmer) = simple_reverse_kmer(end_index, kmer_size, index) {
                out.insert(reverse_kmer);
            }
        }
        if end_index == 0 {
            break;
        }
        end_index -= 1;
    }
}

/// Every length-k DNA string in lexicographic order (the degenerate
/// indexing mode).
///
/// The counter increments the rightmost base below T and terminates once
/// the increment position would pass the leftmost base.
pub fn generate_all_kmers(kmer_size: usize) -> Vec<Vec<Base>> {
    let mut kmers = Vec::new();
    let mut current = vec![1u8; kmer_size];
    loop {
        kmers.push(current.clone());
        let mut i = kmer_size;
        loop {
            if i == 0 {
                return kmers;
            }
            i -= 1;
            if current[i] < 4 {
                current[i] += 1;
                current[i + 1..].fill(1);
                break;
            }
        }
    }
}
