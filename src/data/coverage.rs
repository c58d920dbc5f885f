//! # Coverage State
//!
//! The only mutable state at quasimap time. Three structures are kept per
//! PRG: per-allele read counts, per-allele per-base counts, and grouped
//! allele-class counts. The two count tensors are plain atomics so worker
//! threads record without locking; the grouped maps are keyed by dynamic
//! allele-id sets and each site's map sits behind its own mutex.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::data::alphabet::{site_index, AlleleId};
use crate::data::masks::Masks;

/// Sorted, deduplicated 0-based allele ids a read's mapping touched at one
/// site
pub type AlleleGroup = Vec<AlleleId>;

/// Coverage counters for one PRG
#[derive(Debug)]
pub struct Coverage {
    /// `allele_sum[site][allele]`: reads whose path traversed the allele
    pub allele_sum: Vec<Vec<AtomicU64>>,
    /// `allele_base[site][allele][base]`: reads covering the base,
    /// saturating at `u16::MAX`
    pub allele_base: Vec<Vec<Vec<AtomicU16>>>,
    /// `grouped[site]`: per allele-id group, the number of reads mapping
    /// ambiguously across exactly that group
    pub grouped: Vec<Mutex<HashMap<AlleleGroup, u64>>>,
}

impl Coverage {
    /// Allocate empty coverage shaped by the PRG's sites and alleles
    pub fn empty(masks: &Masks, num_sites: usize) -> Self {
        let lengths = allele_lengths(masks, num_sites);

        let allele_sum = lengths
            .iter()
            .map(|site| site.iter().map(|_| AtomicU64::new(0)).collect())
            .collect();
        let allele_base = lengths
            .iter()
            .map(|site| {
                site.iter()
                    .map(|&len| (0..len).map(|_| AtomicU16::new(0)).collect())
                    .collect()
            })
            .collect();
        let grouped = (0..num_sites).map(|_| Mutex::new(HashMap::new())).collect();

        Self {
            allele_sum,
            allele_base,
            grouped,
        }
    }

    pub fn num_sites(&self) -> usize {
        self.allele_sum.len()
    }

    /// Increment one allele-sum counter
    pub fn add_allele_sum(&self, site_idx: usize, allele_idx: usize) {
        self.allele_sum[site_idx][allele_idx].fetch_add(1, Ordering::Relaxed);
    }

    /// Increment one base counter, saturating at `u16::MAX`.
    ///
    /// The saturation check is a plain load; a lost increment while racing
    /// at the ceiling is tolerated.
    pub fn add_base(&self, site_idx: usize, allele_idx: usize, base_idx: usize) {
        let counter = &self.allele_base[site_idx][allele_idx][base_idx];
        if counter.load(Ordering::Relaxed) < u16::MAX {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Increment the grouped count of one allele class at one site
    pub fn add_group(&self, site_idx: usize, group: AlleleGroup) {
        let mut map = self.grouped[site_idx].lock().expect("grouped map poisoned");
        *map.entry(group).or_insert(0) += 1;
    }

    /// Plain-integer snapshot of the allele-sum tensor
    pub fn allele_sum_counts(&self) -> Vec<Vec<u64>> {
        self.allele_sum
            .iter()
            .map(|site| site.iter().map(|c| c.load(Ordering::Relaxed)).collect())
            .collect()
    }

    /// Plain-integer snapshot of the base-coverage tensor
    pub fn allele_base_counts(&self) -> Vec<Vec<Vec<u16>>> {
        self.allele_base
            .iter()
            .map(|site| {
                site.iter()
                    .map(|allele| allele.iter().map(|c| c.load(Ordering::Relaxed)).collect())
                    .collect()
            })
            .collect()
    }

    /// Snapshot of the grouped counts
    pub fn grouped_counts(&self) -> Vec<HashMap<AlleleGroup, u64>> {
        self.grouped
            .iter()
            .map(|m| m.lock().expect("grouped map poisoned").clone())
            .collect()
    }
}

/// Per-site, per-allele base lengths, read off the masks.
///
/// Contiguous nonzero runs of the sites mask are exactly the alleles
/// (separators and boundaries carry mask value zero).
pub fn allele_lengths(masks: &Masks, num_sites: usize) -> Vec<Vec<usize>> {
    let mut lengths: Vec<Vec<usize>> = vec![Vec::new(); num_sites];
    let mut run_len = 0usize;
    let mut run_site = 0u32;

    for &site in masks.sites.iter().chain(std::iter::once(&0)) {
        if site != 0 {
            run_len += 1;
            run_site = site;
            continue;
        }
        if run_len > 0 {
            lengths[site_index(run_site)].push(run_len);
            run_len = 0;
        }
    }
    lengths
}
