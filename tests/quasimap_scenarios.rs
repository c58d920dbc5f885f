//! End-to-end quasimap scenarios: PRG in, coverage out.
//!
//! Each scenario builds an index from a literal PRG string, maps reads
//! through the kmer index, and checks the exact coverage tensors.

use prgmap::data::coverage::Coverage;
use prgmap::data::prg::Prg;
use prgmap::model::coverage::record_read_coverage;
use prgmap::model::kmer_index::KmerIndex;
use prgmap::model::prg_index::PrgIndex;
use prgmap::model::search::{self, VariantLocus};
use prgmap::model::SearchStates;

struct Fixture {
    index: PrgIndex,
    kmer_index: KmerIndex,
    coverage: Coverage,
}

impl Fixture {
    fn new(prg: &str, kmer_size: usize, max_read_size: usize) -> Self {
        let index = PrgIndex::build(Prg::parse(prg.as_bytes()).unwrap()).unwrap();
        let kmer_index = KmerIndex::build(kmer_size, max_read_size, false, &index);
        let coverage = Coverage::empty(&index.masks, index.num_sites());
        Self {
            index,
            kmer_index,
            coverage,
        }
    }

    fn map(&self, read: &str) -> SearchStates {
        let encoded = prgmap::data::alphabet::encode_read(read.as_bytes())
            .expect("test reads are plain ACGT");
        search::map_read(&encoded, &self.kmer_index, &self.index)
    }

    fn map_and_record(&self, read: &str) -> SearchStates {
        let states = self.map(read);
        record_read_coverage(&self.coverage, &states, read.len(), &self.index);
        states
    }
}

fn locus(site: u32, allele: u32) -> VariantLocus {
    VariantLocus { site, allele }
}

#[test]
fn read_through_first_allele_of_first_site() {
    let fx = Fixture::new("gct5c6g6t5ac7cc8a7", 3, 10);
    let states = fx.map_and_record("gctc");

    assert_eq!(states.len(), 1);
    assert_eq!(states[0].path, vec![locus(5, 1)]);
    assert_eq!(
        fx.coverage.allele_sum_counts(),
        vec![vec![1, 0, 0], vec![0, 0]]
    );
}

#[test]
fn read_selects_first_allele() {
    let fx = Fixture::new("aca5g6t5gcatt", 5, 8);
    let states = fx.map("acaggcat");
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].path, vec![locus(5, 1)]);
}

#[test]
fn read_selects_second_allele() {
    let fx = Fixture::new("aca5g6t5gcatt", 5, 8);
    let states = fx.map("acatgcat");
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].path, vec![locus(5, 2)]);
}

#[test]
fn grouped_counts_over_two_reads() {
    let fx = Fixture::new("gct5c6g6t5ac7cc8a7", 2, 10);
    fx.map_and_record("gctcaccc");
    fx.map_and_record("gcttaca");

    let grouped = fx.coverage.grouped_counts();
    // site 5: one read through allele 0, one through allele 2 (0-based)
    assert_eq!(grouped[0].get(&vec![0u32]), Some(&1));
    assert_eq!(grouped[0].get(&vec![1u32]), None);
    assert_eq!(grouped[0].get(&vec![2u32]), Some(&1));
    // site 7: one read through each allele
    assert_eq!(grouped[1].get(&vec![0u32]), Some(&1));
    assert_eq!(grouped[1].get(&vec![1u32]), Some(&1));
}

#[test]
fn base_coverage_of_single_base_allele() {
    let fx = Fixture::new("a5g6t5c", 1, 4);
    let states = fx.map_and_record("agc");

    assert_eq!(states.len(), 1);
    assert_eq!(states[0].path, vec![locus(5, 1)]);
    assert_eq!(
        fx.coverage.allele_base_counts(),
        vec![vec![vec![1], vec![0]]]
    );
}

#[test]
fn unmappable_read_changes_nothing() {
    let fx = Fixture::new("a5g6t5c", 1, 4);
    let states = fx.map_and_record("aaaa");

    assert!(states.is_empty());
    assert_eq!(fx.coverage.allele_sum_counts(), vec![vec![0, 0]]);
    assert_eq!(
        fx.coverage.allele_base_counts(),
        vec![vec![vec![0], vec![0]]]
    );
    assert!(fx.coverage.grouped_counts()[0].is_empty());
}

#[test]
fn read_shorter_than_kmer_size_cannot_map() {
    let fx = Fixture::new("aca5g6t5gcatt", 5, 8);
    assert!(fx.map("gcat").is_empty());
}

#[test]
fn read_ending_at_final_prg_position() {
    let fx = Fixture::new("aca5g6t5gcatt", 5, 8);
    let states = fx.map("acaggcatt");
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].path, vec![locus(5, 1)]);
}

#[test]
fn read_crossing_two_adjacent_sites() {
    let fx = Fixture::new("gct5c6g6t5ac7cc8a7", 2, 10);
    let states = fx.map("gctcaccc");
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].path, vec![locus(5, 1), locus(7, 1)]);
}

#[test]
fn allele_encapsulated_read_resolves_its_locus() {
    let fx = Fixture::new("gct5caca6g6t5ac", 2, 8);
    // "cac" sits strictly inside allele 1 of site 5
    let states = fx.map_and_record("cac");
    assert!(!states.is_empty());
    assert!(states.iter().all(|s| s.path == vec![locus(5, 1)]));
    assert_eq!(
        fx.coverage.allele_sum_counts(),
        vec![vec![states.len() as u64, 0, 0]]
    );
}

#[test]
fn coverage_is_additive_over_read_partitions() {
    let reads = ["gctc", "gcttac", "gctcaccc", "gctgac"];

    let all_at_once = Fixture::new("gct5c6g6t5ac7cc8a7", 2, 10);
    for read in &reads {
        all_at_once.map_and_record(read);
    }

    let split = Fixture::new("gct5c6g6t5ac7cc8a7", 2, 10);
    for read in reads.iter().rev() {
        split.map_and_record(read);
    }

    assert_eq!(
        all_at_once.coverage.allele_sum_counts(),
        split.coverage.allele_sum_counts()
    );
    assert_eq!(
        all_at_once.coverage.allele_base_counts(),
        split.coverage.allele_base_counts()
    );
    assert_eq!(
        all_at_once.coverage.grouped_counts(),
        split.coverage.grouped_counts()
    );
}
