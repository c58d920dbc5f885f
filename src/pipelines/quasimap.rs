//! # Quasimap Pipeline
//!
//! Orchestrates read mapping:
//! 1. Load the persisted PRG index and kmer index
//! 2. Partition reads across the worker pool; each worker maps reads
//!    against the shared immutable index and records coverage through
//!    atomic counters
//! 3. Dump the three coverage files and the run report
//!
//! Coverage is commutative under read order, so the parallel partitioning
//! never changes the output.

use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use tracing::info;

use crate::config::QuasimapArgs;
use crate::data::coverage::Coverage;
use crate::error::Result;
use crate::io::coverage_out::{self, ReadStats};
use crate::io::{self, GramPaths};
use crate::model::{coverage as coverage_record, search};
use crate::utils::threading;

/// Quasimap pipeline
pub struct QuasimapPipeline {
    args: QuasimapArgs,
}

impl QuasimapPipeline {
    pub fn new(args: QuasimapArgs) -> Self {
        Self { args }
    }

    pub fn run(&self) -> Result<ReadStats> {
        info!(gram_dir = %self.args.gram_dir.display(), "loading build artifacts");
        let (index, kmer_index) = io::index::load_build(&self.args.gram_dir)?;
        info!(
            sites = index.num_sites(),
            kmers = kmer_index.len(),
            "index loaded"
        );

        let coverage = Coverage::empty(&index.masks, index.num_sites());
        let pool = threading::build_thread_pool(self.args.nthreads())?;

        let mut processed = 0u64;
        let mut skipped = 0u64;
        let mapped = AtomicU64::new(0);

        for reads_path in &self.args.reads {
            info!(reads = %reads_path.display(), "mapping reads");
            let encoded = io::reads::load_encoded_reads(reads_path)?;
            processed += encoded.reads.len() as u64 + encoded.skipped;
            skipped += encoded.skipped;

            pool.install(|| {
                encoded.reads.par_iter().for_each(|read| {
                    let states = search::map_read(read, &kmer_index, &index);
                    if states.is_empty() {
                        return;
                    }
                    mapped.fetch_add(1, Ordering::Relaxed);
                    coverage_record::record_read_coverage(&coverage, &states, read.len(), &index);
                });
            });
        }

        let stats = ReadStats {
            reads_processed: processed,
            reads_mapped: mapped.into_inner(),
            reads_skipped: skipped,
            seed: self.args.seed,
        };
        info!(
            processed = stats.reads_processed,
            mapped = stats.reads_mapped,
            skipped = stats.reads_skipped,
            "quasimap finished"
        );

        let paths = GramPaths::new(&self.args.gram_dir);
        coverage_out::write_allele_sum(&paths.allele_sum_coverage, &coverage)?;
        coverage_out::write_allele_base(&paths.allele_base_coverage, &coverage)?;
        coverage_out::write_grouped_allele_counts(&paths.grouped_allele_counts, &coverage)?;
        coverage_out::write_report(&paths.report, &stats)?;
        Ok(stats)
    }
}
