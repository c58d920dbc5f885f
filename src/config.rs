//! # Configuration Logic
//!
//! CLI argument parsing and validation using clap derive.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::error::{PrgmapError, Result};

/// prgmap: population reference graph indexing and read quasimapping
#[derive(Parser, Debug, Clone)]
#[command(name = "prgmap")]
#[command(version = "0.1.0")]
#[command(about = "Index a population reference graph and quasimap reads onto it", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Encode a linear PRG and build the FM-index, masks and kmer index
    Build(BuildArgs),
    /// Map reads against a built PRG index and record allele coverage
    Quasimap(QuasimapArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Directory for all build artifacts (created if missing)
    #[arg(long = "gram-dir", value_name = "DIR")]
    pub gram_dir: PathBuf,

    /// Linear PRG file: DNA letters interleaved with decimal variant markers
    #[arg(long, value_name = "FILE")]
    pub prg: PathBuf,

    /// Kmer length used to seed backward search
    #[arg(long = "kmer-size", default_value = "15")]
    pub kmer_size: u32,

    /// Maximum read length the kmer index must support
    #[arg(long = "max-read-size", default_value = "150")]
    pub max_read_size: u32,

    /// Index every possible kmer instead of only those near variant sites
    #[arg(long = "all-kmers", default_value = "false")]
    pub all_kmers: bool,
}

#[derive(Args, Debug, Clone)]
pub struct QuasimapArgs {
    /// Directory holding the build artifacts
    #[arg(long = "gram-dir", value_name = "DIR")]
    pub gram_dir: PathBuf,

    /// Reads files (FASTA or FASTQ, optionally gzipped); may be repeated
    #[arg(long, value_name = "FILE", required = true, num_args = 1..)]
    pub reads: Vec<PathBuf>,

    /// Number of worker threads (default: all available cores)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Run seed, echoed into the stats report for provenance
    #[arg(long)]
    pub seed: Option<u64>,
}

impl BuildArgs {
    /// Validate build parameters
    pub fn validate(&self) -> Result<()> {
        if !self.prg.exists() {
            return Err(PrgmapError::config(format!(
                "PRG file not found: {}",
                self.prg.display()
            )));
        }
        if self.kmer_size == 0 {
            return Err(PrgmapError::config("kmer-size must be positive"));
        }
        if self.kmer_size > 255 {
            // the kmer stream stores prefix-diff lengths in one byte
            return Err(PrgmapError::config("kmer-size must be at most 255"));
        }
        if self.max_read_size < self.kmer_size {
            return Err(PrgmapError::config(
                "max-read-size must be at least kmer-size",
            ));
        }
        if self.gram_dir.is_file() {
            return Err(PrgmapError::config(format!(
                "gram-dir cannot be an existing file: {}",
                self.gram_dir.display()
            )));
        }
        Ok(())
    }
}

impl QuasimapArgs {
    /// Validate quasimap parameters
    pub fn validate(&self) -> Result<()> {
        if !self.gram_dir.is_dir() {
            return Err(PrgmapError::config(format!(
                "gram-dir is not a directory: {}",
                self.gram_dir.display()
            )));
        }
        for path in &self.reads {
            if !path.exists() {
                return Err(PrgmapError::config(format!(
                    "reads file not found: {}",
                    path.display()
                )));
            }
        }
        if self.threads == Some(0) {
            return Err(PrgmapError::config("threads must be positive"));
        }
        Ok(())
    }

    /// Get the number of threads to use
    pub fn nthreads(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}
