//! # Build Pipeline
//!
//! Orchestrates the build workflow:
//! 1. Parse and encode the linear PRG
//! 2. Build the FM-index and masks, validate PRG structure
//! 3. Enumerate site-overlapping kmers and precompute their search states
//! 4. Persist everything under the gram directory

use tracing::info;

use crate::config::BuildArgs;
use crate::data::prg::Prg;
use crate::error::Result;
use crate::io;
use crate::model::kmer_index::KmerIndex;
use crate::model::prg_index::PrgIndex;

/// Build pipeline
pub struct BuildPipeline {
    args: BuildArgs,
}

impl BuildPipeline {
    pub fn new(args: BuildArgs) -> Self {
        Self { args }
    }

    pub fn run(&self) -> Result<()> {
        info!(prg = %self.args.prg.display(), "encoding PRG");
        let prg = Prg::from_file(&self.args.prg)?;
        info!(
            symbols = prg.len(),
            sites = prg.num_sites(),
            max_symbol = prg.max_alphabet,
            "PRG encoded"
        );

        info!("building FM-index and masks");
        let index = PrgIndex::build(prg)?;

        info!(
            kmer_size = self.args.kmer_size,
            max_read_size = self.args.max_read_size,
            all_kmers = self.args.all_kmers,
            "indexing kmers"
        );
        let kmer_index = KmerIndex::build(
            self.args.kmer_size as usize,
            self.args.max_read_size as usize,
            self.args.all_kmers,
            &index,
        );
        info!(kmers = kmer_index.len(), "kmer index built");

        io::index::save_build(&self.args.gram_dir, &index, &kmer_index)?;
        info!(gram_dir = %self.args.gram_dir.display(), "build artifacts written");
        Ok(())
    }
}
