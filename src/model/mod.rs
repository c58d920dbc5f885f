//! # Model Module
//!
//! The algorithmic core: suffix array and FM-index construction, the vBWT
//! backward-search engine, the kmer indexer, and the coverage recorders.
//!
//! ## Sub-modules
//! - `suffix_array`: prefix-doubling suffix array and BWT
//! - `fm_index`: rank structures and backward-search steps
//! - `prg_index`: the immutable build product shared by all consumers
//! - `search`: the vBWT search state machine
//! - `kmer_index`: precomputed search states for site-overlapping kmers
//! - `coverage`: recording resolved mappings into coverage counters

pub mod coverage;
pub mod fm_index;
pub mod kmer_index;
pub mod prg_index;
pub mod search;
pub mod suffix_array;

pub use fm_index::{FmIndex, SaInterval};
pub use kmer_index::KmerIndex;
pub use prg_index::PrgIndex;
pub use search::{SearchState, SearchStates, VariantLocus, VariantSiteState};
