//! # I/O Module
//!
//! File boundaries: reads input, bit-packed persistence of the build
//! artifacts, and the coverage dumps.

pub mod coverage_out;
pub mod index;
pub mod packed;
pub mod reads;

pub use coverage_out::ReadStats;
pub use index::GramPaths;
