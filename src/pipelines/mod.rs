//! # Pipelines Module
//!
//! High-level workflow orchestration for the two subcommands.

pub mod build;
pub mod quasimap;

pub use build::BuildPipeline;
pub use quasimap::QuasimapPipeline;
