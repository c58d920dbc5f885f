//! # Threading Configuration
//!
//! Rayon thread-pool setup for the quasimap worker pool.

use crate::error::{PrgmapError, Result};

/// Create a configured thread pool with named workers
pub fn build_thread_pool(n_threads: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .thread_name(|i| format!("prgmap-worker-{i}"))
        .build()
        .map_err(|e| PrgmapError::config(format!("failed to create thread pool: {e}")))
}
