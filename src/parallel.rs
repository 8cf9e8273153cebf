//! Parallel processing configuration
//!
//! The overlay's per-cell intersection loop and the normalizer's per-record
//! rescaling run on Rayon's global pool; this module configures its size.

use crate::errors::{RemapError, Result};
use rayon::ThreadPoolBuilder;

/// Size of the global pool; `None` leaves Rayon's default (one thread per core)
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Initializes the global Rayon pool. Zero threads is rejected; the pool
    /// can only be built once per process.
    pub fn setup_global_pool(&self) -> Result<()> {
        match self.num_threads {
            Some(0) => Err(RemapError::ThreadPool(
                "thread count must be at least 1".to_string(),
            )),
            Some(num_threads) => {
                ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build_global()
                    .map_err(|e| {
                        RemapError::ThreadPool(format!(
                            "failed to initialize pool with {num_threads} threads: {e}"
                        ))
                    })?;
                tracing::info!(threads = num_threads, "configured overlay thread pool");
                Ok(())
            }
            None => {
                tracing::debug!("using default thread pool configuration");
                Ok(())
            }
        }
    }
}

/// Threads in the active pool next to the cores the machine reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelInfo {
    pub current_threads: usize,
    pub available_cores: usize,
}

impl ParallelInfo {
    pub fn current() -> Self {
        Self {
            current_threads: rayon::current_num_threads(),
            available_cores: num_cpus::get(),
        }
    }

    pub fn log(&self) {
        tracing::debug!(
            threads = self.current_threads,
            cores = self.available_cores,
            "parallel processing environment"
        );
    }
}
