//! CPU compute backend using Rayon for shared-memory parallelism.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo};

/// CPU backend that parallelises work across threads via Rayon.
///
/// By default work runs on Rayon's global pool. [`CpuBackend::with_threads`]
/// builds a dedicated pool instead, so a job can be confined to a fixed
/// number of threads.
pub struct CpuBackend {
    pool: Option<ThreadPool>,
}

impl CpuBackend {
    /// Create a new CPU backend on the global Rayon pool.
    pub fn new() -> Self {
        Self { pool: None }
    }

    /// Create a CPU backend with its own pool of `num_threads` threads.
    pub fn with_threads(num_threads: usize) -> Result<Self, ComputeError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("lensray-trace-{i}"))
            .build()
            .map_err(|e| ComputeError::ThreadPool(e.to_string()))?;
        Ok(Self { pool: Some(pool) })
    }

    fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuBackend")
            .field("threads", &self.num_threads())
            .field("dedicated_pool", &self.pool.is_some())
            .finish()
    }
}

impl ComputeBackend for CpuBackend {
    fn device_info(&self) -> DeviceInfo {
        let threads = self.num_threads();
        DeviceInfo {
            name: format!("CPU ({threads} threads)"),
            backend_type: BackendType::Cpu,
            threads,
        }
    }

    fn map_indexed<T, F>(&self, count: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        let run = || -> Vec<T> { (0..count).into_par_iter().map(&f).collect() };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_map_is_index_ordered() {
        let backend = CpuBackend::new();
        let out = backend.map_indexed(1000, |i| 2 * i + 1);
        assert_eq!(out.len(), 1000);
        assert!(out.iter().enumerate().all(|(i, v)| *v == 2 * i + 1));
    }

    #[test]
    fn test_dedicated_pool() {
        let backend = CpuBackend::with_threads(2).unwrap();
        assert_eq!(backend.device_info().threads, 2);
        assert_eq!(backend.device_info().backend_type, BackendType::Cpu);
        let sum: usize = backend.map_indexed(100, |i| i).into_iter().sum();
        assert_eq!(sum, 4950);
    }
}
