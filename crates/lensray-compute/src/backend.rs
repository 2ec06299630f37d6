//! Compute backend trait and device description.
//!
//! The [`ComputeBackend`] trait abstracts over execution strategies so that
//! the tracer in `lensray-core` stays agnostic of threading. Backends only
//! ever see independent, index-addressed work items; results come back in
//! index order regardless of execution order.

use thiserror::Error;

/// Errors originating from compute backends.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Backend not available: {0}")]
    Unavailable(String),

    #[error("Failed to build thread pool: {0}")]
    ThreadPool(String),
}

/// Describes the capabilities of a compute backend.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub backend_type: BackendType,
    pub threads: usize,
}

/// The type of compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Serial,
    Cpu,
}

impl std::str::FromStr for BackendType {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "serial" => Ok(BackendType::Serial),
            "cpu" | "auto" => Ok(BackendType::Cpu),
            other => Err(ComputeError::Unavailable(format!(
                "unknown backend '{other}' (expected 'serial', 'cpu' or 'auto')"
            ))),
        }
    }
}

/// Abstraction over execution strategies for independent work items.
pub trait ComputeBackend: Send + Sync {
    /// Return information about the backend.
    fn device_info(&self) -> DeviceInfo;

    /// Evaluate `f(0..count)` and return the results in index order.
    ///
    /// `f` must not depend on evaluation order; backends are free to run
    /// items concurrently.
    fn map_indexed<T, F>(&self, count: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync;
}
