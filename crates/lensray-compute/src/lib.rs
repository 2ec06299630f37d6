//! # LensRay Compute
//!
//! Compute backend abstraction for the LensRay framework. Tracing a ray
//! bundle is embarrassingly parallel: every ray is a pure function of the
//! (read-only) optical system and its starting state. The
//! [`ComputeBackend`](backend::ComputeBackend) trait isolates the tracer
//! from how that independent work is scheduled.
//!
//! ## Available backends
//!
//! | Backend | Feature flag | Notes |
//! |---------|-------------|-------|
//! | Serial | always | Deterministic single-thread execution |
//! | CPU (Rayon) | `cpu` (default) | Global pool or a dedicated pool |

pub mod backend;
pub mod serial;

#[cfg(feature = "cpu")]
pub mod cpu;

pub use backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo};
pub use serial::SerialBackend;

#[cfg(feature = "cpu")]
pub use cpu::CpuBackend;
