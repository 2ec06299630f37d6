//! Damped least-squares solving.
//!
//! [`lm::LmSolver`] is a generic Levenberg-Marquardt engine driven through
//! the [`lm::LmObjective`] trait. Two clients ship with the crate:
//!
//! - [`chief_ray::ChiefRayFinder`] aims a field's chief ray through the
//!   centre of the aperture stop.
//! - [`adjust::AutoAdjuster`] nudges prescription parameters until traced
//!   ray quantities meet their targets.

pub mod adjust;
pub mod chief_ray;
pub mod gauss_jordan;
pub mod lm;

use thiserror::Error;

use crate::system::SystemError;
use crate::trace::TraceError;
use lm::{BadReason, LmStatus};

/// Errors from solver clients.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SolverError {
    #[error("System has no aperture stop")]
    NoApertureStop,

    #[error(transparent)]
    System(#[from] SystemError),

    #[error("Trace failed: {0}")]
    Trace(#[from] TraceError),

    #[error(
        "Solver did not converge after {iterations} iterations \
         (status {status:?}, sum of squares {sum_of_squares:.3e})"
    )]
    DidNotConverge {
        iterations: usize,
        status: LmStatus,
        reason: Option<BadReason>,
        sum_of_squares: f64,
    },

    #[error("Invalid solver setup: {0}")]
    InvalidSetup(String),
}
