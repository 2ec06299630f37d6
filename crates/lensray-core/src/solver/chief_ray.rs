//! Chief-ray aiming.
//!
//! The chief ray of a field is the ray that passes through the centre of
//! the aperture stop. It is found by solving for the two launch
//! coordinates on the first vertex plane that zero the ray's (x, y) in the
//! stop's local frame. The Jacobian is taken by central differences.

use lensray_geometry::Vec3;

use super::lm::{is_bad, LmObjective, LmReport, LmSolver, LmStatus, BIG_VAL};
use super::SolverError;
use crate::system::{ElementId, OpticalSystem};
use crate::trace::{FieldPoint, SequentialTracer};
use crate::types::TracedRay;

/// Central-difference step on the launch coordinates (system units).
pub const CHIEF_RAY_DELTA: f64 = 1e-6;
/// Default relative-rise tolerance.
pub const CHIEF_RAY_TOLERANCE: f64 = 1e-20;
/// Default iteration budget.
pub const CHIEF_RAY_MAX_ITERATIONS: usize = 50;

/// A solved chief ray.
#[derive(Debug, Clone, PartialEq)]
pub struct ChiefRay {
    /// Launch point on the first vertex plane (local x, y).
    pub aim: [f64; 2],
    pub ray: TracedRay,
    /// Remaining offset from the stop centre.
    pub stop_residual: [f64; 2],
    pub report: LmReport,
}

struct ChiefRayObjective<'a> {
    tracer: SequentialTracer<'a>,
    stop: ElementId,
    field: FieldPoint,
    wavelength_nm: f64,
    params: [f64; 2],
    residuals: [f64; 2],
    jacobian: [[f64; 2]; 2],
}

impl ChiefRayObjective<'_> {
    fn trace(&self, params: [f64; 2]) -> Option<TracedRay> {
        let ray = self
            .field
            .ray_through(self.tracer.system(), params[0], params[1], self.wavelength_nm);
        self.tracer.trace(&ray).ok()
    }

    fn evaluate(&self, params: [f64; 2]) -> Option<[f64; 2]> {
        let traced = self.trace(params)?;
        let at_stop = traced.segment_at(self.stop)?;
        Some([at_stop.local_point.x, at_stop.local_point.y])
    }
}

impl LmObjective for ChiefRayObjective<'_> {
    fn compute_residuals(&mut self) -> f64 {
        match self.evaluate(self.params) {
            Some(r) => {
                self.residuals = r;
                r[0] * r[0] + r[1] * r[1]
            }
            None => BIG_VAL,
        }
    }

    fn build_jacobian(&mut self) -> bool {
        for j in 0..2 {
            let mut plus = self.params;
            let mut minus = self.params;
            plus[j] += CHIEF_RAY_DELTA;
            minus[j] -= CHIEF_RAY_DELTA;
            let (Some(rp), Some(rm)) = (self.evaluate(plus), self.evaluate(minus)) else {
                return false;
            };
            for i in 0..2 {
                self.jacobian[i][j] = (rp[i] - rm[i]) / (2.0 * CHIEF_RAY_DELTA);
            }
        }
        !is_bad(self.compute_residuals())
    }

    fn residual(&self, i: usize) -> f64 {
        self.residuals[i]
    }

    fn jacobian(&self, i: usize, j: usize) -> f64 {
        self.jacobian[i][j]
    }

    fn nudge(&mut self, delta: &[f64]) -> f64 {
        self.params[0] += delta[0];
        self.params[1] += delta[1];
        self.compute_residuals()
    }
}

/// Finds chief rays for one system.
#[derive(Debug, Clone, Copy)]
pub struct ChiefRayFinder<'a> {
    system: &'a OpticalSystem,
    stop: ElementId,
    tolerance: f64,
    max_iterations: usize,
}

impl<'a> ChiefRayFinder<'a> {
    pub fn new(system: &'a OpticalSystem) -> Result<Self, SolverError> {
        let stop = system.aperture_stop().ok_or(SolverError::NoApertureStop)?;
        Ok(Self {
            system,
            stop,
            tolerance: CHIEF_RAY_TOLERANCE,
            max_iterations: CHIEF_RAY_MAX_ITERATIONS,
        })
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn stop(&self) -> ElementId {
        self.stop
    }

    /// Solve for the chief ray of `field` at `wavelength_nm`.
    pub fn find(&self, field: &FieldPoint, wavelength_nm: f64) -> Result<ChiefRay, SolverError> {
        let mut objective = ChiefRayObjective {
            tracer: SequentialTracer::new(self.system),
            stop: self.stop,
            field: *field,
            wavelength_nm,
            params: [0.0; 2],
            residuals: [0.0; 2],
            jacobian: [[0.0; 2]; 2],
        };
        let guess = self.initial_guess(field)?;
        if objective.evaluate(guess).is_some() {
            objective.params = guess;
        }

        let report = LmSolver::new(&mut objective, self.tolerance, 2, 2).solve(self.max_iterations);
        if report.status != LmStatus::Level {
            log::warn!(
                "chief ray for {field:?} at {wavelength_nm} nm did not converge: {:?}",
                report.status
            );
            return Err(SolverError::DidNotConverge {
                iterations: report.iterations,
                status: report.status,
                reason: report.reason,
                sum_of_squares: report.sum_of_squares,
            });
        }

        let aim = objective.params;
        let ray = field.ray_through(self.system, aim[0], aim[1], wavelength_nm);
        let traced = SequentialTracer::new(self.system).trace(&ray)?;
        let at_stop = traced
            .segment_at(self.stop)
            .map(|s| [s.local_point.x, s.local_point.y])
            .unwrap_or([f64::NAN; 2]);
        log::debug!(
            "chief ray for {field:?}: aim ({:.6}, {:.6}) after {} iterations",
            aim[0],
            aim[1],
            report.iterations
        );
        Ok(ChiefRay {
            aim,
            ray: traced,
            stop_residual: at_stop,
            report,
        })
    }

    /// Where a straight line from the field through the stop centre meets
    /// the first vertex plane.
    fn initial_guess(&self, field: &FieldPoint) -> Result<[f64; 2], SolverError> {
        let first = self.system.first_surface();
        let to_first = self.system.cache().global_inverse(first)?;
        let stop = to_first.apply_point(&self.system.position(self.stop)?);
        let point = match *field {
            FieldPoint::Angle { .. } => {
                let probe = field.ray_through(self.system, 0.0, 0.0, 1.0);
                let d = to_first.apply_vector(&probe.direction);
                stop - d * (stop.z / d.z)
            }
            FieldPoint::Point { position } => {
                let origin = to_first.apply_point(&Vec3::from(position));
                let span = stop.z - origin.z;
                if span.abs() < f64::EPSILON {
                    return Ok([0.0; 2]);
                }
                origin + (stop - origin) * (-origin.z / span)
            }
        };
        if point.x.is_finite() && point.y.is_finite() {
            Ok([point.x, point.y])
        } else {
            Ok([0.0; 2])
        }
    }
}
