//! Automatic adjustment of prescription parameters.
//!
//! Each [`AdjustVariable`] names a curvature, thickness or conic constant
//! of a prescription row. Each [`AdjustGoal`] traces one ray and asks for a
//! height or slope at some surface to take a target value. The adjuster
//! rebuilds the system from the prescription whenever the variables move,
//! so thickness changes shift every later surface.
//!
//! A nudge that produces an unbuildable system or a failed trace yields
//! [`BIG_VAL`] and is rejected by the solver as uphill.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::lm::{is_bad, LmObjective, LmReport, LmSolver, LmStatus, BIG_VAL};
use super::SolverError;
use crate::system::{Prescription, SystemError};
use crate::trace::{FieldPoint, SequentialTracer};

/// Central-difference step on every variable.
pub const ADJUST_DELTA: f64 = 1e-6;
pub const ADJUST_TOLERANCE: f64 = 1e-16;
pub const ADJUST_MAX_ITERATIONS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Curvature,
    Thickness,
    Conic,
}

/// A prescription parameter the adjuster may change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustVariable {
    /// Prescription row.
    pub surface: usize,
    pub kind: VariableKind,
}

impl AdjustVariable {
    pub fn new(surface: usize, kind: VariableKind) -> Self {
        Self { surface, kind }
    }

    fn get(&self, rx: &Prescription) -> f64 {
        let row = &rx.surfaces[self.surface];
        match self.kind {
            VariableKind::Curvature => row.resolved_curve().curvature(),
            VariableKind::Thickness => row.thickness,
            VariableKind::Conic => row.resolved_curve().conic(),
        }
    }

    fn set(&self, rx: &mut Prescription, value: f64) {
        let row = &mut rx.surfaces[self.surface];
        match self.kind {
            VariableKind::Curvature => {
                let curve = row.resolved_curve().with_curvature(value);
                row.set_curve(curve);
            }
            VariableKind::Thickness => row.thickness = value,
            VariableKind::Conic => {
                let curve = row.resolved_curve().with_conic(value);
                row.set_curve(curve);
            }
        }
    }
}

/// What a goal measures on its traced ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalQuantity {
    /// x of the intercept in the surface's local frame.
    HeightX,
    /// y of the intercept in the surface's local frame.
    HeightY,
    /// Outgoing dx/dz.
    SlopeX,
    /// Outgoing dy/dz.
    SlopeY,
}

fn default_weight() -> f64 {
    1.0
}

/// A target for one traced-ray quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustGoal {
    #[serde(default)]
    pub field: FieldPoint,
    /// Launch point on the first vertex plane.
    #[serde(default)]
    pub pupil: [f64; 2],
    pub wavelength_nm: f64,
    /// Prescription row at which the quantity is read.
    pub surface: usize,
    pub quantity: GoalQuantity,
    #[serde(default)]
    pub target: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl AdjustGoal {
    /// A unit-weight goal for a ray of `field` launched at `pupil`.
    pub fn new(
        field: FieldPoint,
        pupil: [f64; 2],
        wavelength_nm: f64,
        surface: usize,
        quantity: GoalQuantity,
        target: f64,
    ) -> Self {
        Self {
            field,
            pupil,
            wavelength_nm,
            surface,
            quantity,
            target,
            weight: 1.0,
        }
    }
}

struct AdjustObjective<'a> {
    base: &'a Prescription,
    variables: &'a [AdjustVariable],
    goals: &'a [AdjustGoal],
    params: Vec<f64>,
    residuals: Vec<f64>,
    jacobian: Array2<f64>,
}

impl AdjustObjective<'_> {
    fn apply(&self, params: &[f64]) -> Prescription {
        let mut rx = self.base.clone();
        for (variable, value) in self.variables.iter().zip(params) {
            variable.set(&mut rx, *value);
        }
        rx
    }

    fn try_evaluate(&self, params: &[f64]) -> Result<Vec<f64>, SolverError> {
        let system = self.apply(params).build()?;
        let tracer = SequentialTracer::new(&system);
        self.goals
            .iter()
            .map(|goal| {
                let surface = *system
                    .sequence()
                    .get(goal.surface)
                    .ok_or_else(|| {
                        SystemError::InvalidSurface(format!("no surface at row {}", goal.surface))
                    })?;
                let ray = goal
                    .field
                    .ray_through(&system, goal.pupil[0], goal.pupil[1], goal.wavelength_nm);
                let traced = tracer.trace(&ray)?;
                let segment = traced
                    .segment_at(surface)
                    .ok_or(SystemError::UnknownElement(surface))?;
                let value = match goal.quantity {
                    GoalQuantity::HeightX => segment.local_point.x,
                    GoalQuantity::HeightY => segment.local_point.y,
                    GoalQuantity::SlopeX => segment.slope_x(),
                    GoalQuantity::SlopeY => segment.slope_y(),
                };
                Ok(goal.weight * (value - goal.target))
            })
            .collect()
    }

    fn evaluate(&self, params: &[f64]) -> Option<Vec<f64>> {
        self.try_evaluate(params).ok()
    }
}

impl LmObjective for AdjustObjective<'_> {
    fn compute_residuals(&mut self) -> f64 {
        match self.evaluate(&self.params) {
            Some(r) => {
                let sos = r.iter().map(|v| v * v).sum();
                self.residuals = r;
                sos
            }
            None => BIG_VAL,
        }
    }

    fn build_jacobian(&mut self) -> bool {
        for j in 0..self.params.len() {
            let mut plus = self.params.clone();
            let mut minus = self.params.clone();
            plus[j] += ADJUST_DELTA;
            minus[j] -= ADJUST_DELTA;
            let (Some(rp), Some(rm)) = (self.evaluate(&plus), self.evaluate(&minus)) else {
                return false;
            };
            for i in 0..rp.len() {
                self.jacobian[[i, j]] = (rp[i] - rm[i]) / (2.0 * ADJUST_DELTA);
            }
        }
        !is_bad(self.compute_residuals())
    }

    fn residual(&self, i: usize) -> f64 {
        self.residuals[i]
    }

    fn jacobian(&self, i: usize, j: usize) -> f64 {
        self.jacobian[[i, j]]
    }

    fn nudge(&mut self, delta: &[f64]) -> f64 {
        for (p, d) in self.params.iter_mut().zip(delta) {
            *p += d;
        }
        self.compute_residuals()
    }
}

/// The outcome of an adjustment.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustResult {
    /// The prescription with the final variable values applied.
    pub prescription: Prescription,
    /// Final variable values, in the order given.
    pub values: Vec<f64>,
    /// Final weighted goal residuals, in the order given.
    pub residuals: Vec<f64>,
    pub report: LmReport,
}

/// Adjusts prescription variables to meet ray goals.
#[derive(Debug, Clone)]
pub struct AutoAdjuster {
    prescription: Prescription,
    variables: Vec<AdjustVariable>,
    goals: Vec<AdjustGoal>,
    tolerance: f64,
    max_iterations: usize,
}

impl AutoAdjuster {
    pub fn new(
        prescription: Prescription,
        variables: Vec<AdjustVariable>,
        goals: Vec<AdjustGoal>,
    ) -> Result<Self, SolverError> {
        if variables.is_empty() {
            return Err(SolverError::InvalidSetup("no variables to adjust".into()));
        }
        if goals.is_empty() {
            return Err(SolverError::InvalidSetup("no goals to meet".into()));
        }
        let rows = prescription.surfaces.len();
        if let Some(v) = variables.iter().find(|v| v.surface >= rows) {
            return Err(SolverError::InvalidSetup(format!(
                "variable refers to row {} of a {rows}-row prescription",
                v.surface
            )));
        }
        if let Some(g) = goals.iter().find(|g| g.surface >= rows) {
            return Err(SolverError::InvalidSetup(format!(
                "goal refers to row {} of a {rows}-row prescription",
                g.surface
            )));
        }
        Ok(Self {
            prescription,
            variables,
            goals,
            tolerance: ADJUST_TOLERANCE,
            max_iterations: ADJUST_MAX_ITERATIONS,
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

    /// Run the solver. Both [`LmStatus::Level`] and [`LmStatus::MaxIter`]
    /// return the best prescription found; check `report.status`.
    pub fn run(&self) -> Result<AdjustResult, SolverError> {
        let params: Vec<f64> = self
            .variables
            .iter()
            .map(|v| v.get(&self.prescription))
            .collect();
        let mut objective = AdjustObjective {
            base: &self.prescription,
            variables: &self.variables,
            goals: &self.goals,
            jacobian: Array2::zeros((self.goals.len(), params.len())),
            residuals: Vec::new(),
            params,
        };
        // Surface the precise reason if the starting point is unusable.
        objective.try_evaluate(&objective.params)?;

        let report = LmSolver::new(
            &mut objective,
            self.tolerance,
            self.variables.len(),
            self.goals.len(),
        )
        .solve(self.max_iterations);
        if report.status == LmStatus::Bad {
            return Err(SolverError::DidNotConverge {
                iterations: report.iterations,
                status: report.status,
                reason: report.reason,
                sum_of_squares: report.sum_of_squares,
            });
        }

        let residuals = objective.try_evaluate(&objective.params)?;
        log::info!(
            "adjusted {} variables in {} iterations ({:?}), sum of squares {:.3e}",
            self.variables.len(),
            report.iterations,
            report.status,
            report.sum_of_squares
        );
        Ok(AdjustResult {
            prescription: objective.apply(&objective.params),
            values: objective.params,
            residuals,
            report,
        })
    }
}
