//! TOML configuration deserialisation for trace jobs.

use std::path::Path;

use anyhow::Context;
use lensray_core::solver::adjust::{AdjustGoal, AdjustVariable, ADJUST_MAX_ITERATIONS, ADJUST_TOLERANCE};
use lensray_core::trace::{Distribution, FieldPoint};
use lensray_core::Prescription;
use serde::Deserialize;

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    /// The lens prescription (`[system]` with `[[system.surfaces]]` rows).
    pub system: Prescription,
    #[serde(default)]
    pub trace: TraceConfig,
    /// Optional auto-adjustment run before tracing.
    #[serde(default)]
    pub adjust: Option<AdjustConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Bundle tracing parameters.
#[derive(Debug, Deserialize)]
pub struct TraceConfig {
    #[serde(default = "default_fields")]
    pub fields: Vec<FieldPoint>,
    /// Wavelengths (nm). The first is the reference for chief-ray aiming.
    #[serde(default = "default_wavelengths")]
    pub wavelengths: Vec<f64>,
    #[serde(default)]
    pub distribution: Distribution,
    /// Pupil radius on the first surface. Defaults to that surface's clear
    /// aperture.
    #[serde(default)]
    pub pupil_radius: Option<f64>,
    /// Centre each bundle on its chief ray (requires an aperture stop).
    #[serde(default = "default_true")]
    pub aim_chief_ray: bool,
    /// Compute backend: "auto", "cpu" or "serial". Default: "auto".
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Dedicated thread count for the CPU backend.
    #[serde(default)]
    pub threads: Option<usize>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            fields: default_fields(),
            wavelengths: default_wavelengths(),
            distribution: Distribution::default(),
            pupil_radius: None,
            aim_chief_ray: true,
            backend: default_backend(),
            threads: None,
        }
    }
}

fn default_fields() -> Vec<FieldPoint> {
    vec![FieldPoint::on_axis()]
}

/// Helium d line.
fn default_wavelengths() -> Vec<f64> {
    vec![587.56]
}

fn default_backend() -> String {
    "auto".into()
}

fn default_true() -> bool {
    true
}

/// Auto-adjustment parameters.
#[derive(Debug, Deserialize)]
pub struct AdjustConfig {
    pub variables: Vec<AdjustVariable>,
    pub goals: Vec<AdjustGoal>,
    #[serde(default = "default_adjust_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_adjust_iterations")]
    pub max_iterations: usize,
}

fn default_adjust_tolerance() -> f64 {
    ADJUST_TOLERANCE
}

fn default_adjust_iterations() -> usize {
    ADJUST_MAX_ITERATIONS
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Write per-ray image intercepts as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_csv: bool,
    /// Write the run summary as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
    /// Write the (possibly adjusted) prescription as TOML (default: true
    /// when adjusting).
    #[serde(default = "default_true")]
    pub save_prescription: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_csv: true,
            save_json: false,
            save_prescription: true,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_config(&content).with_context(|| format!("parsing {}", path.display()))
}

pub fn parse_config(content: &str) -> anyhow::Result<JobConfig> {
    let config: JobConfig = toml::from_str(content)?;
    if config.trace.wavelengths.is_empty() {
        anyhow::bail!("trace.wavelengths must not be empty");
    }
    if config.trace.fields.is_empty() {
        anyhow::bail!("trace.fields must not be empty");
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lensray_core::solver::adjust::{GoalQuantity, VariableKind};
    use lensray_core::system::SurfaceRole;
    use lensray_geometry::Curve;

    const JOB: &str = r#"
[system]
object_medium = "air"

[[system.surfaces]]
radius = 50.0
thickness = 5.0
material = "N-BK7"
semi_diameter = 10.0

[[system.surfaces]]
curve = { type = "conic", curvature = -0.02, conic = -1.0 }
thickness = 47.0

[[system.surfaces]]
role = "aperture_stop"
semi_diameter = 4.0
thickness = 0.0

[[system.surfaces]]
role = "image"

[trace]
fields = [
    { type = "angle", x_deg = 0.0, y_deg = 0.0 },
    { type = "angle", x_deg = 0.0, y_deg = 3.0 },
]
wavelengths = [486.13, 587.56, 656.27]
distribution = { type = "ring", rings = 3, per_ring = 12 }
pupil_radius = 4.0
backend = "serial"

[adjust]
variables = [{ surface = 1, kind = "thickness" }]
goals = [
    { wavelength_nm = 587.56, pupil = [0.0, 4.0], surface = 3, quantity = "height_y" },
]

[output]
save_json = true
"#;

    #[test]
    fn test_parse_full_job() {
        let job = parse_config(JOB).unwrap();
        assert_eq!(job.system.surfaces.len(), 4);
        assert_eq!(job.system.length_unit_nm, 1e6);
        assert_eq!(
            job.system.surfaces[1].resolved_curve(),
            Curve::Conic {
                curvature: -0.02,
                conic: -1.0
            }
        );
        assert_eq!(job.system.surfaces[2].role, SurfaceRole::ApertureStop);
        assert_eq!(job.trace.fields.len(), 2);
        assert_eq!(
            job.trace.distribution,
            Distribution::Ring {
                rings: 3,
                per_ring: 12
            }
        );
        assert!(job.trace.aim_chief_ray);

        let adjust = job.adjust.unwrap();
        assert_eq!(adjust.variables[0].kind, VariableKind::Thickness);
        let goal = &adjust.goals[0];
        assert_eq!(goal.quantity, GoalQuantity::HeightY);
        assert_eq!(goal.field, FieldPoint::on_axis());
        assert_eq!(goal.weight, 1.0);
        assert_eq!(goal.target, 0.0);
        assert_eq!(adjust.max_iterations, ADJUST_MAX_ITERATIONS);

        assert!(job.output.save_json);
        assert!(job.output.save_csv);
        assert_eq!(job.output.directory, "./output");
        job.system.build().unwrap();
    }

    #[test]
    fn test_minimal_job_uses_defaults() {
        let job = parse_config(
            r#"
[[system.surfaces]]
thickness = 10.0
[[system.surfaces]]
role = "image"
"#,
        )
        .unwrap();
        assert_eq!(job.trace.wavelengths, vec![587.56]);
        assert_eq!(job.trace.fields, vec![FieldPoint::on_axis()]);
        assert_eq!(job.trace.backend, "auto");
        assert!(job.adjust.is_none());
        assert_eq!(job.system.object_medium, "air");
    }

    #[test]
    fn test_empty_wavelengths_rejected() {
        let err = parse_config(
            r#"
[[system.surfaces]]
role = "image"
[trace]
wavelengths = []
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("wavelengths"));
    }
}
