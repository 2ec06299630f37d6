//! Job runner: ties together prescription, solvers and the bundle tracer.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use lensray_compute::{BackendType, ComputeBackend, CpuBackend, SerialBackend};
use lensray_core::solver::adjust::AutoAdjuster;
use lensray_core::solver::chief_ray::ChiefRayFinder;
use lensray_core::solver::lm::LmStatus;
use lensray_core::solver::SolverError;
use lensray_core::trace::bundle::FailureCounts;
use lensray_core::trace::{trace_bundle, FieldPoint, RayBundleSpec, TraceResults};
use lensray_core::{OpticalSystem, Prescription, TraceError};

use crate::config::{AdjustConfig, JobConfig, TraceConfig};

/// Everything a job produces.
pub struct JobOutput {
    /// The traced prescription (adjusted, if the job adjusts).
    pub prescription: Prescription,
    pub summary: RunSummary,
    /// One bundle per configured field, in order.
    pub bundles: Vec<TraceResults>,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub surfaces: usize,
    pub image: String,
    pub backend: String,
    pub fields: Vec<FieldSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjust: Option<AdjustSummary>,
}

/// Image-plane statistics for one field.
#[derive(Debug, Serialize)]
pub struct FieldSummary {
    pub field: FieldPoint,
    /// Bundle centre on the first vertex plane.
    pub aim: [f64; 2],
    pub chief_ray_aimed: bool,
    pub rays: usize,
    pub traced: usize,
    pub failures: FailureCounts,
    pub centroid: Option<[f64; 3]>,
    pub rms_radius: Option<f64>,
    pub max_intensity: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct AdjustSummary {
    pub status: LmStatus,
    pub iterations: usize,
    pub sum_of_squares: f64,
    pub values: Vec<f64>,
    pub residuals: Vec<f64>,
}

/// Run a full job from a parsed configuration.
pub fn run_job(job: &JobConfig) -> Result<JobOutput> {
    let (prescription, adjust) = match &job.adjust {
        Some(adjust) => {
            let (rx, summary) = run_adjust(&job.system, adjust)?;
            (rx, Some(summary))
        }
        None => (job.system.clone(), None),
    };

    let system = prescription.build().context("building optical system")?;
    let image = system.element(system.image())?.name.clone();
    println!(
        "  System: {} surfaces, image at '{}'",
        system.sequence().len(),
        image
    );

    let backend_type: BackendType = job
        .trace
        .backend
        .parse()
        .context("selecting compute backend")?;
    let (backend, bundles, fields) = match backend_type {
        BackendType::Serial => {
            let (bundles, fields) = trace_fields(&system, &job.trace, &SerialBackend)?;
            ("serial".to_string(), bundles, fields)
        }
        BackendType::Cpu => {
            let cpu = match job.trace.threads {
                Some(n) => CpuBackend::with_threads(n)?,
                None => CpuBackend::new(),
            };
            let name = cpu.device_info().name;
            let (bundles, fields) = trace_fields(&system, &job.trace, &cpu)?;
            (name, bundles, fields)
        }
    };

    Ok(JobOutput {
        prescription,
        summary: RunSummary {
            surfaces: system.sequence().len(),
            image,
            backend,
            fields,
            adjust,
        },
        bundles,
    })
}

fn run_adjust(base: &Prescription, config: &AdjustConfig) -> Result<(Prescription, AdjustSummary)> {
    let result = AutoAdjuster::new(base.clone(), config.variables.clone(), config.goals.clone())?
        .with_tolerance(config.tolerance)
        .with_max_iterations(config.max_iterations)
        .run()
        .context("adjusting prescription")?;
    println!(
        "  Adjusted {} variables: {:?} after {} iterations (sum of squares {:.3e})",
        result.values.len(),
        result.report.status,
        result.report.iterations,
        result.report.sum_of_squares
    );
    if result.report.status == LmStatus::MaxIter {
        log::warn!("adjustment stopped at the iteration limit");
    }
    let summary = AdjustSummary {
        status: result.report.status,
        iterations: result.report.iterations,
        sum_of_squares: result.report.sum_of_squares,
        values: result.values,
        residuals: result.residuals,
    };
    Ok((result.prescription, summary))
}

/// Trace one bundle per field on `backend`.
fn trace_fields<B: ComputeBackend>(
    system: &OpticalSystem,
    config: &TraceConfig,
    backend: &B,
) -> Result<(Vec<TraceResults>, Vec<FieldSummary>)> {
    let pupil_radius = match config.pupil_radius {
        Some(r) => r,
        None => system
            .surface(system.first_surface())?
            .shape()
            .max_radius()
            .context("trace.pupil_radius is required when the first surface is unbounded")?,
    };
    if pupil_radius.is_nan() || pupil_radius <= 0.0 {
        anyhow::bail!("pupil radius must be positive, got {pupil_radius}");
    }

    let finder = if config.aim_chief_ray {
        match ChiefRayFinder::new(system) {
            Ok(finder) => Some(finder),
            Err(SolverError::NoApertureStop) => {
                log::warn!("no aperture stop; bundles are centred on the axis");
                None
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        None
    };
    let reference = config.wavelengths[0];
    let image = system.image();

    let mut bundles = Vec::with_capacity(config.fields.len());
    let mut summaries = Vec::with_capacity(config.fields.len());
    for field in &config.fields {
        let aim = match &finder {
            Some(finder) => match finder.find(field, reference) {
                Ok(chief) => Some(chief.aim),
                Err(e) => {
                    log::warn!("chief ray for {field:?} not found ({e}); centring on the axis");
                    None
                }
            },
            None => None,
        };
        let spec = RayBundleSpec {
            field: *field,
            wavelengths: config.wavelengths.clone(),
            distribution: config.distribution,
            pupil_radius,
            aim: aim.unwrap_or_default(),
        };
        let results = trace_bundle(system, &spec, backend);
        let failures = results.failure_counts();
        println!(
            "  Field {:?}: {} rays, {} traced, {} failed",
            field,
            results.len(),
            results.len() - failures.total(),
            failures.total()
        );
        summaries.push(FieldSummary {
            field: *field,
            aim: spec.aim,
            chief_ray_aimed: aim.is_some(),
            rays: results.len(),
            traced: results.len() - failures.total(),
            failures,
            centroid: results.centroid(image).map(|c| [c.x, c.y, c.z]),
            rms_radius: results.rms_radius(image),
            max_intensity: results.max_intensity(image),
        });
        bundles.push(results);
    }
    Ok((bundles, summaries))
}

fn failure_label(error: &TraceError) -> &'static str {
    match error {
        TraceError::MissedSurface { .. } => "missed",
        TraceError::ObstructedByAperture { .. } => "obstructed",
        TraceError::TotalInternalReflection { .. } => "tir",
        TraceError::Medium { .. } => "medium",
    }
}

/// Write per-ray image intercepts to a CSV file with a metadata header.
pub fn write_intercepts_csv(output: &JobOutput, path: &Path) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);

    writeln!(file, "# LensRay sequential trace: image intercepts")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "# surfaces: {}", output.summary.surfaces)?;
    writeln!(file, "# image: {}", output.summary.image)?;
    for (i, field) in output.summary.fields.iter().enumerate() {
        writeln!(
            file,
            "# field {}: {:?}, aim=({:.6}, {:.6})",
            i, field.field, field.aim[0], field.aim[1]
        )?;
    }
    writeln!(file, "#")?;
    writeln!(
        file,
        "field,wavelength_nm,pupil_x,pupil_y,status,surface,x,y,z,dir_x,dir_y,dir_z,intensity,optical_path"
    )?;

    for (i, bundle) in output.bundles.iter().enumerate() {
        for outcome in &bundle.outcomes {
            let prefix = format!(
                "{},{:.2},{:.6},{:.6}",
                i, outcome.wavelength_nm, outcome.pupil[0], outcome.pupil[1]
            );
            match &outcome.result {
                Ok(traced) => {
                    let Some(seg) = traced.image() else {
                        continue;
                    };
                    writeln!(
                        file,
                        "{prefix},ok,{},{:.9e},{:.9e},{:.9e},{:.9e},{:.9e},{:.9e},{:.6e},{:.9e}",
                        seg.surface.index(),
                        seg.point.x,
                        seg.point.y,
                        seg.point.z,
                        seg.direction.x,
                        seg.direction.y,
                        seg.direction.z,
                        seg.intensity,
                        seg.optical_path,
                    )?;
                }
                Err(e) => {
                    writeln!(
                        file,
                        "{prefix},{},{},,,,,,,,",
                        failure_label(e),
                        e.surface().index()
                    )?;
                }
            }
        }
    }
    file.flush()?;

    println!("Intercepts written to: {}", path.display());
    Ok(())
}

/// Write the run summary to a JSON file.
pub fn write_summary_json(summary: &RunSummary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    std::fs::write(path, json)?;

    println!("Summary (JSON) written to: {}", path.display());
    Ok(())
}

/// Write a prescription back out as TOML, loadable as a job's `[system]`.
pub fn write_prescription_toml(prescription: &Prescription, path: &Path) -> Result<()> {
    #[derive(Serialize)]
    struct Wrapper<'a> {
        system: &'a Prescription,
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let text = toml::to_string_pretty(&Wrapper {
        system: prescription,
    })
    .context("serialising prescription")?;
    std::fs::write(path, text)?;

    println!("Prescription written to: {}", path.display());
    Ok(())
}
