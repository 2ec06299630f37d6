//! LensRay command-line interface.
//!
//! Run trace and adjustment jobs from TOML configuration files:
//! ```sh
//! lensray-cli run job.toml
//! lensray-cli validate job.toml
//! lensray-cli materials
//! ```

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lensray-cli")]
#[command(about = "LensRay: sequential ray tracing and lens adjustment")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a trace job from a TOML configuration file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file and print the surface sequence.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// List the built-in material catalogue.
    Materials,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("LensRay Sequential Tracer");
            println!("=========================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let result = runner::run_job(&job)?;

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));

            if job.output.save_csv {
                runner::write_intercepts_csv(&result, &out_dir.join("intercepts.csv"))?;
            }
            if job.output.save_json {
                runner::write_summary_json(&result.summary, &out_dir.join("summary.json"))?;
            }
            if job.output.save_prescription && job.adjust.is_some() {
                runner::write_prescription_toml(
                    &result.prescription,
                    &out_dir.join("prescription.toml"),
                )?;
            }

            println!("Trace complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let system = job.system.build()?;
            println!("Configuration is valid: {}", config.display());
            println!();
            println!("  {:>4}  {:<12} {:>12}  {:<10}", "#", "surface", "z", "role");
            for (row, (id, surface)) in system.surfaces().enumerate() {
                let name = &system.element(id)?.name;
                let z = system.position(id)?.z;
                println!(
                    "  {:>4}  {:<12} {:>12.4}  {:<10}",
                    row,
                    name,
                    z,
                    format!("{:?}", surface.role())
                );
            }
            match system.aperture_stop() {
                Some(stop) => println!("\n  Aperture stop: {}", system.element(stop)?.name),
                None => println!("\n  No aperture stop; chief-ray aiming is unavailable."),
            }
            Ok(())
        }
        Commands::Materials => {
            println!("Available materials:");
            println!();
            for (id, description) in lensray_materials::catalog::AVAILABLE {
                println!("  {:<12} {}", id, description);
            }
            println!();
            println!("  A bare number (e.g. \"1.5168\") is a constant, lossless index.");
            Ok(())
        }
    }
}
