//! Builds, meshes and tags the cross-section of a machine described in JSON.
//!
//! ```text
//! emsector --dir work --machine machine.json                  # create + mesh
//! emsector --dir work --machine machine.json --execute all
//! RUST_LOG=emsector=debug emsector --dir work --machine machine.json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use emsector::analysis::{Analysis, Stages};
use emsector::machine::MachineDescription;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Periodic-sector geometry and physical tagging for electric machines
#[derive(Parser, Debug)]
#[command(name = "emsector", version, long_about = None)]
struct Args {
    /// Working directory; meshes are written here
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Machine description, relative to the working directory
    #[arg(short, long)]
    machine: PathBuf,

    /// Stages to run
    #[arg(short, long, value_enum, default_value_t = Execute::Mesh)]
    execute: Execute,

    /// Log level for this crate (overrides the default INFO)
    #[arg(short, long)]
    log_level: Option<LevelFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Execute {
    All,
    /// Create and mesh the geometry
    Mesh,
    Solve,
    PostProcess,
}

impl From<Execute> for Stages {
    fn from(execute: Execute) -> Self {
        match execute {
            Execute::All => Stages::all(),
            Execute::Mesh => Stages {
                create: true,
                mesh: true,
                ..Stages::default()
            },
            Execute::Solve => Stages {
                solve: true,
                ..Stages::default()
            },
            Execute::PostProcess => Stages {
                post_process: true,
                ..Stages::default()
            },
        }
    }
}

fn init_logging(level: Option<LevelFilter>) {
    // Default: WARN for everything, INFO for emsector. --log-level wins over RUST_LOG.
    const DEFAULT: &str = "warn,emsector=info";
    let directives = match level {
        Some(level) => format!("warn,emsector={level}"),
        None => std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| DEFAULT.to_owned()),
    };
    let env_filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level);

    let path = args.dir.join(&args.machine);
    let machine = match MachineDescription::load(&path) {
        Ok(machine) => machine,
        Err(e) => {
            error!(error = %e, "cannot load machine");
            return ExitCode::FAILURE;
        }
    };

    let stages = Stages::from(args.execute);
    match Analysis::new(&machine, &args.dir)
        .with_mesh_options(machine.mesh)
        .run(stages)
    {
        Ok(report) => {
            info!(
                fractions = report.fractions_drawn,
                solved = report.solved,
                post_processed = report.post_processed,
                "analysis finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "analysis failed");
            ExitCode::FAILURE
        }
    }
}
