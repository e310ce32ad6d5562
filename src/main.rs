//! # nanoscope-fv
//!
//! Command-line front end for decoding Nanoscope force volume files into a
//! dataset directory and reading curves back out of it.
//!
//! ```bash
//! nanoscope-fv ingest scan_0001.spm
//! nanoscope-fv curve scan_0001_spm 130 --backward
//! nanoscope-fv axis scan_0001_spm --physical
//! ```

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use nanoscope_fv::{DecodeConfig, Dataset, Direction, ForceRampFile, SyntheticForceVolume};

/// Nanoscope force volume decoder and curve store
#[derive(Parser)]
#[command(name = "nanoscope-fv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Dataset directory
    #[arg(short, long, global = true, default_value = "./fv-dataset")]
    dataset: PathBuf,

    /// JSON decode configuration (channel names, calibration constants)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode force volume files and store them, replacing same-named experiments
    Ingest {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// List stored experiments
    List,

    /// Print the number of curves of an experiment
    Count { name: String },

    /// Print one deflection curve, one value per line
    Curve {
        name: String,

        /// Row-major pixel index
        index: usize,

        /// Print the retract ramp instead of the approach ramp
        #[arg(long)]
        backward: bool,

        /// Print "position value" pairs using the physical ramp axis
        #[arg(long)]
        physical: bool,
    },

    /// Print the ramp axis of an experiment
    Axis {
        name: String,

        /// Physical ramp positions instead of sample indices
        #[arg(long)]
        physical: bool,
    },

    /// Show parameters and calibration of an experiment
    Info { name: String },

    /// Delete an experiment
    Remove { name: String },

    /// Decode a single force ramp file and print its channels
    Ramp {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print only this channel
        #[arg(long)]
        channel: Option<String>,
    },

    /// Write a synthetic force volume file for testing
    Demo {
        #[arg(value_name = "OUTPUT", default_value = "demo_force_volume.spm")]
        output: PathBuf,

        #[arg(long, default_value = "8")]
        rows: usize,

        #[arg(long, default_value = "8")]
        columns: usize,

        #[arg(long, default_value = "128")]
        ramp_points: usize,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<DecodeConfig> {
    match path {
        Some(p) => DecodeConfig::from_json_file(p)
            .with_context(|| format!("reading config {}", p.display())),
        None => Ok(DecodeConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Ingest { files } => {
            let config = load_config(cli.config.as_ref())?;
            let dataset = Dataset::open(&cli.dataset)?;
            let mut failures = 0;
            for file in &files {
                match dataset.ingest_file(file, &config) {
                    Ok(name) => println!("{} -> {name}", file.display()),
                    Err(e) => {
                        eprintln!("{}: {e}", file.display());
                        failures += 1;
                    }
                }
            }
            if failures > 0 {
                bail!("{failures} of {} files failed to ingest", files.len());
            }
        }
        Commands::List => {
            let dataset = Dataset::open(&cli.dataset)?;
            for name in dataset.experiment_names() {
                println!("{name}");
            }
        }
        Commands::Count { name } => {
            println!("{}", Dataset::open(&cli.dataset)?.curve_count(&name)?);
        }
        Commands::Curve {
            name,
            index,
            backward,
            physical,
        } => {
            let dataset = Dataset::open(&cli.dataset)?;
            let direction = if backward {
                Direction::Backward
            } else {
                Direction::Forward
            };
            let curve = dataset.curve(&name, index, direction)?;
            if physical {
                let axis = dataset.ramp_axis(&name, true)?;
                for (x, y) in axis.iter().zip(&curve) {
                    println!("{x}\t{y}");
                }
            } else {
                for y in &curve {
                    println!("{y}");
                }
            }
        }
        Commands::Axis { name, physical } => {
            for x in Dataset::open(&cli.dataset)?.ramp_axis(&name, physical)? {
                println!("{x}");
            }
        }
        Commands::Info { name } => {
            let dataset = Dataset::open(&cli.dataset)?;
            let p = dataset.parameters(&name)?;
            let calibration = dataset.calibration(&name)?;
            println!("Experiment: {name}");
            println!(
                "  Grid: {} rows x {} columns ({} curves)",
                p.number_of_map_rows,
                p.number_of_map_columns,
                p.curve_count()
            );
            println!("  Scan size: {}", p.scan_size);
            println!(
                "  Pixel length: {} (row) x {} (column)",
                p.pixel_length_row, p.pixel_length_column
            );
            println!(
                "  Ramp: {} points over {} (step {})",
                p.ramp_points, p.ramp_length, p.ramp_step
            );
            println!(
                "  Calibration: photodiode {}, spring constant {}, probe radius {}",
                calibration.photodiode_sensitivity,
                calibration.force_constant,
                calibration.probe_radius
            );
        }
        Commands::Remove { name } => {
            Dataset::open(&cli.dataset)?.remove(&name)?;
            println!("removed {name}");
        }
        Commands::Ramp { file, channel } => {
            let ramp = ForceRampFile::open(&file)
                .with_context(|| format!("decoding {}", file.display()))?;
            let names = match channel {
                Some(name) => vec![name],
                None => ramp.get_channel_names(),
            };
            for name in names {
                let Some(channel) = ramp.channel(&name) else {
                    bail!(
                        "no channel '{name}' in {}; available: {}",
                        file.display(),
                        ramp.get_channel_names().join(", ")
                    );
                };
                println!("{name}");
                println!("{}", channel.to_frame()?);
            }
        }
        Commands::Demo {
            output,
            rows,
            columns,
            ramp_points,
        } => {
            let synthetic = SyntheticForceVolume::builder()
                .rows(rows)
                .columns(columns)
                .ramp_points(ramp_points)
                .build();
            synthetic.write_to(&output)?;
            info!("wrote {}", output.display());
            println!("{}: {}", output.display(), synthetic.describe());
        }
    }
    Ok(())
}
