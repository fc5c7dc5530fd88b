use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use log::{LevelFilter, info};
use png_dpi::{OutputOptions, cli, read_chunks, set_physical_chunk};

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn init_logging(verbose: u8) {
    env_logger::Builder::new()
        .filter_level(log_level(verbose))
        .init();
}

#[derive(Parser)]
#[command(name = "png-dpi")]
#[command(about = "Inspect and rewrite the pHYs resolution chunk of PNG files")]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a pHYs chunk scaled to a device pixel ratio
    Set {
        /// Path to input PNG file
        #[arg(short, long)]
        input: PathBuf,

        /// Path for the rewritten PNG file
        #[arg(short, long)]
        output: PathBuf,

        /// Device pixel ratio the image was captured at
        #[arg(short, long, default_value = "1", value_parser = cli::parse_device_pixel_ratio)]
        dpr: f64,
    },

    /// Print the chunk table and the pHYs record
    Inspect {
        /// Path to PNG file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Check the PNG signature and every chunk CRC
    Check {
        /// Path to PNG file
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Set { input, output, dpr } => {
            let data = std::fs::read(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let tagged = set_physical_chunk(&data, dpr, &OutputOptions::default())
                .with_context(|| format!("rewriting pHYs in {}", input.display()))?;
            tagged
                .write_to_file(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            info!(
                "{} bytes -> {} bytes ({})",
                data.len(),
                tagged.len(),
                tagged.mime_type()
            );
            println!("{}: {}", output.display(), cli::physical_summary(tagged.as_bytes())?);
        }

        Commands::Inspect { input } => {
            let data = std::fs::read(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let table = read_chunks(&data, 0)
                .with_context(|| format!("scanning chunks of {}", input.display()))?;
            for line in cli::describe_chunks(&table) {
                println!("{}", line);
            }
            println!("pHYs: {}", cli::physical_summary(&data)?);
        }

        Commands::Check { input } => {
            let data = std::fs::read(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            match cli::validate_png(&data) {
                cli::ValidationResult::Valid { chunks } => {
                    println!("[OK] {} chunks, all CRCs valid", chunks);
                }
                cli::ValidationResult::NotPng => {
                    bail!("{} is not a PNG file", input.display());
                }
                cli::ValidationResult::Corrupt(reason) => {
                    bail!("{} is corrupt: {}", input.display(), reason);
                }
            }
        }
    }

    Ok(())
}
