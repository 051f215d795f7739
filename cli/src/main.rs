//! Command-line runner for lumen bytecode images (spec.md §6: "CLI input
//! accepted by the core (minimal): a path to the image; everything else is
//! an external collaborator").

use anyhow::{Context, Result};
use clap::Parser;
use lumen_vm::{Image, Vm, VmConfig};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

/// Runs a lumen bytecode image to completion.
#[derive(Parser)]
#[command(name = "lumen")]
#[command(about = "Run a lumen bytecode image", long_about = None)]
struct Cli {
    /// Path to the image file
    image: PathBuf,

    /// Print the decoded instruction stream instead of running it
    #[arg(long)]
    disassemble: bool,

    /// Don't inherit the host process environment for GETENV
    #[arg(long)]
    no_inherit_env: bool,

    /// Sets the level of verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// The only environment variable the core itself consumes (spec.md §6): an
/// optional debug flag that enables trace logging.
const TRACE_ENV_VAR: &str = "LUMEN_TRACE";

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match cli.verbose {
        0 => log::set_max_level(log::LevelFilter::Info),
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let text = fs::read_to_string(&cli.image)
        .with_context(|| format!("failed to read image {}", cli.image.display()))?;
    let image = Image::parse(&text).context("malformed image")?;

    if cli.disassemble {
        print!("{}", image.disassemble());
        return Ok(());
    }

    let config = VmConfig {
        inherit_env: !cli.no_inherit_env,
        trace: std::env::var(TRACE_ENV_VAR).is_ok(),
    };
    let mut vm = Vm::new(image, config);
    vm.run().map_err(|message| anyhow::anyhow!(message))?;
    Ok(())
}
