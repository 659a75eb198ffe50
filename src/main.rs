use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use wiring::config::Config;
use wiring::report::ReportFormat;
use wiring::WiringResult;

mod cli;

#[derive(Parser)]
#[command(name = "wiring")]
#[command(about = "Compose and boot dependency-injection applications")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log solver and composer progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and compose a wiring manifest
    Check {
        /// Path to the manifest
        manifest: PathBuf,
    },
    /// Print the composition plan of a manifest
    Plan {
        /// Path to the manifest
        manifest: PathBuf,
        /// Output format (overrides config)
        #[arg(short, long, value_enum)]
        format: Option<ReportFormat>,
    },
    /// Compose, build and boot a manifest, printing what was constructed
    Boot {
        /// Path to the manifest
        manifest: PathBuf,
        /// Output format (overrides config)
        #[arg(short, long, value_enum)]
        format: Option<ReportFormat>,
        /// Construct bootstrap stages concurrently
        #[arg(long)]
        parallel: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> WiringResult<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = load_config(cli.config.as_ref()).and_then(|config| match cli.command {
        Commands::Check { manifest } => cli::check::run(&manifest, &config),
        Commands::Plan { manifest, format } => cli::plan::run(&manifest, format, &config),
        Commands::Boot {
            manifest,
            format,
            parallel,
        } => cli::boot::run(
            &manifest,
            cli::boot::BootOptions { format, parallel },
            &config,
        ),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\n{}", wiring::error_help::format_error_with_help(&e));
            ExitCode::FAILURE
        }
    }
}
