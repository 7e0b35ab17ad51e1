//! proofmark - timestamp proof client
//!
//! CLI over the proofmark-core library: stamp documents, verify and inspect
//! proofs, and upgrade calendar promises to chain anchors.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use proofmark_core::config::Config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;

/// Exit code for "nothing to upgrade".
const EXIT_NO_UPGRADE: u8 = 2;

/// proofmark - timestamp proof client
#[derive(Parser, Debug)]
#[command(name = "proofmark")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Calendar base URL (repeatable; replaces the configured set)
    #[arg(short = 'c', long = "calendar", global = true)]
    calendars: Vec<String>,

    /// Per-request timeout in seconds
    #[arg(short = 't', long, global = true)]
    timeout: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit machine-readable JSON instead of text
    #[arg(short = 'j', long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create timestamp proofs for one or more files
    Stamp {
        /// Files to stamp
        files: Vec<PathBuf>,

        /// Output path (single file only; defaults to <file>.ots)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Write an attached file (document + proof) instead of a
        /// detached .ots
        #[arg(short = 'a', long)]
        attached: bool,

        /// Poll the calendars until the proof is chain-anchored
        #[arg(short = 'w', long)]
        wait: bool,

        /// Replace an existing output file
        #[arg(long)]
        overwrite: bool,
    },

    /// Verify a proof against its document
    Verify {
        /// The proof file (.ots or attached)
        proof: PathBuf,

        /// The document a detached proof was made for
        #[arg(short = 'f', long = "file")]
        file: Option<PathBuf>,

        /// Skip the in-memory upgrade attempt before verification
        #[arg(long)]
        no_upgrade: bool,
    },

    /// Replace pending attestations with chain anchors
    Upgrade {
        /// Proof files to upgrade
        files: Vec<PathBuf>,
    },

    /// Describe a proof file without any network access
    Info {
        /// The proof file
        proof: PathBuf,
    },

    /// Summarize anchoring progress, optionally probing the calendars
    Status {
        /// The proof file
        proof: PathBuf,

        /// Ask each pending calendar whether an upgrade is ready
        #[arg(long)]
        probe: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => Config::default(),
    };
    if !cli.calendars.is_empty() {
        config.calendars = cli.calendars.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.submit.request_timeout_secs = timeout;
        config.verify.request_timeout_secs = timeout;
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<u8> {
    let config = load_config(&cli)?;
    let json = cli.json;
    match cli.command {
        Commands::Stamp {
            ref files,
            ref output,
            attached,
            wait,
            overwrite,
        } => commands::stamp::run(files, output.as_deref(), attached, wait, overwrite, config, json),
        Commands::Verify {
            ref proof,
            ref file,
            no_upgrade,
        } => commands::verify::run(proof, file.as_deref(), !no_upgrade, config, json),
        Commands::Upgrade { ref files } => commands::upgrade::run(files, config, json),
        Commands::Info { ref proof } => commands::info::run(proof, json),
        Commands::Status { ref proof, probe } => commands::status::run(proof, probe, config, json),
    }
}
