// Command line front end for BMC discovery and configuration
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use std::io::stderr;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

mod cmd;

use cmd::apply::ApplyArgs;
use cmd::identify::IdentifyArgs;
use cmd::validate::ValidateArgs;

#[derive(Parser, Debug)]
#[command(author, version, about = "Identify management controllers and apply configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output - shows request-level logs
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fingerprint the controller on a host without logging in.
    Identify(IdentifyArgs),
    /// Identify a controller, log in and apply a configuration document.
    Apply(ApplyArgs),
    /// Check a configuration document offline.
    Validate(ValidateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // RUST_LOG wins; otherwise -v raises our crates to debug
    let level = if cli.verbose { "debug" } else { "info" };
    let default_directives = format!(
        "bmcfg={level},bmcfg_bmc={level},bmcfg_common={level},reqwest=warn,hyper=warn,rustls=warn",
        level = level
    );
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    registry().with(filter).with(fmt::layer().with_writer(stderr)).init();

    match cli.command {
        Commands::Identify(args) => cmd::identify::run_identify(args).await,
        Commands::Apply(args) => cmd::apply::run_apply(args).await,
        Commands::Validate(args) => cmd::validate::run_validate(args),
    }
}
