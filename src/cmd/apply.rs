use bmcfg_bmc::{identify_with, BmcDriver, Credentials, HttpTransport, ResourceApplier};
use bmcfg_common::ConfigurationBundle;
use clap::Args;
use color_eyre::eyre::{Result, WrapErr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use super::TransportArgs;

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Controller host name or address
    pub host: String,

    /// YAML configuration document
    #[arg(short, long)]
    pub config: PathBuf,

    /// Controller login
    #[arg(short, long, env = "BMCFG_USERNAME")]
    pub username: String,

    /// Controller password
    #[arg(short, long, env = "BMCFG_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[command(flatten)]
    pub transport: TransportArgs,
}

pub async fn run_apply(args: ApplyArgs) -> Result<()> {
    let bundle = ConfigurationBundle::from_path(&args.config)?;
    if bundle.is_empty() {
        warn!(config = %args.config.display(), "Configuration declares no resources");
    }

    let transport = HttpTransport::new(args.transport.config(&args.host))?;
    let driver = identify_with(
        &args.host,
        Credentials::new(args.username, args.password),
        Arc::new(transport),
    )
    .await
    .wrap_err_with(|| format!("unable to connect to {}", args.host))?;

    let report = driver
        .apply_config_report(&bundle)
        .await
        .wrap_err_with(|| format!("apply to {} ({}) aborted", args.host, driver.model()))?;

    for outcome in report.outcomes() {
        println!("{:<8} {}", outcome.resource, outcome.status);
    }

    report
        .into_result()
        .wrap_err_with(|| format!("{} did not accept every resource", args.host))
}
