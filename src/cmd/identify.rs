use bmcfg_bmc::{identify_model, HttpTransport};
use clap::Args;
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;

use super::TransportArgs;

#[derive(Args, Debug)]
pub struct IdentifyArgs {
    /// Controller host name or address
    pub host: String,

    #[command(flatten)]
    pub transport: TransportArgs,
}

pub async fn run_identify(args: IdentifyArgs) -> Result<()> {
    let transport = HttpTransport::new(args.transport.config(&args.host))?;

    let model = identify_model(&args.host, &transport)
        .await
        .wrap_err_with(|| format!("unable to identify {}", args.host))?;
    info!(host = %args.host, model = %model, "Identified controller");

    println!("{}: {} ({})", args.host, model, model.vendor());
    Ok(())
}
