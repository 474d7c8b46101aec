pub mod apply;
pub mod identify;
pub mod validate;

use bmcfg_bmc::TransportConfig;
use clap::Args;
use std::time::Duration;

/// HTTP settings shared by commands that talk to a controller
#[derive(Args, Debug, Clone)]
pub struct TransportArgs {
    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Reject self-signed controller certificates
    #[arg(long)]
    pub verify_tls: bool,
}

impl TransportArgs {
    pub fn config(&self, host: &str) -> TransportConfig {
        TransportConfig::new(host)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_insecure(!self.verify_tls)
    }
}
