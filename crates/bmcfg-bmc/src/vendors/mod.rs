//! Per-model drivers

pub mod c7000;
pub(crate) mod idrac;
pub mod idrac8;
pub mod idrac9;
pub mod ilo;
pub mod m1000e;
pub mod supermicro;

pub use c7000::C7000;
pub use idrac8::Idrac8;
pub use idrac9::Idrac9;
pub use ilo::Ilo;
pub use m1000e::M1000e;
pub use supermicro::SupermicroX10;

use std::sync::Arc;

use crate::driver::BmcDriver;
use crate::transport::Transport;
use crate::types::{Credentials, Model};

/// Build an unconnected driver for `model`
pub fn driver_for(
    model: Model,
    host: &str,
    credentials: Credentials,
    transport: Arc<dyn Transport>,
) -> Box<dyn BmcDriver> {
    match model {
        Model::C7000 => Box::new(C7000::new(host, credentials, transport)),
        Model::Ilo => Box::new(Ilo::new(host, credentials, transport)),
        Model::Idrac8 => Box::new(Idrac8::new(host, credentials, transport)),
        Model::Idrac9 => Box::new(Idrac9::new(host, credentials, transport)),
        Model::M1000e => Box::new(M1000e::new(host, credentials, transport)),
        Model::SupermicroX10 => Box::new(SupermicroX10::new(host, credentials, transport)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    #[test]
    fn test_driver_for_every_model() {
        let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
        for model in [
            Model::C7000,
            Model::Ilo,
            Model::Idrac8,
            Model::Idrac9,
            Model::M1000e,
            Model::SupermicroX10,
        ] {
            let driver = driver_for(model, "bmc.test", Credentials::new("u", "p"), transport.clone());
            assert_eq!(driver.model(), model);
            assert_eq!(driver.host(), "bmc.test");
            assert!(!driver.is_connected());
        }
    }
}
