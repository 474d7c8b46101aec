//! BMC fingerprinting and configuration
//!
//! This crate identifies which management controller answers on a host and
//! applies a vendor-neutral [`ConfigurationBundle`](bmcfg_common::ConfigurationBundle)
//! to it.
//!
//! # Supported Controllers
//!
//! - **HP c7000** Onboard Administrator: SOAP
//! - **HP iLO**: JSON method calls
//! - **Dell iDRAC8**: JSON configuration groups and `/data?set=` query strings
//! - **Dell iDRAC9**: JSON configuration groups
//! - **Dell M1000e** chassis: url-encoded forms, multipart certificate upload
//! - **Supermicro X10**: url-encoded forms
//!
//! # Example
//!
//! ```no_run
//! use bmcfg_bmc::{identify, BmcDriver, Credentials};
//! use bmcfg_common::ConfigurationBundle;
//!
//! # async fn example() -> bmcfg_bmc::Result<()> {
//! let driver = identify("10.0.0.10", Credentials::new("root", "calvin")).await?;
//!
//! let bundle = ConfigurationBundle::from_yaml_str("syslog:\n  server: 10.0.0.2\n  enable: true\n")
//!     .expect("valid document");
//! driver.apply_config(&bundle).await?;
//! # Ok(())
//! # }
//! ```

pub mod discover;
pub mod driver;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod types;
pub mod vendors;

#[cfg(test)]
mod mock;

pub use discover::{identify, identify_model, identify_with};
pub use driver::{ApplyReport, BmcDriver, ResourceApplier, ResourceOutcome, ResourceStatus};
pub use error::{BmcError, ClassificationError, ErrorKind, Result};
pub use transport::{FilePart, HttpTransport, Multipart, Request, Response, Transport};
pub use types::{Credentials, Model, TransportConfig, Vendor};
pub use vendors::driver_for;
