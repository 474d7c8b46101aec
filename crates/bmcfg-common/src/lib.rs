//! Vendor-neutral BMC configuration model
//!
//! A [`ConfigurationBundle`] is a sparse set of resource slots (users, syslog,
//! NTP, LDAP, network, SSL). Drivers in `bmcfg-bmc` read only the slots that are
//! present; an absent slot is never touched and never defaulted.
//!
//! # Example
//!
//! ```
//! use bmcfg_common::ConfigurationBundle;
//!
//! let bundle = ConfigurationBundle::from_yaml_str(
//!     r#"
//! user:
//!   - name: operator
//!     password: s3cret
//!     role: admin
//!     enable: true
//! ntp:
//!   server1: ntp0.example.com
//!   timezone: CET
//!   enable: true
//! "#,
//! )?;
//!
//! assert_eq!(bundle.resources().len(), 2);
//! # Ok::<(), bmcfg_common::ConfigError>(())
//! ```

pub mod error;
pub mod resources;
pub mod validate;

pub use error::{ConfigError, ValidationError};
pub use resources::*;
pub use validate::Role;

pub type Result<T> = std::result::Result<T, ConfigError>;
