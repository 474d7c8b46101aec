//! Wire adapters, one per protocol family
//!
//! - [`soap`]: HP Onboard Administrator SOAP envelopes
//! - [`json`]: Dell configuration groups and the iLO method dialect
//! - [`query`]: iDRAC8 `set=` query strings
//! - [`form`]: url-encoded forms for M1000e and Supermicro
//! - [`xml`]: element lookup in XML replies

pub mod form;
pub mod json;
pub mod query;
pub mod soap;
pub mod xml;

use bmcfg_common::ResourceKind;
use tracing::warn;

use crate::error::{BmcError, Result};
use crate::transport::Response;

/// Treat any 2xx as accepted and everything else as a rejection
pub(crate) fn expect_success(resource: ResourceKind, endpoint: &str, response: &Response) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }

    warn!(
        resource = %resource,
        endpoint,
        status = response.status,
        "Request rejected by controller"
    );
    Err(BmcError::Rejected {
        resource,
        endpoint: endpoint.to_string(),
        status: response.status,
    })
}

/// Map a decode failure to a protocol error against the endpoint
pub(crate) fn malformed(endpoint: &str, detail: impl std::fmt::Display) -> BmcError {
    BmcError::MalformedResponse {
        endpoint: endpoint.to_string(),
        detail: detail.to_string(),
    }
}
