//! Error types for BMC operations

use bmcfg_common::{ResourceKind, ValidationError};
use std::path::PathBuf;
use thiserror::Error;

/// Discovery could not produce a driver for the host
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    /// The host is a device family this crate does not manage
    #[error("vendor not supported")]
    VendorNotSupported,

    /// No probe matched
    #[error("vendor unknown")]
    VendorUnknown,

    /// The vendor was recognised but the model was not
    #[error("identified as {vendor} but could not determine the hardware model: {detail}")]
    UnknownModel { vendor: String, detail: String },
}

/// Error type for BMC operations
#[derive(Debug, Error)]
pub enum BmcError {
    /// Network or HTTP failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// Discovery failure, terminal for the host
    #[error(transparent)]
    Classification(#[from] ClassificationError),

    /// Resource configuration defect
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The firmware answered with a status outside the success range
    #[error("{resource} request to {endpoint} rejected with status {status}")]
    Rejected {
        resource: ResourceKind,
        endpoint: String,
        status: u16,
    },

    /// Login failed or no session is established
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A response could not be decoded
    #[error("malformed response from {endpoint}: {detail}")]
    MalformedResponse { endpoint: String, detail: String },

    /// A payload could not be encoded
    #[error("failed to encode payload: {0}")]
    Encode(String),

    /// A file named by a resource could not be read
    #[error("{resource} resource file {path}: {source}")]
    ReadFile {
        resource: ResourceKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The model has no way to apply this resource
    #[error("{0} is not supported by this controller")]
    Unsupported(ResourceKind),
}

/// Coarse error category for callers that branch on the failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Classification,
    Validation,
    Rejection,
    Authentication,
    Protocol,
    Unsupported,
}

impl BmcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BmcError::Transport(_) => ErrorKind::Transport,
            BmcError::Classification(_) => ErrorKind::Classification,
            BmcError::Validation(_) | BmcError::ReadFile { .. } => ErrorKind::Validation,
            BmcError::Rejected { .. } => ErrorKind::Rejection,
            BmcError::AuthenticationFailed(_) => ErrorKind::Authentication,
            BmcError::MalformedResponse { .. } | BmcError::Encode(_) => ErrorKind::Protocol,
            BmcError::Unsupported(_) => ErrorKind::Unsupported,
        }
    }

    /// Whether the error must stop an apply call instead of being recorded
    /// against a single resource.
    pub fn aborts_apply(&self) -> bool {
        match self {
            BmcError::Transport(_) | BmcError::AuthenticationFailed(_) => true,
            BmcError::Validation(e) => e.is_fatal(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for BmcError {
    fn from(e: reqwest::Error) -> Self {
        BmcError::Transport(e.to_string())
    }
}

/// Result type for BMC operations
pub type Result<T> = std::result::Result<T, BmcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BmcError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "transport failure: connection refused");

        let err = BmcError::from(ClassificationError::VendorNotSupported);
        assert_eq!(err.to_string(), "vendor not supported");

        let err = BmcError::Rejected {
            resource: ResourceKind::Syslog,
            endpoint: "/hpoa".to_string(),
            status: 500,
        };
        assert_eq!(
            err.to_string(),
            "syslog request to /hpoa rejected with status 500"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            BmcError::Transport("x".into()).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            BmcError::from(ClassificationError::VendorUnknown).kind(),
            ErrorKind::Classification
        );
        assert_eq!(
            BmcError::AuthenticationFailed("x".into()).kind(),
            ErrorKind::Authentication
        );
        assert_eq!(BmcError::Encode("x".into()).kind(), ErrorKind::Protocol);
        assert_eq!(
            BmcError::Unsupported(ResourceKind::Ssl).to_string(),
            "ssl is not supported by this controller"
        );
    }

    #[test]
    fn test_aborts_apply() {
        assert!(BmcError::Transport("reset".into()).aborts_apply());

        let fatal = BmcError::from(ValidationError::MissingField {
            resource: ResourceKind::User,
            field: "name",
        });
        assert!(fatal.aborts_apply());
        assert_eq!(fatal.kind(), ErrorKind::Validation);

        let recoverable = BmcError::from(ValidationError::MissingField {
            resource: ResourceKind::Ntp,
            field: "server1",
        });
        assert!(!recoverable.aborts_apply());

        let rejected = BmcError::Rejected {
            resource: ResourceKind::Ldap,
            endpoint: "/data".into(),
            status: 400,
        };
        assert!(!rejected.aborts_apply());
    }
}
