use std::path::PathBuf;
use thiserror::Error;

use crate::resources::ResourceKind;

/// A resource failed its required-field or enumerated-value checks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Required field absent or empty
    #[error("{resource} resource expects parameter: {field}")]
    MissingField {
        resource: ResourceKind,
        field: &'static str,
    },

    /// Role outside the set the firmware understands
    #[error("{resource} resource role {role:?} is not valid, expected one of: {allowed}")]
    InvalidRole {
        resource: ResourceKind,
        role: String,
        allowed: String,
    },
}

impl ValidationError {
    /// The resource the defect was found in
    pub fn resource(&self) -> ResourceKind {
        match self {
            ValidationError::MissingField { resource, .. } => *resource,
            ValidationError::InvalidRole { resource, .. } => *resource,
        }
    }

    /// Whether the defect must stop the whole apply call.
    ///
    /// A malformed account identity is never skipped: continuing would leave the
    /// controller with a partial set of credentials.
    pub fn is_fatal(&self) -> bool {
        self.resource() == ResourceKind::User
    }
}

/// Errors loading a configuration document
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}
