//! Shared validation and defaulting helpers
//!
//! Every driver validates the resources it applies with these helpers so that
//! the same field is reported the same way whatever the vendor.

use tracing::debug;

use crate::error::ValidationError;
use crate::resources::{NtpResource, ResourceKind, SyslogResource, UserResource};

/// Port used when a syslog resource does not declare one
pub const DEFAULT_SYSLOG_PORT: u16 = 514;

/// Privilege tier understood by the firmwares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Full administrative access
    Admin,
    /// Operator / read-mostly access
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Require a non-empty string field
pub fn require<'a>(
    resource: ResourceKind,
    field: &'static str,
    value: &'a str,
) -> Result<&'a str, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::MissingField { resource, field });
    }
    Ok(value)
}

/// Require a declared, non-zero port
pub fn require_port(
    resource: ResourceKind,
    field: &'static str,
    port: Option<u16>,
) -> Result<u16, ValidationError> {
    match port {
        Some(port) if port != 0 => Ok(port),
        _ => Err(ValidationError::MissingField { resource, field }),
    }
}

/// Use the declared port, or `default` when absent
pub fn port_or_default(resource: ResourceKind, port: Option<u16>, default: u16) -> u16 {
    match port {
        Some(port) if port != 0 => port,
        _ => {
            debug!(resource = %resource, port = default, "Port not declared, using default");
            default
        }
    }
}

/// Use the declared value, or `default` when empty
pub fn value_or_default<'a>(
    resource: ResourceKind,
    field: &'static str,
    value: &'a str,
    default: &'a str,
) -> &'a str {
    if value.is_empty() {
        debug!(resource = %resource, field, default, "Parameter not declared, using default");
        default
    } else {
        value
    }
}

/// Parse a role and check it against the vendor's allowed set
pub fn role(resource: ResourceKind, value: &str, allowed: &[Role]) -> Result<Role, ValidationError> {
    require(resource, "role", value)?;

    match Role::parse(value) {
        Some(role) if allowed.contains(&role) => Ok(role),
        _ => Err(ValidationError::InvalidRole {
            resource,
            role: value.to_string(),
            allowed: allowed
                .iter()
                .map(Role::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

/// A user resource that passed validation
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ValidatedUser<'a> {
    pub name: &'a str,
    pub password: &'a str,
    pub role: Role,
    pub enable: bool,
}

impl std::fmt::Debug for ValidatedUser<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedUser")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("enable", &self.enable)
            .finish_non_exhaustive()
    }
}

/// Validate one account
pub fn user<'a>(user: &'a UserResource, allowed: &[Role]) -> Result<ValidatedUser<'a>, ValidationError> {
    let name = require(ResourceKind::User, "name", &user.name)?;
    let password = require(ResourceKind::User, "password", &user.password)?;
    let role = role(ResourceKind::User, &user.role, allowed)?;

    Ok(ValidatedUser {
        name,
        password,
        role,
        enable: user.enable,
    })
}

/// Validate a whole account list, failing on the first defect
///
/// Callers validate the list before the first wire call so that a malformed
/// entry stops the apply before anything reaches the device.
pub fn users<'a>(
    users: &'a [UserResource],
    allowed: &[Role],
) -> Result<Vec<ValidatedUser<'a>>, ValidationError> {
    users.iter().map(|u| user(u, allowed)).collect()
}

/// Syslog target that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyslogTarget<'a> {
    pub server: &'a str,
    pub port: u16,
}

/// Validate an enabled syslog resource, defaulting the port to 514
pub fn syslog(cfg: &SyslogResource) -> Result<SyslogTarget<'_>, ValidationError> {
    let server = require(ResourceKind::Syslog, "server", &cfg.server)?;
    let port = port_or_default(ResourceKind::Syslog, cfg.port, DEFAULT_SYSLOG_PORT);
    Ok(SyslogTarget { server, port })
}

/// NTP settings that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtpTarget<'a> {
    pub server1: &'a str,
    pub server2: &'a str,
    pub server3: &'a str,
    pub timezone: &'a str,
}

/// Validate an enabled NTP resource; missing secondary servers become empty strings
pub fn ntp(cfg: &NtpResource) -> Result<NtpTarget<'_>, ValidationError> {
    let server1 = require(ResourceKind::Ntp, "server1", &cfg.server1)?;
    let timezone = require(ResourceKind::Ntp, "timezone", &cfg.timezone)?;

    Ok(NtpTarget {
        server1,
        server2: cfg.server2.as_deref().unwrap_or_default(),
        server3: cfg.server3.as_deref().unwrap_or_default(),
        timezone,
    })
}
