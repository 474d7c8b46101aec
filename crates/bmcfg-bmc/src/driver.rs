//! Driver traits and the resource dispatcher

use async_trait::async_trait;
use bmcfg_common::validate::{self, NtpTarget, Role, SyslogTarget, ValidatedUser};
use bmcfg_common::{
    ConfigurationBundle, LdapResource, NetworkResource, Resource, ResourceKind, SslResource,
    UserResource,
};
use tracing::{debug, error, info, warn};

use crate::error::{BmcError, Result};
use crate::types::Model;

/// Per-resource apply routines of one controller model
///
/// The dispatcher only calls a routine when [`supports`](Self::supports)
/// returns true for its resource, and only with validated input for users,
/// syslog and NTP. LDAP, network and SSL requirements differ per vendor, so
/// those routines validate their own input.
#[async_trait]
pub trait ResourceApplier: Send + Sync {
    /// Controller model
    fn model(&self) -> Model;

    /// Host this driver talks to
    fn host(&self) -> &str;

    /// Check if the model can apply a resource
    fn supports(&self, resource: ResourceKind) -> bool;

    /// Roles accepted for local accounts
    fn user_roles(&self) -> &'static [Role] {
        &[Role::Admin]
    }

    /// Create or update one account
    ///
    /// `index` is the account's position in the list; models with numbered
    /// slots derive the slot from it.
    async fn apply_user(&self, user: &ValidatedUser<'_>, index: usize) -> Result<()>;

    async fn apply_syslog(&self, _target: &SyslogTarget<'_>) -> Result<()> {
        Err(BmcError::Unsupported(ResourceKind::Syslog))
    }

    async fn apply_ntp(&self, _target: &NtpTarget<'_>) -> Result<()> {
        Err(BmcError::Unsupported(ResourceKind::Ntp))
    }

    async fn apply_ldap(&self, _cfg: &LdapResource) -> Result<()> {
        Err(BmcError::Unsupported(ResourceKind::Ldap))
    }

    async fn apply_network(&self, _cfg: &NetworkResource) -> Result<()> {
        Err(BmcError::Unsupported(ResourceKind::Network))
    }

    async fn apply_ssl(&self, _cfg: &SslResource) -> Result<()> {
        Err(BmcError::Unsupported(ResourceKind::Ssl))
    }
}

/// A connected controller
#[async_trait]
pub trait BmcDriver: ResourceApplier {
    /// Log in and keep the session token for later calls
    async fn connect(&mut self) -> Result<()>;

    /// Whether a session token is held
    fn is_connected(&self) -> bool;

    /// Apply every populated slot and report what happened to each
    ///
    /// Returns `Err` only for errors that stop the whole call: transport
    /// failures, authentication failures and invalid user entries.
    async fn apply_config_report(&self, bundle: &ConfigurationBundle) -> Result<ApplyReport> {
        dispatch(self, bundle).await
    }

    /// Apply every populated slot, returning the last recorded error
    async fn apply_config(&self, bundle: &ConfigurationBundle) -> Result<()> {
        self.apply_config_report(bundle).await?.into_result()
    }
}

/// What happened to one resource
#[derive(Debug)]
pub enum ResourceStatus {
    /// Sent and accepted
    Applied,
    /// Intentionally not applied
    Skipped(String),
    /// The model has no routine for the resource
    Unsupported,
    /// The key is not a known resource
    Unrecognized,
    /// Validation failed or the controller rejected it
    Failed(BmcError),
}

impl ResourceStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, ResourceStatus::Failed(_))
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Applied => write!(f, "applied"),
            ResourceStatus::Skipped(reason) => write!(f, "skipped ({})", reason),
            ResourceStatus::Unsupported => write!(f, "not supported by this model"),
            ResourceStatus::Unrecognized => write!(f, "unknown resource"),
            ResourceStatus::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// One line of an [`ApplyReport`]
#[derive(Debug)]
pub struct ResourceOutcome {
    pub resource: String,
    pub status: ResourceStatus,
}

/// Per-resource outcomes of an apply call, in dispatch order
#[derive(Debug, Default)]
pub struct ApplyReport {
    outcomes: Vec<ResourceOutcome>,
}

impl ApplyReport {
    fn push(&mut self, resource: &str, status: ResourceStatus) {
        self.outcomes.push(ResourceOutcome {
            resource: resource.to_string(),
            status,
        });
    }

    pub fn outcomes(&self) -> &[ResourceOutcome] {
        &self.outcomes
    }

    /// Status recorded for a resource name
    pub fn status(&self, resource: &str) -> Option<&ResourceStatus> {
        self.outcomes
            .iter()
            .find(|o| o.resource == resource)
            .map(|o| &o.status)
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| o.status.is_failure())
    }

    /// The last recorded failure, or `Ok(())`
    pub fn into_result(self) -> Result<()> {
        match self
            .outcomes
            .into_iter()
            .rev()
            .find_map(|o| match o.status {
                ResourceStatus::Failed(e) => Some(e),
                _ => None,
            }) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Walk the populated slots of `bundle` in fixed order and apply each one
pub async fn dispatch<A>(applier: &A, bundle: &ConfigurationBundle) -> Result<ApplyReport>
where
    A: ResourceApplier + ?Sized,
{
    let host = applier.host();
    let model = applier.model();
    let mut report = ApplyReport::default();

    for resource in bundle.resources() {
        let name = resource.name();

        let status = match resource.kind() {
            None => {
                warn!(host, model = %model, resource = name, "Unknown resource");
                ResourceStatus::Unrecognized
            }
            Some(kind) if !applier.supports(kind) => {
                info!(host, model = %model, resource = name, "Resource not supported by this model, skipping");
                ResourceStatus::Unsupported
            }
            Some(_) => match apply_resource(applier, resource).await {
                Ok(status) => status,
                Err(e) if e.aborts_apply() => {
                    error!(host, model = %model, resource = name, error = %e, "Aborting apply");
                    return Err(e);
                }
                Err(e) => {
                    warn!(host, model = %model, resource = name, error = %e, "Unable to apply resource");
                    ResourceStatus::Failed(e)
                }
            },
        };

        report.push(name, status);
    }

    Ok(report)
}

async fn apply_resource<A>(applier: &A, resource: Resource<'_>) -> Result<ResourceStatus>
where
    A: ResourceApplier + ?Sized,
{
    match resource {
        Resource::Users(users) => apply_users(applier, users).await,
        Resource::Syslog(cfg) => {
            if !cfg.enable {
                return Ok(skipped(applier, ResourceKind::Syslog));
            }
            let target = validate::syslog(cfg)?;
            applier.apply_syslog(&target).await?;
            Ok(applied(applier, ResourceKind::Syslog))
        }
        Resource::Ntp(cfg) => {
            if !cfg.enable {
                return Ok(skipped(applier, ResourceKind::Ntp));
            }
            let target = validate::ntp(cfg)?;
            applier.apply_ntp(&target).await?;
            Ok(applied(applier, ResourceKind::Ntp))
        }
        Resource::Ldap(cfg) => {
            applier.apply_ldap(cfg).await?;
            Ok(applied(applier, ResourceKind::Ldap))
        }
        Resource::Network(cfg) => {
            applier.apply_network(cfg).await?;
            Ok(applied(applier, ResourceKind::Network))
        }
        Resource::Ssl(cfg) => {
            applier.apply_ssl(cfg).await?;
            Ok(applied(applier, ResourceKind::Ssl))
        }
        Resource::Unrecognized(_) => Ok(ResourceStatus::Unrecognized),
    }
}

/// Validate the whole list first, then apply each account in order
async fn apply_users<A>(applier: &A, users: &[UserResource]) -> Result<ResourceStatus>
where
    A: ResourceApplier + ?Sized,
{
    let validated = validate::users(users, applier.user_roles())?;
    let mut last_error = None;

    for (index, user) in validated.iter().enumerate() {
        match applier.apply_user(user, index).await {
            Ok(()) => info!(host = applier.host(), user = user.name, "User parameters applied"),
            Err(e) if e.aborts_apply() => return Err(e),
            Err(e) => {
                warn!(host = applier.host(), user = user.name, error = %e, "Unable to apply user");
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) => Err(e),
        None => Ok(ResourceStatus::Applied),
    }
}

fn skipped<A: ResourceApplier + ?Sized>(applier: &A, resource: ResourceKind) -> ResourceStatus {
    debug!(host = applier.host(), resource = %resource, "Declared with enable: false, skipping");
    ResourceStatus::Skipped("declared with enable: false".to_string())
}

fn applied<A: ResourceApplier + ?Sized>(applier: &A, resource: ResourceKind) -> ResourceStatus {
    info!(host = applier.host(), resource = %resource, "Resource parameters applied");
    ResourceStatus::Applied
}
