//! Resource types and the sparse configuration bundle

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ConfigError;

/// Kind of configurable BMC resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    User,
    Syslog,
    Network,
    Ntp,
    Ldap,
    Ssl,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::User => "user",
            ResourceKind::Syslog => "syslog",
            ResourceKind::Network => "network",
            ResourceKind::Ntp => "ntp",
            ResourceKind::Ldap => "ldap",
            ResourceKind::Ssl => "ssl",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A local account on the controller
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserResource {
    pub name: String,
    pub password: String,
    /// Privilege tier, `admin` or `user` depending on the vendor
    pub role: String,
    pub enable: bool,
}

impl UserResource {
    /// Create an enabled account
    pub fn new(
        name: impl Into<String>,
        password: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            role: role.into(),
            enable: true,
        }
    }

    pub fn with_enable(mut self, enable: bool) -> Self {
        self.enable = enable;
        self
    }
}

// Passwords stay out of logs.
impl std::fmt::Debug for UserResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserResource")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .field("enable", &self.enable)
            .finish()
    }
}

/// Remote syslog target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyslogResource {
    pub server: String,
    /// Defaults to 514 where the vendor accepts a port
    pub port: Option<u16>,
    /// When false the resource is skipped, the device is left untouched
    pub enable: bool,
}

impl SyslogResource {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port: None,
            enable: true,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_enable(mut self, enable: bool) -> Self {
        self.enable = enable;
        self
    }
}

/// Time source and timezone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NtpResource {
    pub server1: String,
    pub server2: Option<String>,
    pub server3: Option<String>,
    pub timezone: String,
    pub enable: bool,
}

impl NtpResource {
    pub fn new(server1: impl Into<String>, timezone: impl Into<String>) -> Self {
        Self {
            server1: server1.into(),
            server2: None,
            server3: None,
            timezone: timezone.into(),
            enable: true,
        }
    }

    pub fn with_secondary(mut self, server2: impl Into<String>) -> Self {
        self.server2 = Some(server2.into());
        self
    }

    pub fn with_tertiary(mut self, server3: impl Into<String>) -> Self {
        self.server3 = Some(server3.into());
        self
    }

    pub fn with_enable(mut self, enable: bool) -> Self {
        self.enable = enable;
        self
    }
}

/// Directory service binding
///
/// Which fields are required depends on the vendor; a missing one aborts the
/// LDAP resource only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LdapResource {
    pub server: String,
    pub port: Option<u16>,
    pub search_filter: String,
    /// Common name of the group granted access
    pub group: String,
    /// DN under which `group` lives
    pub group_base_dn: String,
    /// DN searched for user entries
    pub base_dn: String,
    pub user_attribute: String,
    pub group_attribute: String,
    pub role: String,
}

impl LdapResource {
    /// Full DN of the access group, `cn=<group>,<group_base_dn>`
    pub fn group_dn(&self) -> String {
        format!("cn={},{}", self.group, self.group_base_dn)
    }
}

/// Management network settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkResource {
    pub hostname: Option<String>,
    pub dns_servers: Vec<String>,
    pub ssh_enable: bool,
    pub ssh_port: Option<u16>,
    pub ipmi_enable: bool,
    pub sol_enable: bool,
}

/// Web server certificate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SslResource {
    pub certificate_file: String,
    pub key_file: String,
}

/// Sparse, vendor-neutral description of the desired controller state
///
/// Every slot is optional. Presence is the only signal drivers consult.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationBundle {
    #[serde(default, rename = "user", alias = "users", skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<UserResource>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syslog: Option<SyslogResource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkResource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ntp: Option<NtpResource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ldap: Option<LdapResource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<SslResource>,

    /// Top-level keys the model does not know about
    #[serde(flatten)]
    pub unrecognized: BTreeMap<String, serde_json::Value>,
}

/// A populated slot of a [`ConfigurationBundle`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resource<'a> {
    Users(&'a [UserResource]),
    Syslog(&'a SyslogResource),
    Network(&'a NetworkResource),
    Ntp(&'a NtpResource),
    Ldap(&'a LdapResource),
    Ssl(&'a SslResource),
    Unrecognized(&'a str),
}

impl Resource<'_> {
    /// The resource kind, `None` for unrecognized slots
    pub fn kind(&self) -> Option<ResourceKind> {
        match self {
            Resource::Users(_) => Some(ResourceKind::User),
            Resource::Syslog(_) => Some(ResourceKind::Syslog),
            Resource::Network(_) => Some(ResourceKind::Network),
            Resource::Ntp(_) => Some(ResourceKind::Ntp),
            Resource::Ldap(_) => Some(ResourceKind::Ldap),
            Resource::Ssl(_) => Some(ResourceKind::Ssl),
            Resource::Unrecognized(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Resource::Unrecognized(name) => name,
            other => other.kind().map(|k| k.as_str()).unwrap_or_default(),
        }
    }
}

impl ConfigurationBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document
    pub fn from_yaml_str(s: &str) -> crate::Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Load a YAML document from disk
    pub fn from_path(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Populated slots in dispatch order
    ///
    /// The order is fixed: user, syslog, network, ntp, ldap, ssl, then any
    /// unrecognized keys. It does not depend on how the bundle was written.
    pub fn resources(&self) -> Vec<Resource<'_>> {
        let mut resources = Vec::new();

        if let Some(users) = &self.users {
            resources.push(Resource::Users(users));
        }
        if let Some(syslog) = &self.syslog {
            resources.push(Resource::Syslog(syslog));
        }
        if let Some(network) = &self.network {
            resources.push(Resource::Network(network));
        }
        if let Some(ntp) = &self.ntp {
            resources.push(Resource::Ntp(ntp));
        }
        if let Some(ldap) = &self.ldap {
            resources.push(Resource::Ldap(ldap));
        }
        if let Some(ssl) = &self.ssl {
            resources.push(Resource::Ssl(ssl));
        }
        resources.extend(
            self.unrecognized
                .keys()
                .map(|name| Resource::Unrecognized(name.as_str())),
        );

        resources
    }

    /// True when no slot is populated
    pub fn is_empty(&self) -> bool {
        self.resources().is_empty()
    }

    pub fn with_users(mut self, users: Vec<UserResource>) -> Self {
        self.users = Some(users);
        self
    }

    pub fn with_syslog(mut self, syslog: SyslogResource) -> Self {
        self.syslog = Some(syslog);
        self
    }

    pub fn with_network(mut self, network: NetworkResource) -> Self {
        self.network = Some(network);
        self
    }

    pub fn with_ntp(mut self, ntp: NtpResource) -> Self {
        self.ntp = Some(ntp);
        self
    }

    pub fn with_ldap(mut self, ldap: LdapResource) -> Self {
        self.ldap = Some(ldap);
        self
    }

    pub fn with_ssl(mut self, ssl: SslResource) -> Self {
        self.ssl = Some(ssl);
        self
    }
}
