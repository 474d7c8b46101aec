//! Common types for BMC operations

use std::time::Duration;

/// Hardware vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vendor {
    Hp,
    Dell,
    Supermicro,
    /// Discrete Cloudline boards, recognised but not managed
    Cloudline,
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Vendor::Hp => write!(f, "HP"),
            Vendor::Dell => write!(f, "Dell"),
            Vendor::Supermicro => write!(f, "Supermicro"),
            Vendor::Cloudline => write!(f, "Cloudline"),
        }
    }
}

/// Controller model, one driver each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    /// HP BladeSystem c7000 Onboard Administrator
    C7000,
    /// HP Integrated Lights-Out
    Ilo,
    /// Dell iDRAC 8
    Idrac8,
    /// Dell iDRAC 9
    Idrac9,
    /// Dell PowerEdge M1000e chassis management controller
    M1000e,
    /// Supermicro X10 boards
    SupermicroX10,
}

impl Model {
    pub fn vendor(&self) -> Vendor {
        match self {
            Model::C7000 | Model::Ilo => Vendor::Hp,
            Model::Idrac8 | Model::Idrac9 | Model::M1000e => Vendor::Dell,
            Model::SupermicroX10 => Vendor::Supermicro,
        }
    }

    /// Chassis controllers manage a blade enclosure rather than a single host
    pub fn is_chassis(&self) -> bool {
        matches!(self, Model::C7000 | Model::M1000e)
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Model::C7000 => write!(f, "c7000"),
            Model::Ilo => write!(f, "ilo"),
            Model::Idrac8 => write!(f, "idrac8"),
            Model::Idrac9 => write!(f, "idrac9"),
            Model::M1000e => write!(f, "m1000e"),
            Model::SupermicroX10 => write!(f, "supermicrox10"),
        }
    }
}

/// Login credentials for a controller
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL (e.g., https://bmc.example.com)
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Skip TLS verification (controllers ship self-signed certs)
    pub insecure: bool,
}

impl TransportConfig {
    /// Create a config for `https://<host>`
    pub fn new(host: &str) -> Self {
        Self {
            base_url: format!("https://{}", host),
            timeout: Duration::from_secs(30),
            insecure: true,
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Require valid certificates
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }
}
