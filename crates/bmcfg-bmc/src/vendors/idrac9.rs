//! Dell iDRAC9 driver
//!
//! Everything, including time and directory settings, goes through JSON
//! configuration groups. The session is carried in the `XSRF-TOKEN` header.

use async_trait::async_trait;
use bmcfg_common::validate::{self, NtpTarget, Role, SyslogTarget, ValidatedUser};
use bmcfg_common::{LdapResource, ResourceKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::idrac::{self, SyslogSettings, UserSettings};
use crate::driver::{BmcDriver, ResourceApplier};
use crate::error::{BmcError, Result};
use crate::protocol::{expect_success, json};
use crate::transport::{Method, Request, Transport};
use crate::types::{Credentials, Model};

const SESSION_PATH: &str = "/sysmgmt/2015/bmc/session";
const SESSION_HEADER: &str = "XSRF-TOKEN";

const NTP_GROUP: &str = "iDRAC.NTPConfigGroup";
const TIME_GROUP: &str = "iDRAC.Time";
const LDAP_GROUP: &str = "iDRAC.LDAP";
const LDAP_ROLE_GROUP: &str = "iDRAC.LDAPRoleGroup.1";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionReply {
    #[serde(default)]
    auth_result: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct NtpSettings<'a> {
    #[serde(rename = "NTP1")]
    ntp1: &'a str,
    #[serde(rename = "NTP2")]
    ntp2: &'a str,
    #[serde(rename = "NTP3")]
    ntp3: &'a str,
    #[serde(rename = "NTPEnable")]
    ntp_enable: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TimeSettings<'a> {
    timezone: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct LdapSettings<'a> {
    enable: &'static str,
    server: &'a str,
    port: String,
    #[serde(rename = "BaseDN")]
    base_dn: &'a str,
    user_attribute: &'a str,
    group_attribute: &'a str,
    #[serde(rename = "GroupAttributeIsDN")]
    group_attribute_is_dn: &'static str,
    search_filter: &'a str,
    #[serde(rename = "CertValidationEnable")]
    cert_validation_enable: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct LdapRoleSettings {
    #[serde(rename = "DN")]
    dn: String,
    privilege: &'static str,
}

/// iDRAC9 driver
pub struct Idrac9 {
    host: String,
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    token: Option<String>,
}

impl Idrac9 {
    pub fn new(host: impl Into<String>, credentials: Credentials, transport: Arc<dyn Transport>) -> Self {
        Self {
            host: host.into(),
            credentials,
            transport,
            token: None,
        }
    }

    async fn put_group<T: Serialize + Sync>(
        &self,
        resource: ResourceKind,
        group: &str,
        settings: &T,
    ) -> Result<()> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| BmcError::AuthenticationFailed(format!("not connected to {}", self.host)))?;
        let path = json::config_group_path(group);
        let body = json::config_group(group, settings)?;
        debug!(host = %self.host, endpoint = %path, "Updating configuration group");

        let request = Request::put(path.as_str(), body)
            .content_type(json::CONTENT_TYPE)
            .header(SESSION_HEADER, token);
        let response = self.transport.send(request).await?;
        expect_success(resource, &path, &response)
    }
}

#[async_trait]
impl ResourceApplier for Idrac9 {
    fn model(&self) -> Model {
        Model::Idrac9
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn supports(&self, resource: ResourceKind) -> bool {
        matches!(
            resource,
            ResourceKind::User | ResourceKind::Syslog | ResourceKind::Ntp | ResourceKind::Ldap
        )
    }

    fn user_roles(&self) -> &'static [Role] {
        &[Role::Admin, Role::User]
    }

    async fn apply_user(&self, user: &ValidatedUser<'_>, index: usize) -> Result<()> {
        self.put_group(
            ResourceKind::User,
            &idrac::user_group(index),
            &UserSettings::new(user),
        )
        .await
    }

    async fn apply_syslog(&self, target: &SyslogTarget<'_>) -> Result<()> {
        self.put_group(
            ResourceKind::Syslog,
            idrac::SYSLOG_GROUP,
            &SyslogSettings::new(target),
        )
        .await
    }

    async fn apply_ntp(&self, target: &NtpTarget<'_>) -> Result<()> {
        let servers = NtpSettings {
            ntp1: target.server1,
            ntp2: target.server2,
            ntp3: target.server3,
            ntp_enable: json::enabled(true),
        };
        self.put_group(ResourceKind::Ntp, NTP_GROUP, &servers).await?;

        let time = TimeSettings {
            timezone: target.timezone,
        };
        self.put_group(ResourceKind::Ntp, TIME_GROUP, &time).await
    }

    async fn apply_ldap(&self, cfg: &LdapResource) -> Result<()> {
        let server = validate::require(ResourceKind::Ldap, "server", &cfg.server)?;
        let port = validate::require_port(ResourceKind::Ldap, "port", cfg.port)?;
        let base_dn = validate::require(ResourceKind::Ldap, "base_dn", &cfg.base_dn)?;
        let user_attribute = validate::require(ResourceKind::Ldap, "user_attribute", &cfg.user_attribute)?;
        let group_attribute =
            validate::require(ResourceKind::Ldap, "group_attribute", &cfg.group_attribute)?;
        validate::require(ResourceKind::Ldap, "group", &cfg.group)?;
        validate::require(ResourceKind::Ldap, "group_base_dn", &cfg.group_base_dn)?;
        let role = validate::role(ResourceKind::Ldap, &cfg.role, &[Role::Admin, Role::User])?;

        let settings = LdapSettings {
            enable: json::enabled(true),
            server,
            port: port.to_string(),
            base_dn,
            user_attribute,
            group_attribute,
            group_attribute_is_dn: json::enabled(true),
            search_filter: &cfg.search_filter,
            cert_validation_enable: json::enabled(false),
        };
        self.put_group(ResourceKind::Ldap, LDAP_GROUP, &settings)
            .await?;

        let role_group = LdapRoleSettings {
            dn: cfg.group_dn(),
            privilege: idrac::privilege(role),
        };
        self.put_group(ResourceKind::Ldap, LDAP_ROLE_GROUP, &role_group)
            .await
    }
}

#[async_trait]
impl BmcDriver for Idrac9 {
    async fn connect(&mut self) -> Result<()> {
        let request = Request::new(Method::POST, SESSION_PATH)
            .header("user", format!("\"{}\"", self.credentials.username))
            .header("password", format!("\"{}\"", self.credentials.password));
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(BmcError::AuthenticationFailed(format!(
                "session request returned status {}",
                response.status
            )));
        }

        // Older firmware answers with an empty body
        if let Ok(reply) = serde_json::from_slice::<SessionReply>(&response.body) {
            if let Some(code) = reply.auth_result.filter(|code| *code != 0) {
                return Err(BmcError::AuthenticationFailed(format!("session authResult {}", code)));
            }
        }

        let token = response
            .header(SESSION_HEADER)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| BmcError::AuthenticationFailed(format!("no {} in session response", SESSION_HEADER)))?;

        self.token = Some(token.to_string());
        info!(host = %self.host, model = %Model::Idrac9, "Connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.token.is_some()
    }
}
