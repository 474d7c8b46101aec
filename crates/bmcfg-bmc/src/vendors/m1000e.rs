//! Dell PowerEdge M1000e chassis management controller driver (forms)
//!
//! Every settings page is a url-encoded POST to `/cgi-bin/webcgi/<page>`
//! carrying the `ST2` session token as a form field. The web server
//! certificate is the exception: it is uploaded as a multipart form.

use async_trait::async_trait;
use bmcfg_common::validate::{self, NtpTarget, Role, SyslogTarget, ValidatedUser};
use bmcfg_common::{LdapResource, ResourceKind, SslResource};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::driver::{BmcDriver, ResourceApplier};
use crate::error::{BmcError, Result};
use crate::protocol::expect_success;
use crate::protocol::form::{self, FormParams, FormValue};
use crate::transport::{Multipart, Request, Transport};
use crate::types::{Credentials, Model};

const LOGIN_PATH: &str = "/cgi-bin/webcgi/login";
const INTERFACES_PATH: &str = "/cgi-bin/webcgi/interfaces";
const DATETIME_PATH: &str = "/cgi-bin/webcgi/datetime";
const DIRECTORY_SERVICES_PATH: &str = "/cgi-bin/webcgi/dirsvcs";
const LDAP_ROLE_PATH: &str = "/cgi-bin/webcgi/ldaprole?index=1";
const CERTIFICATE_UPLOAD_PATH: &str = "/cgi-bin/webcgi/certupload";

/// Administrator privilege bitmap, also used as the CMC group
const ADMINISTRATOR: i64 = 4095;

/// Session idle timeout requested at login, in seconds
const SESSION_TIMEOUT: i64 = 1800;

const DEFAULT_USER_ATTRIBUTE: &str = "uid";
const DEFAULT_GROUP_ATTRIBUTE: &str = "memberUid";

/// Per-capability flags granted to administrators
const ADMIN_FLAGS: [&str; 10] = [
    "login",
    "cfg",
    "cfguser",
    "clearlog",
    "chassiscontrol",
    "superuser",
    "serveradmin",
    "testalert",
    "debug",
    "afabricadmin",
];

fn admin_flags(fields: &mut Vec<(&'static str, FormValue)>) {
    fields.extend(ADMIN_FLAGS.iter().map(|flag| (*flag, FormValue::Bool(true))));
    fields.push(("bfabricadmin", FormValue::Bool(true)));
}

struct LoginParams<'a> {
    user: &'a str,
    password: &'a str,
}

impl FormParams for LoginParams<'_> {
    fn fields(&self) -> Vec<(&'static str, FormValue)> {
        vec![
            ("WEBSERVER_timeout", SESSION_TIMEOUT.into()),
            ("user", self.user.into()),
            ("password", self.password.into()),
            ("WEBSERVER_timeout_select", SESSION_TIMEOUT.into()),
        ]
    }
}

/// `/cgi-bin/webcgi/user?id=N`; the query id and `UserID` must match
struct UserParams<'a> {
    token: &'a str,
    user_id: usize,
    enable: bool,
    name: &'a str,
    password: &'a str,
}

impl FormParams for UserParams<'_> {
    fn fields(&self) -> Vec<(&'static str, FormValue)> {
        let mut fields = vec![
            ("ST2", self.token.into()),
            ("Privilege", ADMINISTRATOR.into()),
            ("UserID", self.user_id.into()),
            ("EnableUser", self.enable.into()),
            ("UserName", self.name.into()),
            ("ChangePassword", true.into()),
            ("Password", self.password.into()),
            ("ConfirmPassword", self.password.into()),
            ("CMC_GROUP", ADMINISTRATOR.into()),
        ];
        admin_flags(&mut fields);
        fields.push(("cfabricadmin", true.into()));
        fields
    }
}

/// `/cgi-bin/webcgi/interfaces`
///
/// The page submits every network service at once, so the other services
/// are sent with the factory values.
struct InterfaceParams<'a> {
    token: &'a str,
    syslog_server: &'a str,
    syslog_port: u16,
}

impl FormParams for InterfaceParams<'_> {
    fn fields(&self) -> Vec<(&'static str, FormValue)> {
        vec![
            ("ST2", self.token.into()),
            ("SERIAL_enable", true.into()),
            ("SERIAL_redirect_enable", true.into()),
            ("SERIAL_timeout", 1800i64.into()),
            ("SERIAL_baudrate", 115200i64.into()),
            ("SERIAL_console_no_auth", false.into()),
            ("SERIAL_quit_key", "^\\".into()),
            ("SERIAL_history_buf_size", 8192i64.into()),
            ("SERIAL_login_command", "".into()),
            ("WEBSERVER_enable", true.into()),
            ("WEBSERVER_maxsessions", 4i64.into()),
            ("WEBSERVER_timeout", SESSION_TIMEOUT.into()),
            ("WEBSERVER_http_port", 80i64.into()),
            ("WEBSERVER_https_port", 443i64.into()),
            ("SSH_enable", true.into()),
            ("SSH_maxsessions", 4i64.into()),
            ("SSH_timeout", 1800i64.into()),
            ("SSH_port", 22i64.into()),
            ("TELNET_enable", true.into()),
            ("TELNET_maxsessions", 4i64.into()),
            ("TELNET_timeout", 1800i64.into()),
            ("TELNET_port", 23i64.into()),
            ("RACADM_enable", true.into()),
            ("RACADM_maxsessions", 4i64.into()),
            ("RACADM_timeout", 60i64.into()),
            ("SNMP_enable", true.into()),
            ("SNMP_COMMUNITYNAME_get", "public".into()),
            ("SNMP_Protocol", 0i64.into()),
            ("SNMP_DiscoveryPort_set", 161i64.into()),
            ("CHASSIS_LOGGING_remote_syslog_enable", true.into()),
            ("CHASSIS_LOGGING_remote_syslog_host_1", self.syslog_server.into()),
            ("CHASSIS_LOGGING_remote_syslog_host_2", "".into()),
            ("CHASSIS_LOGGING_remote_syslog_host_3", "".into()),
            ("CHASSIS_LOGGING_remote_syslog_port", self.syslog_port.into()),
        ]
    }
}

/// `/cgi-bin/webcgi/datetime`
struct DatetimeParams<'a> {
    token: &'a str,
    ntp: &'a NtpTarget<'a>,
}

impl FormParams for DatetimeParams<'_> {
    fn fields(&self) -> Vec<(&'static str, FormValue)> {
        vec![
            ("ST2", self.token.into()),
            ("NTP_enable", true.into()),
            ("NTP_server1", self.ntp.server1.into()),
            ("NTP_server2", self.ntp.server2.into()),
            ("NTP_server3", self.ntp.server3.into()),
            ("datetimeChanged", true.into()),
            ("CMC_TIME_timezone_string", self.ntp.timezone.into()),
            ("tzChanged", true.into()),
        ]
    }
}

/// `/cgi-bin/webcgi/dirsvcs`, generic LDAP with Active Directory off
struct DirectoryServicesParams<'a> {
    token: &'a str,
    server: &'a str,
    port: u16,
    base_dn: &'a str,
    user_attribute: &'a str,
    group_attribute: &'a str,
    search_filter: &'a str,
}

impl FormParams for DirectoryServicesParams<'_> {
    fn fields(&self) -> Vec<(&'static str, FormValue)> {
        vec![
            ("ST2", self.token.into()),
            ("SERVICE_selected", "ldap".into()),
            ("CERT_type", 5i64.into()),
            ("action", 1i64.into()),
            ("choose", 2i64.into()),
            ("GENLDAP_enable_ck", true.into()),
            ("GENLDAP_enable", true.into()),
            ("GENLDAP_group_attribute_is_dn_ck", true.into()),
            ("GENLDAP_group_attribute_is_dn", true.into()),
            ("GENLDAP_cert_validate_enable_ck", true.into()),
            ("GENLDAP_cert_validate_enable", false.into()),
            ("GENLDAP_bind_dn", "".into()),
            ("GENLDAP_bind_passwd", "PASSWORD".into()),
            ("GENLDAP_bind_passwd_changed", false.into()),
            ("GENLDAP_base_dn", self.base_dn.into()),
            ("GENLDAP_user_attribute", self.user_attribute.into()),
            ("GENLDAP_group_attribute", self.group_attribute.into()),
            ("GENLDAP_search_filter", self.search_filter.into()),
            ("GENLDAP_connect_timeout_seconds", 30i64.into()),
            ("GENLDAP_search_timeout_seconds", 120i64.into()),
            ("LDAP_servers", 1i64.into()),
            ("GENLDAP_server_addr", self.server.into()),
            ("GENLDAP_server_port", self.port.into()),
            ("GENLDAP_srvlookup_enable", false.into()),
            ("AD_enable", false.into()),
            ("AD_timeout", 120i64.into()),
            ("AD_schema_ext", 1i64.into()),
            ("RoleGroupFlag", 0i64.into()),
            ("RoleGroupIndex", "".into()),
        ]
    }
}

/// `/cgi-bin/webcgi/ldaprole?index=1`
struct LdapRoleParams<'a> {
    token: &'a str,
    group_dn: &'a str,
}

impl FormParams for LdapRoleParams<'_> {
    fn fields(&self) -> Vec<(&'static str, FormValue)> {
        let mut fields = vec![
            ("ST2", self.token.into()),
            ("PrivBitmap", ADMINISTRATOR.into()),
            ("Index", 1i64.into()),
            ("GENLDAP_ROLE_dn", self.group_dn.into()),
            ("GENLDAP_ROLE_privilege", ADMINISTRATOR.into()),
        ];
        admin_flags(&mut fields);
        fields
    }
}

/// Certificate and key upload to `/cgi-bin/webcgi/certupload`
fn certificate_form(token: &str, certificate: UploadFile, key: UploadFile) -> Multipart {
    Multipart::new()
        .text("ST2", token)
        .text("caller", "")
        .text("pageCode", "")
        .text("pageId", "2")
        .text("pageName", "")
        .file("file", certificate.file_name, certificate.data)
        .file("file_key", key.file_name, key.data)
}

struct UploadFile {
    file_name: String,
    data: Vec<u8>,
}

async fn read_upload(path: &str) -> Result<UploadFile> {
    let path = Path::new(path);
    let data = tokio::fs::read(path).await.map_err(|source| BmcError::ReadFile {
        resource: ResourceKind::Ssl,
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(UploadFile { file_name, data })
}

/// Find an `ST2=<token>` in a login reply
fn session_token(text: &str) -> Option<&str> {
    let (_, rest) = text.split_once("ST2=")?;
    let end = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    let token = &rest[..end];
    (!token.is_empty()).then_some(token)
}

/// M1000e driver
pub struct M1000e {
    host: String,
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    token: Option<String>,
}

impl M1000e {
    pub fn new(host: impl Into<String>, credentials: Credentials, transport: Arc<dyn Transport>) -> Self {
        Self {
            host: host.into(),
            credentials,
            transport,
            token: None,
        }
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| BmcError::AuthenticationFailed(format!("not connected to {}", self.host)))
    }

    async fn submit<P: FormParams + Sync>(&self, resource: ResourceKind, path: &str, params: &P) -> Result<()> {
        debug!(host = %self.host, endpoint = path, "Submitting form");
        let request = Request::post(path, form::encode(params)).content_type(form::CONTENT_TYPE);
        let response = self.transport.send(request).await?;
        expect_success(resource, path, &response)
    }
}

#[async_trait]
impl ResourceApplier for M1000e {
    fn model(&self) -> Model {
        Model::M1000e
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn supports(&self, resource: ResourceKind) -> bool {
        matches!(
            resource,
            ResourceKind::User
                | ResourceKind::Syslog
                | ResourceKind::Ntp
                | ResourceKind::Ldap
                | ResourceKind::Ssl
        )
    }

    fn user_roles(&self) -> &'static [Role] {
        &[Role::Admin]
    }

    async fn apply_user(&self, user: &ValidatedUser<'_>, index: usize) -> Result<()> {
        let user_id = index + 1;
        let params = UserParams {
            token: self.token()?,
            user_id,
            enable: user.enable,
            name: user.name,
            password: user.password,
        };
        self.submit(
            ResourceKind::User,
            &format!("/cgi-bin/webcgi/user?id={}", user_id),
            &params,
        )
        .await
    }

    async fn apply_syslog(&self, target: &SyslogTarget<'_>) -> Result<()> {
        let params = InterfaceParams {
            token: self.token()?,
            syslog_server: target.server,
            syslog_port: target.port,
        };
        self.submit(ResourceKind::Syslog, INTERFACES_PATH, &params)
            .await
    }

    async fn apply_ntp(&self, target: &NtpTarget<'_>) -> Result<()> {
        let params = DatetimeParams {
            token: self.token()?,
            ntp: target,
        };
        self.submit(ResourceKind::Ntp, DATETIME_PATH, &params).await
    }

    async fn apply_ldap(&self, cfg: &LdapResource) -> Result<()> {
        let server = validate::require(ResourceKind::Ldap, "server", &cfg.server)?;
        let port = validate::require_port(ResourceKind::Ldap, "port", cfg.port)?;
        let base_dn = validate::require(ResourceKind::Ldap, "base_dn", &cfg.base_dn)?;
        validate::require(ResourceKind::Ldap, "group", &cfg.group)?;
        validate::require(ResourceKind::Ldap, "group_base_dn", &cfg.group_base_dn)?;
        validate::role(ResourceKind::Ldap, &cfg.role, &[Role::Admin])?;
        let token = self.token()?;

        let directory = DirectoryServicesParams {
            token,
            server,
            port,
            base_dn,
            user_attribute: validate::value_or_default(
                ResourceKind::Ldap,
                "user_attribute",
                &cfg.user_attribute,
                DEFAULT_USER_ATTRIBUTE,
            ),
            group_attribute: validate::value_or_default(
                ResourceKind::Ldap,
                "group_attribute",
                &cfg.group_attribute,
                DEFAULT_GROUP_ATTRIBUTE,
            ),
            search_filter: &cfg.search_filter,
        };
        self.submit(ResourceKind::Ldap, DIRECTORY_SERVICES_PATH, &directory)
            .await?;

        let group_dn = cfg.group_dn();
        let role = LdapRoleParams {
            token,
            group_dn: &group_dn,
        };
        self.submit(ResourceKind::Ldap, LDAP_ROLE_PATH, &role).await
    }

    async fn apply_ssl(&self, cfg: &SslResource) -> Result<()> {
        let certificate_file = validate::require(ResourceKind::Ssl, "certificate_file", &cfg.certificate_file)?;
        let key_file = validate::require(ResourceKind::Ssl, "key_file", &cfg.key_file)?;
        let token = self.token()?;

        let certificate = read_upload(certificate_file).await?;
        let key = read_upload(key_file).await?;
        debug!(
            host = %self.host,
            certificate = %certificate.file_name,
            bytes = certificate.data.len(),
            "Uploading web server certificate"
        );

        let request = Request::multipart(CERTIFICATE_UPLOAD_PATH, certificate_form(token, certificate, key));
        let response = self.transport.send(request).await?;
        expect_success(ResourceKind::Ssl, CERTIFICATE_UPLOAD_PATH, &response)
    }
}

#[async_trait]
impl BmcDriver for M1000e {
    async fn connect(&mut self) -> Result<()> {
        let body = form::encode(&LoginParams {
            user: &self.credentials.username,
            password: &self.credentials.password,
        });
        let response = self
            .transport
            .send(Request::post(LOGIN_PATH, body).content_type(form::CONTENT_TYPE))
            .await?;

        if !response.is_success() {
            return Err(BmcError::AuthenticationFailed(format!(
                "login returned status {}",
                response.status
            )));
        }

        let text = response.text();
        let token = response
            .header("Location")
            .and_then(session_token)
            .or_else(|| session_token(&text))
            .ok_or_else(|| BmcError::AuthenticationFailed("no ST2 token in login response".to_string()))?;

        self.token = Some(token.to_string());
        info!(host = %self.host, model = %Model::M1000e, "Connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.token.is_some()
    }
}
