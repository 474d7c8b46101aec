//! Supermicro X10 driver (forms)
//!
//! Accounts go to `/cgi/config_user.cgi`; everything else is an `op=` form
//! posted to `/cgi/op.cgi`. The session is the `SID` cookie set at login.

use async_trait::async_trait;
use bmcfg_common::validate::{self, NtpTarget, Role, SyslogTarget, ValidatedUser};
use bmcfg_common::{LdapResource, ResourceKind};
use std::sync::Arc;
use tracing::{debug, info};

use crate::driver::{BmcDriver, ResourceApplier};
use crate::error::{BmcError, Result};
use crate::protocol::expect_success;
use crate::protocol::form::{self, FormParams, FormValue};
use crate::transport::{Request, Transport};
use crate::types::{Credentials, Model};

const LOGIN_PATH: &str = "/cgi/login.cgi";
const USER_PATH: &str = "/cgi/config_user.cgi";
const OP_PATH: &str = "/cgi/op.cgi";
const SESSION_COOKIE: &str = "SID";

/// Slot 1 is the reserved anonymous account
const FIRST_USER_SLOT: usize = 2;

const PRIVILEGE_ADMIN: i64 = 4;
const PRIVILEGE_OPERATOR: i64 = 3;
/// IPMI "no access", used for disabled accounts
const PRIVILEGE_NO_ACCESS: i64 = 15;

fn privilege(user: &ValidatedUser<'_>) -> i64 {
    if !user.enable {
        return PRIVILEGE_NO_ACCESS;
    }
    match user.role {
        Role::Admin => PRIVILEGE_ADMIN,
        Role::User => PRIVILEGE_OPERATOR,
    }
}

struct LoginParams<'a> {
    name: &'a str,
    pwd: &'a str,
}

impl FormParams for LoginParams<'_> {
    fn fields(&self) -> Vec<(&'static str, FormValue)> {
        vec![("name", self.name.into()), ("pwd", self.pwd.into())]
    }
}

struct UserParams<'a> {
    user_id: usize,
    user: &'a ValidatedUser<'a>,
}

impl FormParams for UserParams<'_> {
    fn fields(&self) -> Vec<(&'static str, FormValue)> {
        vec![
            ("username", self.user.name.into()),
            ("userid", self.user_id.into()),
            ("password", self.user.password.into()),
            ("new_privilege", privilege(self.user).into()),
        ]
    }
}

struct SyslogParams<'a> {
    target: &'a SyslogTarget<'a>,
}

impl FormParams for SyslogParams<'_> {
    fn fields(&self) -> Vec<(&'static str, FormValue)> {
        vec![
            ("op", "config_syslog".into()),
            ("syslogport1", self.target.port.into()),
            ("syslogip1", self.target.server.into()),
            ("syslogport2", 0i64.into()),
            ("syslogip2", "".into()),
            ("syslogport3", 0i64.into()),
            ("syslogip3", "".into()),
            ("enable", true.into()),
        ]
    }
}

struct DateTimeParams<'a> {
    target: &'a NtpTarget<'a>,
}

impl FormParams for DateTimeParams<'_> {
    fn fields(&self) -> Vec<(&'static str, FormValue)> {
        vec![
            ("op", "config_date_time".into()),
            ("timezone", self.target.timezone.into()),
            ("dst_en", false.into()),
            ("ntp", "on".into()),
            ("ntp_server_pri", self.target.server1.into()),
            ("ntp_server_sec", self.target.server2.into()),
        ]
    }
}

struct LdapParams<'a> {
    server: &'a str,
    port: u16,
    base_dn: &'a str,
    search_filter: &'a str,
}

impl FormParams for LdapParams<'_> {
    fn fields(&self) -> Vec<(&'static str, FormValue)> {
        vec![
            ("op", "config_ldap".into()),
            ("en_ldap", "on".into()),
            ("en_ssl", true.into()),
            ("ldap_ip", self.server.into()),
            ("ldap_port", self.port.into()),
            ("basedn", self.base_dn.into()),
            ("ldap_search_filter", self.search_filter.into()),
        ]
    }
}

/// Supermicro X10 driver
pub struct SupermicroX10 {
    host: String,
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    sid: Option<String>,
}

impl SupermicroX10 {
    pub fn new(host: impl Into<String>, credentials: Credentials, transport: Arc<dyn Transport>) -> Self {
        Self {
            host: host.into(),
            credentials,
            transport,
            sid: None,
        }
    }

    async fn submit<P: FormParams + Sync>(&self, resource: ResourceKind, path: &str, params: &P) -> Result<()> {
        let sid = self
            .sid
            .as_deref()
            .ok_or_else(|| BmcError::AuthenticationFailed(format!("not connected to {}", self.host)))?;

        debug!(host = %self.host, endpoint = path, resource = %resource, "Submitting form");
        let request = Request::post(path, form::encode(params))
            .content_type(form::CONTENT_TYPE)
            .header("Cookie", format!("{}={}", SESSION_COOKIE, sid));
        let response = self.transport.send(request).await?;
        expect_success(resource, path, &response)
    }
}

#[async_trait]
impl ResourceApplier for SupermicroX10 {
    fn model(&self) -> Model {
        Model::SupermicroX10
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
        let params = UserParams {
            user_id: index + FIRST_USER_SLOT,
            user,
        };
        self.submit(ResourceKind::User, USER_PATH, &params).await
    }

    async fn apply_syslog(&self, target: &SyslogTarget<'_>) -> Result<()> {
        self.submit(ResourceKind::Syslog, OP_PATH, &SyslogParams { target })
            .await
    }

    async fn apply_ntp(&self, target: &NtpTarget<'_>) -> Result<()> {
        if !target.server3.is_empty() {
            debug!(host = %self.host, "Only two NTP servers are configurable, ignoring server3");
        }
        self.submit(ResourceKind::Ntp, OP_PATH, &DateTimeParams { target })
            .await
    }

    async fn apply_ldap(&self, cfg: &LdapResource) -> Result<()> {
        let params = LdapParams {
            server: validate::require(ResourceKind::Ldap, "server", &cfg.server)?,
            port: validate::require_port(ResourceKind::Ldap, "port", cfg.port)?,
            base_dn: validate::require(ResourceKind::Ldap, "base_dn", &cfg.base_dn)?,
            search_filter: &cfg.search_filter,
        };
        self.submit(ResourceKind::Ldap, OP_PATH, &params).await
    }
}

#[async_trait]
impl BmcDriver for SupermicroX10 {
    async fn connect(&mut self) -> Result<()> {
        let body = form::encode(&LoginParams {
            name: &self.credentials.username,
            pwd: &self.credentials.password,
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

        let sid = response
            .cookie(SESSION_COOKIE)
            .filter(|sid| !sid.is_empty())
            .ok_or_else(|| BmcError::AuthenticationFailed("no SID cookie in login response".to_string()))?;

        self.sid = Some(sid.to_string());
        info!(host = %self.host, model = %Model::SupermicroX10, "Connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.sid.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::transport::{Method, Response};
    use bmcfg_common::{ConfigurationBundle, NtpResource, SyslogResource, UserResource};
    use std::collections::HashMap;

    fn fields(request: &Request) -> HashMap<String, String> {
        form::decode(&request.body_text()).into_iter().collect()
    }

    fn login() -> Response {
        Response::new(200, "<html>ok</html>").with_header("Set-Cookie", "SID=qwerty12345; path=/; secure")
    }

    fn transport() -> MockTransport {
        MockTransport::new()
            .on(Method::POST, LOGIN_PATH, login())
            .ok(Method::POST, USER_PATH, "ok")
            .ok(Method::POST, OP_PATH, "ok")
    }

    async fn connected(transport: &Arc<MockTransport>) -> SupermicroX10 {
        let mut driver = SupermicroX10::new("smc.test", Credentials::new("ADMIN", "ADMIN"), transport.clone());
        driver.connect().await.unwrap();
        driver
    }

    #[tokio::test]
    async fn test_connect_stores_sid() {
        let transport = Arc::new(transport());
        let driver = connected(&transport).await;

        assert!(driver.is_connected());
        let requests = transport.requests();
        let form = fields(&requests[0]);
        assert_eq!(form["name"], "ADMIN");
        assert_eq!(form["pwd"], "ADMIN");
    }

    #[tokio::test]
    async fn test_connect_without_cookie_fails() {
        let transport = Arc::new(MockTransport::new().ok(Method::POST, LOGIN_PATH, "<html>ok</html>"));
        let mut driver = SupermicroX10::new("smc.test", Credentials::new("ADMIN", "bad"), transport);

        assert!(matches!(
            driver.connect().await.unwrap_err(),
            BmcError::AuthenticationFailed(_)
        ));
        assert!(!driver.is_connected());
    }

    #[tokio::test]
    async fn test_apply_before_connect() {
        let transport = Arc::new(transport());
        let driver = SupermicroX10::new("smc.test", Credentials::new("ADMIN", "ADMIN"), transport.clone());
        let bundle = ConfigurationBundle::new().with_syslog(SyslogResource::new("10.0.0.1"));

        assert!(matches!(
            driver.apply_config(&bundle).await.unwrap_err(),
            BmcError::AuthenticationFailed(_)
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_users_slots_and_privileges() {
        let transport = Arc::new(transport());
        let driver = connected(&transport).await;
        let bundle = ConfigurationBundle::new().with_users(vec![
            UserResource::new("ops", "pw1", "admin"),
            UserResource::new("viewer", "pw2", "user"),
            UserResource::new("old", "pw3", "admin").with_enable(false),
        ]);

        driver.apply_config(&bundle).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[1].header_value("Cookie"), Some("SID=qwerty12345"));

        let first = fields(&requests[1]);
        assert_eq!(first["userid"], "2");
        assert_eq!(first["new_privilege"], "4");

        let second = fields(&requests[2]);
        assert_eq!(second["userid"], "3");
        assert_eq!(second["new_privilege"], "3");

        let third = fields(&requests[3]);
        assert_eq!(third["userid"], "4");
        assert_eq!(third["new_privilege"], "15");
    }

    #[tokio::test]
    async fn test_syslog_and_ntp() {
        let transport = Arc::new(transport());
        let driver = connected(&transport).await;
        let bundle = ConfigurationBundle::new()
            .with_syslog(SyslogResource::new("10.0.0.1"))
            .with_ntp(NtpResource::new("ntp0", "UTC").with_secondary("ntp1"));

        driver.apply_config(&bundle).await.unwrap();

        let requests = transport.requests();
        let syslog = fields(&requests[1]);
        assert_eq!(syslog["op"], "config_syslog");
        assert_eq!(syslog["syslogip1"], "10.0.0.1");
        assert_eq!(syslog["syslogport1"], "514");

        let ntp = fields(&requests[2]);
        assert_eq!(ntp["op"], "config_date_time");
        assert_eq!(ntp["ntp_server_pri"], "ntp0");
        assert_eq!(ntp["ntp_server_sec"], "ntp1");
        assert_eq!(ntp["timezone"], "UTC");
    }

    #[tokio::test]
    async fn test_ldap_requires_base_dn() {
        let transport = Arc::new(transport());
        let driver = connected(&transport).await;
        let bundle = ConfigurationBundle::new()
            .with_ldap(LdapResource {
                server: "ldap.example.com".into(),
                port: Some(389),
                ..Default::default()
            })
            .with_syslog(SyslogResource::new("10.0.0.1"));

        let report = driver.apply_config_report(&bundle).await.unwrap();

        assert!(matches!(report.status("syslog"), Some(crate::driver::ResourceStatus::Applied)));
        assert!(matches!(
            report.status("ldap"),
            Some(crate::driver::ResourceStatus::Failed(BmcError::Validation(_)))
        ));
        assert_eq!(transport.count(Method::POST, OP_PATH), 1);
    }

    #[tokio::test]
    async fn test_ldap_form() {
        let transport = Arc::new(transport());
        let driver = connected(&transport).await;
        let bundle = ConfigurationBundle::new().with_ldap(LdapResource {
            server: "ldap.example.com".into(),
            port: Some(636),
            base_dn: "dc=example,dc=com".into(),
            ..Default::default()
        });

        driver.apply_config(&bundle).await.unwrap();

        let ldap = fields(&transport.requests()[1]);
        assert_eq!(ldap["op"], "config_ldap");
        assert_eq!(ldap["ldap_ip"], "ldap.example.com");
        assert_eq!(ldap["ldap_port"], "636");
        assert_eq!(ldap["basedn"], "dc=example,dc=com");
    }

    #[tokio::test]
    async fn test_rejected_user_continues() {
        let transport = Arc::new(
            MockTransport::new()
                .on(Method::POST, LOGIN_PATH, login())
                .on(Method::POST, USER_PATH, Response::new(500, ""))
                .ok(Method::POST, OP_PATH, "ok"),
        );
        let driver = connected(&transport).await;
        let bundle = ConfigurationBundle::new()
            .with_users(vec![UserResource::new("ops", "pw", "admin")])
            .with_syslog(SyslogResource::new("10.0.0.1"));

        let err = driver.apply_config(&bundle).await.unwrap_err();

        assert!(matches!(err, BmcError::Rejected { status: 500, .. }));
        assert_eq!(transport.count(Method::POST, OP_PATH), 1);
    }
}
