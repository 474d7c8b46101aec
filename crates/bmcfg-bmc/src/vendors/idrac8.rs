//! Dell iDRAC8 driver
//!
//! Accounts and syslog go through JSON configuration groups. Time and
//! directory settings only exist as `/data?set=` query strings, with the LDAP
//! role privileges posted to `/postset?ldapconf`.

use async_trait::async_trait;
use bmcfg_common::validate::{self, NtpTarget, Role, SyslogTarget, ValidatedUser};
use bmcfg_common::{LdapResource, ResourceKind};
use std::sync::Arc;
use tracing::{debug, info};

use super::idrac::{self, SyslogSettings, UserSettings};
use crate::driver::{BmcDriver, ResourceApplier};
use crate::error::{BmcError, Result};
use crate::protocol::form::{self, FormParams, FormValue};
use crate::protocol::query::{self, SetQuery};
use crate::protocol::{expect_success, json, malformed, xml};
use crate::transport::{Request, Response, Transport};
use crate::types::{Credentials, Model};

const LOGIN_PATH: &str = "/data/login";
const SESSION_HEADER: &str = "ST2";

/// Generic LDAP, as opposed to Active Directory
const LDAP_ENABLE_MODE: i64 = 3;

struct LoginForm<'a> {
    user: &'a str,
    password: &'a str,
}

impl FormParams for LoginForm<'_> {
    fn fields(&self) -> Vec<(&'static str, FormValue)> {
        vec![("user", self.user.into()), ("password", self.password.into())]
    }
}

/// Pull the `ST2` token out of a login `forwardUrl` such as
/// `index.html?ST1=3f1a,ST2=9c2e`
fn session_token(forward_url: &str) -> Option<&str> {
    let (_, rest) = forward_url.split_once("ST2=")?;
    let token = rest
        .split(|c: char| c == ',' || c == '&')
        .next()
        .unwrap_or_default();
    (!token.is_empty()).then_some(token)
}

/// iDRAC8 driver
pub struct Idrac8 {
    host: String,
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    token: Option<String>,
}

impl Idrac8 {
    pub fn new(host: impl Into<String>, credentials: Credentials, transport: Arc<dyn Transport>) -> Self {
        Self {
            host: host.into(),
            credentials,
            transport,
            token: None,
        }
    }

    async fn send(&self, request: Request) -> Result<Response> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| BmcError::AuthenticationFailed(format!("not connected to {}", self.host)))?;
        self.transport
            .send(request.header(SESSION_HEADER, token))
            .await
    }

    async fn put_group(&self, resource: ResourceKind, group: &str, body: Vec<u8>) -> Result<()> {
        let path = json::config_group_path(group);
        debug!(host = %self.host, endpoint = %path, "Updating configuration group");

        let response = self
            .send(Request::put(path.as_str(), body).content_type(json::CONTENT_TYPE))
            .await?;
        expect_success(resource, &path, &response)
    }

    async fn set(&self, resource: ResourceKind, query: SetQuery) -> Result<()> {
        let path = query.to_path();
        debug!(host = %self.host, endpoint = %path, "Setting parameters");

        let response = self.send(Request::get(path.as_str())).await?;
        expect_success(resource, query::DATA_PATH, &response)
    }
}

#[async_trait]
impl ResourceApplier for Idrac8 {
    fn model(&self) -> Model {
        Model::Idrac8
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
        let group = idrac::user_group(index);
        let body = json::config_group(&group, &UserSettings::new(user))?;
        self.put_group(ResourceKind::User, &group, body).await
    }

    async fn apply_syslog(&self, target: &SyslogTarget<'_>) -> Result<()> {
        let body = json::config_group(idrac::SYSLOG_GROUP, &SyslogSettings::new(target))?;
        self.put_group(ResourceKind::Syslog, idrac::SYSLOG_GROUP, body)
            .await
    }

    async fn apply_ntp(&self, target: &NtpTarget<'_>) -> Result<()> {
        self.set(
            ResourceKind::Ntp,
            SetQuery::new().string("tm_tz_str_zone", target.timezone),
        )
        .await?;

        self.set(
            ResourceKind::Ntp,
            SetQuery::new()
                .int("tm_ntp_int_opmode", 1)
                .string("tm_ntp_str_server1", target.server1)
                .string("tm_ntp_str_server2", target.server2)
                .string("tm_ntp_str_server3", target.server3),
        )
        .await
    }

    async fn apply_ldap(&self, cfg: &LdapResource) -> Result<()> {
        let server = validate::require(ResourceKind::Ldap, "server", &cfg.server)?;
        let search_filter = validate::require(ResourceKind::Ldap, "search_filter", &cfg.search_filter)?;
        validate::require(ResourceKind::Ldap, "group", &cfg.group)?;
        validate::require(ResourceKind::Ldap, "group_base_dn", &cfg.group_base_dn)?;
        let port = validate::require_port(ResourceKind::Ldap, "port", cfg.port)?;
        let role = validate::role(ResourceKind::Ldap, &cfg.role, &[Role::Admin, Role::User])?;
        let base_dn = validate::require(ResourceKind::Ldap, "base_dn", &cfg.base_dn)?;
        let user_attribute = validate::require(ResourceKind::Ldap, "user_attribute", &cfg.user_attribute)?;
        let group_attribute =
            validate::require(ResourceKind::Ldap, "group_attribute", &cfg.group_attribute)?;

        self.set(ResourceKind::Ldap, SetQuery::new().string("xGLServer", server))
            .await?;
        self.set(
            ResourceKind::Ldap,
            SetQuery::new().string("xGLSearchFilter", search_filter),
        )
        .await?;
        self.set(
            ResourceKind::Ldap,
            SetQuery::new().string("xGLGroup1Name", &cfg.group_dn()),
        )
        .await?;

        let privileges = SetQuery::new()
            .int("LDAPEnableMode", LDAP_ENABLE_MODE)
            .int("xGLNameSearchEnabled", 0)
            .string("xGLBaseDN", base_dn)
            .string("xGLUserLogin", user_attribute)
            .string("xGLGroupMem", group_attribute)
            .string("xGLBindDN", "")
            .int("xGLCertValidationEnabled", 1)
            .string("xGLGroup1Priv", idrac::privilege(role))
            .int("xGLGroup2Priv", 0)
            .int("xGLGroup3Priv", 0)
            .int("xGLGroup4Priv", 0)
            .int("xGLGroup5Priv", 0)
            .int("xGLServerPort", i64::from(port));

        let response = self
            .send(
                Request::post(query::POSTSET_LDAP_PATH, privileges.to_post_body())
                    .content_type(form::CONTENT_TYPE),
            )
            .await?;
        expect_success(ResourceKind::Ldap, query::POSTSET_LDAP_PATH, &response)
    }
}

#[async_trait]
impl BmcDriver for Idrac8 {
    async fn connect(&mut self) -> Result<()> {
        let body = form::encode(&LoginForm {
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
        let auth_result = xml::element_text(&text, "authResult").map_err(|e| malformed(LOGIN_PATH, e))?;
        if auth_result.as_deref() != Some("0") {
            return Err(BmcError::AuthenticationFailed(format!(
                "login authResult {}",
                auth_result.as_deref().unwrap_or("missing")
            )));
        }

        let forward_url = xml::element_text(&text, "forwardUrl")
            .map_err(|e| malformed(LOGIN_PATH, e))?
            .unwrap_or_default();
        let token = session_token(&forward_url)
            .ok_or_else(|| BmcError::AuthenticationFailed("no ST2 token in login response".to_string()))?;

        self.token = Some(token.to_string());
        info!(host = %self.host, model = %Model::Idrac8, "Connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ResourceStatus;
    use crate::mock::MockTransport;
    use crate::transport::Method;
    use bmcfg_common::{ConfigurationBundle, NtpResource, SyslogResource, UserResource};
    use serde_json::Value;

    const LOGIN_OK: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root>\n<status>ok</status>\n<authResult>0</authResult>\n<forwardUrl>index.html?ST1=5b3e,ST2=c0ffee42</forwardUrl>\n</root>";
    const LOGIN_DENIED: &str = "<root><status>ok</status><authResult>1</authResult><forwardUrl>login.html</forwardUrl></root>";

    fn ldap() -> LdapResource {
        LdapResource {
            server: "ldaps.example.com".into(),
            port: Some(636),
            search_filter: "objectClass=posixAccount".into(),
            group: "bmcAdmins".into(),
            group_base_dn: "ou=Group,dc=example,dc=com".into(),
            base_dn: "ou=People,dc=example,dc=com".into(),
            user_attribute: "uid".into(),
            group_attribute: "memberUid".into(),
            role: "admin".into(),
        }
    }

    fn transport() -> MockTransport {
        MockTransport::new()
            .ok(Method::POST, LOGIN_PATH, LOGIN_OK)
            .ok(Method::GET, "/data", "<root><status>ok</status></root>")
            .ok(Method::POST, "/postset", "")
    }

    async fn connected(transport: &Arc<MockTransport>) -> Idrac8 {
        let mut driver = Idrac8::new("idrac.test", Credentials::new("root", "calvin"), transport.clone());
        driver.connect().await.unwrap();
        driver
    }

    #[test]
    fn test_session_token() {
        assert_eq!(session_token("index.html?ST1=aa,ST2=bb"), Some("bb"));
        assert_eq!(session_token("index.html?ST1=aa&ST2=bb&x=1"), Some("bb"));
        assert_eq!(session_token("index.html?ST1=aa"), None);
        assert_eq!(session_token("index.html?ST2="), None);
    }

    #[tokio::test]
    async fn test_connect() {
        let transport = Arc::new(transport());
        let driver = connected(&transport).await;

        assert!(driver.is_connected());
        let login = &transport.requests()[0];
        assert_eq!(
            form::decode(&login.body_text()),
            vec![
                ("user".to_string(), "root".to_string()),
                ("password".to_string(), "calvin".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_connect_denied() {
        let transport = Arc::new(MockTransport::new().ok(Method::POST, LOGIN_PATH, LOGIN_DENIED));
        let mut driver = Idrac8::new("idrac.test", Credentials::new("root", "wrong"), transport);

        assert!(matches!(
            driver.connect().await.unwrap_err(),
            BmcError::AuthenticationFailed(_)
        ));
        assert!(!driver.is_connected());
    }

    #[tokio::test]
    async fn test_users_use_slots_from_two() {
        let transport = Arc::new(transport().ok(
            Method::PUT,
            "/sysmgmt/2012/server/configgroup/iDRAC.Users.2",
            "{}",
        ).ok(
            Method::PUT,
            "/sysmgmt/2012/server/configgroup/iDRAC.Users.3",
            "{}",
        ));
        let driver = connected(&transport).await;
        let bundle = ConfigurationBundle::new().with_users(vec![
            UserResource::new("root", "calvin", "admin"),
            UserResource::new("ops", "pw", "user"),
        ]);

        driver.apply_config(&bundle).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].header_value("ST2"), Some("c0ffee42"));

        let body: Value = serde_json::from_slice(requests[2].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["iDRAC.Users.3"]["UserName"], "@06f@070@073");
        assert_eq!(body["iDRAC.Users.3"]["Privilege"], "497");
    }

    #[tokio::test]
    async fn test_syslog_group() {
        let transport = Arc::new(transport().ok(
            Method::PUT,
            "/sysmgmt/2012/server/configgroup/iDRAC.SysLog",
            "{}",
        ));
        let driver = connected(&transport).await;
        let bundle = ConfigurationBundle::new().with_syslog(SyslogResource::new("10.0.0.9").with_port(1514));

        driver.apply_config(&bundle).await.unwrap();

        let body: Value = serde_json::from_slice(transport.requests()[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["iDRAC.SysLog"]["Port"], "1514");
        assert_eq!(body["iDRAC.SysLog"]["Server1"], "10.0.0.9");
    }

    #[tokio::test]
    async fn test_ntp_sets_timezone_then_servers() {
        let transport = Arc::new(transport());
        let driver = connected(&transport).await;
        let bundle = ConfigurationBundle::new()
            .with_ntp(NtpResource::new("ntp0.example.com", "CET").with_secondary("ntp1.example.com"));

        driver.apply_config(&bundle).await.unwrap();

        assert_eq!(
            &transport.paths()[1..],
            &[
                "/data?set=tm_tz_str_zone:CET".to_string(),
                "/data?set=tm_ntp_int_opmode:1,tm_ntp_str_server1:ntp0.example.com,tm_ntp_str_server2:ntp1.example.com,tm_ntp_str_server3:".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_ldap_sequence() {
        let transport = Arc::new(transport());
        let driver = connected(&transport).await;
        let bundle = ConfigurationBundle::new().with_ldap(ldap());

        driver.apply_config(&bundle).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 5);
        assert_eq!(requests[1].path, "/data?set=xGLServer:ldaps.example.com");
        assert_eq!(
            requests[2].path,
            "/data?set=xGLSearchFilter:objectClass%5C%3DposixAccount"
        );
        assert!(requests[3].path.starts_with("/data?set=xGLGroup1Name:cn%5C%3DbmcAdmins%5C%2Cou"));

        let postset = &requests[4];
        assert_eq!(postset.path, "/postset?ldapconf");
        let body = postset.body_text();
        assert!(body.starts_with("data=LDAPEnableMode:3,xGLNameSearchEnabled:0,xGLBaseDN:ou%5C%3DPeople"));
        assert!(body.contains("xGLGroup1Priv:511,xGLGroup2Priv:0"));
        assert!(body.ends_with("xGLServerPort:636"));
    }

    #[tokio::test]
    async fn test_ldap_missing_field_sends_nothing() {
        let transport = Arc::new(transport());
        let driver = connected(&transport).await;
        let bundle = ConfigurationBundle::new()
            .with_ldap(LdapResource {
                search_filter: String::new(),
                ..ldap()
            })
            .with_ntp(NtpResource::new("ntp0", "UTC"));

        let report = driver.apply_config_report(&bundle).await.unwrap();

        assert!(matches!(report.status("ldap"), Some(ResourceStatus::Failed(BmcError::Validation(_)))));
        assert_eq!(report.status("ntp").map(|s| s.is_failure()), Some(false));
        // login plus the two NTP calls
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_ldap_stops_at_first_rejection() {
        let transport = Arc::new(
            MockTransport::new()
                .ok(Method::POST, LOGIN_PATH, LOGIN_OK)
                .ok(Method::GET, "/data", "")
                .on(Method::GET, "/data", Response::new(500, "")),
        );
        let driver = connected(&transport).await;
        let bundle = ConfigurationBundle::new().with_ldap(ldap());

        let err = driver.apply_config(&bundle).await.unwrap_err();

        assert!(matches!(err, BmcError::Rejected { resource: ResourceKind::Ldap, status: 500, .. }));
        assert_eq!(transport.requests().len(), 3);
    }
}
