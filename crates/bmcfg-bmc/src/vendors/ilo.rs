//! HP iLO driver (JSON method dialect)
//!
//! Every call is a flat JSON object with a `method` and the `session_key`,
//! posted to `/json/<endpoint>`. The key also travels as the `sessionKey`
//! cookie.

use async_trait::async_trait;
use bmcfg_common::validate::{NtpTarget, Role, SyslogTarget, ValidatedUser};
use bmcfg_common::ResourceKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::driver::{BmcDriver, ResourceApplier};
use crate::error::{BmcError, Result};
use crate::protocol::{expect_success, json, malformed};
use crate::transport::{Request, Response, Transport};
use crate::types::{Credentials, Model};

const LOGIN_PATH: &str = "/json/login_session";
const USER_INFO_PATH: &str = "/json/user_info";
const SYSLOG_PATH: &str = "/json/remote_syslog";
const SNTP_PATH: &str = "/json/network_sntp";

#[derive(Serialize)]
struct Login<'a> {
    method: &'static str,
    user_login: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginReply {
    #[serde(default)]
    session_key: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    users: Vec<Account>,
}

#[derive(Debug, Deserialize)]
struct Account {
    id: u32,
    login_name: String,
}

#[derive(Serialize)]
struct UserPayload<'a> {
    method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<u32>,
    login_name: &'a str,
    user_name: &'a str,
    password: &'a str,
    remote_cons_priv: u8,
    virtual_media_priv: u8,
    reset_priv: u8,
    config_priv: u8,
    user_priv: u8,
    session_key: &'a str,
}

#[derive(Serialize)]
struct SyslogPayload<'a> {
    method: &'static str,
    remote_syslog_enable: u8,
    remote_syslog_server: &'a str,
    remote_syslog_port: u16,
    session_key: &'a str,
}

#[derive(Serialize)]
struct SntpPayload<'a> {
    method: &'static str,
    sntp_server1: &'a str,
    sntp_server2: &'a str,
    time_zone: &'a str,
    session_key: &'a str,
}

/// iLO driver
pub struct Ilo {
    host: String,
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    session_key: Option<String>,
}

impl Ilo {
    pub fn new(host: impl Into<String>, credentials: Credentials, transport: Arc<dyn Transport>) -> Self {
        Self {
            host: host.into(),
            credentials,
            transport,
            session_key: None,
        }
    }

    fn session_key(&self) -> Result<&str> {
        self.session_key
            .as_deref()
            .ok_or_else(|| BmcError::AuthenticationFailed(format!("not connected to {}", self.host)))
    }

    fn request(&self, request: Request) -> Result<Request> {
        Ok(request
            .content_type(json::CONTENT_TYPE)
            .header("Cookie", format!("sessionKey={}", self.session_key()?)))
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, payload: &T) -> Result<Response> {
        let request = self.request(Request::post(path, json::serialize(payload)?))?;
        debug!(host = %self.host, endpoint = path, "Posting JSON method");
        self.transport.send(request).await
    }

    /// Id of an existing account with this login name
    async fn find_account(&self, login_name: &str) -> Result<Option<u32>> {
        let response = self.transport.send(self.request(Request::get(USER_INFO_PATH))?).await?;
        expect_success(ResourceKind::User, USER_INFO_PATH, &response)?;

        let info: UserInfo =
            serde_json::from_slice(&response.body).map_err(|e| malformed(USER_INFO_PATH, e))?;
        Ok(info
            .users
            .into_iter()
            .find(|account| account.login_name == login_name)
            .map(|account| account.id))
    }
}

#[async_trait]
impl ResourceApplier for Ilo {
    fn model(&self) -> Model {
        Model::Ilo
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn supports(&self, resource: ResourceKind) -> bool {
        matches!(
            resource,
            ResourceKind::User | ResourceKind::Syslog | ResourceKind::Ntp
        )
    }

    fn user_roles(&self) -> &'static [Role] {
        &[Role::Admin, Role::User]
    }

    async fn apply_user(&self, user: &ValidatedUser<'_>, _index: usize) -> Result<()> {
        let user_id = self.find_account(user.name).await?;
        // A disabled account keeps its login but holds no privileges
        let granted = u8::from(user.enable);
        let admin = granted & u8::from(user.role == Role::Admin);

        let payload = UserPayload {
            method: if user_id.is_some() { "mod_user" } else { "add_user" },
            user_id,
            login_name: user.name,
            user_name: user.name,
            password: user.password,
            remote_cons_priv: granted,
            virtual_media_priv: granted,
            reset_priv: granted,
            config_priv: admin,
            user_priv: admin,
            session_key: self.session_key()?,
        };
        debug!(host = %self.host, user = user.name, method = payload.method, "Applying account");

        let response = self.post(USER_INFO_PATH, &payload).await?;
        expect_success(ResourceKind::User, USER_INFO_PATH, &response)
    }

    async fn apply_syslog(&self, target: &SyslogTarget<'_>) -> Result<()> {
        let payload = SyslogPayload {
            method: "set_remote_syslog",
            remote_syslog_enable: 1,
            remote_syslog_server: target.server,
            remote_syslog_port: target.port,
            session_key: self.session_key()?,
        };

        let response = self.post(SYSLOG_PATH, &payload).await?;
        expect_success(ResourceKind::Syslog, SYSLOG_PATH, &response)
    }

    async fn apply_ntp(&self, target: &NtpTarget<'_>) -> Result<()> {
        if !target.server3.is_empty() {
            debug!(host = %self.host, "iLO accepts two SNTP servers, ignoring server3");
        }

        let payload = SntpPayload {
            method: "set_sntp",
            sntp_server1: target.server1,
            sntp_server2: target.server2,
            time_zone: target.timezone,
            session_key: self.session_key()?,
        };

        let response = self.post(SNTP_PATH, &payload).await?;
        expect_success(ResourceKind::Ntp, SNTP_PATH, &response)
    }
}

#[async_trait]
impl BmcDriver for Ilo {
    async fn connect(&mut self) -> Result<()> {
        let payload = Login {
            method: "login",
            user_login: &self.credentials.username,
            password: &self.credentials.password,
        };
        let request =
            Request::post(LOGIN_PATH, json::serialize(&payload)?).content_type(json::CONTENT_TYPE);
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(BmcError::AuthenticationFailed(format!(
                "login returned status {}",
                response.status
            )));
        }

        let reply: LoginReply =
            serde_json::from_slice(&response.body).map_err(|e| malformed(LOGIN_PATH, e))?;
        if reply.session_key.is_empty() {
            return Err(BmcError::AuthenticationFailed(
                "no session_key in login response".to_string(),
            ));
        }

        self.session_key = Some(reply.session_key);
        info!(host = %self.host, model = %Model::Ilo, "Connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session_key.is_some()
    }
}
