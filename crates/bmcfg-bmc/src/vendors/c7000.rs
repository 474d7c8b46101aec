//! HP BladeSystem c7000 Onboard Administrator driver (SOAP)

use async_trait::async_trait;
use bmcfg_common::validate::{NtpTarget, Role, SyslogTarget, ValidatedUser, DEFAULT_SYSLOG_PORT};
use bmcfg_common::ResourceKind;
use std::sync::Arc;
use tracing::{debug, info};

use crate::driver::{BmcDriver, ResourceApplier};
use crate::error::{BmcError, Result};
use crate::protocol::soap::{self, Operation};
use crate::protocol::{expect_success, malformed, xml};
use crate::transport::{Request, Response, Transport};
use crate::types::{Credentials, Model};

/// `addUser` answers 400 when the account already exists
const USER_EXISTS_STATUS: u16 = 400;

/// Onboard Administrator driver
pub struct C7000 {
    host: String,
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    session_key: Option<String>,
}

impl C7000 {
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

    async fn call(&self, operation: &Operation) -> Result<Response> {
        let body = soap::envelope(operation, Some(self.session_key()?))?;
        debug!(host = %self.host, operation = operation.name(), "Posting SOAP operation");

        self.transport
            .send(Request::post(soap::ENDPOINT, body).content_type(soap::CONTENT_TYPE))
            .await
    }

    async fn set_user_password(&self, user: &ValidatedUser<'_>) -> Result<()> {
        let response = self
            .call(&Operation::set_user_password(user.name, user.password))
            .await?;
        expect_success(ResourceKind::User, soap::ENDPOINT, &response)
    }
}

#[async_trait]
impl ResourceApplier for C7000 {
    fn model(&self) -> Model {
        Model::C7000
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
        &[Role::Admin]
    }

    async fn apply_user(&self, user: &ValidatedUser<'_>, _index: usize) -> Result<()> {
        let response = self
            .call(&Operation::add_user(user.name, user.password))
            .await?;

        if response.status == USER_EXISTS_STATUS {
            info!(host = %self.host, user = user.name, "User already exists, updating password");
            return self.set_user_password(user).await;
        }

        expect_success(ResourceKind::User, soap::ENDPOINT, &response)
    }

    async fn apply_syslog(&self, target: &SyslogTarget<'_>) -> Result<()> {
        if target.port != DEFAULT_SYSLOG_PORT {
            debug!(host = %self.host, port = target.port, "Onboard Administrator always logs to port 514");
        }

        let response = self
            .call(&Operation::set_remote_syslog_server(target.server))
            .await?;
        expect_success(ResourceKind::Syslog, soap::ENDPOINT, &response)
    }

    async fn apply_ntp(&self, target: &NtpTarget<'_>) -> Result<()> {
        let response = self
            .call(&Operation::configure_ntp(target.server1, target.server2))
            .await?;
        expect_success(ResourceKind::Ntp, soap::ENDPOINT, &response)?;

        let response = self
            .call(&Operation::set_enclosure_time_zone(target.timezone))
            .await?;
        expect_success(ResourceKind::Ntp, soap::ENDPOINT, &response)
    }
}

#[async_trait]
impl BmcDriver for C7000 {
    async fn connect(&mut self) -> Result<()> {
        let body = soap::envelope(
            &Operation::user_login(&self.credentials.username, &self.credentials.password),
            None,
        )?;
        let response = self
            .transport
            .send(Request::post(soap::ENDPOINT, body).content_type(soap::CONTENT_TYPE))
            .await?;

        if !response.is_success() {
            return Err(BmcError::AuthenticationFailed(format!(
                "userLogIn returned status {}",
                response.status
            )));
        }

        let key = xml::element_text(&response.text(), "oaSessionKey")
            .map_err(|e| malformed(soap::ENDPOINT, e))?
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                BmcError::AuthenticationFailed("no session key in userLogIn response".to_string())
            })?;

        self.session_key = Some(key);
        info!(host = %self.host, model = %Model::C7000, "Connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session_key.is_some()
    }
}
