//! Configuration groups shared by iDRAC8 and iDRAC9

use bmcfg_common::validate::{Role, SyslogTarget, ValidatedUser};
use serde::Serialize;

use crate::protocol::json;

/// Slot 1 holds the anonymous account
pub(crate) const FIRST_USER_SLOT: usize = 2;

/// Full privilege bitmap
pub(crate) const PRIVILEGE_ADMIN: &str = "511";
/// Login, console, virtual media and power control
pub(crate) const PRIVILEGE_OPERATOR: &str = "497";

pub(crate) fn privilege(role: Role) -> &'static str {
    match role {
        Role::Admin => PRIVILEGE_ADMIN,
        Role::User => PRIVILEGE_OPERATOR,
    }
}

/// Group name for the account at list position `index`
pub(crate) fn user_group(index: usize) -> String {
    format!("iDRAC.Users.{}", index + FIRST_USER_SLOT)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct UserSettings {
    pub user_name: String,
    pub password: String,
    pub enable: &'static str,
    pub privilege: &'static str,
    pub ipmi_lan_privilege: &'static str,
    pub sol_enable: &'static str,
}

impl UserSettings {
    pub fn new(user: &ValidatedUser<'_>) -> Self {
        Self {
            user_name: json::encode_credential(user.name),
            password: json::encode_credential(user.password),
            enable: json::enabled(user.enable),
            privilege: privilege(user.role),
            ipmi_lan_privilege: match user.role {
                Role::Admin => "Administrator",
                Role::User => "Operator",
            },
            sol_enable: json::enabled(true),
        }
    }
}

pub(crate) const SYSLOG_GROUP: &str = "iDRAC.SysLog";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SyslogSettings<'a> {
    pub port: String,
    pub server1: &'a str,
    pub enable: &'static str,
}

impl<'a> SyslogSettings<'a> {
    pub fn new(target: &SyslogTarget<'a>) -> Self {
        Self {
            port: target.port.to_string(),
            server1: target.server,
            enable: json::enabled(true),
        }
    }
}
