//! JSON payloads
//!
//! Dell controllers take `PUT /sysmgmt/2012/server/configgroup/<Group>` with a
//! body of `{"<Group>": {...}}` where every setting is a string. Account names
//! and passwords inside those bodies are hex-encoded per character.
//!
//! HP iLO uses flat objects with a `method` field posted to `/json/<endpoint>`;
//! those are plain serde structs in the iLO driver.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{BmcError, Result};

pub const CONTENT_TYPE: &str = "application/json";
pub const CONFIG_GROUP_PATH: &str = "/sysmgmt/2012/server/configgroup";

/// Path of a configuration group
pub fn config_group_path(group: &str) -> String {
    format!("{}/{}", CONFIG_GROUP_PATH, group)
}

/// Wrap `settings` under its group name
pub fn config_group<T: Serialize + ?Sized>(group: &str, settings: &T) -> Result<Vec<u8>> {
    let mut payload = BTreeMap::new();
    payload.insert(group, settings);
    serialize(&payload)
}

/// Serialize any payload, mapping failures to an encode error
pub fn serialize<T: Serialize + ?Sized>(payload: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(payload).map_err(|e| BmcError::Encode(e.to_string()))
}

/// Dell's boolean spelling
pub fn enabled(value: bool) -> &'static str {
    if value {
        "Enabled"
    } else {
        "Disabled"
    }
}

/// Encode a credential as `@0<hex>` per character
///
/// `"root"` becomes `"@072@06f@06f@074"`.
pub fn encode_credential(value: &str) -> String {
    value
        .chars()
        .map(|c| format!("@0{:x}", u32::from(c)))
        .collect()
}

/// Reverse of [`encode_credential`]; `None` on anything it could not have produced
pub fn decode_credential(encoded: &str) -> Option<String> {
    let mut segments = encoded.split('@');
    if !segments.next()?.is_empty() {
        return None;
    }

    segments
        .map(|segment| {
            let hex = segment.strip_prefix('0')?;
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_encode_credential() {
        assert_eq!(encode_credential("root"), "@072@06f@06f@074");
        assert_eq!(encode_credential("P@ss"), "@050@040@073@073");
        assert_eq!(encode_credential(""), "");
    }

    #[test]
    fn test_decode_credential() {
        for value in ["calvin", "p@ss,w=rd", "ünïcode", ""] {
            assert_eq!(decode_credential(&encode_credential(value)).as_deref(), Some(value));
        }

        assert_eq!(decode_credential("root"), None);
        assert_eq!(decode_credential("@0zz"), None);
        assert_eq!(decode_credential("@172"), None);
    }

    #[test]
    fn test_config_group_body() {
        let mut settings = BTreeMap::new();
        settings.insert("Server1", "10.0.0.1");
        settings.insert("Enable", enabled(true));

        let body = config_group("iDRAC.SysLog", &settings).unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            value,
            json!({"iDRAC.SysLog": {"Enable": "Enabled", "Server1": "10.0.0.1"}})
        );
    }

    #[test]
    fn test_config_group_path() {
        assert_eq!(
            config_group_path("iDRAC.Users.3"),
            "/sysmgmt/2012/server/configgroup/iDRAC.Users.3"
        );
    }
}
