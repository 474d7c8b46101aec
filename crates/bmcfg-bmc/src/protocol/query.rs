//! iDRAC8 query-string settings
//!
//! Settings are written as `GET /data?set=key1:value1,key2:value2`. The
//! firmware splits on `,` and `:` after unescaping, so `=` and `,` inside
//! string values are escaped with a backslash. The same list is posted to
//! `/postset?ldapconf` as `data=key1:value1,...`.

use url::form_urlencoded;

pub const DATA_PATH: &str = "/data";
pub const POSTSET_LDAP_PATH: &str = "/postset?ldapconf";

/// Backslash-escape `=` and `,`
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '=' || c == ',' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Reverse of [`escape`]
pub fn unescape(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next == '=' || next == ',' {
                    unescaped.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        unescaped.push(c);
    }
    unescaped
}

/// Ordered `key:value` list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetQuery {
    pairs: Vec<(&'static str, String)>,
}

impl SetQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an integer setting
    pub fn int(mut self, key: &'static str, value: i64) -> Self {
        self.pairs.push((key, value.to_string()));
        self
    }

    /// Add a string setting; the value is escaped
    pub fn string(mut self, key: &'static str, value: &str) -> Self {
        self.pairs.push((key, escape(value)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `key:value,key:value` with no trailing separator
    ///
    /// Values are percent-encoded after escaping so that characters such as
    /// `&` in LDAP filters survive the trip through the URL.
    pub fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}:{}",
                    key,
                    form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>()
                )
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// `/data?set=...`
    pub fn to_path(&self) -> String {
        format!("{}?set={}", DATA_PATH, self.encode())
    }

    /// `data=...` body for `/postset`
    pub fn to_post_body(&self) -> String {
        format!("data={}", self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("ou=People,dc=example,dc=com"),
            r"ou\=People\,dc\=example\,dc\=com"
        );
        assert_eq!(escape("ntp0.example.com"), "ntp0.example.com");
    }

    #[test]
    fn test_unescape_reverses_escape() {
        for value in [
            "cn=bmcAdmins,ou=Group,dc=example,dc=com",
            "(objectClass=posixAccount)",
            r"back\slash",
            r"trailing\",
            "",
        ] {
            assert_eq!(unescape(&escape(value)), value);
        }
    }

    #[test]
    fn test_set_query_path() {
        let query = SetQuery::new()
            .int("tm_ntp_int_opmode", 1)
            .string("tm_ntp_str_server1", "ntp0.example.com")
            .string("tm_ntp_str_server2", "");

        assert_eq!(
            query.to_path(),
            "/data?set=tm_ntp_int_opmode:1,tm_ntp_str_server1:ntp0.example.com,tm_ntp_str_server2:"
        );
    }

    #[test]
    fn test_set_query_encodes_escaped_values() {
        let query = SetQuery::new().string("xGLBaseDN", "ou=People,dc=example");

        assert_eq!(query.encode(), "xGLBaseDN:ou%5C%3DPeople%5C%2Cdc%5C%3Dexample");
        assert_eq!(
            query.to_post_body(),
            "data=xGLBaseDN:ou%5C%3DPeople%5C%2Cdc%5C%3Dexample"
        );
    }
}
