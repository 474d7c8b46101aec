//! SOAP envelopes for the HP Onboard Administrator
//!
//! Every call is a `POST /hpoa` carrying one operation element in the body.
//! Calls after login carry the session key in a WS-Security header.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{BmcError, Result};

pub const ENDPOINT: &str = "/hpoa";
pub const CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

/// Poll interval, in seconds, sent with `configureNtp`
pub const NTP_POLL_INTERVAL: u32 = 720;

const NS_SOAP_ENV: &str = "http://www.w3.org/2003/05/soap-envelope";
const NS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
const NS_XSD: &str = "http://www.w3.org/2001/XMLSchema";
const NS_WSU: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
const NS_WSSE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
const NS_HPOA: &str = "hpoa.xsd";

/// One `hpoa:` operation with its child fields, in wire order
#[derive(Clone, PartialEq, Eq)]
pub struct Operation {
    name: &'static str,
    fields: Vec<(&'static str, String)>,
}

impl Operation {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.fields.push((name, value.into()));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn user_login(username: &str, password: &str) -> Self {
        Self::new("userLogIn")
            .field("username", username)
            .field("password", password)
    }

    pub fn add_user(username: &str, password: &str) -> Self {
        Self::new("addUser")
            .field("username", username)
            .field("password", password)
    }

    pub fn set_user_password(username: &str, password: &str) -> Self {
        Self::new("setUserPassword")
            .field("username", username)
            .field("password", password)
    }

    pub fn set_remote_syslog_server(server: &str) -> Self {
        Self::new("setRemoteSyslogServer").field("server", server)
    }

    pub fn configure_ntp(primary: &str, secondary: &str) -> Self {
        Self::new("configureNtp")
            .field("ntpPrimary", primary)
            .field("ntpSecondary", secondary)
            .field("ntpPoll", NTP_POLL_INTERVAL.to_string())
    }

    pub fn set_enclosure_time_zone(timezone: &str) -> Self {
        Self::new("setEnclosureTimeZone").field("timeZone", timezone)
    }
}

// Field values include passwords, so only the names are printed.
impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field(
                "fields",
                &self.fields.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| BmcError::Encode(e.to_string()))
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    write(writer, Event::Start(BytesStart::new(name)))?;
    write(writer, Event::Text(BytesText::new(text)))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

/// Render a complete envelope for `operation`
///
/// `session_key` is `None` only for `userLogIn`.
pub fn envelope(operation: &Operation, session_key: Option<&str>) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    write(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    write(
        &mut writer,
        Event::Start(BytesStart::new("SOAP-ENV:Envelope").with_attributes([
            ("xmlns:SOAP-ENV", NS_SOAP_ENV),
            ("xmlns:xsi", NS_XSI),
            ("xmlns:xsd", NS_XSD),
            ("xmlns:wsu", NS_WSU),
            ("xmlns:wsse", NS_WSSE),
            ("xmlns:hpoa", NS_HPOA),
        ])),
    )?;

    if let Some(key) = session_key {
        write(&mut writer, Event::Start(BytesStart::new("SOAP-ENV:Header")))?;
        write(
            &mut writer,
            Event::Start(
                BytesStart::new("wsse:Security")
                    .with_attributes([("SOAP-ENV:mustUnderstand", "true")]),
            ),
        )?;
        write(
            &mut writer,
            Event::Start(BytesStart::new("hpoa:HpOaSessionKeyToken")),
        )?;
        text_element(&mut writer, "hpoa:oaSessionKey", key)?;
        write(
            &mut writer,
            Event::End(BytesEnd::new("hpoa:HpOaSessionKeyToken")),
        )?;
        write(&mut writer, Event::End(BytesEnd::new("wsse:Security")))?;
        write(&mut writer, Event::End(BytesEnd::new("SOAP-ENV:Header")))?;
    }

    write(&mut writer, Event::Start(BytesStart::new("SOAP-ENV:Body")))?;
    let operation_tag = format!("hpoa:{}", operation.name);
    write(
        &mut writer,
        Event::Start(BytesStart::new(operation_tag.as_str())),
    )?;
    for (name, value) in &operation.fields {
        text_element(&mut writer, &format!("hpoa:{}", name), value)?;
    }
    write(&mut writer, Event::End(BytesEnd::new(operation_tag.as_str())))?;
    write(&mut writer, Event::End(BytesEnd::new("SOAP-ENV:Body")))?;
    write(&mut writer, Event::End(BytesEnd::new("SOAP-ENV:Envelope")))?;

    String::from_utf8(writer.into_inner()).map_err(|e| BmcError::Encode(e.to_string()))
}
