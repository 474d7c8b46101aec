//! Url-encoded forms for CGI-style controllers
//!
//! Each endpoint gets a parameter struct implementing [`FormParams`]. Values
//! are typed so that booleans always go out as `1`/`0`.

use std::borrow::Cow;
use url::form_urlencoded;

pub const CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A single form value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl FormValue {
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            FormValue::Bool(true) => Cow::Borrowed("1"),
            FormValue::Bool(false) => Cow::Borrowed("0"),
            FormValue::Int(i) => Cow::Owned(i.to_string()),
            FormValue::Str(s) => Cow::Borrowed(s),
        }
    }
}

impl From<bool> for FormValue {
    fn from(value: bool) -> Self {
        FormValue::Bool(value)
    }
}

impl From<i64> for FormValue {
    fn from(value: i64) -> Self {
        FormValue::Int(value)
    }
}

impl From<u16> for FormValue {
    fn from(value: u16) -> Self {
        FormValue::Int(i64::from(value))
    }
}

impl From<usize> for FormValue {
    fn from(value: usize) -> Self {
        FormValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::Str(value.to_string())
    }
}

impl From<String> for FormValue {
    fn from(value: String) -> Self {
        FormValue::Str(value)
    }
}

/// A typed form body
pub trait FormParams {
    /// Fields in wire order
    fn fields(&self) -> Vec<(&'static str, FormValue)>;
}

/// Url-encode a parameter struct
pub fn encode<P: FormParams + ?Sized>(params: &P) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in params.fields() {
        serializer.append_pair(name, &value.render());
    }
    serializer.finish()
}

/// Decode a form body into ordered pairs
pub fn decode(body: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(body.as_bytes()).into_owned().collect()
}
