//! HTTP transport
//!
//! Drivers and the discovery sequencer talk to controllers through the
//! [`Transport`] trait. [`HttpTransport`] is the reqwest implementation; tests
//! substitute a scripted in-memory transport.

use async_trait::async_trait;
use std::borrow::Cow;
use tracing::{debug, trace};

use crate::error::Result;
use crate::types::TransportConfig;

pub use reqwest::Method;

/// An HTTP request relative to the controller's base URL
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Absolute path, may carry a query string
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// multipart/form-data body, sent instead of `body`
    pub multipart: Option<Multipart>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
            multipart: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    /// POST a multipart form; the transport sets the boundary content type
    pub fn multipart(path: impl Into<String>, form: Multipart) -> Self {
        let mut request = Self::new(Method::POST, path);
        request.multipart = Some(form);
        request
    }

    pub fn put(path: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn content_type(self, content_type: &str) -> Self {
        self.header("Content-Type", content_type)
    }

    /// The path with any query string removed
    pub fn path_without_query(&self) -> &str {
        self.path.split('?').next().unwrap_or_default()
    }

    /// The query string, if any
    pub fn query(&self) -> Option<&str> {
        self.path.split_once('?').map(|(_, query)| query)
    }

    /// Case-insensitive header lookup
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.body.as_deref().unwrap_or_default())
    }
}

/// File attached to a multipart form
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub name: String,
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Text fields and file uploads of a multipart/form-data request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Multipart {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl Multipart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, name: impl Into<String>, file_name: impl Into<String>, data: Vec<u8>) -> Self {
        self.files.push(FilePart {
            name: name.into(),
            file_name: file_name.into(),
            data,
        });
        self
    }

    /// Value of a text field
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// File part by field name
    pub fn file_part(&self, name: &str) -> Option<&FilePart> {
        self.files.iter().find(|part| part.name == name)
    }

    fn into_form(self) -> reqwest::multipart::Form {
        let form = self
            .fields
            .into_iter()
            .fold(reqwest::multipart::Form::new(), |form, (name, value)| form.text(name, value));
        self.files.into_iter().fold(form, |form, part| {
            form.part(
                part.name,
                reqwest::multipart::Part::bytes(part.data).file_name(part.file_name),
            )
        })
    }
}

/// Status, headers and fully drained body of a response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Value of a cookie set by the response
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .filter(|(header, _)| header.eq_ignore_ascii_case("set-cookie"))
            .filter_map(|(_, value)| value.split(';').next())
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(header, _)| header.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Sends requests to a single controller
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the response with its body fully read.
    ///
    /// Non-2xx statuses are responses, not errors. Errors mean the exchange
    /// itself failed.
    async fn send(&self, request: Request) -> Result<Response>;
}

/// reqwest-backed transport for one controller
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.insecure)
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let url = self.url(&request.path);
        debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = self.client.request(request.method.clone(), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(form) = request.multipart {
            builder = builder.multipart(form.into_form());
        } else if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        // Drain the body so the connection goes back to the pool before the
        // next request.
        let body = response.bytes().await?.to_vec();
        trace!(url = %url, status, bytes = body.len(), "Received response");

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
