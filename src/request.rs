//! The gateway's request view: transport-agnostic, synchronous, and owned
//! for the lifetime of one handler invocation (`spec.md` §3/§5).

use crate::error::GatewayError;
use crate::http::HttpMethod;
use crate::uri::Uri;
use std::collections::BTreeMap;

/// A case-insensitive header multimap (last write wins per name).
#[derive(Debug, Clone, Default)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0.insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A request for one round-trip. Owns its body; response headers accumulate
/// on it until the handler's response is flushed, at which point
/// [`Request::mark_responded`] is called exactly once (`spec.md` §3).
#[derive(Debug, Clone)]
pub struct Request {
    pub method: HttpMethod,
    pub uri: Uri,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub is_https: bool,
    pub is_localhost: bool,
    path_params: BTreeMap<String, String>,
    response_headers: Headers,
    responded: bool,
}

impl Request {
    pub fn new(method: HttpMethod, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: Headers::new(),
            body: Vec::new(),
            is_https: false,
            is_localhost: false,
            path_params: BTreeMap::new(),
            response_headers: Headers::new(),
            responded: false,
        }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Set by the router once a route has matched (`spec.md` §4.5).
    pub fn set_path_params(&mut self, params: BTreeMap<String, String>) {
        self.path_params = params;
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub fn add_response_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.response_headers.insert(name, value);
    }

    pub fn response_headers(&self) -> &Headers {
        &self.response_headers
    }

    /// `true` and flips the internal flag on the first call; `false` on
    /// every subsequent call. The pipeline uses this to guarantee a
    /// response is written exactly once.
    pub fn mark_responded(&mut self) -> bool {
        if self.responded {
            false
        } else {
            self.responded = true;
            true
        }
    }

    pub fn has_responded(&self) -> bool {
        self.responded
    }

    /// Decode the body as JSON, the only format this gateway's single
    /// supported media type ever carries.
    pub fn body_as_json(&self) -> Result<serde_json::Value, GatewayError> {
        if self.body.is_empty() {
            return Err(GatewayError::bad_request("request body is empty", ""));
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| GatewayError::bad_request(format!("invalid JSON body: {e}"), ""))
    }
}
