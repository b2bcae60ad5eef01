//! The gateway's response contract (`spec.md` §3).

use crate::error::GatewayError;
use crate::http::HttpStatusCode;
use crate::request::Headers;
use crate::serialize::MEDIA_TYPE;
use serde::Serialize;

/// A response ready to hand back to a transport adapter. The invariant that
/// non-empty `content` implies a consistent `Content-Type`/`Content-Length`
/// pair is enforced in every constructor, never left to the caller.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: HttpStatusCode,
    headers: Headers,
    content: Vec<u8>,
}

impl Response {
    pub fn empty(status: HttpStatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            content: Vec::new(),
        }
    }

    /// Serialize `body` as the gateway's single supported media type.
    pub fn json(status: HttpStatusCode, body: &impl Serialize) -> Result<Self, GatewayError> {
        let content = serde_json::to_vec(body)
            .map_err(|e| GatewayError::internal(format!("failed to serialize response body: {e}")))?;
        let mut headers = Headers::new();
        headers.insert("Content-Type", MEDIA_TYPE);
        headers.insert("Content-Length", content.len().to_string());
        Ok(Self {
            status,
            headers,
            content,
        })
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn redirect(status: HttpStatusCode, location: impl Into<String>) -> Self {
        Self::empty(status).with_header("Location", location.into())
    }

    /// Strip the body while keeping every header, `Content-Length` included
    /// (`spec.md` §4.5 step 3's generic HEAD handler: same status and headers
    /// a `GET` would have produced, no body on the wire).
    pub fn without_body(mut self) -> Self {
        self.content.clear();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// `true` iff the non-empty-content invariant holds; used only in tests
    /// and debug assertions, never on the success path.
    pub fn is_well_formed(&self) -> bool {
        if self.content.is_empty() {
            return true;
        }
        match (self.headers.get("Content-Type"), self.headers.get("Content-Length")) {
            (Some(_), Some(len)) => len.parse::<usize>().map(|n| n == self.content.len()).unwrap_or(false),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_response_has_no_content() {
        let r = Response::empty(HttpStatusCode::NO_CONTENT);
        assert!(!r.has_content());
        assert!(r.is_well_formed());
    }

    #[test]
    fn json_response_has_consistent_headers() {
        let r = Response::json(HttpStatusCode::OK, &json!({"a": 1})).unwrap();
        assert!(r.has_content());
        assert!(r.is_well_formed());
        assert_eq!(r.header("Content-Type"), Some(MEDIA_TYPE));
    }

    #[test]
    fn redirect_sets_location_with_no_body() {
        let r = Response::redirect(HttpStatusCode::MOVED_PERMANENTLY, "/wda/devices");
        assert_eq!(r.header("Location"), Some("/wda/devices"));
        assert!(!r.has_content());
    }

    #[test]
    fn without_body_clears_content_but_keeps_content_length() {
        let r = Response::json(HttpStatusCode::OK, &json!({"a": 1})).unwrap();
        let len = r.header("Content-Length").unwrap().to_string();
        let stripped = r.without_body();
        assert!(!stripped.has_content());
        assert_eq!(stripped.header("Content-Length"), Some(len.as_str()));
    }
}
