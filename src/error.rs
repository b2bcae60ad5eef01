//! Error taxonomy and JSON:API error-document projection.
//!
//! The original shape was a class hierarchy (`HttpError ⊂ CoreError ⊂
//! DataError ⊂ {AttributeError, RelationshipError}`). Here it is a flat
//! tagged sum with a single projection into an HTTP status and a JSON:API
//! error document, per `spec.md` §4.3/§9.

use crate::core_status::CoreStatus;
use crate::http::HttpStatusCode;
use crate::serialize::{base_meta, JsonApiObject};
use serde::Serialize;

/// A bare HTTP-level error: a status, title, and optional detail. Carries an
/// optional JSON-pointer-ish field path for request-body validation failures
/// (`spec.md` §4.2: "every parsing failure becomes `HttpError(BadRequest)`
/// with a pointer like `data/type`").
#[derive(Debug, Clone)]
pub struct HttpError {
    pub status: HttpStatusCode,
    pub title: String,
    pub detail: Option<String>,
    pub pointer: Option<String>,
}

impl HttpError {
    pub fn new(status: HttpStatusCode, title: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
            detail: None,
            pointer: None,
        }
    }

    pub fn bad_request(detail: impl Into<String>, pointer: impl Into<String>) -> Self {
        Self {
            status: HttpStatusCode::BAD_REQUEST,
            title: HttpStatusCode::BAD_REQUEST.reason_phrase().to_string(),
            detail: Some(detail.into()),
            pointer: Some(pointer.into()),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// A backend-domain error: a non-success [`CoreStatus`] plus an optional
/// backend-specific numeric code. Constructing one with `core_status ==
/// Success` is a caller bug (`spec.md` §3 invariant); debug builds assert it.
#[derive(Debug, Clone)]
pub struct CoreError {
    pub core_status: CoreStatus,
    pub domain_status: i64,
    pub title: String,
    pub http_status: HttpStatusCode,
}

impl CoreError {
    pub fn new(core_status: CoreStatus, domain_status: i64) -> Self {
        debug_assert!(!core_status.is_success(), "CoreError raised for success status");
        Self {
            title: core_status.title().to_string(),
            http_status: core_status.http_status(),
            core_status,
            domain_status,
        }
    }
}

/// Where within a resource's data a [`DataError`] applies.
#[derive(Debug, Clone)]
pub enum Locator {
    Attribute(String),
    Relationship(String, Option<i64>),
}

/// A single error attached to one element of a request's `data`
/// (`spec.md` §3/§4.2).
#[derive(Debug, Clone)]
pub struct DataError {
    pub core: CoreError,
    pub data_index: Option<i64>,
    pub locator: Option<Locator>,
}

impl DataError {
    pub fn new(core: CoreError, data_index: Option<i64>, locator: Option<Locator>) -> Self {
        Self {
            core,
            data_index,
            locator,
        }
    }

    /// The JSON:API `source.pointer` for this error (`spec.md` §4.2).
    pub fn pointer(&self) -> String {
        let mut pointer = match self.data_index {
            Some(i) if i >= 0 => format!("/data/{i}"),
            _ => "/data".to_string(),
        };
        match &self.locator {
            Some(Locator::Attribute(name)) => pointer.push_str(&format!("/attributes/{name}")),
            Some(Locator::Relationship(name, index)) => {
                pointer.push_str(&format!("/relationships/{name}/data"));
                if let Some(j) = index {
                    if *j >= 0 {
                        pointer.push_str(&format!("/{j}"));
                    }
                }
            }
            None => {}
        }
        pointer
    }
}

/// One or more [`DataError`]s raised together against a single request.
#[derive(Debug, Clone)]
pub struct DataException(pub Vec<DataError>);

/// A raw, numeric-coded exception surfaced by the backend frontend itself
/// (as opposed to a typed [`CoreError`] response).
#[derive(Debug, Clone, Copy)]
pub struct BackendError {
    pub code: i64,
}

/// Every error a handler or the pipeline can raise, projected to a single
/// HTTP status + JSON:API error document by [`GatewayError::into_document`].
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("http error: {0:?}")]
    Http(HttpError),
    #[error("core error: {0:?}")]
    Core(CoreError),
    #[error("data exception: {0:?}")]
    Data(DataException),
    #[error("backend error: {0:?}")]
    Backend(BackendError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn bad_request(detail: impl Into<String>, pointer: impl Into<String>) -> Self {
        Self::Http(HttpError::bad_request(detail, pointer))
    }

    pub fn not_found(title: impl Into<String>) -> Self {
        Self::Http(HttpError::new(HttpStatusCode::NOT_FOUND, title))
    }

    /// Resolve this error to an HTTP status and a JSON:API error document,
    /// per `spec.md` §4.3.
    pub fn into_document(self) -> (HttpStatusCode, ErrorDocument) {
        match self {
            GatewayError::Http(e) => {
                let status = e.status;
                let obj = ErrorObject {
                    status: status.as_u16().to_string(),
                    title: e.title,
                    detail: e.detail,
                    code: None,
                    meta: None,
                    source: e.pointer.map(|pointer| ErrorSource { pointer }),
                };
                (status, ErrorDocument::single(obj))
            }
            GatewayError::Core(e) => {
                let status = if e.core_status.is_success() {
                    HttpStatusCode::INTERNAL_SERVER_ERROR
                } else {
                    e.http_status
                };
                let obj = ErrorObject {
                    status: status.as_u16().to_string(),
                    title: e.title,
                    detail: None,
                    code: Some(e.core_status.code().to_string()),
                    meta: domain_status_meta(e.domain_status),
                    source: None,
                };
                (status, ErrorDocument::single(obj))
            }
            GatewayError::Data(DataException(errors)) => {
                let status = data_exception_status(&errors);
                let objs = errors
                    .into_iter()
                    .map(|e| ErrorObject {
                        status: e.core.http_status.as_u16().to_string(),
                        title: e.core.title.clone(),
                        detail: None,
                        code: Some(e.core.core_status.code().to_string()),
                        meta: domain_status_meta(e.core.domain_status),
                        source: Some(ErrorSource { pointer: e.pointer() }),
                    })
                    .collect();
                (status, ErrorDocument { errors: objs, ..ErrorDocument::empty() })
            }
            GatewayError::Backend(e) => {
                let status = HttpStatusCode::INTERNAL_SERVER_ERROR;
                let obj = ErrorObject {
                    status: status.as_u16().to_string(),
                    title: status.reason_phrase().to_string(),
                    detail: Some(format!("Parameter service core error {}", e.code)),
                    code: None,
                    meta: None,
                    source: None,
                };
                (status, ErrorDocument::single(obj))
            }
            GatewayError::Internal(_) => {
                let status = HttpStatusCode::INTERNAL_SERVER_ERROR;
                let obj = ErrorObject {
                    status: status.as_u16().to_string(),
                    title: status.reason_phrase().to_string(),
                    detail: Some("Internal operation execution error occurred.".to_string()),
                    code: None,
                    meta: None,
                    source: None,
                };
                (status, ErrorDocument::single(obj))
            }
        }
    }
}

fn domain_status_meta(domain_status: i64) -> Option<std::collections::BTreeMap<String, serde_json::Value>> {
    if domain_status == 0 {
        return None;
    }
    let mut meta = std::collections::BTreeMap::new();
    meta.insert(
        "domainSpecificStatusCode".to_string(),
        serde_json::Value::from(domain_status),
    );
    Some(meta)
}

/// `spec.md` §4.3: if every contained error is in the `4xx` family, use the
/// highest of those codes; otherwise the exception as a whole is a `500`.
fn data_exception_status(errors: &[DataError]) -> HttpStatusCode {
    let codes: Vec<u16> = errors.iter().map(|e| e.core.http_status.as_u16()).collect();
    if codes.iter().all(|c| (400..500).contains(c)) {
        HttpStatusCode::new(*codes.iter().max().unwrap_or(&500))
    } else {
        HttpStatusCode::INTERNAL_SERVER_ERROR
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorSource {
    pub pointer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorObject {
    pub status: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<std::collections::BTreeMap<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
}

/// The `{ jsonapi, meta, errors }` envelope (`spec.md` §4.2/§8 property 5).
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDocument {
    pub jsonapi: JsonApiObject,
    pub meta: std::collections::BTreeMap<String, serde_json::Value>,
    pub errors: Vec<ErrorObject>,
}

impl ErrorDocument {
    fn empty() -> Self {
        Self {
            jsonapi: JsonApiObject::default(),
            meta: base_meta(),
            errors: Vec::new(),
        }
    }

    fn single(obj: ErrorObject) -> Self {
        Self {
            errors: vec![obj],
            ..Self::empty()
        }
    }
}
