//! JSON:API envelope plumbing shared by success and error documents.

mod document;
mod request_bodies;
mod resource;
mod value;

pub use document::{apply_paging, Basic, CollectionDocument};
pub use request_bodies::{
    parse_create_monitoring_list_request, parse_in_args, parse_value_path_request,
    parse_value_path_requests, CreateMonitoringListRequest, MethodInvocationInArgs,
    ValuePathRequest,
};
pub use resource::{DataMode, RelatedResource, Relationship, Resource};
pub use value::ParameterValue;

use serde::Serialize;

/// The REST API version reported in every document's `meta.version`.
/// `spec.md` §4.2 calls this `<rest-api-version>`; fixed here as this
/// gateway core's own version, independent of the crate's Cargo version.
pub const REST_API_VERSION: &str = "1.0";

/// The single supported media type (`spec.md` §4.5/§6).
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

#[derive(Debug, Clone, Serialize)]
pub struct JsonApiObject {
    pub version: &'static str,
}

impl Default for JsonApiObject {
    fn default() -> Self {
        Self { version: "1.0" }
    }
}

/// Build the `meta` map every document carries, starting from
/// `{"version": REST_API_VERSION}` and allowing callers to add further
/// entries (e.g. a resource count).
pub fn base_meta() -> std::collections::BTreeMap<String, serde_json::Value> {
    let mut meta = std::collections::BTreeMap::new();
    meta.insert(
        "version".to_string(),
        serde_json::Value::String(REST_API_VERSION.to_string()),
    );
    meta
}
