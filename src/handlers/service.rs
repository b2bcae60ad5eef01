//! `GET /` (`spec.md` §6): the service identity document, a fixed set of
//! discovery links to every top-level collection.

use crate::error::GatewayError;
use crate::http::HttpStatusCode;
use crate::request::Request;
use crate::response::Response;
use crate::router::Operation;
use crate::serialize::{Resource, REST_API_VERSION};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ServiceAttributes {
    #[serde(rename = "apiVersion")]
    api_version: &'static str,
}

const TOP_LEVEL_COLLECTIONS: &[&str] = &[
    "devices",
    "features",
    "parameters",
    "parameter-definitions",
    "methods",
    "method-definitions",
    "monitoring-lists",
    "enum-definitions",
];

pub async fn get_service_identity(op: Arc<Operation>, _req: Request) -> Result<Response, GatewayError> {
    let base = op.ctx.service_base;
    let mut resource = Resource::new("service", "self", ServiceAttributes { api_version: REST_API_VERSION }).with_link("self", base.to_string());
    for name in TOP_LEVEL_COLLECTIONS {
        resource = resource.with_link(*name, format!("{base}/{name}"));
    }
    let doc = crate::serialize::Basic::new(base.to_string(), resource);
    Response::json(HttpStatusCode::OK, &doc)
}
