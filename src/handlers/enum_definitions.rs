//! `GET /enum-definitions[/{name}]` (`spec.md` §6).

use super::path_param;
use crate::error::GatewayError;
use crate::http::HttpStatusCode;
use crate::request::Request;
use crate::response::Response;
use crate::router::Operation;
use crate::serialize::{Basic, CollectionDocument, Resource};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct EnumDefinitionAttributes {
    pub values: BTreeMap<String, i64>,
}

fn enum_definition_resource(base: &str, d: &crate::backend::EnumDefinitionData) -> Resource<EnumDefinitionAttributes> {
    Resource::new(
        "enum-definitions",
        d.name.clone(),
        EnumDefinitionAttributes { values: d.values.clone() },
    )
    .with_link("self", format!("{base}/enum-definitions/{}", d.name))
}

pub async fn list_enum_definitions(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let defs = op.ctx.backend.get_all_enum_definitions().await.into_result()?;
    let base = op.ctx.service_base;
    let data: Vec<_> = defs.iter().map(|d| enum_definition_resource(base, d)).collect();
    let total = data.len() as u64;
    let doc = CollectionDocument::new(format!("{base}/enum-definitions"), req.uri.query_string(), data, 0, total.max(1), total);
    Response::json(HttpStatusCode::OK, &doc)
}

pub async fn get_enum_definition(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let name = path_param(&req, "name")?;
    let defs = op.ctx.backend.get_all_enum_definitions().await.into_result()?;
    let data = defs
        .into_iter()
        .find(|d| d.name == name)
        .ok_or_else(|| GatewayError::not_found("Not Found"))?;
    let base = op.ctx.service_base;
    let resource = enum_definition_resource(base, &data);
    let doc = Basic::new(format!("{base}/enum-definitions/{name}"), resource);
    Response::json(HttpStatusCode::OK, &doc)
}
