//! `GET /method-definitions[/{id}]` (`spec.md` §6, "analogous" to `/methods`).

use super::{method_definition_resource, path_param};
use crate::error::GatewayError;
use crate::filters::{parse_parameter_filter, parse_pagination};
use crate::http::HttpStatusCode;
use crate::path::ParameterInstancePath;
use crate::request::Request;
use crate::response::Response;
use crate::router::Operation;
use crate::serialize::{Basic, CollectionDocument};
use std::sync::Arc;

pub async fn list_method_definitions(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let query = req.uri.query();
    let filter = parse_parameter_filter(&query)?;
    let pagination = parse_pagination(&query)?;
    let page = op
        .ctx
        .backend
        .get_all_method_definitions(filter, pagination.offset as u64, pagination.limit as u64)
        .await
        .into_result()?;
    let base = op.ctx.service_base;
    let data: Vec<_> = page
        .items
        .into_iter()
        .map(|d| method_definition_resource(base, "method-definitions", d))
        .collect();
    let doc = CollectionDocument::new(
        format!("{base}/method-definitions"),
        req.uri.query_string(),
        data,
        pagination.offset as u64,
        pagination.limit as u64,
        page.total,
    );
    Response::json(HttpStatusCode::OK, &doc)
}

pub async fn get_method_definition(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let id = path_param(&req, "id")?;
    let path = ParameterInstancePath::parse(id)?;
    let data = op.ctx.backend.get_method_definition_by_path(path).await.into_result()?;
    let base = op.ctx.service_base;
    let resource = method_definition_resource(base, "method-definitions", data);
    let doc = Basic::new(format!("{base}/method-definitions/{id}"), resource);
    Response::json(HttpStatusCode::OK, &doc)
}
