//! `GET /parameter-definitions[/{id}[/enum]]` (`spec.md` §6).

use super::{parameter_definition_resource, path_param};
use crate::error::GatewayError;
use crate::filters::{parse_parameter_filter, parse_pagination};
use crate::http::HttpStatusCode;
use crate::path::ParameterInstancePath;
use crate::request::Request;
use crate::response::Response;
use crate::router::Operation;
use crate::serialize::{Basic, CollectionDocument};
use std::sync::Arc;

pub async fn list_parameter_definitions(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let query = req.uri.query();
    let filter = parse_parameter_filter(&query)?;
    let pagination = parse_pagination(&query)?;
    let page = op
        .ctx
        .backend
        .get_all_parameter_definitions(filter, pagination.offset as u64, pagination.limit as u64)
        .await
        .into_result()?;
    let base = op.ctx.service_base;
    let data: Vec<_> = page.items.into_iter().map(|d| parameter_definition_resource(base, d)).collect();
    let doc = CollectionDocument::new(
        format!("{base}/parameter-definitions"),
        req.uri.query_string(),
        data,
        pagination.offset as u64,
        pagination.limit as u64,
        page.total,
    );
    Response::json(HttpStatusCode::OK, &doc)
}

pub async fn get_parameter_definition(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let id = path_param(&req, "id")?;
    let path = ParameterInstancePath::parse(id)?;
    let mut data = op.ctx.backend.get_parameter_definitions_by_path(vec![path]).await.into_result()?;
    let data = data.pop().ok_or_else(|| GatewayError::not_found("Not Found"))?;
    let base = op.ctx.service_base;
    let resource = parameter_definition_resource(base, data);
    let doc = Basic::new(format!("{base}/parameter-definitions/{id}"), resource);
    Response::json(HttpStatusCode::OK, &doc)
}

/// `GET /parameter-definitions/{id}/enum` → `301` to `/enum-definitions/{name}`
/// when the definition names one, else `404` (`spec.md` §6).
pub async fn redirect_parameter_definition_enum(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let id = path_param(&req, "id")?;
    let path = ParameterInstancePath::parse(id)?;
    let mut data = op.ctx.backend.get_parameter_definitions_by_path(vec![path]).await.into_result()?;
    let data = data.pop().ok_or_else(|| GatewayError::not_found("Not Found"))?;
    let enum_name = data.enum_name.ok_or_else(|| GatewayError::not_found("Not Found"))?;
    let base = op.ctx.service_base;
    Ok(Response::redirect(HttpStatusCode::MOVED_PERMANENTLY, format!("{base}/enum-definitions/{enum_name}")))
}
