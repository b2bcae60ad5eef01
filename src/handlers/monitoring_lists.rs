//! `GET/POST/DELETE /monitoring-lists[/{id}[/parameters]]` (`spec.md` §6).

use super::{parameter_resource, path_param};
use crate::error::GatewayError;
use crate::http::HttpStatusCode;
use crate::request::Request;
use crate::response::Response;
use crate::router::Operation;
use crate::serialize::{parse_create_monitoring_list_request, Basic, CollectionDocument, RelatedResource, Resource};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct MonitoringListAttributes {
    pub timeout: u16,
}

fn monitoring_list_resource(base: &str, d: &crate::backend::MonitoringListData) -> Resource<MonitoringListAttributes> {
    let id = d.id.to_string();
    let resource = Resource::new("monitoring-lists", id.clone(), MonitoringListAttributes { timeout: d.timeout });
    let resource = resource.with_link("self", format!("{base}/monitoring-lists/{id}"));
    let relationship = crate::serialize::Relationship::multi(
        d.parameter_paths.iter().map(|p| RelatedResource::new("parameters", p.to_id_string())).collect(),
    )
    .with_link("related", format!("{base}/monitoring-lists/{id}/parameters"));
    resource.with_relationship("parameters", relationship)
}

pub async fn list_monitoring_lists(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let lists = op.ctx.backend.get_all_monitoring_lists().await.into_result()?;
    let base = op.ctx.service_base;
    let data: Vec<_> = lists.iter().map(|d| monitoring_list_resource(base, d)).collect();
    let total = data.len() as u64;
    let doc = CollectionDocument::new(format!("{base}/monitoring-lists"), req.uri.query_string(), data, 0, total.max(1), total);
    Response::json(HttpStatusCode::OK, &doc)
}

pub async fn create_monitoring_list(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let body = req.body_as_json()?;
    let parsed = parse_create_monitoring_list_request(&body)?;
    let data = op
        .ctx
        .backend
        .create_monitoring_list_with_paths(parsed.parameter_paths, parsed.timeout)
        .await
        .into_result()?;
    let base = op.ctx.service_base;
    tracing::info!(id = data.id, "monitoring list created");
    let resource = monitoring_list_resource(base, &data);
    let location = format!("{base}/monitoring-lists/{}", data.id);
    let doc = Basic::new(location.clone(), resource);
    Response::json(HttpStatusCode::CREATED, &doc).map(|r| r.with_header("Location", location))
}

fn parse_list_id(req: &Request) -> Result<u64, GatewayError> {
    let id = path_param(req, "id")?;
    id.parse::<u64>()
        .map_err(|_| GatewayError::bad_request(format!("\"{id}\" is not a valid monitoring list id"), ""))
}

pub async fn get_monitoring_list(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let id = parse_list_id(&req)?;
    let data = op.ctx.backend.get_monitoring_list(id).await.into_result()?;
    let base = op.ctx.service_base;
    let resource = monitoring_list_resource(base, &data);
    let path = format!("{base}/monitoring-lists/{id}");
    let query = req.uri.query();
    if query.get("include") == Some("parameters") {
        let values = op.ctx.backend.get_values_for_monitoring_list(id).await.into_result()?;
        let included = values
            .into_iter()
            .map(|p| serde_json::to_value(parameter_resource(base, p)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| GatewayError::internal(format!("failed to serialize included parameter: {e}")))?;
        let doc = Basic::new(path, resource).with_included(included);
        return Response::json(HttpStatusCode::OK, &doc);
    }
    let doc = Basic::new(path, resource);
    Response::json(HttpStatusCode::OK, &doc)
}

pub async fn delete_monitoring_list(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let id = parse_list_id(&req)?;
    if let Err(err) = op.ctx.backend.delete_monitoring_list(id).await.into_result() {
        tracing::warn!(id, error = %err, "failed to delete monitoring list");
        return Err(err);
    }
    Ok(Response::empty(HttpStatusCode::NO_CONTENT))
}

pub async fn list_monitoring_list_parameters(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let id = parse_list_id(&req)?;
    let base = op.ctx.service_base;
    let values = op.ctx.backend.get_values_for_monitoring_list(id).await.into_result()?;
    let data: Vec<_> = values.into_iter().map(|p| parameter_resource(base, p)).collect();
    let total = data.len() as u64;
    let doc = CollectionDocument::new(
        format!("{base}/monitoring-lists/{id}/parameters"),
        req.uri.query_string(),
        data,
        0,
        total.max(1),
        total,
    );
    Response::json(HttpStatusCode::OK, &doc)
}
