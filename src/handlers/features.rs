//! `GET /features[/{id}]` and its `includedfeatures`/`containedparameters`/
//! `containedmethods` relationship collections (`spec.md` §6).

use super::{parameter_resource, path_param, related_refs};
use crate::backend::FeatureData;
use crate::error::GatewayError;
use crate::filters::parse_pagination;
use crate::http::HttpStatusCode;
use crate::path::ParameterInstancePath;
use crate::request::Request;
use crate::response::Response;
use crate::router::Operation;
use crate::serialize::{apply_paging, Basic, CollectionDocument, Relationship, Resource};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FeatureAttributes {
    pub name: String,
}

pub(crate) fn feature_resource(base: &str, f: FeatureData) -> Resource<FeatureAttributes> {
    let id = f.id();
    let included: Vec<_> = f
        .included_features
        .iter()
        .map(|name| crate::serialize::RelatedResource::new("features", format!("{}-{}", f.device, name)))
        .collect();
    let contained_parameters = related_refs("parameters", &f.contained_parameters);
    let contained_methods = related_refs("methods", &f.contained_methods);
    Resource::new("features", id.clone(), FeatureAttributes { name: f.name })
        .with_link("self", format!("{base}/features/{id}"))
        .with_relationship(
            "includedfeatures",
            Relationship::multi(included).with_link("related", format!("{base}/features/{id}/includedfeatures")),
        )
        .with_relationship(
            "containedparameters",
            Relationship::multi(contained_parameters)
                .with_link("related", format!("{base}/features/{id}/containedparameters")),
        )
        .with_relationship(
            "containedmethods",
            Relationship::multi(contained_methods).with_link("related", format!("{base}/features/{id}/containedmethods")),
        )
}

fn parse_feature_id(id: &str) -> Result<ParameterInstancePath, GatewayError> {
    ParameterInstancePath::parse(id)
}

pub async fn list_features(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let pagination = parse_pagination(&req.uri.query())?;
    let features = op.ctx.backend.get_features_of_all_devices().await.into_result()?;
    let base = op.ctx.service_base;
    let total = features.len() as u64;
    let page = apply_paging(&features, pagination.limit as u64, pagination.offset as u64)?;
    let data: Vec<_> = page.into_iter().map(|f| feature_resource(base, f)).collect();
    let doc = CollectionDocument::new(
        format!("{base}/features"),
        req.uri.query_string(),
        data,
        pagination.offset as u64,
        pagination.limit as u64,
        total,
    );
    Response::json(HttpStatusCode::OK, &doc)
}

pub async fn get_feature(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let feature_id = path_param(&req, "feature_id")?;
    let path = parse_feature_id(feature_id)?;
    let data = op.ctx.backend.get_feature_definition(path.device, &path.path).await.into_result()?;
    let base = op.ctx.service_base;
    let resource = feature_resource(base, data);
    let doc = Basic::new(format!("{base}/features/{feature_id}"), resource);
    Response::json(HttpStatusCode::OK, &doc)
}

/// `spec.md` §6's `includedfeatures`/`containedmethods` relationship
/// collections have no backend operation to hydrate the referenced
/// resources in bulk, so these return bare `{type, id}` references fetched
/// off the parent feature, unlike `containedparameters` below which is
/// fully hydrated via `get_parameters_by_path`.
pub async fn list_feature_includes(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let feature_id = path_param(&req, "feature_id")?;
    let path = parse_feature_id(feature_id)?;
    let feature = op.ctx.backend.get_feature_definition(path.device, &path.path).await.into_result()?;
    let base = op.ctx.service_base;
    let refs: Vec<_> = feature
        .included_features
        .iter()
        .map(|name| crate::serialize::RelatedResource::new("features", format!("{}-{}", feature.device, name)))
        .collect();
    let total = refs.len() as u64;
    let doc = CollectionDocument::new(
        format!("{base}/features/{feature_id}/includedfeatures"),
        req.uri.query_string(),
        refs,
        0,
        total.max(1),
        total,
    );
    Response::json(HttpStatusCode::OK, &doc)
}

pub async fn list_contained_methods(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let feature_id = path_param(&req, "feature_id")?;
    let path = parse_feature_id(feature_id)?;
    let feature = op.ctx.backend.get_feature_definition(path.device, &path.path).await.into_result()?;
    let base = op.ctx.service_base;
    let refs = related_refs("methods", &feature.contained_methods);
    let total = refs.len() as u64;
    let doc = CollectionDocument::new(
        format!("{base}/features/{feature_id}/containedmethods"),
        req.uri.query_string(),
        refs,
        0,
        total.max(1),
        total,
    );
    Response::json(HttpStatusCode::OK, &doc)
}

pub async fn list_contained_parameters(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let feature_id = path_param(&req, "feature_id")?;
    let path = parse_feature_id(feature_id)?;
    let feature = op.ctx.backend.get_feature_definition(path.device, &path.path).await.into_result()?;
    let base = op.ctx.service_base;
    let parameters = op.ctx.backend.get_parameters_by_path(feature.contained_parameters.clone()).await.into_result()?;
    let total = parameters.len() as u64;
    let data: Vec<_> = parameters.into_iter().map(|p| parameter_resource(base, p)).collect();
    let doc = CollectionDocument::new(
        format!("{base}/features/{feature_id}/containedparameters"),
        req.uri.query_string(),
        data,
        0,
        total.max(1),
        total,
    );
    Response::json(HttpStatusCode::OK, &doc)
}
