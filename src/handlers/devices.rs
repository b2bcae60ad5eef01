//! `GET /devices`, `/devices/{id}`, `/devices/{id}/subdevices[/{name}]`,
//! `/devices/{id}/features` (`spec.md` §6).

use super::path_param;
use crate::backend::DeviceData;
use crate::error::GatewayError;
use crate::filters::parse_pagination;
use crate::http::HttpStatusCode;
use crate::path::DeviceId;
use crate::request::Request;
use crate::response::Response;
use crate::router::Operation;
use crate::serialize::{apply_paging, Basic, CollectionDocument, Resource};
use serde::Serialize;
use std::sync::Arc;

/// `spec.md` §9's `class_instances`/device-collection open question names
/// `"kbus"`, `"rlb"` as the collections it knows about; there is no backend
/// operation to list collection names (only to resolve one by name, §4.8),
/// so the fixed set from the glossary/open-question text is used here.
const KNOWN_DEVICE_COLLECTIONS: &[&str] = &["kbus", "rlb"];

#[derive(Debug, Clone, Serialize)]
pub(crate) struct DeviceAttributes {
    #[serde(rename = "orderNumber")]
    pub order_number: String,
    #[serde(rename = "firmwareVersion")]
    pub firmware_version: String,
}

pub(crate) fn device_resource(base: &str, d: DeviceData) -> Resource<DeviceAttributes> {
    let id = d.id.to_string();
    Resource::new(
        "devices",
        id.clone(),
        DeviceAttributes {
            order_number: d.order_number,
            firmware_version: d.firmware_version,
        },
    )
    .with_link("self", format!("{base}/devices/{id}"))
}

pub async fn list_devices(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let pagination = parse_pagination(&req.uri.query())?;
    let devices = op.ctx.backend.get_all_devices().await.into_result()?;
    let base = op.ctx.service_base;
    let total = devices.len() as u64;
    let page = apply_paging(&devices, pagination.limit as u64, pagination.offset as u64)?;
    let data: Vec<_> = page.into_iter().map(|d| device_resource(base, d)).collect();
    let doc = CollectionDocument::new(
        format!("{base}/devices"),
        req.uri.query_string(),
        data,
        pagination.offset as u64,
        pagination.limit as u64,
        total,
    );
    Response::json(HttpStatusCode::OK, &doc)
}

pub async fn get_device(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let device = DeviceId::parse(path_param(&req, "device_id")?)?;
    let data = match op.ctx.backend.get_device(device).await.into_result() {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!(%device, error = %err, "backend rejected device lookup");
            return Err(err);
        }
    };
    let base = op.ctx.service_base;
    let resource = device_resource(base, data);
    let doc = Basic::new(format!("{base}/devices/{device}"), resource);
    Response::json(HttpStatusCode::OK, &doc)
}

pub async fn get_subdevices_collections(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let device = DeviceId::parse(path_param(&req, "device_id")?)?;
    let base = op.ctx.service_base;
    let mut doc = Basic::new(
        format!("{base}/devices/{device}/subdevices"),
        serde_json::json!({ "collections": KNOWN_DEVICE_COLLECTIONS }),
    );
    for name in KNOWN_DEVICE_COLLECTIONS {
        doc.links.insert((*name).to_string(), format!("{base}/devices/{device}/subdevices/{name}"));
    }
    Response::json(HttpStatusCode::OK, &doc)
}

pub async fn get_subdevices(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let device = DeviceId::parse(path_param(&req, "device_id")?)?;
    let name = path_param(&req, "name")?.to_string();
    let pagination = parse_pagination(&req.uri.query())?;
    let devices = op.ctx.backend.get_subdevices_by_collection_name(device, &name).await.into_result()?;
    let base = op.ctx.service_base;
    let total = devices.len() as u64;
    let page = apply_paging(&devices, pagination.limit as u64, pagination.offset as u64)?;
    let data: Vec<_> = page.into_iter().map(|d| device_resource(base, d)).collect();
    let doc = CollectionDocument::new(
        format!("{base}/devices/{device}/subdevices/{name}"),
        req.uri.query_string(),
        data,
        pagination.offset as u64,
        pagination.limit as u64,
        total,
    );
    Response::json(HttpStatusCode::OK, &doc)
}

pub async fn list_device_features(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let device = DeviceId::parse(path_param(&req, "device_id")?)?;
    let pagination = parse_pagination(&req.uri.query())?;
    let features = op.ctx.backend.get_features(vec![device]).await.into_result()?;
    let base = op.ctx.service_base;
    let total = features.len() as u64;
    let page = apply_paging(&features, pagination.limit as u64, pagination.offset as u64)?;
    let data: Vec<_> = page.into_iter().map(|f| super::features::feature_resource(base, f)).collect();
    let doc = CollectionDocument::new(
        format!("{base}/devices/{device}/features"),
        req.uri.query_string(),
        data,
        pagination.offset as u64,
        pagination.limit as u64,
        total,
    );
    Response::json(HttpStatusCode::OK, &doc)
}

/// `GET /devices/{id}/features/{name}` → `301` to `/features/{id}-{name}`
/// (`spec.md` §6).
pub async fn redirect_device_feature(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let device_id = path_param(&req, "device_id")?;
    let name = path_param(&req, "name")?;
    let base = op.ctx.service_base;
    Ok(Response::redirect(HttpStatusCode::MOVED_PERMANENTLY, format!("{base}/features/{device_id}-{name}")))
}
