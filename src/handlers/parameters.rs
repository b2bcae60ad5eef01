//! `GET/PATCH /parameters[/{id}]` and the `referencedinstances`/`instances`
//! class-instance routes (`spec.md` §6).

use super::{parameter_resource, path_param};
use crate::backend::{ParameterData, SetParameterOutcome};
use crate::core_status::CoreStatus;
use crate::error::{CoreError, DataError, DataException, GatewayError, Locator};
use crate::filters::{parse_parameter_filter, parse_pagination};
use crate::http::HttpStatusCode;
use crate::path::ParameterInstancePath;
use crate::request::Request;
use crate::response::Response;
use crate::router::Operation;
use crate::serialize::{
    apply_paging, parse_value_path_request, parse_value_path_requests, Basic, CollectionDocument, ParameterValue, Resource,
    ValuePathRequest,
};
use serde::Serialize;
use std::sync::Arc;

/// Data-type tags the backend uses for class/instance parameters
/// (`class_instances.cpp`'s `parameter_value_types::instance_identity_ref`/
/// `instantiations`).
const INSTANCE_IDENTITY_REF_TYPE: &str = "InstanceIdentityRef";
const INSTANTIATIONS_TYPE: &str = "Instantiations";

/// Scalar values carry a single ref in `value`; ranked values carry an array
/// of them (`class_instances.cpp`: `get_rank() == scalar` picks a
/// single-element vector over `get_items()`).
fn instance_identity_ref_values(value: &ParameterValue) -> Vec<String> {
    if value.data_rank == 0 {
        value.value.as_str().map(|s| vec![s.to_string()]).unwrap_or_default()
    } else {
        value
            .value
            .as_array()
            .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }
}

/// The instance numbers an `instantiations`-typed parameter carries.
fn instantiation_ids(value: &ParameterValue) -> Vec<u32> {
    value
        .value
        .as_array()
        .map(|items| items.iter().filter_map(|v| v.as_u64()).map(|n| n as u32).collect())
        .unwrap_or_default()
}

/// Fetch the class parameter at `path` and verify it is an `instantiations`
/// parameter, the way every `class_instances.cpp` operation does before
/// touching its instantiation list.
async fn fetch_class_parameter(op: &Operation, path: &ParameterInstancePath, id: &str) -> Result<ParameterData, GatewayError> {
    let mut params = op.ctx.backend.get_parameters_by_path(vec![path.clone()]).await.into_result()?;
    let data = params.pop().ok_or_else(|| GatewayError::not_found("Not Found"))?;
    if data.value.data_type != INSTANTIATIONS_TYPE {
        return Err(GatewayError::not_found(format!(
            "No instances available for parameter with ID \"{id}\", parameter is not of type '{INSTANTIATIONS_TYPE}'."
        )));
    }
    Ok(data)
}

pub async fn list_parameters(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let query = req.uri.query();
    let filter = parse_parameter_filter(&query)?;
    let pagination = parse_pagination(&query)?;
    let page = op
        .ctx
        .backend
        .get_all_parameters(filter, pagination.offset as u64, pagination.limit as u64)
        .await
        .into_result()?;
    let base = op.ctx.service_base;
    let data: Vec<_> = page.items.into_iter().map(|p| parameter_resource(base, p)).collect();
    let doc = CollectionDocument::new(
        format!("{base}/parameters"),
        req.uri.query_string(),
        data,
        pagination.offset as u64,
        pagination.limit as u64,
        page.total,
    );
    Response::json(HttpStatusCode::OK, &doc)
}

pub async fn get_parameter(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let id = path_param(&req, "id")?;
    let path = ParameterInstancePath::parse(id)?;
    let mut data = op.ctx.backend.get_parameters_by_path(vec![path]).await.into_result()?;
    let data = data.pop().ok_or_else(|| GatewayError::not_found("Not Found"))?;
    let base = op.ctx.service_base;
    let resource = parameter_resource(base, data);
    let doc = Basic::new(format!("{base}/parameters/{id}"), resource);
    Response::json(HttpStatusCode::OK, &doc)
}

#[derive(Debug, Clone, Serialize)]
struct SetOutcomeAttributes {
    value: serde_json::Value,
}

fn outcome_resource(base: &str, path: &ParameterInstancePath, value: serde_json::Value) -> Resource<SetOutcomeAttributes> {
    let id = path.to_id_string();
    Resource::new("parameters", id.clone(), SetOutcomeAttributes { value }).with_link("self", format!("{base}/parameters/{id}"))
}

/// Classify a batch of write outcomes into surviving successes and hard
/// errors. A deferred write is always rescheduled on `op` regardless of the
/// error flags below; `deferred-parameters-as-errors` only controls whether
/// it is *also* folded into `errors` (`class_instances.cpp`'s sibling,
/// `operations/parameters.cpp`'s `set_parameters` — see `DESIGN.md`
/// decision 3).
fn classify_outcomes(
    op: &Operation,
    requests: &[ValuePathRequest],
    outcomes: Vec<SetParameterOutcome>,
    treat_deferred_as_error: bool,
) -> (Vec<(usize, serde_json::Value)>, Vec<DataError>, bool) {
    let mut successes = Vec::new();
    let mut errors = Vec::new();
    let mut any_deferred = false;
    for (i, outcome) in outcomes.into_iter().enumerate() {
        let value = requests.get(i).map(|r| r.value.clone()).unwrap_or(serde_json::Value::Null);
        if !outcome.status.is_success() {
            errors.push(DataError::new(
                CoreError::new(outcome.status, 0),
                Some(i as i64),
                Some(Locator::Attribute("value".to_string())),
            ));
            continue;
        }
        if outcome.deferred {
            any_deferred = true;
            let backend = op.ctx.backend.clone();
            let request = ValuePathRequest {
                path: outcome.path.clone(),
                value: value.clone(),
            };
            op.defer(async move {
                let _ = backend.set_parameter_values_by_path(vec![request]).await;
            });
            if treat_deferred_as_error {
                errors.push(DataError::new(
                    CoreError::new(CoreStatus::ConnectionChangesDeferred, 0),
                    Some(i as i64),
                    Some(Locator::Attribute("value".to_string())),
                ));
                continue;
            }
        }
        successes.push((i, value));
    }
    (successes, errors, any_deferred)
}

fn deferred_flags(req: &Request) -> (bool, bool) {
    let query = req.uri.query();
    let deferred_as_errors = query.get("deferred-parameters-as-errors") == Some("true");
    let adjusted_as_errors = query.get("adjusted-parameters-as-errors") == Some("true");
    (deferred_as_errors, adjusted_as_errors)
}

pub async fn patch_parameter(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let id = path_param(&req, "id")?.to_string();
    let body = req.body_as_json()?;
    let parsed = parse_value_path_request(&body)?;
    let (deferred_as_errors, _adjusted_as_errors) = deferred_flags(&req);
    let requests = vec![parsed];
    let outcomes = match op
        .ctx
        .backend
        .set_parameter_values_by_path_connection_aware(requests.clone(), deferred_as_errors)
        .await
        .into_result()
    {
        Ok(outcomes) => outcomes,
        Err(err) => {
            tracing::warn!(parameter = %id, error = %err, "backend rejected parameter write");
            return Err(err);
        }
    };
    let (successes, errors, any_deferred) = classify_outcomes(&op, &requests, outcomes, deferred_as_errors);
    if !errors.is_empty() {
        return Err(GatewayError::Data(DataException(errors)));
    }
    let base = op.ctx.service_base;
    let (_, value) = successes.into_iter().next().ok_or_else(|| GatewayError::internal("no outcome for single parameter set"))?;
    let resource = outcome_resource(base, &requests[0].path, value);
    let doc = Basic::new(format!("{base}/parameters/{id}"), resource);
    let status = if any_deferred { HttpStatusCode::ACCEPTED } else { HttpStatusCode::OK };
    Response::json(status, &doc)
}

pub async fn patch_parameters(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let body = req.body_as_json()?;
    let requests = parse_value_path_requests(&body)?;
    let (deferred_as_errors, _adjusted_as_errors) = deferred_flags(&req);
    let outcomes = op
        .ctx
        .backend
        .set_parameter_values_by_path_connection_aware(requests.clone(), deferred_as_errors)
        .await
        .into_result()?;
    let (successes, errors, any_deferred) = classify_outcomes(&op, &requests, outcomes, deferred_as_errors);
    if !errors.is_empty() {
        return Err(GatewayError::Data(DataException(errors)));
    }
    let base = op.ctx.service_base;
    let data: Vec<_> = successes
        .into_iter()
        .map(|(i, value)| outcome_resource(base, &requests[i].path, value))
        .collect();
    let total = data.len() as u64;
    let doc = CollectionDocument::new(format!("{base}/parameters"), req.uri.query_string(), data, 0, total.max(1), total);
    let status = if any_deferred { HttpStatusCode::ACCEPTED } else { HttpStatusCode::OK };
    Response::json(status, &doc)
}

/// `GET /parameters/{id}/referencedinstances`: resolve an
/// `instance_identity_ref` parameter's values to the instance paths that
/// still actually exist, dropping any that have since been removed from
/// their class's instantiation list (`class_instances.cpp`:33-158).
pub async fn list_referenced_instances(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let id = path_param(&req, "id")?;
    let path = ParameterInstancePath::parse(id)?;
    let pagination = parse_pagination(&req.uri.query())?;
    let base = op.ctx.service_base;

    let mut params = op.ctx.backend.get_parameters_by_path(vec![path.clone()]).await.into_result()?;
    let referenced = params.pop().ok_or_else(|| GatewayError::not_found("Not Found"))?;
    if referenced.value.data_type != INSTANCE_IDENTITY_REF_TYPE {
        return Err(GatewayError::not_found(format!(
            "No referenced instances available for parameter with ID \"{id}\", parameter is not of type '{INSTANCE_IDENTITY_REF_TYPE}'."
        )));
    }

    let mut instance_paths = Vec::new();
    let mut class_paths = Vec::new();
    for value in instance_identity_ref_values(&referenced.value) {
        let class_path = match value.rfind('/') {
            Some(idx) => value[..idx].to_string(),
            None => value.clone(),
        };
        instance_paths.push(ParameterInstancePath::new(path.device, value));
        class_paths.push(ParameterInstancePath::new(path.device, class_path));
    }

    let class_responses = op.ctx.backend.get_parameters_by_path(class_paths.clone()).await.into_result()?;

    let resolved: Vec<ParameterInstancePath> = instance_paths
        .into_iter()
        .zip(class_paths.iter())
        .zip(class_responses.iter())
        .filter_map(|((instance_path, class_path), class_response)| {
            let existing = if class_response.value.data_type == INSTANTIATIONS_TYPE {
                instantiation_ids(&class_response.value)
            } else {
                Vec::new()
            };
            let still_exists = existing
                .iter()
                .any(|instance_id| format!("{}/{}", class_path.path, instance_id) == instance_path.path);
            still_exists.then_some(instance_path)
        })
        .collect();

    let total = resolved.len() as u64;
    let page = apply_paging(&resolved, pagination.limit as u64, pagination.offset as u64)?;
    let data = super::related_refs("parameters", &page);
    let doc = CollectionDocument::new(
        format!("{base}/parameters/{id}/referencedinstances"),
        req.uri.query_string(),
        data,
        pagination.offset as u64,
        pagination.limit as u64,
        total,
    );
    Response::json(HttpStatusCode::OK, &doc)
}

/// `GET /parameters/{id}/instances`: the instance paths named in a class
/// parameter's own instantiation list (`class_instances.cpp`:160-214).
pub async fn list_parameter_instances(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let id = path_param(&req, "id")?;
    let path = ParameterInstancePath::parse(id)?;
    let pagination = parse_pagination(&req.uri.query())?;
    let base = op.ctx.service_base;

    let class_param = fetch_class_parameter(&op, &path, id).await?;
    let instances: Vec<ParameterInstancePath> = instantiation_ids(&class_param.value)
        .into_iter()
        .map(|instance_id| ParameterInstancePath::new(path.device, format!("{}/{instance_id}", path.path)))
        .collect();

    let total = instances.len() as u64;
    let page = apply_paging(&instances, pagination.limit as u64, pagination.offset as u64)?;
    let data = super::related_refs("parameters", &page);
    let doc = CollectionDocument::new(
        format!("{base}/parameters/{id}/instances"),
        req.uri.query_string(),
        data,
        pagination.offset as u64,
        pagination.limit as u64,
        total,
    );
    Response::json(HttpStatusCode::OK, &doc)
}

/// `GET /parameters/{id}/instances/{no}`: a single resolved instance
/// (`class_instances.cpp`:216-271).
pub async fn get_parameter_instance(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let id = path_param(&req, "id")?;
    let path = ParameterInstancePath::parse(id)?;
    let number: u32 = path_param(&req, "no")?
        .parse()
        .map_err(|_| GatewayError::bad_request("instance number must be a non-negative integer", ""))?;
    let base = op.ctx.service_base;

    let class_param = fetch_class_parameter(&op, &path, id).await?;
    if !instantiation_ids(&class_param.value).contains(&number) {
        return Err(GatewayError::not_found(format!(
            "Instance with instance number \"{number}\" not found for class parameter with ID \"{id}\"."
        )));
    }

    let instance_path = ParameterInstancePath::new(path.device, format!("{}/{number}", path.path));
    let mut params = op.ctx.backend.get_parameters_by_path(vec![instance_path]).await.into_result()?;
    let data = params.pop().ok_or_else(|| GatewayError::not_found("Not Found"))?;
    let resource = parameter_resource(base, data);
    let doc = Basic::new(format!("{base}/parameters/{id}/instances/{number}"), resource);
    Response::json(HttpStatusCode::OK, &doc)
}
