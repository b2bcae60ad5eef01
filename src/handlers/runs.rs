//! `POST/GET/DELETE /methods/{id}/runs[/{run_id}]` (`spec.md` §4.6/§6): the
//! `result-behavior=sync|async|auto|any` state machine.

use super::path_param;
use crate::backend::{ExecutionStatus, MethodInvocationResult};
use crate::error::GatewayError;
use crate::http::HttpStatusCode;
use crate::path::ParameterInstancePath;
use crate::pipeline::{wait_bounded, ResultBehavior, AUTO_RESULT_WAIT};
use crate::request::Request;
use crate::response::Response;
use crate::router::Operation;
use crate::runs::{MethodRunObject, RunState};
use crate::serialize::{parse_in_args, Basic, CollectionDocument};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
struct RunAttributes {
    #[serde(rename = "executionStatus")]
    execution_status: &'static str,
    #[serde(rename = "outArgs", skip_serializing_if = "BTreeMap::is_empty")]
    out_args: BTreeMap<String, crate::serialize::ParameterValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn result_attributes(result: &MethodInvocationResult) -> RunAttributes {
    RunAttributes {
        execution_status: result.execution_status.as_str(),
        out_args: result.out_args.clone(),
        error: None,
    }
}

fn run_resource(base: &str, method_id: &str, run: &MethodRunObject) -> crate::serialize::Resource<RunAttributes> {
    let attrs = match &run.state {
        RunState::InProgress => RunAttributes {
            execution_status: ExecutionStatus::Progress.as_str(),
            out_args: BTreeMap::new(),
            error: None,
        },
        RunState::Done(result) => result_attributes(result),
        RunState::Error(err) => RunAttributes {
            execution_status: ExecutionStatus::Error.as_str(),
            out_args: BTreeMap::new(),
            error: Some(err.title.clone()),
        },
        RunState::Removed => RunAttributes {
            execution_status: ExecutionStatus::Error.as_str(),
            out_args: BTreeMap::new(),
            error: Some("Gone".to_string()),
        },
    };
    crate::serialize::Resource::new("runs", run.id.clone(), attrs)
        .with_link("self", format!("{base}/methods/{method_id}/runs/{}", run.id))
}

/// Invoke the backend and record the outcome on `id`'s run entry. Shared by
/// the inline (`sync`) and detached (`async`/`auto`/`any`) paths.
async fn invoke_and_record(
    op: Arc<Operation>,
    path: ParameterInstancePath,
    in_args: crate::serialize::MethodInvocationInArgs,
    run_id: Option<String>,
) -> Result<MethodInvocationResult, GatewayError> {
    let response = op.ctx.backend.invoke_method_by_path(path, in_args).await;
    match (response.into_result(), &run_id) {
        (Ok(result), Some(id)) => {
            op.ctx.runs.complete(id, result.clone());
            Ok(result)
        }
        (Ok(result), None) => Ok(result),
        (Err(GatewayError::Core(core)), Some(id)) => {
            tracing::warn!(run_id = %id, error = ?core, "backend method invocation failed");
            op.ctx.runs.fail(id, core.clone());
            Err(GatewayError::Core(core))
        }
        (Err(err), _) => Err(err),
    }
}

pub async fn post_method_run(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let method_id = path_param(&req, "id")?.to_string();
    let path = ParameterInstancePath::parse(&method_id)?;
    let body = req.body_as_json()?;
    let in_args_value = body
        .get("data")
        .and_then(|d| d.get("attributes"))
        .and_then(|a| a.get("inArgs"))
        .cloned()
        .unwrap_or(serde_json::json!({}));
    let in_args = parse_in_args(&in_args_value)?;

    let behavior = ResultBehavior::parse(req.uri.query().get("result-behavior"));
    let base = op.ctx.service_base;
    let timeout_span = op.ctx.settings.run_result_timeout();

    if timeout_span == 0 {
        let result = invoke_and_record(op.clone(), path, in_args, None).await?;
        let resource = crate::serialize::Resource::new("methods", method_id.clone(), result_attributes(&result))
            .with_link("self", format!("{base}/methods/{method_id}"));
        let doc = Basic::new(format!("{base}/methods/{method_id}"), resource);
        return Response::json(HttpStatusCode::OK, &doc);
    }

    let run_id = op.ctx.runs.create(path.clone(), timeout_span)?;
    let location = format!("{base}/methods/{method_id}/runs/{run_id}");

    match behavior {
        ResultBehavior::Sync => {
            invoke_and_record(op.clone(), path, in_args, Some(run_id.clone())).await?;
            let run = op.ctx.runs.get(&run_id)?;
            let resource = run_resource(base, &method_id, &run);
            let doc = Basic::new(location.clone(), resource);
            Response::json(HttpStatusCode::CREATED, &doc).map(|r| r.with_header("Location", location))
        }
        ResultBehavior::Async => {
            let fut_op = op.clone();
            let fut_run_id = run_id.clone();
            tokio::spawn(invoke_and_record(fut_op, path, in_args, Some(fut_run_id)));
            let run = op.ctx.runs.get(&run_id)?;
            let resource = run_resource(base, &method_id, &run);
            let doc = Basic::new(location.clone(), resource);
            Response::json(HttpStatusCode::CREATED, &doc).map(|r| r.with_header("Location", location))
        }
        ResultBehavior::Auto => {
            let wait_op = op.clone();
            let wait_run_id = run_id.clone();
            wait_bounded(invoke_and_record(wait_op, path, in_args, Some(wait_run_id)), AUTO_RESULT_WAIT).await;
            let run = op.ctx.runs.get(&run_id)?;
            let resource = run_resource(base, &method_id, &run);
            let doc = Basic::new(location.clone(), resource);
            Response::json(HttpStatusCode::CREATED, &doc).map(|r| r.with_header("Location", location))
        }
    }
}

pub async fn list_method_runs(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let method_id = path_param(&req, "id")?.to_string();
    let path = ParameterInstancePath::parse(&method_id)?;
    let base = op.ctx.service_base;
    let runs = op.ctx.runs.list_for_method(&path);
    let data: Vec<_> = runs.iter().map(|r| run_resource(base, &method_id, r)).collect();
    let total = data.len() as u64;
    let doc = CollectionDocument::new(
        format!("{base}/methods/{method_id}/runs"),
        req.uri.query_string(),
        data,
        0,
        total.max(1),
        total,
    );
    Response::json(HttpStatusCode::OK, &doc)
}

pub async fn get_method_run(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let method_id = path_param(&req, "id")?.to_string();
    let run_id = path_param(&req, "run_id")?.to_string();
    let run = op.ctx.runs.get(&run_id)?;
    let base = op.ctx.service_base;
    let resource = run_resource(base, &method_id, &run);
    let doc = Basic::new(format!("{base}/methods/{method_id}/runs/{run_id}"), resource);
    Response::json(HttpStatusCode::OK, &doc)
}

pub async fn delete_method_run(op: Arc<Operation>, req: Request) -> Result<Response, GatewayError> {
    let run_id = path_param(&req, "run_id")?;
    op.ctx.runs.delete(run_id)?;
    Ok(Response::empty(HttpStatusCode::NO_CONTENT))
}
