//! The operation pipeline: CORS header assembly, handler invocation, error
//! projection, and the deferred-task drain (`spec.md` §4.6/§5).
//!
//! The flow is content negotiation → route → invoke → write, plus one added
//! discipline per `spec.md` §5: exactly one deferred follow-up task, spawned
//! after the response is flushed, regardless of the handler's outcome.

use crate::error::GatewayError;
use crate::http::{HttpMethod, HttpStatusCode};
use crate::request::Request;
use crate::response::Response;
use crate::router::{negotiate_content_type, Context, Operation, RouteOutcome, Router};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Fixed CORS header whitelists (`spec.md` §6). Policy tables themselves are
/// out of scope (§1); these are the literal header-name strings `spec.md` §6
/// fixes.
const ALLOWED_HEADERS: &str = "Accept, Authorization, Content-Length, Content-Type, Wago-Wdx-No-Auth-Popup";
const EXPOSED_HEADERS: &str = "Content-Length, Content-Type, Www-Authenticate, Wago-Wdx-Auth-Token, Wago-Wdx-Auth-Token-Expiration, Wago-Wdx-Auth-Token-Type";

fn methods_header(methods: &[HttpMethod]) -> String {
    methods.iter().map(HttpMethod::as_str).collect::<Vec<_>>().join(", ")
}

fn apply_cors(mut response: Response, allowed_methods: Option<&[HttpMethod]>) -> Response {
    if let Some(methods) = allowed_methods {
        response = response.with_header("Access-Control-Allow-Methods", methods_header(methods));
    }
    response
        .with_header("Access-Control-Allow-Headers", ALLOWED_HEADERS)
        .with_header("Access-Control-Expose-Headers", EXPOSED_HEADERS)
}

fn error_response(err: GatewayError) -> Response {
    let (status, doc) = err.into_document();
    // `spec.md` §4.3: "if even serialisation of the error fails, respond with
    // a bare status line" — `Response::json` can only fail on serialization.
    Response::json(status, &doc).unwrap_or_else(|_| Response::empty(HttpStatusCode::INTERNAL_SERVER_ERROR))
}

/// Run every deferred task queued on `op`, detached (`spec.md` §4.6/§5: the
/// deferred handler runs exactly once, after the response is flushed,
/// regardless of the handler's own success or failure).
fn spawn_deferred(op: &Operation) {
    for fut in op.take_deferred() {
        tokio::spawn(fut);
    }
}

/// Drive one request through routing, content negotiation, handler
/// invocation, and the deferred-task drain. The single entry point a
/// transport adapter calls per request.
///
/// Routing runs before negotiation: a `NotFound` outcome always yields `404`
/// and an `OPTIONS` match always yields its short-circuit response, even
/// with an unacceptable `Accept`/`Content-Type` (`spec.md` §4.5 steps 4-5
/// take precedence over step 6's negotiation rules for those two outcomes).
pub async fn handle(router: &Router, ctx: Context, mut req: Request) -> Response {
    let method = req.method;
    let outcome = match router.route(&req) {
        Ok(outcome) => outcome,
        Err(err) => return error_response(err),
    };

    match outcome {
        RouteOutcome::NotFound => {
            tracing::debug!(path = %req.uri.path, "no route matched");
            error_response(GatewayError::not_found("Not Found"))
        }
        RouteOutcome::Options { allowed_methods } => {
            apply_cors(Response::empty(HttpStatusCode::NO_CONTENT), Some(&allowed_methods))
        }
        RouteOutcome::Redirect { status, location } => {
            if let Err(err) = negotiate_content_type(&req) {
                return apply_cors(error_response(err), None);
            }
            apply_cors(Response::redirect(status, location), None)
        }
        RouteOutcome::MethodNotAllowed { allowed_methods } => {
            if let Err(err) = negotiate_content_type(&req) {
                return apply_cors(error_response(err), Some(&allowed_methods));
            }
            let resp = Response::empty(HttpStatusCode::METHOD_NOT_ALLOWED)
                .with_header("Allow", methods_header(&allowed_methods));
            apply_cors(resp, Some(&allowed_methods))
        }
        RouteOutcome::Matched {
            handler,
            path_params,
            allowed_methods,
            doc_link: _,
        } => {
            if let Err(err) = negotiate_content_type(&req) {
                return apply_cors(error_response(err), Some(&allowed_methods));
            }
            let path = req.uri.path.clone();
            req.set_path_params(path_params);
            let op = Arc::new(Operation::new(ctx));
            let result = handler.call(op.clone(), req).await;
            let mut response = match result {
                Ok(response) => {
                    tracing::info!(%method, %path, status = response.status.as_u16(), "request completed");
                    apply_cors(response, Some(&allowed_methods))
                }
                Err(err) => {
                    tracing::warn!(%method, %path, error = %err, "handler returned an error");
                    apply_cors(error_response(err), Some(&allowed_methods))
                }
            };
            if method == HttpMethod::Head {
                response = response.without_body();
            }
            spawn_deferred(&op);
            response
        }
    }
}

/// `result-behavior=sync|async|auto|any` selector (`spec.md` §4.6). `any` is
/// an alias for `auto`; `spec.md` §4.6 lists them as the same default policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultBehavior {
    Sync,
    Async,
    Auto,
}

impl ResultBehavior {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("sync") => Self::Sync,
            Some("async") => Self::Async,
            _ => Self::Auto,
        }
    }
}

/// The bounded wait `result-behavior=auto|any` uses to decide between a
/// synchronous and a registry-backed response (`spec.md` §4.6/§5).
pub const AUTO_RESULT_WAIT: Duration = Duration::from_secs(3);

/// Race `fut` against `duration`. `Some` if `fut` resolved in time, `None` on
/// timeout — the caller falls back to the async response shape.
pub async fn wait_bounded<F: Future>(fut: F, duration: Duration) -> Option<F::Output> {
    tokio::time::timeout(duration, fut).await.ok()
}
