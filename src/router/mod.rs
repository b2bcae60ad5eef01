//! URL routing: template registration, matching, method negotiation, and
//! redirects (`spec.md` §4.5).

mod template;

pub use template::Template;

use crate::backend::Frontend;
use crate::error::GatewayError;
use crate::http::{HttpMethod, HttpStatusCode};
use crate::request::Request;
use crate::response::Response;
use crate::runs::RunManager;
use crate::serialize::MEDIA_TYPE;
use crate::settings::Settings;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Collaborators shared by every handler invocation for one request
/// (`spec.md` §4.6).
#[derive(Clone)]
pub struct Context {
    pub backend: Arc<dyn Frontend>,
    pub runs: Arc<RunManager>,
    pub settings: Arc<dyn Settings>,
    pub service_base: &'static str,
}

/// The per-request handle handlers receive: the shared collaborators plus a
/// slot for a deferred follow-up task (`spec.md` §4.6's "deferred handler",
/// realized per §9 as a task spawned after the response is written rather
/// than an abstract callback).
pub struct Operation {
    pub ctx: Context,
    deferred: parking_lot::Mutex<Vec<Pin<Box<dyn Future<Output = ()> + Send>>>>,
}

impl Operation {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            deferred: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Register a follow-up task to run exactly once after the response is
    /// flushed, regardless of whether the handler succeeded
    /// (`spec.md` §4.6/§5). The future must be `'static` — it cannot borrow
    /// the original request.
    pub fn defer(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.deferred.lock().push(Box::pin(fut));
    }

    pub(crate) fn take_deferred(&self) -> Vec<Pin<Box<dyn Future<Output = ()> + Send>>> {
        std::mem::take(&mut *self.deferred.lock())
    }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response, GatewayError>> + Send>>;

/// A route handler. Implemented automatically for any
/// `Fn(Arc<Operation>, Request) -> impl Future<Output = Result<Response, GatewayError>>`.
pub trait Handler: Send + Sync {
    fn call(&self, op: Arc<Operation>, req: Request) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Arc<Operation>, Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, GatewayError>> + Send + 'static,
{
    fn call(&self, op: Arc<Operation>, req: Request) -> HandlerFuture {
        Box::pin(self(op, req))
    }
}

struct RouteEntry {
    template: Template,
    handlers: BTreeMap<HttpMethod, Arc<dyn Handler>>,
    doc_link: Option<&'static str>,
}

impl RouteEntry {
    /// The method set reported in `Allow`/CORS: every registered method,
    /// plus `HEAD` whenever `GET` is registered (`spec.md` §4.5 step 3).
    fn allowed_methods(&self) -> Vec<HttpMethod> {
        let mut methods: Vec<HttpMethod> = self.handlers.keys().copied().collect();
        if self.handlers.contains_key(&HttpMethod::Get) && !methods.contains(&HttpMethod::Head) {
            methods.push(HttpMethod::Head);
        }
        methods
    }
}

/// The outcome of routing one request, before content negotiation.
pub enum RouteOutcome {
    Matched {
        handler: Arc<dyn Handler>,
        path_params: BTreeMap<String, String>,
        allowed_methods: Vec<HttpMethod>,
        doc_link: Option<&'static str>,
    },
    /// `OPTIONS` short-circuits to a generic handler regardless of whether
    /// the matched route registered one (`spec.md` §4.5 step 4).
    Options {
        allowed_methods: Vec<HttpMethod>,
    },
    Redirect {
        status: HttpStatusCode,
        location: String,
    },
    MethodNotAllowed {
        allowed_methods: Vec<HttpMethod>,
    },
    NotFound,
}

/// The immutable route table, built once at startup (`spec.md` §5: "the
/// router's immutable route table" is the only non-run-registry shared
/// state).
pub struct Router {
    service_base: &'static str,
    routes: Vec<RouteEntry>,
}

pub struct RouterBuilder {
    service_base: &'static str,
    routes: Vec<RouteEntry>,
}

impl RouterBuilder {
    pub fn new(service_base: &'static str) -> Self {
        Self {
            service_base,
            routes: Vec::new(),
        }
    }

    /// Register `handler` for `(method, template)`. Panics on an
    /// un-compilable template — this only ever runs once at startup against
    /// templates the gateway author wrote, so a panic here is a build-time
    /// bug, not a runtime condition.
    pub fn route(
        mut self,
        method: HttpMethod,
        template: &str,
        handler: impl Handler + 'static,
        doc_link: Option<&'static str>,
    ) -> Self {
        let compiled = Template::compile(template).expect("invalid route template");
        if let Some(entry) = self.routes.iter_mut().find(|e| e.template.raw == compiled.raw) {
            entry.handlers.insert(method, Arc::new(handler));
        } else {
            let mut handlers = BTreeMap::new();
            handlers.insert(method, Arc::new(handler) as Arc<dyn Handler>);
            self.routes.push(RouteEntry {
                template: compiled,
                handlers,
                doc_link,
            });
        }
        self
    }

    pub fn build(self) -> Router {
        Router {
            service_base: self.service_base,
            routes: self.routes,
        }
    }
}

fn redirect_status_for(method: HttpMethod) -> HttpStatusCode {
    match method {
        HttpMethod::Get | HttpMethod::Head => HttpStatusCode::MOVED_PERMANENTLY,
        _ => HttpStatusCode::TEMPORARY_REDIRECT,
    }
}

impl Router {
    fn find_entry(&self, relative_path: &str) -> Option<(&RouteEntry, BTreeMap<String, String>)> {
        self.routes.iter().find_map(|e| e.template.matches(relative_path).map(|p| (e, p)))
    }

    fn query_suffix(req: &Request) -> String {
        let qs = req.uri.query_string();
        if qs.is_empty() {
            String::new()
        } else {
            format!("?{qs}")
        }
    }

    /// Route `req`, implementing `spec.md` §4.5's full algorithm: service
    /// base check, trailing-slash redirect, upper-case redirect, method
    /// selection with `HEAD` fallback, and the `OPTIONS` short-circuit.
    pub fn route(&self, req: &Request) -> Result<RouteOutcome, GatewayError> {
        let path = &req.uri.path;
        let base = self.service_base;
        if !(path == base || path.starts_with(&format!("{base}/"))) {
            return Err(GatewayError::internal(format!(
                "request path {path} is outside service base {base}"
            )));
        }
        let relative = &path[base.len()..];

        if relative.len() > 1 && relative.ends_with('/') {
            let canonical = &relative[..relative.len() - 1];
            if self.find_entry(canonical).is_some() {
                let location = format!("{base}{canonical}{}", Self::query_suffix(req));
                return Ok(RouteOutcome::Redirect {
                    status: redirect_status_for(req.method),
                    location,
                });
            }
        }

        let Some((entry, path_params)) = self.find_entry(relative) else {
            tracing::debug!(path = %relative, "no route template matches");
            return Ok(RouteOutcome::NotFound);
        };

        if relative.chars().any(|c| c.is_ascii_uppercase()) {
            let location = format!("{base}{}{}", relative.to_ascii_lowercase(), Self::query_suffix(req));
            return Ok(RouteOutcome::Redirect {
                status: redirect_status_for(req.method),
                location,
            });
        }

        let allowed_methods = entry.allowed_methods();

        if req.method == HttpMethod::Options {
            return Ok(RouteOutcome::Options { allowed_methods });
        }

        if let Some(handler) = entry.handlers.get(&req.method) {
            return Ok(RouteOutcome::Matched {
                handler: handler.clone(),
                path_params,
                allowed_methods,
                doc_link: entry.doc_link,
            });
        }
        if req.method == HttpMethod::Head {
            if let Some(handler) = entry.handlers.get(&HttpMethod::Get) {
                return Ok(RouteOutcome::Matched {
                    handler: handler.clone(),
                    path_params,
                    allowed_methods,
                    doc_link: entry.doc_link,
                });
            }
        }
        tracing::warn!(method = %req.method, path = %relative, ?allowed_methods, "method not allowed for route");
        Ok(RouteOutcome::MethodNotAllowed { allowed_methods })
    }
}

/// Check `Accept`/`Content-Type` against the single supported media type
/// (`spec.md` §4.5's content negotiation rules).
pub fn negotiate_content_type(req: &Request) -> Result<(), GatewayError> {
    if let Some(accept) = req.header("Accept") {
        let acceptable = accept.split(',').any(|part| {
            let media_range = part.split(';').next().unwrap_or("").trim();
            media_range == MEDIA_TYPE || media_range == "*/*" || media_range == "application/*"
        });
        if !acceptable {
            return Err(GatewayError::Http(crate::error::HttpError::new(
                HttpStatusCode::NOT_ACCEPTABLE,
                HttpStatusCode::NOT_ACCEPTABLE.reason_phrase(),
            )));
        }
    }
    let needs_body = matches!(req.method, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch);
    if needs_body {
        let content_type = req.header("Content-Type").map(|s| s.split(';').next().unwrap_or("").trim().to_string());
        if content_type.as_deref() != Some(MEDIA_TYPE) {
            return Err(GatewayError::Http(crate::error::HttpError::new(
                HttpStatusCode::UNSUPPORTED_MEDIA_TYPE,
                HttpStatusCode::UNSUPPORTED_MEDIA_TYPE.reason_phrase(),
            )));
        }
    }
    Ok(())
}
