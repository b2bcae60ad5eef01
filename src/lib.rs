//! REST/JSON:API gateway core for the WDX device-and-parameter service.
//!
//! This crate is the protocol-facing core only: routing, the operation
//! pipeline (CORS, content negotiation, deferred-task drain), the error
//! taxonomy, and the method-run registry. It is driven by a [`backend::Frontend`]
//! implementation supplied by the embedding application, which owns the
//! actual device/parameter/method data and any authentication layer.
//!
//! Diagnostics go through `tracing`; this crate never installs a subscriber
//! itself. An embedding application wires one up the way it wires up any
//! other binary:
//!
//! ```no_run
//! tracing_subscriber::fmt()
//!     .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
//!     .json()
//!     .init();
//! let _router = wda_gateway_core::build_router("/wda");
//! ```

pub mod backend;
pub mod core_status;
pub mod error;
pub mod filters;
mod handlers;
pub mod http;
pub mod path;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod router;
pub mod runs;
pub mod serialize;
pub mod settings;
pub mod uri;

use http::HttpMethod;
use router::RouterBuilder;

/// Build the full `/wda` route table against the handlers in this crate
/// (`spec.md` §6). The embedding application owns the `Context` (backend,
/// run registry, settings) passed to [`pipeline::handle`] per request.
pub fn build_router(service_base: &'static str) -> router::Router {
    RouterBuilder::new(service_base)
        .route(HttpMethod::Get, "/", handlers::get_service_identity, None)
        .route(HttpMethod::Get, "/devices", handlers::list_devices, None)
        .route(HttpMethod::Get, "/devices/:device_id:", handlers::get_device, None)
        .route(
            HttpMethod::Get,
            "/devices/:device_id:/subdevices",
            handlers::get_subdevices_collections,
            None,
        )
        .route(
            HttpMethod::Get,
            "/devices/:device_id:/subdevices/:name:",
            handlers::get_subdevices,
            None,
        )
        .route(
            HttpMethod::Get,
            "/devices/:device_id:/features",
            handlers::list_device_features,
            None,
        )
        .route(
            HttpMethod::Get,
            "/devices/:device_id:/features/:name:",
            handlers::redirect_device_feature,
            None,
        )
        .route(HttpMethod::Get, "/features", handlers::list_features, None)
        .route(HttpMethod::Get, "/features/:feature_id:", handlers::get_feature, None)
        .route(
            HttpMethod::Get,
            "/features/:feature_id:/includedfeatures",
            handlers::list_feature_includes,
            None,
        )
        .route(
            HttpMethod::Get,
            "/features/:feature_id:/containedparameters",
            handlers::list_contained_parameters,
            None,
        )
        .route(
            HttpMethod::Get,
            "/features/:feature_id:/containedmethods",
            handlers::list_contained_methods,
            None,
        )
        .route(HttpMethod::Get, "/parameters", handlers::list_parameters, None)
        .route(HttpMethod::Patch, "/parameters", handlers::patch_parameters, None)
        .route(HttpMethod::Get, "/parameters/:id:", handlers::get_parameter, None)
        .route(HttpMethod::Patch, "/parameters/:id:", handlers::patch_parameter, None)
        .route(
            HttpMethod::Get,
            "/parameters/:id:/referencedinstances",
            handlers::list_referenced_instances,
            None,
        )
        .route(
            HttpMethod::Get,
            "/parameters/:id:/instances",
            handlers::list_parameter_instances,
            None,
        )
        .route(
            HttpMethod::Get,
            "/parameters/:id:/instances/:no:",
            handlers::get_parameter_instance,
            None,
        )
        .route(
            HttpMethod::Get,
            "/parameter-definitions",
            handlers::list_parameter_definitions,
            None,
        )
        .route(
            HttpMethod::Get,
            "/parameter-definitions/:id:",
            handlers::get_parameter_definition,
            None,
        )
        .route(
            HttpMethod::Get,
            "/parameter-definitions/:id:/enum",
            handlers::redirect_parameter_definition_enum,
            None,
        )
        .route(HttpMethod::Get, "/methods", handlers::list_methods, None)
        .route(HttpMethod::Get, "/methods/:id:", handlers::get_method, None)
        .route(HttpMethod::Post, "/methods/:id:/runs", handlers::post_method_run, None)
        .route(HttpMethod::Get, "/methods/:id:/runs", handlers::list_method_runs, None)
        .route(
            HttpMethod::Get,
            "/methods/:id:/runs/:run_id:",
            handlers::get_method_run,
            None,
        )
        .route(
            HttpMethod::Delete,
            "/methods/:id:/runs/:run_id:",
            handlers::delete_method_run,
            None,
        )
        .route(
            HttpMethod::Get,
            "/method-definitions",
            handlers::list_method_definitions,
            None,
        )
        .route(
            HttpMethod::Get,
            "/method-definitions/:id:",
            handlers::get_method_definition,
            None,
        )
        .route(HttpMethod::Get, "/monitoring-lists", handlers::list_monitoring_lists, None)
        .route(HttpMethod::Post, "/monitoring-lists", handlers::create_monitoring_list, None)
        .route(HttpMethod::Get, "/monitoring-lists/:id:", handlers::get_monitoring_list, None)
        .route(
            HttpMethod::Delete,
            "/monitoring-lists/:id:",
            handlers::delete_monitoring_list,
            None,
        )
        .route(
            HttpMethod::Get,
            "/monitoring-lists/:id:/parameters",
            handlers::list_monitoring_list_parameters,
            None,
        )
        .route(HttpMethod::Get, "/enum-definitions", handlers::list_enum_definitions, None)
        .route(
            HttpMethod::Get,
            "/enum-definitions/:name:",
            handlers::get_enum_definition,
            None,
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use request::Request;
    use router::RouteOutcome;
    use uri::Uri;

    #[test]
    fn every_documented_route_matches_something() {
        let router = build_router("/wda");
        let probes: &[(HttpMethod, &str)] = &[
            (HttpMethod::Get, "/wda/"),
            (HttpMethod::Get, "/wda/devices"),
            (HttpMethod::Get, "/wda/devices/1-1"),
            (HttpMethod::Get, "/wda/devices/1-1/subdevices"),
            (HttpMethod::Get, "/wda/devices/1-1/subdevices/kbus"),
            (HttpMethod::Get, "/wda/devices/1-1/features"),
            (HttpMethod::Get, "/wda/devices/1-1/features/foo"),
            (HttpMethod::Get, "/wda/features"),
            (HttpMethod::Get, "/wda/features/1-1-foo"),
            (HttpMethod::Get, "/wda/features/1-1-foo/includedfeatures"),
            (HttpMethod::Get, "/wda/features/1-1-foo/containedparameters"),
            (HttpMethod::Get, "/wda/features/1-1-foo/containedmethods"),
            (HttpMethod::Get, "/wda/parameters"),
            (HttpMethod::Patch, "/wda/parameters"),
            (HttpMethod::Get, "/wda/parameters/1-1-a"),
            (HttpMethod::Patch, "/wda/parameters/1-1-a"),
            (HttpMethod::Get, "/wda/parameters/1-1-a/referencedinstances"),
            (HttpMethod::Get, "/wda/parameters/1-1-a/instances"),
            (HttpMethod::Get, "/wda/parameters/1-1-a/instances/0"),
            (HttpMethod::Get, "/wda/parameter-definitions"),
            (HttpMethod::Get, "/wda/parameter-definitions/1-1-a"),
            (HttpMethod::Get, "/wda/parameter-definitions/1-1-a/enum"),
            (HttpMethod::Get, "/wda/methods"),
            (HttpMethod::Get, "/wda/methods/1-1-m"),
            (HttpMethod::Post, "/wda/methods/1-1-m/runs"),
            (HttpMethod::Get, "/wda/methods/1-1-m/runs"),
            (HttpMethod::Get, "/wda/methods/1-1-m/runs/abc"),
            (HttpMethod::Delete, "/wda/methods/1-1-m/runs/abc"),
            (HttpMethod::Get, "/wda/method-definitions"),
            (HttpMethod::Get, "/wda/method-definitions/1-1-m"),
            (HttpMethod::Get, "/wda/monitoring-lists"),
            (HttpMethod::Post, "/wda/monitoring-lists"),
            (HttpMethod::Get, "/wda/monitoring-lists/1"),
            (HttpMethod::Delete, "/wda/monitoring-lists/1"),
            (HttpMethod::Get, "/wda/monitoring-lists/1/parameters"),
            (HttpMethod::Get, "/wda/enum-definitions"),
            (HttpMethod::Get, "/wda/enum-definitions/colors"),
        ];
        for (method, path) in probes {
            let req = Request::new(*method, Uri::parse(path));
            let outcome = router.route(&req).unwrap_or_else(|e| panic!("{path} errored: {e}"));
            assert!(matches!(outcome, RouteOutcome::Matched { .. }), "{method} {path} did not match");
        }
    }

    #[test]
    fn unknown_path_is_not_found() {
        let router = build_router("/wda");
        let req = Request::new(HttpMethod::Get, Uri::parse("/wda/nope"));
        assert!(matches!(router.route(&req).unwrap(), RouteOutcome::NotFound));
    }
}
