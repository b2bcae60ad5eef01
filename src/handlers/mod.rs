//! Per-route handlers (`spec.md` §6), grouped by resource family. Each
//! handler has the shape `async fn(Arc<Operation>, Request) -> Result<Response, GatewayError>`
//! required by [`crate::router::Handler`]'s blanket impl.

mod devices;
mod enum_definitions;
mod features;
mod method_definitions;
mod methods;
mod monitoring_lists;
mod parameter_definitions;
mod parameters;
mod runs;
mod service;

pub use devices::{get_device, get_subdevices, get_subdevices_collections, list_device_features, list_devices, redirect_device_feature};
pub use enum_definitions::{get_enum_definition, list_enum_definitions};
pub use features::{get_feature, list_contained_methods, list_contained_parameters, list_feature_includes, list_features};
pub use method_definitions::{get_method_definition, list_method_definitions};
pub use methods::{get_method, list_methods};
pub use monitoring_lists::{create_monitoring_list, delete_monitoring_list, get_monitoring_list, list_monitoring_list_parameters, list_monitoring_lists};
pub use parameter_definitions::{get_parameter_definition, list_parameter_definitions, redirect_parameter_definition_enum};
pub use parameters::{
    get_parameter, get_parameter_instance, list_parameter_instances, list_referenced_instances, patch_parameter, patch_parameters, list_parameters,
};
pub use runs::{delete_method_run, get_method_run, list_method_runs, post_method_run};
pub use service::get_service_identity;

use crate::backend::{MethodDefinitionData, ParameterData, ParameterDefinitionData};
use crate::error::GatewayError;
use crate::path::ParameterInstancePath;
use crate::request::Request;
use crate::serialize::{ParameterValue, RelatedResource, Resource};
use serde::Serialize;

/// Fetch a required path parameter. Missing params indicate a route
/// registered with a template that doesn't match its handler, a build-time
/// bug rather than a client error.
pub(crate) fn path_param<'a>(req: &'a Request, name: &str) -> Result<&'a str, GatewayError> {
    req.path_param(name)
        .ok_or_else(|| GatewayError::internal(format!("route handler expected path param \"{name}\"")))
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ParameterAttributes {
    pub value: ParameterValue,
    pub writeable: bool,
    pub beta: bool,
    pub deprecated: bool,
    #[serde(rename = "userSetting")]
    pub user_setting: bool,
}

impl From<ParameterData> for ParameterAttributes {
    fn from(d: ParameterData) -> Self {
        Self {
            value: d.value,
            writeable: d.writeable,
            beta: d.beta,
            deprecated: d.deprecated,
            user_setting: d.user_setting,
        }
    }
}

pub(crate) fn parameter_resource(base: &str, d: ParameterData) -> Resource<ParameterAttributes> {
    let id = d.path.to_id_string();
    let resource = Resource::new("parameters", id.clone(), ParameterAttributes::from(d));
    resource.with_link("self", format!("{base}/parameters/{id}"))
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ParameterDefinitionAttributes {
    #[serde(rename = "dataType")]
    pub data_type: String,
    #[serde(rename = "dataRank")]
    pub data_rank: u32,
    pub writeable: bool,
    pub beta: bool,
    pub deprecated: bool,
    #[serde(rename = "userSetting")]
    pub user_setting: bool,
}

impl From<&ParameterDefinitionData> for ParameterDefinitionAttributes {
    fn from(d: &ParameterDefinitionData) -> Self {
        Self {
            data_type: d.data_type.clone(),
            data_rank: d.data_rank,
            writeable: d.writeable,
            beta: d.beta,
            deprecated: d.deprecated,
            user_setting: d.user_setting,
        }
    }
}

pub(crate) fn parameter_definition_resource(base: &str, d: ParameterDefinitionData) -> Resource<ParameterDefinitionAttributes> {
    let id = d.path.to_id_string();
    let attrs = ParameterDefinitionAttributes::from(&d);
    let mut resource = Resource::new("parameter-definitions", id.clone(), attrs).with_link("self", format!("{base}/parameter-definitions/{id}"));
    if d.enum_name.is_some() {
        resource = resource.with_link("enum", format!("{base}/parameter-definitions/{id}/enum"));
    }
    resource
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct MethodDefinitionAttributes {
    pub name: String,
}

pub(crate) fn method_definition_resource(base: &str, resource_type: &str, d: MethodDefinitionData) -> Resource<MethodDefinitionAttributes> {
    let id = d.path.to_id_string();
    Resource::new(resource_type.to_string(), id.clone(), MethodDefinitionAttributes { name: d.name })
        .with_link("self", format!("{base}/{resource_type}/{id}"))
}

/// A bare `{type, id}` reference list, used for relationship-only endpoints
/// that have no fuller resource of their own to fetch
/// (`spec.md` §6's `includedfeatures`/`containedmethods`).
pub(crate) fn related_refs(resource_type: &str, paths: &[ParameterInstancePath]) -> Vec<RelatedResource> {
    paths.iter().map(|p| RelatedResource::new(resource_type, p.to_id_string())).collect()
}
