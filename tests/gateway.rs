//! End-to-end coverage: a full request driven through `build_router` +
//! `pipeline::handle` against a fake `Frontend`, exercising `spec.md` §8's
//! concrete scenarios and a handful of its testable properties that only
//! show up once routing, content negotiation, and serialization compose.

use async_trait::async_trait;
use std::sync::Mutex;
use wda_gateway_core::backend::{
    BackendResponse, DeviceData, EnumDefinitionData, FeatureData, Frontend, MethodDefinitionData,
    MethodInvocationResult, MonitoringListData, PagedPayload, ParameterData, ParameterDefinitionData,
    SetParameterOutcome,
};
use wda_gateway_core::core_status::CoreStatus;
use wda_gateway_core::filters::ParameterFilter;
use wda_gateway_core::http::{HttpMethod, HttpStatusCode};
use wda_gateway_core::path::{DeviceId, ParameterInstancePath};
use wda_gateway_core::pipeline::handle;
use wda_gateway_core::request::Request;
use wda_gateway_core::router::Context;
use wda_gateway_core::runs::RunManager;
use wda_gateway_core::serialize::{MethodInvocationInArgs, ParameterValue, ValuePathRequest};
use wda_gateway_core::settings::{InMemorySettings, Settings, RUN_RESULT_TIMEOUT};
use wda_gateway_core::uri::Uri;

/// A fake backend fixture covering just the operations exercised below.
/// Every other `Frontend` method is unreachable from these tests and panics
/// if one ever is (a signal to extend the fixture, not a hidden bug).
struct FakeFrontend {
    devices: Vec<DeviceData>,
    parameters: Vec<ParameterData>,
    monitoring_lists: Mutex<Vec<MonitoringListData>>,
    next_list_id: Mutex<u64>,
}

impl FakeFrontend {
    fn new() -> Self {
        Self {
            devices: Vec::new(),
            parameters: Vec::new(),
            monitoring_lists: Mutex::new(Vec::new()),
            next_list_id: Mutex::new(1),
        }
    }

    fn with_devices(mut self, devices: Vec<DeviceData>) -> Self {
        self.devices = devices;
        self
    }

    fn with_parameters(mut self, parameters: Vec<ParameterData>) -> Self {
        self.parameters = parameters;
        self
    }
}

#[async_trait]
impl Frontend for FakeFrontend {
    async fn get_all_devices(&self) -> BackendResponse<Vec<DeviceData>> {
        BackendResponse::success(self.devices.clone())
    }

    async fn get_device(&self, id: DeviceId) -> BackendResponse<DeviceData> {
        match self.devices.iter().find(|d| d.id == id) {
            Some(d) => BackendResponse::success(d.clone()),
            None => BackendResponse::error(CoreStatus::UnknownDevice),
        }
    }

    async fn get_subdevices_by_collection_name(&self, _device: DeviceId, _collection_name: &str) -> BackendResponse<Vec<DeviceData>> {
        unimplemented!("not exercised by these tests")
    }

    async fn get_features(&self, _devices: Vec<DeviceId>) -> BackendResponse<Vec<FeatureData>> {
        unimplemented!("not exercised by these tests")
    }

    async fn get_features_of_all_devices(&self) -> BackendResponse<Vec<FeatureData>> {
        unimplemented!("not exercised by these tests")
    }

    async fn get_feature_definition(&self, _device: DeviceId, _feature_name: &str) -> BackendResponse<FeatureData> {
        unimplemented!("not exercised by these tests")
    }

    async fn get_parameters_by_path(&self, paths: Vec<ParameterInstancePath>) -> BackendResponse<Vec<ParameterData>> {
        let data = paths
            .into_iter()
            .map(|p| {
                self.parameters.iter().find(|d| d.path == p).cloned().unwrap_or_else(|| ParameterData {
                    path: p,
                    value: ParameterValue::new(serde_json::Value::Null, "Unknown", 0),
                    writeable: false,
                    beta: false,
                    deprecated: false,
                    user_setting: false,
                })
            })
            .collect();
        BackendResponse::success(data)
    }

    async fn get_parameter_definitions_by_path(&self, _paths: Vec<ParameterInstancePath>) -> BackendResponse<Vec<ParameterDefinitionData>> {
        unimplemented!("not exercised by these tests")
    }

    async fn get_all_parameters(&self, _filter: ParameterFilter, offset: u64, limit: u64) -> BackendResponse<PagedPayload<ParameterData>> {
        let total = self.parameters.len() as u64;
        let start = offset.min(total) as usize;
        let end = (offset + limit).min(total) as usize;
        BackendResponse::success(PagedPayload {
            items: self.parameters[start..end].to_vec(),
            total,
        })
    }

    async fn get_all_parameter_definitions(&self, _filter: ParameterFilter, _offset: u64, _limit: u64) -> BackendResponse<PagedPayload<ParameterDefinitionData>> {
        unimplemented!("not exercised by these tests")
    }

    async fn get_all_method_definitions(&self, _filter: ParameterFilter, _offset: u64, _limit: u64) -> BackendResponse<PagedPayload<MethodDefinitionData>> {
        unimplemented!("not exercised by these tests")
    }

    async fn set_parameter_values_by_path_connection_aware(&self, _requests: Vec<ValuePathRequest>, _treat_deferred_as_error: bool) -> BackendResponse<Vec<SetParameterOutcome>> {
        unimplemented!("not exercised by these tests")
    }

    async fn set_parameter_values_by_path(&self, _requests: Vec<ValuePathRequest>) -> BackendResponse<Vec<SetParameterOutcome>> {
        unimplemented!("not exercised by these tests")
    }

    async fn invoke_method_by_path(&self, _path: ParameterInstancePath, _in_args: MethodInvocationInArgs) -> BackendResponse<MethodInvocationResult> {
        BackendResponse::success(MethodInvocationResult {
            execution_status: wda_gateway_core::backend::ExecutionStatus::Done,
            out_args: Default::default(),
        })
    }

    async fn create_monitoring_list_with_paths(&self, paths: Vec<ParameterInstancePath>, timeout: u16) -> BackendResponse<MonitoringListData> {
        let mut next_id = self.next_list_id.lock().unwrap();
        let id = *next_id;
        *next_id += 1;
        let data = MonitoringListData {
            id,
            timeout,
            parameter_paths: paths,
        };
        self.monitoring_lists.lock().unwrap().push(data.clone());
        BackendResponse::success(data)
    }

    async fn get_monitoring_list(&self, id: u64) -> BackendResponse<MonitoringListData> {
        match self.monitoring_lists.lock().unwrap().iter().find(|l| l.id == id) {
            Some(l) => BackendResponse::success(l.clone()),
            None => BackendResponse::error(CoreStatus::UnknownMonitoringList),
        }
    }

    async fn get_all_monitoring_lists(&self) -> BackendResponse<Vec<MonitoringListData>> {
        BackendResponse::success(self.monitoring_lists.lock().unwrap().clone())
    }

    async fn delete_monitoring_list(&self, _id: u64) -> BackendResponse<()> {
        unimplemented!("not exercised by these tests")
    }

    async fn get_values_for_monitoring_list(&self, _id: u64) -> BackendResponse<Vec<ParameterData>> {
        unimplemented!("not exercised by these tests")
    }

    async fn get_enum_definition(&self, _name: &str) -> BackendResponse<EnumDefinitionData> {
        unimplemented!("not exercised by these tests")
    }

    async fn get_all_enum_definitions(&self) -> BackendResponse<Vec<EnumDefinitionData>> {
        unimplemented!("not exercised by these tests")
    }

    async fn get_method_definition_by_path(&self, _path: ParameterInstancePath) -> BackendResponse<MethodDefinitionData> {
        unimplemented!("not exercised by these tests")
    }
}

fn ctx(backend: FakeFrontend, settings: InMemorySettings) -> Context {
    Context {
        backend: std::sync::Arc::new(backend),
        runs: std::sync::Arc::new(RunManager::new(1000)),
        settings: std::sync::Arc::new(settings) as std::sync::Arc<dyn Settings>,
        service_base: "/wda",
    }
}

fn get(path: &str) -> Request {
    Request::new(HttpMethod::Get, Uri::parse(path))
}

fn json_body(method: HttpMethod, path: &str, body: serde_json::Value) -> Request {
    Request::new(method, Uri::parse(path))
        .with_header("Content-Type", "application/vnd.api+json")
        .with_body(serde_json::to_vec(&body).unwrap())
}

fn body_json(content: &[u8]) -> serde_json::Value {
    serde_json::from_slice(content).unwrap()
}

#[tokio::test]
async fn scenario_a_list_devices() {
    let backend = FakeFrontend::new().with_devices(vec![
        DeviceData {
            id: DeviceId::new(1, 1),
            order_number: "123".to_string(),
            firmware_version: "0.1.0".to_string(),
        },
        DeviceData {
            id: DeviceId::new(2, 1),
            order_number: "456".to_string(),
            firmware_version: "2.0.18".to_string(),
        },
    ]);
    let router = wda_gateway_core::build_router("/wda");
    let resp = handle(&router, ctx(backend, InMemorySettings::new()), get("/wda/devices")).await;

    assert_eq!(resp.status, HttpStatusCode::OK);
    let body = body_json(resp.content());
    assert_eq!(body["data"][0]["id"], "1-1");
    assert_eq!(body["data"][1]["attributes"]["orderNumber"], "456");
    assert_eq!(body["links"]["self"], "/wda/devices?page[limit]=255&page[offset]=0");
}

#[tokio::test]
async fn scenario_b_unknown_device_maps_to_404() {
    let backend = FakeFrontend::new();
    let router = wda_gateway_core::build_router("/wda");
    let resp = handle(&router, ctx(backend, InMemorySettings::new()), get("/wda/devices/3-3")).await;

    assert_eq!(resp.status, HttpStatusCode::NOT_FOUND);
    let body = body_json(resp.content());
    assert_eq!(body["errors"][0]["status"], "404");
    assert_eq!(body["errors"][0]["code"], "UNKNOWN_DEVICE");
}

#[tokio::test]
async fn scenario_c_create_monitoring_list() {
    let backend = FakeFrontend::new();
    let router = wda_gateway_core::build_router("/wda");
    let req = json_body(
        HttpMethod::Post,
        "/wda/monitoring-lists",
        serde_json::json!({
            "data": {
                "type": "monitoring-lists",
                "attributes": { "timeout": 5 },
                "relationships": {
                    "parameters": {
                        "data": [
                            {"id": "0-0-a", "type": "parameters"},
                            {"id": "0-0-b", "type": "parameters"},
                        ]
                    }
                }
            }
        }),
    );
    let resp = handle(&router, ctx(backend, InMemorySettings::new()), req).await;

    assert_eq!(resp.status, HttpStatusCode::CREATED);
    assert_eq!(resp.header("Location"), Some("/wda/monitoring-lists/1"));
    let body = body_json(resp.content());
    assert_eq!(body["data"]["id"], "1");
    assert_eq!(body["data"]["attributes"]["timeout"], 5);
}

#[tokio::test]
async fn scenario_d_method_run_async_responds_in_progress() {
    let backend = FakeFrontend::new();
    let router = wda_gateway_core::build_router("/wda");
    let settings = InMemorySettings::new().with(RUN_RESULT_TIMEOUT, "60");
    let req = json_body(
        HttpMethod::Post,
        "/wda/methods/0-0-m/runs?result-behavior=async",
        serde_json::json!({"data": {"type": "runs", "attributes": {"inArgs": {}}}}),
    );
    let resp = handle(&router, ctx(backend, settings), req).await;

    assert_eq!(resp.status, HttpStatusCode::CREATED);
    assert!(resp.header("Location").is_some());
    let body = body_json(resp.content());
    assert_eq!(body["data"]["attributes"]["executionStatus"], "progress");
}

#[tokio::test]
async fn property_7_sync_behavior_waits_for_completion() {
    let backend = FakeFrontend::new();
    let router = wda_gateway_core::build_router("/wda");
    let settings = InMemorySettings::new().with(RUN_RESULT_TIMEOUT, "60");
    let req = json_body(
        HttpMethod::Post,
        "/wda/methods/0-0-m/runs?result-behavior=sync",
        serde_json::json!({"data": {"type": "runs", "attributes": {"inArgs": {}}}}),
    );
    let resp = handle(&router, ctx(backend, settings), req).await;

    assert_eq!(resp.status, HttpStatusCode::CREATED);
    let body = body_json(resp.content());
    assert_eq!(body["data"]["attributes"]["executionStatus"], "done");
}

#[tokio::test]
async fn property_7_auto_behavior_is_synchronous_when_backend_completes_quickly() {
    let backend = FakeFrontend::new();
    let router = wda_gateway_core::build_router("/wda");
    let settings = InMemorySettings::new().with(RUN_RESULT_TIMEOUT, "60");
    let req = json_body(
        HttpMethod::Post,
        "/wda/methods/0-0-m/runs",
        serde_json::json!({"data": {"type": "runs", "attributes": {"inArgs": {}}}}),
    );
    let resp = handle(&router, ctx(backend, settings), req).await;

    assert_eq!(resp.status, HttpStatusCode::CREATED);
    let body = body_json(resp.content());
    assert_eq!(body["data"]["attributes"]["executionStatus"], "done");
}

#[tokio::test]
async fn method_run_with_zero_timeout_never_touches_the_run_registry() {
    let backend = FakeFrontend::new();
    let router = wda_gateway_core::build_router("/wda");
    let req = json_body(
        HttpMethod::Post,
        "/wda/methods/0-0-m/runs",
        serde_json::json!({"data": {"type": "runs", "attributes": {"inArgs": {}}}}),
    );
    let resp = handle(&router, ctx(backend, InMemorySettings::new()), req).await;

    assert_eq!(resp.status, HttpStatusCode::OK);
    assert!(resp.header("Location").is_none());
    let body = body_json(resp.content());
    assert_eq!(body["data"]["type"], "methods");
    assert_eq!(body["data"]["attributes"]["executionStatus"], "done");
}

#[tokio::test]
async fn scenario_f_trailing_slash_redirects() {
    let backend = FakeFrontend::new();
    let router = wda_gateway_core::build_router("/wda");
    let resp = handle(&router, ctx(backend, InMemorySettings::new()), get("/wda/devices/")).await;

    assert_eq!(resp.status, HttpStatusCode::MOVED_PERMANENTLY);
    assert_eq!(resp.header("Location"), Some("/wda/devices"));
}

#[tokio::test]
async fn property_1_unregistered_method_is_405_with_allow_header() {
    let backend = FakeFrontend::new();
    let router = wda_gateway_core::build_router("/wda");
    let req = Request::new(HttpMethod::Post, Uri::parse("/wda/devices"));
    let resp = handle(&router, ctx(backend, InMemorySettings::new()), req).await;

    assert_eq!(resp.status, HttpStatusCode::METHOD_NOT_ALLOWED);
    let allow = resp.header("Allow").unwrap();
    assert!(allow.contains("GET"));
    assert!(allow.contains("HEAD"));
}

fn parameter(path: &str, n: i64) -> ParameterData {
    ParameterData {
        path: ParameterInstancePath::new(DeviceId::HEADSTATION, path.to_string()),
        value: ParameterValue::new(serde_json::json!(n), "Int32", 0),
        writeable: true,
        beta: false,
        deprecated: false,
        user_setting: false,
    }
}

#[tokio::test]
async fn property_3_pagination_links_are_consistent_across_a_full_page_walk() {
    let params: Vec<ParameterData> = (0..10).map(|i| parameter(&format!("p{i}"), i)).collect();
    let backend = FakeFrontend::new().with_parameters(params);
    let router = wda_gateway_core::build_router("/wda");
    let resp = handle(&router, ctx(backend, InMemorySettings::new()), get("/wda/parameters?page[limit]=4&page[offset]=4")).await;

    assert_eq!(resp.status, HttpStatusCode::OK);
    let body = body_json(resp.content());
    let links = &body["links"];
    assert_eq!(links["first"], "/wda/parameters?page[limit]=4&page[offset]=0");
    assert_eq!(links["self"], "/wda/parameters?page[limit]=4&page[offset]=4");
    assert_eq!(links["prev"], "/wda/parameters?page[limit]=4&page[offset]=0");
    assert_eq!(links["next"], "/wda/parameters?page[limit]=4&page[offset]=8");
    assert_eq!(body["data"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn options_request_short_circuits_with_no_content() {
    let backend = FakeFrontend::new();
    let router = wda_gateway_core::build_router("/wda");
    let req = Request::new(HttpMethod::Options, Uri::parse("/wda/devices"));
    let resp = handle(&router, ctx(backend, InMemorySettings::new()), req).await;

    assert_eq!(resp.status, HttpStatusCode::NO_CONTENT);
    assert!(!resp.has_content());
}

#[tokio::test]
async fn unsupported_accept_header_is_rejected() {
    let backend = FakeFrontend::new();
    let router = wda_gateway_core::build_router("/wda");
    let req = get("/wda/devices").with_header("Accept", "text/html");
    let resp = handle(&router, ctx(backend, InMemorySettings::new()), req).await;

    assert_eq!(resp.status, HttpStatusCode::NOT_ACCEPTABLE);
}

#[tokio::test]
async fn unmatched_route_is_404_even_with_an_unacceptable_accept_header() {
    let backend = FakeFrontend::new();
    let router = wda_gateway_core::build_router("/wda");
    let req = get("/wda/does-not-exist").with_header("Accept", "text/html");
    let resp = handle(&router, ctx(backend, InMemorySettings::new()), req).await;

    assert_eq!(resp.status, HttpStatusCode::NOT_FOUND);
}

#[tokio::test]
async fn options_short_circuits_even_with_an_unacceptable_accept_header() {
    let backend = FakeFrontend::new();
    let router = wda_gateway_core::build_router("/wda");
    let req = Request::new(HttpMethod::Options, Uri::parse("/wda/devices")).with_header("Accept", "text/html");
    let resp = handle(&router, ctx(backend, InMemorySettings::new()), req).await;

    assert_eq!(resp.status, HttpStatusCode::NO_CONTENT);
}

#[tokio::test]
async fn head_request_carries_gets_headers_with_no_body() {
    let backend = FakeFrontend::new().with_devices(vec![DeviceData {
        id: DeviceId::HEADSTATION,
        order_number: "750-8XXX".to_string(),
        firmware_version: "1.0.0".to_string(),
    }]);
    let router = wda_gateway_core::build_router("/wda");
    let req = Request::new(HttpMethod::Head, Uri::parse("/wda/devices"));
    let resp = handle(&router, ctx(backend, InMemorySettings::new()), req).await;

    assert_eq!(resp.status, HttpStatusCode::OK);
    assert!(!resp.has_content());
    assert!(resp.header("Content-Length").is_some());
}

fn class_parameter(path: &str, instance_ids: Vec<i64>) -> ParameterData {
    ParameterData {
        path: ParameterInstancePath::parse(path).unwrap(),
        value: ParameterValue::new(serde_json::json!(instance_ids), "Instantiations", 1),
        writeable: false,
        beta: false,
        deprecated: false,
        user_setting: false,
    }
}

fn simple_parameter(path: &str, value: serde_json::Value) -> ParameterData {
    ParameterData {
        path: ParameterInstancePath::parse(path).unwrap(),
        value: ParameterValue::new(value, "Int32", 0),
        writeable: true,
        beta: false,
        deprecated: false,
        user_setting: false,
    }
}

fn ref_parameter(path: &str, targets: Vec<&str>) -> ParameterData {
    let (value, rank) = match targets.as_slice() {
        [single] => (serde_json::json!(single), 0),
        many => (serde_json::json!(many), 1),
    };
    ParameterData {
        path: ParameterInstancePath::parse(path).unwrap(),
        value: ParameterValue::new(value, "InstanceIdentityRef", rank),
        writeable: false,
        beta: false,
        deprecated: false,
        user_setting: false,
    }
}

#[tokio::test]
async fn class_instances_lists_instantiations_from_the_class_parameter() {
    let backend = FakeFrontend::new().with_parameters(vec![class_parameter("0-0-myclass", vec![0, 1])]);
    let router = wda_gateway_core::build_router("/wda");
    let req = get("/wda/parameters/0-0-myclass/instances");
    let resp = handle(&router, ctx(backend, InMemorySettings::new()), req).await;

    assert_eq!(resp.status, HttpStatusCode::OK);
    let body = body_json(resp.content());
    let ids: Vec<_> = body["data"].as_array().unwrap().iter().map(|d| d["id"].as_str().unwrap().to_string()).collect();
    assert_eq!(ids, vec!["0-0-myclass-0".to_string(), "0-0-myclass-1".to_string()]);
}

#[tokio::test]
async fn class_instances_on_non_instantiations_parameter_is_404() {
    let backend = FakeFrontend::new().with_parameters(vec![simple_parameter("0-0-a", serde_json::json!(1))]);
    let router = wda_gateway_core::build_router("/wda");
    let req = get("/wda/parameters/0-0-a/instances");
    let resp = handle(&router, ctx(backend, InMemorySettings::new()), req).await;

    assert_eq!(resp.status, HttpStatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_single_class_instance_by_number() {
    let backend = FakeFrontend::new().with_parameters(vec![
        class_parameter("0-0-myclass", vec![0, 1]),
        simple_parameter("0-0-myclass/0", serde_json::json!(42)),
    ]);
    let router = wda_gateway_core::build_router("/wda");
    let req = get("/wda/parameters/0-0-myclass/instances/0");
    let resp = handle(&router, ctx(backend, InMemorySettings::new()), req).await;

    assert_eq!(resp.status, HttpStatusCode::OK);
    let body = body_json(resp.content());
    assert_eq!(body["data"]["id"], "0-0-myclass-0");
}

#[tokio::test]
async fn get_single_class_instance_unknown_number_is_404() {
    let backend = FakeFrontend::new().with_parameters(vec![class_parameter("0-0-myclass", vec![0])]);
    let router = wda_gateway_core::build_router("/wda");
    let req = get("/wda/parameters/0-0-myclass/instances/5");
    let resp = handle(&router, ctx(backend, InMemorySettings::new()), req).await;

    assert_eq!(resp.status, HttpStatusCode::NOT_FOUND);
}

#[tokio::test]
async fn referenced_instances_drops_refs_no_longer_in_the_class() {
    let backend = FakeFrontend::new().with_parameters(vec![
        class_parameter("0-0-myclass", vec![0]),
        ref_parameter("0-0-ref", vec!["myclass/0", "myclass/2"]),
    ]);
    let router = wda_gateway_core::build_router("/wda");
    let req = get("/wda/parameters/0-0-ref/referencedinstances");
    let resp = handle(&router, ctx(backend, InMemorySettings::new()), req).await;

    assert_eq!(resp.status, HttpStatusCode::OK);
    let body = body_json(resp.content());
    let ids: Vec<_> = body["data"].as_array().unwrap().iter().map(|d| d["id"].as_str().unwrap().to_string()).collect();
    assert_eq!(ids, vec!["0-0-myclass-0".to_string()]);
}

#[tokio::test]
async fn referenced_instances_on_non_ref_parameter_is_404() {
    let backend = FakeFrontend::new().with_parameters(vec![simple_parameter("0-0-a", serde_json::json!(1))]);
    let router = wda_gateway_core::build_router("/wda");
    let req = get("/wda/parameters/0-0-a/referencedinstances");
    let resp = handle(&router, ctx(backend, InMemorySettings::new()), req).await;

    assert_eq!(resp.status, HttpStatusCode::NOT_FOUND);
}
