//! The backend **frontend** collaborator (`spec.md` §4.8): a narrow async
//! facade over the device/parameter service. The core only ever talks to
//! this trait; a concrete implementation (out of scope here, see `spec.md`
//! §1) lives on the other side of it.

use crate::core_status::CoreStatus;
use crate::error::{CoreError, GatewayError};
use crate::filters::ParameterFilter;
use crate::path::{DeviceId, ParameterInstancePath};
use crate::serialize::{MethodInvocationInArgs, ParameterValue, ValuePathRequest};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Every backend call resolves to one of these: a status, an optional
/// backend-specific code, and an optional typed payload (`spec.md` §4.8).
#[derive(Debug, Clone)]
pub struct BackendResponse<T> {
    pub status: CoreStatus,
    pub domain_specific_status_code: Option<i64>,
    pub payload: Option<T>,
}

impl<T> BackendResponse<T> {
    pub fn success(payload: T) -> Self {
        Self {
            status: CoreStatus::Success,
            domain_specific_status_code: None,
            payload: Some(payload),
        }
    }

    pub fn error(status: CoreStatus) -> Self {
        debug_assert!(!status.is_success(), "error response constructed with a success status");
        Self {
            status,
            domain_specific_status_code: None,
            payload: None,
        }
    }

    pub fn with_domain_status_code(mut self, code: i64) -> Self {
        self.domain_specific_status_code = Some(code);
        self
    }

    pub fn has_error(&self) -> bool {
        !self.status.is_success()
    }

    /// Resolve to the typed payload or the equivalent [`GatewayError`]
    /// (`spec.md` §4.3's `CoreException` path).
    pub fn into_result(self) -> Result<T, GatewayError> {
        match (self.status.is_success(), self.payload) {
            (true, Some(payload)) => Ok(payload),
            (true, None) => Err(GatewayError::internal("backend reported success with no payload")),
            (false, _) => Err(GatewayError::Core(CoreError::new(
                self.status,
                self.domain_specific_status_code.unwrap_or(0),
            ))),
        }
    }
}

/// A page of results plus the total element count needed for pagination
/// links (`spec.md` §4.4's `page_element_max`).
#[derive(Debug, Clone)]
pub struct PagedPayload<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[derive(Debug, Clone)]
pub struct DeviceData {
    pub id: DeviceId,
    pub order_number: String,
    pub firmware_version: String,
}

#[derive(Debug, Clone)]
pub struct FeatureData {
    pub device: DeviceId,
    pub name: String,
    pub included_features: Vec<String>,
    pub contained_parameters: Vec<ParameterInstancePath>,
    pub contained_methods: Vec<ParameterInstancePath>,
}

impl FeatureData {
    /// The canonical feature id, `"{device}-{name}"` (`spec.md` §6's
    /// `/devices/{id}/features/{name}` redirect target).
    pub fn id(&self) -> String {
        format!("{}-{}", self.device, self.name)
    }
}

#[derive(Debug, Clone)]
pub struct ParameterData {
    pub path: ParameterInstancePath,
    pub value: ParameterValue,
    pub writeable: bool,
    pub beta: bool,
    pub deprecated: bool,
    pub user_setting: bool,
}

#[derive(Debug, Clone)]
pub struct ParameterDefinitionData {
    pub path: ParameterInstancePath,
    pub data_type: String,
    pub data_rank: u32,
    pub writeable: bool,
    pub beta: bool,
    pub deprecated: bool,
    pub user_setting: bool,
    pub enum_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MethodDefinitionData {
    pub path: ParameterInstancePath,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Progress,
    Done,
    Error,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodInvocationResult {
    pub execution_status: ExecutionStatus,
    pub out_args: BTreeMap<String, ParameterValue>,
}

/// Outcome of setting one parameter in a (possibly batch) write
/// (`spec.md` §4.8/§9 open question on deferred writes).
#[derive(Debug, Clone)]
pub struct SetParameterOutcome {
    pub path: ParameterInstancePath,
    pub status: CoreStatus,
    pub deferred: bool,
}

/// `spec.md` §3's `MonitoringListData`.
#[derive(Debug, Clone)]
pub struct MonitoringListData {
    pub id: u64,
    pub timeout: u16,
    pub parameter_paths: Vec<ParameterInstancePath>,
}

#[derive(Debug, Clone)]
pub struct EnumDefinitionData {
    pub name: String,
    pub values: BTreeMap<String, i64>,
}

/// The backend facade the gateway core consumes (`spec.md` §4.8). Every
/// method is `async` rather than the original future-with-callbacks shape;
/// cancellation is modeled by dropping the returned future (`spec.md` §9).
#[async_trait]
pub trait Frontend: Send + Sync {
    async fn get_all_devices(&self) -> BackendResponse<Vec<DeviceData>>;
    async fn get_device(&self, id: DeviceId) -> BackendResponse<DeviceData>;
    async fn get_subdevices_by_collection_name(
        &self,
        device: DeviceId,
        collection_name: &str,
    ) -> BackendResponse<Vec<DeviceData>>;
    async fn get_features(&self, devices: Vec<DeviceId>) -> BackendResponse<Vec<FeatureData>>;
    async fn get_features_of_all_devices(&self) -> BackendResponse<Vec<FeatureData>>;
    async fn get_feature_definition(&self, device: DeviceId, feature_name: &str) -> BackendResponse<FeatureData>;
    async fn get_parameters_by_path(&self, paths: Vec<ParameterInstancePath>) -> BackendResponse<Vec<ParameterData>>;
    async fn get_parameter_definitions_by_path(
        &self,
        paths: Vec<ParameterInstancePath>,
    ) -> BackendResponse<Vec<ParameterDefinitionData>>;
    async fn get_all_parameters(
        &self,
        filter: ParameterFilter,
        offset: u64,
        limit: u64,
    ) -> BackendResponse<PagedPayload<ParameterData>>;
    async fn get_all_parameter_definitions(
        &self,
        filter: ParameterFilter,
        offset: u64,
        limit: u64,
    ) -> BackendResponse<PagedPayload<ParameterDefinitionData>>;
    async fn get_all_method_definitions(
        &self,
        filter: ParameterFilter,
        offset: u64,
        limit: u64,
    ) -> BackendResponse<PagedPayload<MethodDefinitionData>>;
    async fn set_parameter_values_by_path_connection_aware(
        &self,
        requests: Vec<ValuePathRequest>,
        treat_deferred_as_error: bool,
    ) -> BackendResponse<Vec<SetParameterOutcome>>;
    async fn set_parameter_values_by_path(
        &self,
        requests: Vec<ValuePathRequest>,
    ) -> BackendResponse<Vec<SetParameterOutcome>>;
    async fn invoke_method_by_path(
        &self,
        path: ParameterInstancePath,
        in_args: MethodInvocationInArgs,
    ) -> BackendResponse<MethodInvocationResult>;
    async fn create_monitoring_list_with_paths(
        &self,
        paths: Vec<ParameterInstancePath>,
        timeout: u16,
    ) -> BackendResponse<MonitoringListData>;
    async fn get_monitoring_list(&self, id: u64) -> BackendResponse<MonitoringListData>;
    async fn get_all_monitoring_lists(&self) -> BackendResponse<Vec<MonitoringListData>>;
    async fn delete_monitoring_list(&self, id: u64) -> BackendResponse<()>;
    async fn get_values_for_monitoring_list(&self, id: u64) -> BackendResponse<Vec<ParameterData>>;
    async fn get_enum_definition(&self, name: &str) -> BackendResponse<EnumDefinitionData>;
    async fn get_all_enum_definitions(&self) -> BackendResponse<Vec<EnumDefinitionData>>;

    /// `spec.md` §4.8 calls its operation list "abbreviated"; this rounds out
    /// the routes named in §6 that have no other backing op: `/methods/{id}`
    /// (a method's own definition, reused for both the invocable `methods`
    /// resource and the `method-definitions` resource). The
    /// `referencedinstances`/`instances` class-instance routes have no
    /// dedicated backend op — they resolve entirely through
    /// `get_parameters_by_path`, the way `class_instances.cpp` does it.
    async fn get_method_definition_by_path(&self, path: ParameterInstancePath) -> BackendResponse<MethodDefinitionData>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_response_resolves_to_payload() {
        let r = BackendResponse::success(42);
        assert!(!r.has_error());
        assert_eq!(r.into_result().unwrap(), 42);
    }

    #[test]
    fn scenario_b_error_response_resolves_to_core_error() {
        let r: BackendResponse<DeviceData> = BackendResponse::error(CoreStatus::UnknownDevice);
        assert!(r.has_error());
        let err = r.into_result().unwrap_err();
        match err {
            GatewayError::Core(e) => assert_eq!(e.core_status, CoreStatus::UnknownDevice),
            _ => panic!("expected a core error"),
        }
    }

    #[test]
    fn feature_id_joins_device_and_name() {
        let f = FeatureData {
            device: DeviceId::new(1, 1),
            name: "LocalbusMasterKBus".to_string(),
            included_features: vec![],
            contained_parameters: vec![],
            contained_methods: vec![],
        };
        assert_eq!(f.id(), "1-1-LocalbusMasterKBus");
    }
}
