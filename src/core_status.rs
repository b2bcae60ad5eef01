//! Backend status catalog and its translation to HTTP.
//!
//! `spec.md` references specific backend status values (`unknown_device` in
//! its Scenario B, `wda_connection_changes_deferred` in its Open Questions)
//! without enumerating the full catalog the backend can report. This module
//! fixes a representative catalog covering every resource kind the gateway
//! exposes, each carrying its own HTTP status and JSON:API `code` string.
//! Unrecognized future statuses fall back to `500` rather than panicking.

use crate::http::HttpStatusCode;

/// A backend-reported outcome status, as carried on every `Frontend`
/// response (`spec.md` §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreStatus {
    Success,
    UnknownDevice,
    UnknownParameter,
    UnknownMethod,
    UnknownFeature,
    UnknownMonitoringList,
    UnknownEnumDefinition,
    UnknownSubdeviceCollection,
    PermissionDenied,
    InvalidValue,
    ConnectionChangesDeferred,
    Failure,
}

impl CoreStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// The JSON:API `code` string for this status (`spec.md` §4.2: error
    /// objects carry an optional `code` mirroring the core status).
    pub fn code(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::UnknownDevice => "UNKNOWN_DEVICE",
            Self::UnknownParameter => "UNKNOWN_PARAMETER",
            Self::UnknownMethod => "UNKNOWN_METHOD",
            Self::UnknownFeature => "UNKNOWN_FEATURE",
            Self::UnknownMonitoringList => "UNKNOWN_MONITORING_LIST",
            Self::UnknownEnumDefinition => "UNKNOWN_ENUM_DEFINITION",
            Self::UnknownSubdeviceCollection => "UNKNOWN_SUBDEVICE_COLLECTION",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::InvalidValue => "INVALID_VALUE",
            Self::ConnectionChangesDeferred => "CONNECTION_CHANGES_DEFERRED",
            Self::Failure => "FAILURE",
        }
    }

    /// The HTTP status this core status maps to (`spec.md` §4.3's implicit
    /// "domain → HTTP" translation table).
    pub fn http_status(&self) -> HttpStatusCode {
        match self {
            Self::Success => HttpStatusCode::OK,
            Self::UnknownDevice
            | Self::UnknownParameter
            | Self::UnknownMethod
            | Self::UnknownFeature
            | Self::UnknownMonitoringList
            | Self::UnknownEnumDefinition
            | Self::UnknownSubdeviceCollection => HttpStatusCode::NOT_FOUND,
            Self::PermissionDenied => HttpStatusCode::FORBIDDEN,
            Self::InvalidValue => HttpStatusCode::BAD_REQUEST,
            Self::ConnectionChangesDeferred => HttpStatusCode::ACCEPTED,
            Self::Failure => HttpStatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// A human title matching the IANA reason phrase for the mapped status,
    /// used as the JSON:API error object's `title`.
    pub fn title(&self) -> &'static str {
        self.http_status().reason_phrase()
    }
}
