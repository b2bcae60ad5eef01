//! Parameter value wire representation.

use serde::{Deserialize, Serialize};

/// A single parameter value as carried on the wire: `{ value, dataType,
/// dataRank, stringValue? }` (`spec.md` §4.2). `stringValue` carries the
/// full-precision JSON text form whenever `data_type` names an integer or
/// floating-point type, working around JavaScript's 53-bit safe-integer
/// limit on the client side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterValue {
    pub value: serde_json::Value,
    #[serde(rename = "dataType")]
    pub data_type: String,
    #[serde(rename = "dataRank")]
    pub data_rank: u32,
    #[serde(rename = "stringValue", skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
}

impl ParameterValue {
    pub fn new(value: serde_json::Value, data_type: impl Into<String>, data_rank: u32) -> Self {
        let data_type = data_type.into();
        let string_value = needs_string_value(&data_type).then(|| value.to_string());
        Self {
            value,
            data_type,
            data_rank,
            string_value,
        }
    }
}

fn needs_string_value(data_type: &str) -> bool {
    let lower = data_type.to_lowercase();
    lower.contains("int") || lower.contains("float")
}
