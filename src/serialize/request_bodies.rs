//! Strict JSON:API request body deserialization (`spec.md` §4.2).
//!
//! Every failure here becomes `HttpError(BadRequest)` carrying a
//! JSON-pointer-like field path; there is no silent default for a missing or
//! malformed field.

use super::value::ParameterValue;
use crate::error::GatewayError;
use crate::path::ParameterInstancePath;
use serde_json::Value;
use std::collections::BTreeMap;

fn bad(detail: impl Into<String>, pointer: impl Into<String>) -> GatewayError {
    GatewayError::bad_request(detail, pointer)
}

fn require_object<'a>(v: &'a Value, pointer: &str) -> Result<&'a serde_json::Map<String, Value>, GatewayError> {
    v.as_object().ok_or_else(|| bad("expected a JSON object", pointer))
}

fn require_field<'a>(obj: &'a serde_json::Map<String, Value>, name: &str, pointer_prefix: &str) -> Result<&'a Value, GatewayError> {
    obj.get(name)
        .ok_or_else(|| bad(format!("missing field \"{name}\""), format!("{pointer_prefix}/{name}")))
}

fn require_type(obj: &serde_json::Map<String, Value>, expected: &str, pointer_prefix: &str) -> Result<(), GatewayError> {
    let ty = require_field(obj, "type", pointer_prefix)?
        .as_str()
        .ok_or_else(|| bad("\"type\" must be a string", format!("{pointer_prefix}/type")))?;
    if ty != expected {
        return Err(bad(
            format!("expected type \"{expected}\", got \"{ty}\""),
            format!("{pointer_prefix}/type"),
        ));
    }
    Ok(())
}

/// Decimal integer in `[0, 65535]`, consumed in full: rejects reals,
/// negatives, quoted numbers, and overflow (`spec.md` §4.2's numeric parsing
/// rule, property 6).
fn parse_timeout(v: &Value, pointer: &str) -> Result<u16, GatewayError> {
    let n = v
        .as_u64()
        .ok_or_else(|| bad("timeout must be a non-negative integer literal", pointer))?;
    u16::try_from(n).map_err(|_| bad("timeout must be in [0, 65535]", pointer))
}

/// Resolve a `value`/`stringValue` pair to the single effective JSON value,
/// requiring the two to agree when both are present (`spec.md` §4.2).
fn resolve_value(
    value: Option<Value>,
    string_value: Option<&str>,
    pointer_prefix: &str,
) -> Result<Value, GatewayError> {
    match (value, string_value) {
        (Some(v), Some(s)) => {
            if v.to_string() == s {
                Ok(v)
            } else {
                Err(bad(
                    "\"value\" and \"stringValue\" disagree",
                    format!("{pointer_prefix}/stringValue"),
                ))
            }
        }
        (Some(v), None) => Ok(v),
        (None, Some(s)) => serde_json::from_str(s)
            .map_err(|_| bad("\"stringValue\" is not valid JSON", format!("{pointer_prefix}/stringValue"))),
        (None, None) => Err(bad(
            "one of \"value\" or \"stringValue\" is required",
            pointer_prefix,
        )),
    }
}

/// A fully-typed parameter value as given by a client (with `dataType` and
/// `dataRank`), used for method invocation in-args.
fn parse_full_parameter_value(v: &Value, pointer_prefix: &str) -> Result<ParameterValue, GatewayError> {
    let obj = require_object(v, pointer_prefix)?;
    let data_type = require_field(obj, "dataType", pointer_prefix)?
        .as_str()
        .ok_or_else(|| bad("\"dataType\" must be a string", format!("{pointer_prefix}/dataType")))?
        .to_string();
    let data_rank = require_field(obj, "dataRank", pointer_prefix)?
        .as_u64()
        .ok_or_else(|| bad("\"dataRank\" must be a non-negative integer", format!("{pointer_prefix}/dataRank")))?
        as u32;
    let value = obj.get("value").cloned();
    let string_value = obj.get("stringValue").and_then(|v| v.as_str());
    let resolved = resolve_value(value, string_value, pointer_prefix)?;
    Ok(ParameterValue::new(resolved, data_type, data_rank))
}

/// `object of name -> ParameterValue` (`spec.md` §4.2).
#[derive(Debug, Clone, Default)]
pub struct MethodInvocationInArgs(pub BTreeMap<String, ParameterValue>);

/// Parse a method invocation's `inArgs` object (already extracted from
/// `data.attributes.inArgs`).
pub fn parse_in_args(in_args: &Value) -> Result<MethodInvocationInArgs, GatewayError> {
    let obj = require_object(in_args, "data/attributes/inArgs")?;
    let mut args = BTreeMap::new();
    for (name, v) in obj {
        let pointer = format!("data/attributes/inArgs/{name}");
        args.insert(name.clone(), parse_full_parameter_value(v, &pointer)?);
    }
    Ok(MethodInvocationInArgs(args))
}

/// A single parameter write: the path being set plus the resolved value
/// (`spec.md` §4.2, §6 `PATCH /parameters/{id}`).
#[derive(Debug, Clone)]
pub struct ValuePathRequest {
    pub path: ParameterInstancePath,
    pub value: Value,
}

fn parse_value_path_resource(resource: &Value, pointer_prefix: &str) -> Result<ValuePathRequest, GatewayError> {
    let obj = require_object(resource, pointer_prefix)?;
    require_type(obj, "parameters", pointer_prefix)?;
    let id = require_field(obj, "id", pointer_prefix)?
        .as_str()
        .ok_or_else(|| bad("\"id\" must be a string", format!("{pointer_prefix}/id")))?;
    let path = ParameterInstancePath::parse(id).map_err(|_| bad("unknown parameter path", format!("{pointer_prefix}/id")))?;
    let attr_pointer = format!("{pointer_prefix}/attributes");
    let attributes = require_field(obj, "attributes", pointer_prefix)?;
    let attrs = require_object(attributes, &attr_pointer)?;
    let value = attrs.get("value").cloned();
    let string_value = attrs.get("stringValue").and_then(|v| v.as_str());
    let value = resolve_value(value, string_value, &attr_pointer)?;
    Ok(ValuePathRequest { path, value })
}

/// Parse a single-resource `PATCH /parameters/{id}` body.
pub fn parse_value_path_request(body: &Value) -> Result<ValuePathRequest, GatewayError> {
    let obj = require_object(body, "")?;
    let data = require_field(obj, "data", "")?;
    parse_value_path_resource(data, "data")
}

/// Parse a batch `PATCH /parameters` body (`data` is an array).
pub fn parse_value_path_requests(body: &Value) -> Result<Vec<ValuePathRequest>, GatewayError> {
    let obj = require_object(body, "")?;
    let data = require_field(obj, "data", "")?;
    let items = data.as_array().ok_or_else(|| bad("\"data\" must be an array", "data"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_value_path_resource(item, &format!("data/{i}")))
        .collect()
}

/// A `POST /monitoring-lists` body: a timeout plus the parameter paths to
/// aggregate (`spec.md` §4.2/§6).
#[derive(Debug, Clone)]
pub struct CreateMonitoringListRequest {
    pub timeout: u16,
    pub parameter_paths: Vec<ParameterInstancePath>,
}

pub fn parse_create_monitoring_list_request(body: &Value) -> Result<CreateMonitoringListRequest, GatewayError> {
    let obj = require_object(body, "")?;
    let data = require_field(obj, "data", "")?;
    let data_obj = require_object(data, "data")?;
    require_type(data_obj, "monitoring-lists", "data")?;

    let attributes = require_field(data_obj, "attributes", "data")?;
    let attr_obj = require_object(attributes, "data/attributes")?;
    let timeout_value = require_field(attr_obj, "timeout", "data/attributes")?;
    let timeout = parse_timeout(timeout_value, "data/attributes/timeout")?;

    let relationships = require_field(data_obj, "relationships", "data")?;
    let rel_obj = require_object(relationships, "data/relationships")?;
    let parameters = require_field(rel_obj, "parameters", "data/relationships")?;
    let parameters_obj = require_object(parameters, "data/relationships/parameters")?;
    let rel_data = require_field(parameters_obj, "data", "data/relationships/parameters")?;
    let rel_items = rel_data
        .as_array()
        .ok_or_else(|| bad("\"data\" must be an array", "data/relationships/parameters/data"))?;

    let mut parameter_paths = Vec::with_capacity(rel_items.len());
    for (i, item) in rel_items.iter().enumerate() {
        let pointer = format!("data/relationships/parameters/data/{i}");
        let item_obj = require_object(item, &pointer)?;
        require_type(item_obj, "parameters", &pointer)?;
        let id = require_field(item_obj, "id", &pointer)?
            .as_str()
            .ok_or_else(|| bad("\"id\" must be a string", format!("{pointer}/id")))?;
        let path = ParameterInstancePath::parse(id)
            .map_err(|_| bad("unknown parameter path", format!("{pointer}/id")))?;
        parameter_paths.push(path);
    }

    Ok(CreateMonitoringListRequest {
        timeout,
        parameter_paths,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scenario_c_create_monitoring_list() {
        let body = json!({
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
        });
        let parsed = parse_create_monitoring_list_request(&body).unwrap();
        assert_eq!(parsed.timeout, 5);
        assert_eq!(parsed.parameter_paths.len(), 2);
        assert_eq!(parsed.parameter_paths[0].to_id_string(), "0-0-a");
    }

    #[test]
    fn property_6_invalid_timeouts_are_rejected() {
        for bad_timeout in [json!(-1), json!(65536), json!("5"), json!(2.5), json!("5k")] {
            let body = json!({
                "data": {
                    "type": "monitoring-lists",
                    "attributes": { "timeout": bad_timeout },
                    "relationships": { "parameters": { "data": [] } }
                }
            });
            assert!(parse_create_monitoring_list_request(&body).is_err());
        }
    }

    #[test]
    fn property_6_absent_timeout_is_rejected() {
        let body = json!({
            "data": {
                "type": "monitoring-lists",
                "attributes": {},
                "relationships": { "parameters": { "data": [] } }
            }
        });
        assert!(parse_create_monitoring_list_request(&body).is_err());
    }

    #[test]
    fn wrong_resource_type_is_rejected() {
        let body = json!({
            "data": {
                "type": "not-monitoring-lists",
                "attributes": { "timeout": 5 },
                "relationships": { "parameters": { "data": [] } }
            }
        });
        let err = parse_create_monitoring_list_request(&body).unwrap_err();
        assert!(matches!(err, GatewayError::Http(_)));
    }

    #[test]
    fn value_and_string_value_must_agree() {
        let body = json!({
            "data": {
                "type": "parameters",
                "id": "0-0-a",
                "attributes": { "value": 42, "stringValue": "43" }
            }
        });
        assert!(parse_value_path_request(&body).is_err());
    }

    #[test]
    fn value_alone_is_accepted() {
        let body = json!({
            "data": { "type": "parameters", "id": "0-0-a", "attributes": { "value": 42 } }
        });
        let parsed = parse_value_path_request(&body).unwrap();
        assert_eq!(parsed.value, json!(42));
    }

    #[test]
    fn string_value_alone_is_parsed_as_json() {
        let body = json!({
            "data": { "type": "parameters", "id": "0-0-a", "attributes": { "stringValue": "42" } }
        });
        let parsed = parse_value_path_request(&body).unwrap();
        assert_eq!(parsed.value, json!(42));
    }

    #[test]
    fn batch_value_path_requests_parses_each_item() {
        let body = json!({
            "data": [
                {"type": "parameters", "id": "0-0-a", "attributes": {"value": 1}},
                {"type": "parameters", "id": "0-0-b", "attributes": {"value": 2}},
            ]
        });
        let parsed = parse_value_path_requests(&body).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].path.to_id_string(), "0-0-b");
    }

    #[test]
    fn in_args_parses_typed_values() {
        let in_args = json!({
            "speed": { "value": 10, "dataType": "Int32", "dataRank": 0 }
        });
        let parsed = parse_in_args(&in_args).unwrap();
        assert_eq!(parsed.0["speed"].data_type, "Int32");
        assert_eq!(parsed.0["speed"].string_value.as_deref(), Some("10"));
    }
}
