//! JSON:API resource objects, relationships, and related-resource references.

use serde::Serialize;
use std::collections::BTreeMap;

/// `(type, id)` reference to another resource, as carried in relationship
/// `data` arrays (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

impl RelatedResource {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

/// A relationship's cardinality. Exactly one mode applies per instance;
/// `data` is empty iff the mode is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    None,
    Single,
    Multi,
}

/// A single relationship entry on a [`Resource`].
#[derive(Debug, Clone)]
pub struct Relationship {
    pub links: BTreeMap<String, String>,
    pub data_mode: DataMode,
    pub data: Vec<RelatedResource>,
}

impl Relationship {
    pub fn none() -> Self {
        Self {
            links: BTreeMap::new(),
            data_mode: DataMode::None,
            data: Vec::new(),
        }
    }

    pub fn single(resource: RelatedResource) -> Self {
        Self {
            links: BTreeMap::new(),
            data_mode: DataMode::Single,
            data: vec![resource],
        }
    }

    pub fn multi(resources: Vec<RelatedResource>) -> Self {
        Self {
            links: BTreeMap::new(),
            data_mode: DataMode::Multi,
            data: resources,
        }
    }

    pub fn with_link(mut self, name: impl Into<String>, href: impl Into<String>) -> Self {
        self.links.insert(name.into(), href.into());
        self
    }
}

impl Serialize for Relationship {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        if !self.links.is_empty() {
            map.serialize_entry("links", &self.links)?;
        }
        match self.data_mode {
            DataMode::None => map.serialize_entry("data", &Option::<()>::None)?,
            DataMode::Single => map.serialize_entry("data", &self.data.first())?,
            DataMode::Multi => map.serialize_entry("data", &self.data)?,
        }
        map.end()
    }
}

/// A single JSON:API resource object. `data` carries the resource's typed
/// attribute payload (the caller's concrete type, e.g. a device or
/// parameter DTO); `meta` is free-form and is how batch endpoints attach an
/// inline, per-item error when one item in a batch write fails while others
/// succeed (`spec.md` §6's `PATCH /parameters` batch set).
#[derive(Debug, Clone, Serialize)]
pub struct Resource<T: Serialize> {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
    #[serde(flatten)]
    pub data: T,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Relationship>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, serde_json::Value>,
}

impl<T: Serialize> Resource<T> {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>, data: T) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            data,
            relationships: BTreeMap::new(),
            links: BTreeMap::new(),
            meta: BTreeMap::new(),
        }
    }

    pub fn with_relationship(mut self, name: impl Into<String>, rel: Relationship) -> Self {
        self.relationships.insert(name.into(), rel);
        self
    }

    pub fn with_link(mut self, name: impl Into<String>, href: impl Into<String>) -> Self {
        self.links.insert(name.into(), href.into());
        self
    }

    /// Attach an inline per-item error to this resource's `meta`, for batch
    /// endpoints where one item failed independently of its siblings.
    pub fn with_error_meta(mut self, status: &str, title: &str, detail: Option<&str>) -> Self {
        self.meta
            .insert("status".to_string(), serde_json::Value::String(status.to_string()));
        self.meta
            .insert("title".to_string(), serde_json::Value::String(title.to_string()));
        if let Some(detail) = detail {
            self.meta
                .insert("detail".to_string(), serde_json::Value::String(detail.to_string()));
        }
        self
    }

    /// `true` if this resource carries an inline error in `meta` (see
    /// [`Resource::with_error_meta`]).
    pub fn has_errors(&self) -> bool {
        self.meta.contains_key("status") && self.meta.contains_key("title")
    }

    /// `true` if `meta` merely *looks* like an error (carries a `status` or
    /// `title` key) without the full shape `has_errors` requires — used by
    /// batch-result renderers to decide whether to log a warning about a
    /// malformed per-item error payload instead of silently dropping it.
    pub fn has_error_like_meta(&self) -> bool {
        self.meta.contains_key("status") || self.meta.contains_key("title")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn relationship_none_has_empty_data() {
        let rel = Relationship::none();
        let v = serde_json::to_value(&rel).unwrap();
        assert_eq!(v["data"], serde_json::Value::Null);
    }

    #[test]
    fn relationship_multi_serializes_array() {
        let rel = Relationship::multi(vec![RelatedResource::new("parameters", "0-0-a")]);
        let v = serde_json::to_value(&rel).unwrap();
        assert!(v["data"].is_array());
        assert_eq!(v["data"][0]["id"], "0-0-a");
    }

    #[test]
    fn resource_error_meta_roundtrip() {
        let res = Resource::new("parameters", "0-0-a", json!({"value": 1}))
            .with_error_meta("400", "Bad Request", Some("invalid value"));
        assert!(res.has_errors());
        assert!(res.has_error_like_meta());
        let clean = Resource::new("parameters", "0-0-b", json!({"value": 2}));
        assert!(!clean.has_errors());
        assert!(!clean.has_error_like_meta());
    }
}
