//! Single and paginated collection documents, with stable link synthesis.

use crate::error::GatewayError;
use serde::Serialize;
use std::collections::BTreeMap;

use super::base_meta;

/// A single-resource JSON:API document (`spec.md` §3's `Basic<T>`).
#[derive(Debug, Clone)]
pub struct Basic<T> {
    pub base_path: String,
    pub query: String,
    pub links: BTreeMap<String, String>,
    pub meta: BTreeMap<String, serde_json::Value>,
    pub data: T,
    /// Resources reached via `include=...` (`spec.md` §4.2's optional
    /// `included`). Only `monitoring-lists/{id}?include=parameters` ever
    /// populates this (§1's Non-goals scope out deeper traversal).
    pub included: Vec<serde_json::Value>,
}

impl<T> Basic<T> {
    pub fn new(base_path: impl Into<String>, data: T) -> Self {
        let base_path = base_path.into();
        let mut links = BTreeMap::new();
        if !base_path.is_empty() {
            links.insert("self".to_string(), base_path.clone());
        }
        Self {
            base_path,
            query: String::new(),
            links,
            meta: meta_from_base(),
            data,
            included: Vec::new(),
        }
    }

    pub fn with_included(mut self, included: Vec<serde_json::Value>) -> Self {
        self.included = included;
        self
    }
}

impl<T: Serialize> Serialize for Basic<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("jsonapi", &super::JsonApiObject::default())?;
        map.serialize_entry("meta", &self.meta)?;
        map.serialize_entry("data", &self.data)?;
        if !self.links.is_empty() {
            map.serialize_entry("links", &self.links)?;
        }
        if !self.included.is_empty() {
            map.serialize_entry("included", &self.included)?;
        }
        map.end()
    }
}

fn meta_from_base() -> BTreeMap<String, serde_json::Value> {
    base_meta()
}

/// A paginated collection document (`spec.md` §3/§4.4).
#[derive(Debug, Clone)]
pub struct CollectionDocument<T> {
    pub base_path: String,
    /// The raw query string of the originating request, without the
    /// leading `?` (may be empty).
    pub query: String,
    pub meta: BTreeMap<String, serde_json::Value>,
    pub data: T,
    pub page_offset: u64,
    pub page_limit: u64,
    pub page_element_max: u64,
}

impl<T> CollectionDocument<T> {
    pub fn new(
        base_path: impl Into<String>,
        query: impl Into<String>,
        data: T,
        page_offset: u64,
        page_limit: u64,
        page_element_max: u64,
    ) -> Self {
        Self {
            base_path: base_path.into(),
            query: query.into(),
            meta: meta_from_base(),
            data,
            page_offset,
            page_limit: page_limit.max(1),
            page_element_max,
        }
    }

    /// The request's query string with any `page[...]=` parameter removed,
    /// with a leading `?` if anything remains (`spec.md` §4.4).
    pub fn query_without_pagination(&self) -> String {
        let kept: Vec<&str> = self
            .query
            .split('&')
            .filter(|s| !s.is_empty() && !s.starts_with("page["))
            .collect();
        if kept.is_empty() {
            String::new()
        } else {
            format!("?{}", kept.join("&"))
        }
    }

    fn link_for(&self, offset: u64) -> String {
        let qwp = self.query_without_pagination();
        let sep = if qwp.is_empty() { "?" } else { "&" };
        format!(
            "{}{}{}page[limit]={}&page[offset]={}",
            self.base_path, qwp, sep, self.page_limit, offset
        )
    }

    /// The largest offset `O*` with `O* mod limit == page_offset mod limit`
    /// that still falls within `page_element_max` (`spec.md` §4.4's `last`
    /// link algorithm).
    pub fn last_offset(&self) -> u64 {
        let l = self.page_limit;
        let mut o = if self.page_element_max > l {
            self.page_offset
        } else {
            0
        };
        while self.page_element_max > o + l {
            o += l;
        }
        o
    }

    pub fn has_next(&self) -> bool {
        self.page_offset + self.page_limit < self.page_element_max
    }

    pub fn has_prev(&self) -> bool {
        self.page_offset > 0
    }

    pub fn prev_offset(&self) -> u64 {
        self.page_offset.saturating_sub(self.page_limit)
    }

    /// Build the deterministic `self`, `first`, `last`, and conditional
    /// `next`/`prev` links.
    pub fn build_links(&self) -> BTreeMap<String, String> {
        let mut links = BTreeMap::new();
        links.insert("self".to_string(), self.link_for(self.page_offset));
        links.insert("first".to_string(), self.link_for(0));
        links.insert("last".to_string(), self.link_for(self.last_offset()));
        if self.has_next() {
            links.insert(
                "next".to_string(),
                self.link_for(self.page_offset + self.page_limit),
            );
        }
        if self.has_prev() {
            links.insert("prev".to_string(), self.link_for(self.prev_offset()));
        }
        links
    }
}

impl<T: Serialize> Serialize for CollectionDocument<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("jsonapi", &super::JsonApiObject::default())?;
        map.serialize_entry("meta", &self.meta)?;
        map.serialize_entry("data", &self.data)?;
        map.serialize_entry("links", &self.build_links())?;
        map.end()
    }
}

/// Slice `items` to `[min(offset, len) .. min(offset + limit, len)]`
/// (`spec.md` §4.4/§8 property 8). Errors if `offset + limit` would overflow.
pub fn apply_paging<T: Clone>(
    items: &[T],
    limit: u64,
    offset: u64,
) -> Result<Vec<T>, GatewayError> {
    let len = items.len() as u64;
    let end = offset
        .checked_add(limit)
        .ok_or_else(|| GatewayError::internal("page offset + limit overflow"))?;
    let start = offset.min(len) as usize;
    let end = end.min(len) as usize;
    Ok(items[start..end].to_vec())
}
