//! Route template compilation and matching.
//!
//! `spec.md` §9 flags the original regex-per-route compilation as unneeded
//! overhead and recommends a segment trie instead; this is a linear scan
//! over compiled segment lists (`mofa-gateway/src/router/trie.rs`'s shape),
//! which is plenty fast for a route table with a few dozen entries and
//! avoids a regex dependency entirely.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `:name:` — matches exactly one path segment, any non-`/` bytes.
    Param(String),
    /// `#name#` — matches the remainder of the path, `/` included. Only
    /// valid as the template's last segment.
    Rest(String),
}

/// A compiled route template (`spec.md` §4.5).
#[derive(Debug, Clone)]
pub struct Template {
    pub raw: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Compile `raw` (e.g. `/devices/:device_id:/subdevices`). Rejects
    /// templates ending in `/` other than the bare root.
    pub fn compile(raw: &str) -> Result<Self, String> {
        if raw != "/" && raw.ends_with('/') {
            return Err(format!("route template must not end in '/': {raw}"));
        }
        let mut segments = Vec::new();
        let parts: Vec<&str> = raw.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
        for (i, part) in parts.iter().enumerate() {
            let seg = if part.len() > 2 && part.starts_with(':') && part.ends_with(':') {
                Segment::Param(part[1..part.len() - 1].to_string())
            } else if part.len() > 2 && part.starts_with('#') && part.ends_with('#') {
                if i != parts.len() - 1 {
                    return Err(format!("rest capture must be the last segment: {raw}"));
                }
                Segment::Rest(part[1..part.len() - 1].to_string())
            } else {
                Segment::Literal(part.to_string())
            };
            segments.push(seg);
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Match `path` (no query string, may or may not have a leading `/`).
    /// Returns the captured path parameters in declared order on success.
    pub fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let path_segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
        let mut params = BTreeMap::new();
        let mut pi = 0usize;
        for seg in &self.segments {
            match seg {
                Segment::Literal(lit) => {
                    if path_segments.get(pi)? != lit {
                        return None;
                    }
                    pi += 1;
                }
                Segment::Param(name) => {
                    let value = *path_segments.get(pi)?;
                    params.insert(name.clone(), value.to_string());
                    pi += 1;
                }
                Segment::Rest(name) => {
                    if pi >= path_segments.len() {
                        return None;
                    }
                    params.insert(name.clone(), path_segments[pi..].join("/"));
                    pi = path_segments.len();
                }
            }
        }
        if pi == path_segments.len() {
            Some(params)
        } else {
            None
        }
    }
}
