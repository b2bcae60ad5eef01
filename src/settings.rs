//! The settings-store collaborator (`spec.md` §6): a string-typed key/value
//! store the gateway reads two keys from. Persistence, reload, and the rest
//! of the store's surface are out of scope; the core only needs these two
//! lookups.

/// Settings keys the core reads (`spec.md` §6).
pub const RUN_RESULT_TIMEOUT: &str = "run_result_timeout";
pub const ALLOW_UNAUTHENTICATED_SCAN_DEVICES: &str = "allow_unauthenticated_requests_for_scan_devices";

pub trait Settings: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// The method-run timeout span in seconds; `0` disables run storage
    /// (sync-only). Falls back to `0` if unset or unparsable.
    fn run_result_timeout(&self) -> u16 {
        self.get(RUN_RESULT_TIMEOUT)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    fn allow_unauthenticated_scan_devices(&self) -> bool {
        self.get(ALLOW_UNAUTHENTICATED_SCAN_DEVICES)
            .map(|v| v == "true")
            .unwrap_or(false)
    }
}

/// A fixed-map settings store, suitable for tests and for embedding
/// alongside a real configuration loader.
#[derive(Debug, Clone, Default)]
pub struct InMemorySettings {
    values: std::collections::BTreeMap<String, String>,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl Settings for InMemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_timeout_defaults_to_zero() {
        let s = InMemorySettings::new();
        assert_eq!(s.run_result_timeout(), 0);
    }

    #[test]
    fn timeout_is_read_and_parsed() {
        let s = InMemorySettings::new().with(RUN_RESULT_TIMEOUT, "30");
        assert_eq!(s.run_result_timeout(), 30);
    }

    #[test]
    fn scan_devices_flag_defaults_to_false() {
        let s = InMemorySettings::new();
        assert!(!s.allow_unauthenticated_scan_devices());
        let s = s.with(ALLOW_UNAUTHENTICATED_SCAN_DEVICES, "true");
        assert!(s.allow_unauthenticated_scan_devices());
    }
}
