//! Call-site options, process-wide settings and setting precedence.
//!
//! Every bootstrap-layer setting can come from three places. From lowest to
//! highest priority:
//! 1. **Stored** - a value already loaded into the property store
//! 2. **System** - the process-wide [`SystemProperties`]
//! 3. **Options** - the [`Options`] map passed at the call site
//!
//! [`resolve_setting`] evaluates them in that order and lets each present
//! value overwrite the previous one.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use super::store::PropertyStore;

/// Call-site option map keyed by fully namespaced setting names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options(HashMap<String, String>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Process-wide settings layer, consulted between call-site options and stored
/// properties.
///
/// Cloning yields another handle onto the same map. Use [`SystemProperties::global`]
/// for the shared process instance or [`SystemProperties::new`] for an
/// isolated one.
#[derive(Debug, Clone, Default)]
pub struct SystemProperties {
    values: Arc<RwLock<HashMap<String, String>>>,
}

static GLOBAL_SYSTEM_PROPERTIES: OnceLock<SystemProperties> = OnceLock::new();

impl SystemProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared process-wide instance.
    pub fn global() -> Self {
        GLOBAL_SYSTEM_PROPERTIES
            .get_or_init(SystemProperties::new)
            .clone()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }
}

/// Resolve a setting with last-applied-wins precedence.
///
/// Starts from `default`, then applies the stored value, then the system
/// value, then the option value. Each one that is present replaces the
/// result so far, giving options > system > stored > default.
pub fn resolve_setting(
    key: &str,
    options: &Options,
    system: &SystemProperties,
    stored: Option<&PropertyStore>,
    default: Option<&str>,
) -> Option<String> {
    let mut value = default.map(str::to_string);

    if let Some(stored_value) = stored.and_then(|store| store.get(key)) {
        value = Some(stored_value.to_string());
    }
    if let Some(system_value) = system.get(key) {
        value = Some(system_value);
    }
    if let Some(option_value) = options.get(key) {
        value = Some(option_value.to_string());
    }

    value
}

/// Resolve a boolean flag; only the exact text `true` enables it.
pub fn resolve_flag(
    key: &str,
    options: &Options,
    system: &SystemProperties,
    stored: Option<&PropertyStore>,
) -> bool {
    resolve_setting(key, options, system, stored, None).is_some_and(|v| v == "true")
}

/// Split a colon-separated directory list, dropping empty segments.
pub fn parse_search_paths(paths: &str) -> Vec<String> {
    paths
        .split(':')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "eeprops.test.setting";

    #[test]
    fn test_default_when_nothing_set() {
        let value = resolve_setting(
            KEY,
            &Options::new(),
            &SystemProperties::new(),
            None,
            Some("fallback"),
        );
        assert_eq!(value.as_deref(), Some("fallback"));
    }

    #[test]
    fn test_stored_overrides_default() {
        let mut store = PropertyStore::new();
        store.put(KEY, "stored");
        let value = resolve_setting(
            KEY,
            &Options::new(),
            &SystemProperties::new(),
            Some(&store),
            Some("fallback"),
        );
        assert_eq!(value.as_deref(), Some("stored"));
    }

    #[test]
    fn test_system_overrides_stored() {
        let mut store = PropertyStore::new();
        store.put(KEY, "stored");
        let system = SystemProperties::new();
        system.set(KEY, "system");
        let value = resolve_setting(KEY, &Options::new(), &system, Some(&store), None);
        assert_eq!(value.as_deref(), Some("system"));
    }

    #[test]
    fn test_options_override_system_and_stored() {
        let mut store = PropertyStore::new();
        store.put(KEY, "stored");
        let system = SystemProperties::new();
        system.set(KEY, "system");
        let options = Options::new().with(KEY, "option");
        let value = resolve_setting(KEY, &options, &system, Some(&store), None);
        assert_eq!(value.as_deref(), Some("option"));
    }

    #[test]
    fn test_flag_option_can_disable_system_flag() {
        let system = SystemProperties::new();
        system.set(KEY, "true");
        assert!(resolve_flag(KEY, &Options::new(), &system, None));

        let options = Options::new().with(KEY, "false");
        assert!(!resolve_flag(KEY, &options, &system, None));
    }

    #[test]
    fn test_flag_is_case_sensitive() {
        let options = Options::new().with(KEY, "TRUE");
        assert!(!resolve_flag(KEY, &options, &SystemProperties::new(), None));
    }

    #[test]
    fn test_system_properties_handles_share_state() {
        let a = SystemProperties::new();
        let b = a.clone();
        a.set("shared", "yes");
        assert_eq!(b.get("shared").as_deref(), Some("yes"));
        assert_eq!(b.remove("shared").as_deref(), Some("yes"));
        assert!(a.get("shared").is_none());
    }

    #[test]
    fn test_parse_search_paths() {
        assert_eq!(
            parse_search_paths("/etc/app:/opt/app::conf"),
            vec!["/etc/app", "/opt/app", "conf"]
        );
        assert!(parse_search_paths("").is_empty());
    }
}
