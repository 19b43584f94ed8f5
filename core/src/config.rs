//! Adapter configuration.
//!
//! Defaults match what existing callers rely on. Values can come from serde
//! (embedding the adapter's settings in a larger config file) or from the
//! environment via `AdapterConfig::from_env`.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// What to do with a method string outside GET/POST/PUT/DELETE/HEAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodPolicy {
    /// Send it as GET. Existing callers depend on this.
    #[default]
    #[serde(alias = "fallback")]
    FallbackToGet,
    /// Fail with `AdapterError::UnsupportedMethod`.
    Reject,
}

impl MethodPolicy {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "fallback" | "fallback_to_get" => Some(MethodPolicy::FallbackToGet),
            "reject" => Some(MethodPolicy::Reject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Timeout for requests built with `HttpAdapter::request`.
    pub timeout_ms: u64,
    pub method_policy: MethodPolicy,
    /// Ask the host to run requests off its main loop. Web exports have no
    /// threads, so this is off on wasm32.
    pub use_threads: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            method_policy: MethodPolicy::default(),
            use_threads: !cfg!(target_arch = "wasm32"),
        }
    }
}

impl AdapterConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Read overrides from `ENGINE_HTTP_TIMEOUT_MS`,
    /// `ENGINE_HTTP_METHOD_POLICY` and `ENGINE_HTTP_USE_THREADS`.
    ///
    /// Unset variables keep their defaults. Unparseable values are logged
    /// and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("ENGINE_HTTP_TIMEOUT_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.timeout_ms = ms,
                Err(e) => warn_ignored("ENGINE_HTTP_TIMEOUT_MS", &raw, &e.to_string()),
            }
        }

        if let Some(raw) = lookup("ENGINE_HTTP_METHOD_POLICY") {
            match MethodPolicy::parse(raw.trim()) {
                Some(policy) => config.method_policy = policy,
                None => warn_ignored("ENGINE_HTTP_METHOD_POLICY", &raw, "expected 'fallback' or 'reject'"),
            }
        }

        if let Some(raw) = lookup("ENGINE_HTTP_USE_THREADS") {
            match raw.trim().parse::<bool>() {
                Ok(v) => config.use_threads = v,
                Err(e) => warn_ignored("ENGINE_HTTP_USE_THREADS", &raw, &e.to_string()),
            }
        }

        config
    }
}

fn warn_ignored(key: &str, raw: &str, reason: &str) {
    tracing::warn!(target: "engine_http::config", "Ignoring {}='{}': {}", key, raw, reason);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = AdapterConfig::default();
        assert_eq!(config.default_timeout(), Duration::from_secs(10));
        assert_eq!(config.method_policy, MethodPolicy::FallbackToGet);
        assert!(config.use_threads);
    }

    #[test]
    fn env_overrides_apply() {
        let config = AdapterConfig::from_lookup(lookup(&[
            ("ENGINE_HTTP_TIMEOUT_MS", "2500"),
            ("ENGINE_HTTP_METHOD_POLICY", "reject"),
            ("ENGINE_HTTP_USE_THREADS", "false"),
        ]));
        assert_eq!(config.default_timeout(), Duration::from_millis(2500));
        assert_eq!(config.method_policy, MethodPolicy::Reject);
        assert!(!config.use_threads);
    }

    #[test]
    fn bad_env_values_keep_defaults() {
        let config = AdapterConfig::from_lookup(lookup(&[
            ("ENGINE_HTTP_TIMEOUT_MS", "soon"),
            ("ENGINE_HTTP_METHOD_POLICY", "maybe"),
            ("ENGINE_HTTP_USE_THREADS", "yes"),
        ]));
        assert_eq!(config, AdapterConfig::default());
    }

    #[test]
    fn deserializes_partial_json() {
        let config: AdapterConfig = serde_json::from_str(r#"{"method_policy":"reject"}"#).unwrap();
        assert_eq!(config.method_policy, MethodPolicy::Reject);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);

        let config: AdapterConfig = serde_json::from_str(r#"{"method_policy":"fallback"}"#).unwrap();
        assert_eq!(config.method_policy, MethodPolicy::FallbackToGet);
    }
}
