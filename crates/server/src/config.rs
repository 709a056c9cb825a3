use shared_types::{AppConfig, CabinetSettings, FeatureFlags};
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Default path to the config file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "config.toml";

fn config_path() -> String {
    std::env::var("CAPCO_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

/// Parse config file contents, falling back to defaults on error.
pub fn parse_config(contents: &str) -> AppConfig {
    toml::from_str(contents).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to parse config file, using defaults");
        AppConfig::default()
    })
}

/// Read the config file once and store it in the global `OnceLock`.
/// Safe to call multiple times; only the first call has effect.
///
/// A missing or unparseable file yields `AppConfig::default()`.
pub fn load_config() -> &'static AppConfig {
    CONFIG.get_or_init(|| {
        let path = config_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let config = parse_config(&contents);
                tracing::info!(path = %path, features = ?config.features, "Configuration loaded");
                config
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Config file not found, using defaults");
                AppConfig::default()
            }
        }
    })
}

/// Loaded feature flags (defaults if `load_config` has not run).
pub fn feature_flags() -> &'static FeatureFlags {
    &load_config().features
}

/// Loaded firm settings (defaults if `load_config` has not run).
pub fn cabinet() -> &'static CabinetSettings {
    &load_config().cabinet
}

/// Read an env var and parse it, falling back to `default`.
pub fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Largest request body accepted (CSV imports included).
pub fn max_upload_bytes() -> usize {
    env_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_config_falls_back_to_defaults() {
        let config = parse_config("features = 12");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn parses_cabinet_section() {
        let config = parse_config("[cabinet]\ntaux_tva = 0.0\n");
        assert_eq!(config.cabinet.taux_tva, 0.0);
        assert!(config.features.audit);
    }

    #[test]
    fn env_or_uses_default_for_garbage() {
        std::env::set_var("CAPCO_TEST_ENV_OR", "not-a-number");
        assert_eq!(env_or("CAPCO_TEST_ENV_OR", 42u32), 42);
        std::env::set_var("CAPCO_TEST_ENV_OR", "7");
        assert_eq!(env_or("CAPCO_TEST_ENV_OR", 42u32), 7);
        assert_eq!(env_or("CAPCO_TEST_ENV_OR_UNSET", 3i64), 3);
    }
}
