// Fiches - platform/config.rs
//
// Platform directory resolution and config.toml loading with startup
// validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::core::model::AccountTier;
use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolved platform paths for Fiches configuration and data.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/fiches/ or %APPDATA%\Fiches\config\)
    pub config_dir: PathBuf,

    /// Data directory holding the persisted filters.
    pub data_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let data_dir = proj_dirs.data_dir().to_path_buf();

            tracing::debug!(
                config = %config_dir.display(),
                data = %data_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                data_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            let fallback = PathBuf::from(".");
            Self {
                config_dir: fallback.clone(),
                data_dir: fallback,
            }
        }
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub api: ApiSection,
    pub account: AccountSection,
    pub filters: FiltersSection,
    pub logging: LoggingSection,
}

/// `[api]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// Base URL of the files API, without the `/files` suffix.
    pub base_url: Option<String>,
    /// Owner of the listed files.
    pub user_id: Option<String>,
    /// Global timeout of a single request, in seconds.
    pub timeout_secs: Option<u64>,
    /// List only active files.
    pub active_only: Option<bool>,
}

/// `[account]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct AccountSection {
    /// "free", "standard" or "premium".
    pub tier: Option<String>,
}

/// `[filters]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct FiltersSection {
    /// Per-dimension debounce window in ms.
    pub debounce_ms: Option<u64>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    // -- API --
    pub base_url: String,
    /// None until configured or passed on the command line.
    pub user_id: Option<String>,
    pub http_timeout: Duration,
    pub active_only: bool,

    // -- Account --
    pub tier: AccountTier,

    // -- Filters --
    pub debounce: Duration,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: constants::DEFAULT_API_BASE_URL.to_string(),
            user_id: None,
            http_timeout: Duration::from_secs(constants::DEFAULT_HTTP_TIMEOUT_SECS),
            active_only: true,
            tier: AccountTier::default(),
            debounce: Duration::from_millis(constants::DEFAULT_FILTER_DEBOUNCE_MS),
            log_level: None,
        }
    }
}

/// Load and validate `config.toml` from the given config directory.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first run).
/// If the file is unparseable, returns defaults with a warning so the user
/// is informed but the program still starts.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<String>) {
    let config_path = config_dir.join(constants::CONFIG_FILE_NAME);
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(source) => {
            let error = ConfigError::Io {
                path: config_path.clone(),
                source,
            };
            let msg = format!("{error}. Using defaults.");
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(source) => {
            let error = ConfigError::TomlParse {
                path: config_path.clone(),
                source,
            };
            let msg = format!("{error}. Using defaults.");
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");
    let config = validate(raw, &mut warnings);

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

/// Check every field against its named bounds, accumulating all warnings.
fn validate(raw: RawConfig, warnings: &mut Vec<String>) -> AppConfig {
    let mut config = AppConfig::default();

    // -- API: base_url --
    if let Some(url) = raw.api.base_url {
        let url = url.trim().trim_end_matches('/');
        if url.starts_with("http://") || url.starts_with("https://") {
            config.base_url = url.to_string();
        } else {
            warnings.push(format!(
                "[api] base_url = \"{url}\" must start with http:// or https://. Using default ({}).",
                constants::DEFAULT_API_BASE_URL,
            ));
        }
    }

    // -- API: user_id --
    if let Some(user) = raw.api.user_id {
        let user = user.trim();
        if user.is_empty() || user.contains('/') {
            warnings.push(format!(
                "[api] user_id = \"{user}\" is not a valid identifier. Ignoring it."
            ));
        } else {
            config.user_id = Some(user.to_string());
        }
    }

    // -- API: timeout_secs --
    if let Some(secs) = raw.api.timeout_secs {
        if (constants::MIN_HTTP_TIMEOUT_SECS..=constants::MAX_HTTP_TIMEOUT_SECS).contains(&secs) {
            config.http_timeout = Duration::from_secs(secs);
        } else {
            let error = ConfigError::ValueOutOfRange {
                field: "[api] timeout_secs".to_string(),
                value: secs.to_string(),
                expected: format!(
                    "{}-{}",
                    constants::MIN_HTTP_TIMEOUT_SECS,
                    constants::MAX_HTTP_TIMEOUT_SECS
                ),
            };
            warnings.push(format!(
                "{error}. Using default ({}).",
                constants::DEFAULT_HTTP_TIMEOUT_SECS
            ));
        }
    }

    if let Some(active_only) = raw.api.active_only {
        config.active_only = active_only;
    }

    // -- Account: tier --
    if let Some(ref tier) = raw.account.tier {
        match AccountTier::parse(tier) {
            Some(t) => config.tier = t,
            None => warnings.push(format!(
                "[account] tier = \"{tier}\" is not recognised. \
                 Valid values: free, standard, premium. Using default (free).",
            )),
        }
    }

    // -- Filters: debounce_ms --
    if let Some(ms) = raw.filters.debounce_ms {
        if ms <= constants::MAX_FILTER_DEBOUNCE_MS {
            config.debounce = Duration::from_millis(ms);
        } else {
            let error = ConfigError::ValueOutOfRange {
                field: "[filters] debounce_ms".to_string(),
                value: ms.to_string(),
                expected: format!("0-{}", constants::MAX_FILTER_DEBOUNCE_MS),
            };
            warnings.push(format!(
                "{error}. Using default ({}).",
                constants::DEFAULT_FILTER_DEBOUNCE_MS
            ));
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    config
}
