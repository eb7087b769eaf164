// Fiches - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Every error names the subsystem and the operation that failed so that a
// single `tracing::warn!` line is enough to diagnose it.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all Fiches operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum FichesError {
    /// A backend request failed.
    Backend(BackendError),

    /// Filter persistence failed.
    Persistence(PersistenceError),

    /// Configuration loading or validation failed.
    Config(ConfigError),
}

impl fmt::Display for FichesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(e) => write!(f, "Backend error: {e}"),
            Self::Persistence(e) => write!(f, "Persistence error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl std::error::Error for FichesError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend(e) => Some(e),
            Self::Persistence(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Backend errors
// ---------------------------------------------------------------------------

/// Errors raised while talking to the files API.
///
/// All variants are retryable from the user's point of view; none of them
/// invalidates state already held by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The server answered with a non-success status code.
    Http { endpoint: String, status: u16 },

    /// The request never produced a response (DNS, connect, timeout, TLS).
    Transport { endpoint: String, message: String },

    /// The response body was not the expected JSON shape.
    Decode { endpoint: String, message: String },
}

impl BackendError {
    /// Endpoint path the failing request was sent to.
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Http { endpoint, .. }
            | Self::Transport { endpoint, .. }
            | Self::Decode { endpoint, .. } => endpoint,
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { endpoint, status } => {
                write!(f, "'{endpoint}' answered with HTTP {status}")
            }
            Self::Transport { endpoint, message } => {
                write!(f, "request to '{endpoint}' failed: {message}")
            }
            Self::Decode { endpoint, message } => {
                write!(f, "unexpected response from '{endpoint}': {message}")
            }
        }
    }
}

impl std::error::Error for BackendError {}

impl From<BackendError> for FichesError {
    fn from(e: BackendError) -> Self {
        Self::Backend(e)
    }
}

// ---------------------------------------------------------------------------
// Wire errors
// ---------------------------------------------------------------------------

/// A backend response body that cannot be turned into typed records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// The value does not have the expected JSON shape.
    UnexpectedShape {
        what: &'static str,
        expected: &'static str,
    },

    /// A required field is absent or unusable.
    MissingField { what: String, field: &'static str },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedShape { what, expected } => write!(f, "{what} is not {expected}"),
            Self::MissingField { what, field } => write!(f, "{what} has no usable '{field}'"),
        }
    }
}

impl std::error::Error for WireError {}

// ---------------------------------------------------------------------------
// Persistence errors
// ---------------------------------------------------------------------------

/// Errors related to storing the persisted filter projection.
#[derive(Debug)]
pub enum PersistenceError {
    /// The blob does not fit in the remaining storage quota.
    QuotaExceeded {
        key: String,
        size: usize,
        quota: usize,
    },

    /// Storage is disabled or otherwise unavailable.
    Unavailable { key: String },

    /// The projection could not be serialised.
    Serialize { source: serde_json::Error },

    /// I/O error reading or writing the backing file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotaExceeded { key, size, quota } => write!(
                f,
                "storing '{key}' needs {size} bytes, exceeds quota of {quota} bytes"
            ),
            Self::Unavailable { key } => write!(f, "storage for '{key}' is unavailable"),
            Self::Serialize { source } => write!(f, "failed to serialise filters: {source}"),
            Self::Io { path, source } => {
                write!(f, "filter storage I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Serialize { source } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<PersistenceError> for FichesError {
    fn from(e: PersistenceError) -> Self {
        Self::Persistence(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for FichesError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for Fiches results.
pub type Result<T> = std::result::Result<T, FichesError>;
