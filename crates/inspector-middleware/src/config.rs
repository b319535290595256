//! Configuration for the InspectorLayer middleware.
//!
//! Build an [`InspectorConfig`] in code with the builder methods, or load it
//! from `INSPECTOR_*` environment variables with [`InspectorConfig::from_env`].

use inspector_core::{DEFAULT_MAX_PER_PAGE, DEFAULT_MAX_RECORDS, DEFAULT_PER_PAGE};
use serde::Deserialize;
use thiserror::Error;

/// Default path prefix of the inspection endpoint.
pub const DEFAULT_INSPECTION_PATH: &str = "/_inspector";

/// Prefix of the environment variables read by [`InspectorConfig::from_env`].
pub const ENV_PREFIX: &str = "INSPECTOR_";

/// Error type for configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable had a value of the wrong type.
    #[error("Configuration error: {0}")]
    Env(#[from] envy::Error),

    /// The inspection path does not start with `/`.
    #[error("Inspection path must start with '/': {0:?}")]
    InvalidPath(String),
}

/// Configuration for the InspectorLayer middleware.
///
/// ```ignore
/// use inspector_middleware::InspectorConfig;
///
/// let config = InspectorConfig::new()
///     .inspection_path("/debug/requests")
///     .max_records(500)
///     .max_per_page(Some(100));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct InspectorConfig {
    /// Path prefix served by the paginator instead of being recorded.
    pub(crate) inspection_path: String,

    /// Maximum number of retained records. `None` keeps everything.
    pub(crate) max_records: Option<usize>,

    /// Page size when the query does not give a valid `per_page`.
    pub(crate) default_per_page: usize,

    /// Upper bound for `per_page`. `None` accepts any size.
    pub(crate) max_per_page: Option<usize>,

    /// Maximum number of body bytes kept in a record. `None` keeps all.
    pub(crate) max_body_capture: Option<usize>,

    /// Whether `X-Forwarded-For` / `X-Real-IP` are used for the client address.
    pub(crate) trust_forwarded_headers: bool,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl InspectorConfig {
    /// Create a new configuration with default values.
    ///
    /// Defaults:
    /// - Inspection path: "/_inspector"
    /// - Max records: 1000
    /// - Default page size: 20, capped at 500
    /// - Full body capture
    /// - Forwarded headers trusted
    pub fn new() -> Self {
        Self {
            inspection_path: DEFAULT_INSPECTION_PATH.to_string(),
            max_records: Some(DEFAULT_MAX_RECORDS),
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: Some(DEFAULT_MAX_PER_PAGE),
            max_body_capture: None,
            trust_forwarded_headers: true,
        }
    }

    /// Load configuration from `INSPECTOR_*` environment variables.
    ///
    /// | Variable | Meaning |
    /// |----------|---------|
    /// | `INSPECTOR_PATH` | inspection path prefix |
    /// | `INSPECTOR_MAX_RECORDS` | retained records, `0` for unbounded |
    /// | `INSPECTOR_DEFAULT_PER_PAGE` | default page size |
    /// | `INSPECTOR_MAX_PER_PAGE` | page size cap, `0` for no cap |
    /// | `INSPECTOR_MAX_BODY_CAPTURE` | recorded body bytes, `0` for all |
    /// | `INSPECTOR_TRUST_FORWARDED_HEADERS` | `true` / `false` |
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env: EnvConfig = envy::prefixed(ENV_PREFIX).from_env()?;
        env.apply(Self::new())
    }

    /// Set the inspection path prefix.
    pub fn inspection_path(mut self, path: impl Into<String>) -> Self {
        self.inspection_path = path.into();
        self
    }

    /// Keep at most `max` records, evicting the oldest.
    pub fn max_records(mut self, max: usize) -> Self {
        self.max_records = Some(max);
        self
    }

    /// Keep every record for the life of the process.
    pub fn unbounded(mut self) -> Self {
        self.max_records = None;
        self
    }

    /// Set the page size used when the query gives none.
    pub fn default_per_page(mut self, per_page: usize) -> Self {
        self.default_per_page = per_page.max(1);
        self
    }

    /// Set the page size cap.
    pub fn max_per_page(mut self, max: Option<usize>) -> Self {
        self.max_per_page = max;
        self
    }

    /// Limit the number of body bytes kept in each record.
    ///
    /// Downstream handlers always receive the complete body.
    pub fn max_body_capture(mut self, max: Option<usize>) -> Self {
        self.max_body_capture = max;
        self
    }

    /// Enable or disable client address lookup in forwarding headers.
    pub fn trust_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_forwarded_headers = trust;
        self
    }

    /// Get the inspection path prefix.
    pub fn path(&self) -> &str {
        &self.inspection_path
    }

    /// Get the retained record limit.
    pub fn record_limit(&self) -> Option<usize> {
        self.max_records
    }

    /// Check if a request path belongs to the inspection endpoint.
    ///
    /// Matches the path itself and anything below it, not sibling paths
    /// sharing the same prefix.
    pub(crate) fn is_inspection_path(&self, path: &str) -> bool {
        let base = self.inspection_path.trim_end_matches('/');
        match path.strip_prefix(base) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

impl std::fmt::Debug for InspectorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InspectorConfig")
            .field("inspection_path", &self.inspection_path)
            .field("max_records", &self.max_records)
            .field("default_per_page", &self.default_per_page)
            .field("max_per_page", &self.max_per_page)
            .field("max_body_capture", &self.max_body_capture)
            .field("trust_forwarded_headers", &self.trust_forwarded_headers)
            .finish()
    }
}

/// Raw `INSPECTOR_*` variables. Zero means "no limit" for the size settings.
#[derive(Debug, Default, Deserialize)]
struct EnvConfig {
    path: Option<String>,
    max_records: Option<usize>,
    default_per_page: Option<usize>,
    max_per_page: Option<usize>,
    max_body_capture: Option<usize>,
    trust_forwarded_headers: Option<bool>,
}

impl EnvConfig {
    fn apply(self, mut config: InspectorConfig) -> Result<InspectorConfig, ConfigError> {
        if let Some(path) = self.path {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidPath(path));
            }
            config.inspection_path = path;
        }
        if let Some(max) = self.max_records {
            config.max_records = non_zero(max);
        }
        if let Some(per_page) = self.default_per_page {
            config = config.default_per_page(per_page);
        }
        if let Some(max) = self.max_per_page {
            config.max_per_page = non_zero(max);
        }
        if let Some(max) = self.max_body_capture {
            config.max_body_capture = non_zero(max);
        }
        if let Some(trust) = self.trust_forwarded_headers {
            config.trust_forwarded_headers = trust;
        }
        Ok(config)
    }
}

fn non_zero(value: usize) -> Option<usize> {
    (value > 0).then_some(value)
}
