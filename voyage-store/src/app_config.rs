use serde::Deserialize;
use std::env;
use std::fmt;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Backend root, e.g. `https://api.example.com/api`. Unset means offline.
    pub base_url: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    pub token: Option<ApiToken>,
}

fn default_timeout() -> u64 { 30 }

#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowConfig {
    #[serde(default = "default_duplicate_suffix")]
    pub duplicate_suffix: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            duplicate_suffix: default_duplicate_suffix(),
        }
    }
}

fn default_duplicate_suffix() -> String {
    voyage_catalog::DUPLICATE_SUFFIX.to_string()
}

/// Bearer token handed over by the auth layer. Masked in Debug output.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local file, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `VOYAGE__API__BASE_URL=https://...`
            .add_source(config::Environment::with_prefix("VOYAGE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
