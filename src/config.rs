//! Model client configuration, read from the environment.
//!
//! Azure OpenAI is used when `AZURE_OPENAI_API_KEY` is set, otherwise an
//! OpenAI-compatible endpoint configured through `OPENAI_*` variables.

use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-15-preview";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// `POST {base_url}/chat/completions` with a bearer token.
    OpenAi,
    /// `POST {endpoint}/openai/deployments/{model}/chat/completions` with an
    /// `api-key` header.
    AzureOpenAi { api_version: String },
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: Provider,
    pub base_url: String,
    pub api_key: String,
    /// Model name, or the deployment name on Azure.
    pub model: String,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: Provider::OpenAi,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn azure(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            provider: Provider::AzureOpenAi {
                api_version: api_version.into(),
            },
            base_url: endpoint.into(),
            api_key: api_key.into(),
            model: deployment.into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_env_file(None);
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. Empty values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(api_key) = get("AZURE_OPENAI_API_KEY") {
            let endpoint =
                get("AZURE_OPENAI_ENDPOINT").ok_or(ConfigError::MissingVar("AZURE_OPENAI_ENDPOINT"))?;
            let api_version = get("AZURE_OPENAI_API_VERSION")
                .or_else(|| get("OPENAI_API_VERSION"))
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string());
            let deployment =
                get("AZURE_OPENAI_DEPLOYMENT").unwrap_or_else(|| DEFAULT_MODEL.to_string());
            return Ok(Self::azure(endpoint, api_key, deployment, api_version));
        }

        let api_key = get("OPENAI_API_KEY").ok_or(ConfigError::MissingVar("OPENAI_API_KEY"))?;
        let mut config = Self::openai(
            api_key,
            get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        );
        if let Some(base_url) = get("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }

    pub(crate) fn chat_url(&self, model: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        match &self.provider {
            Provider::OpenAi => format!("{base}/chat/completions"),
            Provider::AzureOpenAi { api_version } => format!(
                "{base}/openai/deployments/{model}/chat/completions?api-version={api_version}"
            ),
        }
    }

    pub(crate) fn auth_header(&self) -> (&'static str, String) {
        match self.provider {
            Provider::OpenAi => ("Authorization", format!("Bearer {}", self.api_key)),
            Provider::AzureOpenAi { .. } => ("api-key", self.api_key.clone()),
        }
    }
}

/// Load variables from a `.env` file into the process environment.
///
/// With no path, searches the current directory and its parents. Variables
/// already set are left alone. Returns whether a file was loaded.
pub fn load_env_file(path: Option<&Path>) -> bool {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).is_ok(),
        None => dotenvy::dotenv().is_ok(),
    };
    debug!(loaded, path = ?path, "env file");
    loaded
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingVar(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(name) => write!(f, "missing environment variable {name}"),
        }
    }
}

impl std::error::Error for ConfigError {}
