use ::config::{Config, ConfigBuilder, Environment, File, FileFormat};
use ::config::builder::DefaultState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Name of the optional configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "trendalert.toml";
/// Environment variable pointing at an alternative configuration file.
pub const CONFIG_PATH_VAR: &str = "TRENDALERT_CONFIG";
/// Environment variable holding the Gemini API key.
pub const GOOGLE_API_KEY_VAR: &str = "GOOGLE_API_KEY";
/// Environment variable holding the Tavily API key.
pub const TAVILY_API_KEY_VAR: &str = "TAVILY_API_KEY";

/// The `AppConfig` struct holds the configuration settings for the application.
/// It includes the web server address, both provider settings, the HTTP
/// timeout and user agent, and the credentials configured on the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the web UI listens.
    pub server: ServerConfig,
    /// The configuration settings for the search provider.
    pub search: SearchConfig,
    /// The configuration settings for the Language Model (LLM).
    pub llm: LLMConfig,
    /// The timeout for HTTP requests, in seconds.
    pub timeout_secs: u64,
    /// The user agent string to be used in HTTP requests.
    pub user_agent: String,
    /// Keys configured on the server; form input takes precedence.
    #[serde(default, skip_serializing)]
    pub credentials: Credentials,
}

/// The `ServerConfig` struct holds the address of the web UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The interface to bind to.
    pub host: String,
    /// The TCP port; `0` picks a free one.
    pub port: u16,
}

/// The `SearchConfig` struct holds the settings for the Tavily search API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// The endpoint URL for the search API.
    pub endpoint: String,
    /// The number of results requested from the provider.
    pub max_results: usize,
}

/// The `LLMConfig` struct holds the settings for the Gemini API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// The base URL for the models API; the model and method are appended.
    pub endpoint: String,
    /// The model identifier.
    pub model: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: String::from("127.0.0.1"),
                port: 8501,
            },
            search: SearchConfig {
                endpoint: String::from("https://api.tavily.com/search"),
                max_results: crate::DEFAULT_MAX_RESULTS,
            },
            llm: LLMConfig {
                endpoint: String::from("https://generativelanguage.googleapis.com/v1beta/models"),
                model: String::from(crate::DEFAULT_MODEL),
            },
            timeout_secs: crate::DEFAULT_TIMEOUT.as_secs(),
            user_agent: String::from(crate::USER_AGENT),
            credentials: Credentials::default(),
        }
    }
}

impl AppConfig {
    /// Loads the configuration from the defaults, the optional config file,
    /// `TRENDALERT_*` environment variables and the provider key variables.
    pub fn load() -> crate::Result<Self> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| CONFIG_FILE.to_string());

        let config = Self::defaults()?
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix("TRENDALERT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option(
                "credentials.google_api_key",
                std::env::var(GOOGLE_API_KEY_VAR).ok(),
            )?
            .set_override_option(
                "credentials.tavily_api_key",
                std::env::var(TAVILY_API_KEY_VAR).ok(),
            )?
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Loads the configuration from the defaults overlaid with a TOML document.
    pub fn from_toml(toml: &str) -> crate::Result<Self> {
        let config = Self::defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// The request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The `host:port` pair the web UI binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn defaults() -> crate::Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder().add_source(Config::try_from(&AppConfig::default())?))
    }
}

/// An API key that never shows up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a key, trimming surrounding whitespace. Blank input yields `None`.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    /// The raw key, for request headers only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// The `Credentials` struct carries the keys for both providers into the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Key for the Gemini API.
    #[serde(default, deserialize_with = "non_blank_key")]
    pub google_api_key: Option<ApiKey>,
    /// Key for the Tavily API.
    #[serde(default, deserialize_with = "non_blank_key")]
    pub tavily_api_key: Option<ApiKey>,
}

impl Credentials {
    /// Builds credentials from raw input; blank keys count as missing.
    pub fn new(google_api_key: &str, tavily_api_key: &str) -> Self {
        Self {
            google_api_key: ApiKey::new(google_api_key),
            tavily_api_key: ApiKey::new(tavily_api_key),
        }
    }

    /// Fills each missing key from `fallback`.
    pub fn or(self, fallback: &Credentials) -> Self {
        Self {
            google_api_key: self.google_api_key.or_else(|| fallback.google_api_key.clone()),
            tavily_api_key: self.tavily_api_key.or_else(|| fallback.tavily_api_key.clone()),
        }
    }

    /// Returns `true` when both keys are present.
    pub fn is_complete(&self) -> bool {
        self.google_api_key.is_some() && self.tavily_api_key.is_some()
    }

    /// The Gemini key, or `MissingCredentials`.
    pub fn google(&self) -> crate::Result<&ApiKey> {
        self.google_api_key
            .as_ref()
            .ok_or(crate::PipelineError::MissingCredentials)
    }

    /// The Tavily key, or `MissingCredentials`.
    pub fn tavily(&self) -> crate::Result<&ApiKey> {
        self.tavily_api_key
            .as_ref()
            .ok_or(crate::PipelineError::MissingCredentials)
    }
}

fn non_blank_key<'de, D>(deserializer: D) -> std::result::Result<Option<ApiKey>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(ApiKey::new))
}
