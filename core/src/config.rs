//! Credentials and client configuration.
//!
//! Credentials are never compiled in: they come from the environment
//! (`ParseConfig::from_env`) or from a JSON file (`ParseConfig::from_json_file`).

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ParseError;

pub const DEFAULT_SERVER_URL: &str = "https://api.parse.com/1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_APPLICATION_ID: &str = "PARSE_APPLICATION_ID";
pub const ENV_REST_API_KEY: &str = "PARSE_REST_API_KEY";
pub const ENV_SERVER_URL: &str = "PARSE_SERVER_URL";
pub const ENV_TIMEOUT_SECS: &str = "PARSE_TIMEOUT_SECS";

/// Application id and REST API key sent with every request.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    application_id: String,
    rest_api_key: String,
}

impl Credentials {
    pub fn new(application_id: impl Into<String>, rest_api_key: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            rest_api_key: rest_api_key.into(),
        }
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn rest_api_key(&self) -> &str {
        &self.rest_api_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("application_id", &self.application_id)
            .field("rest_api_key", &"<redacted>")
            .finish()
    }
}

/// Everything a `ParseClient` or `Dispatcher` needs to reach a Parse server.
#[derive(Debug, Clone)]
pub struct ParseConfig {
    server_url: String,
    credentials: Credentials,
    timeout: Duration,
}

/// On-disk shape of a config file. Only the credentials are required.
#[derive(Deserialize)]
struct ConfigFile {
    #[serde(flatten)]
    credentials: Credentials,
    server_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl ParseConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            credentials,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_server_url(mut self, server_url: &str) -> Self {
        self.server_url = server_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read the config from `PARSE_*` environment variables.
    pub fn from_env() -> Result<Self, ParseError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the config from a JSON file such as
    /// `{"application_id": "..", "rest_api_key": "..", "timeout_secs": 10}`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ParseError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ParseError> {
        let file: ConfigFile =
            serde_json::from_str(raw).map_err(|e| ParseError::Config(e.to_string()))?;
        let mut config = Self::new(file.credentials);
        if let Some(url) = file.server_url {
            config = config.with_server_url(&url);
        }
        if let Some(secs) = file.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ParseError> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| ParseError::Config(format!("{key} is not set")))
        };
        let credentials = Credentials::new(required(ENV_APPLICATION_ID)?, required(ENV_REST_API_KEY)?);

        let mut config = Self::new(credentials);
        if let Some(url) = lookup(ENV_SERVER_URL) {
            config = config.with_server_url(&url);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw
                .parse()
                .map_err(|_| ParseError::Config(format!("{ENV_TIMEOUT_SECS} is not a number: {raw}")))?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Base of every class endpoint, `<server_url>/classes`.
    pub fn classes_url(&self) -> String {
        format!("{}/classes", self.server_url)
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
