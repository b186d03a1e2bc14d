use serde::{Deserialize, Serialize};
use std::{fmt, net::SocketAddr, time::Duration};
use url::Url;

pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:5000/translate-proxy";
pub const DEFAULT_GOOGLE_URL: &str = "https://translation.googleapis.com/language/translate/v2";
pub const DEFAULT_LIBRE_URL: &str = "https://libretranslate.de/translate";
pub const DEFAULT_MYMEMORY_URL: &str = "https://api.mymemory.translated.net/get";
pub const DEFAULT_PROXY_TIMEOUT_MS: u64 = 8000;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_PROXY_PATH: &str = "/translate-proxy";
pub const DEFAULT_SOURCE_LANG: &str = "en";
pub const DEFAULT_TARGET_LANG: &str = "fi";

/// Server-held secret for the key-based provider.
pub const ENV_GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
/// Client-held key. Ends up on the caller's machine, prefer the proxy.
pub const ENV_CLIENT_API_KEY: &str = "TRANSLATOR_CLIENT_API_KEY";
pub const ENV_PROXY_URL: &str = "TRANSLATOR_PROXY_URL";
pub const ENV_GOOGLE_URL: &str = "GOOGLE_TRANSLATE_URL";
pub const ENV_LIBRE_URL: &str = "LIBRETRANSLATE_URL";
pub const ENV_MYMEMORY_URL: &str = "MYMEMORY_URL";

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(v))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub proxy_url: Url,
    pub google_url: Url,
    pub libre_url: Url,
    pub mymemory_url: Url,
}

impl Endpoints {
    pub fn new(
        proxy_url: &str,
        google_url: &str,
        libre_url: &str,
        mymemory_url: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            proxy_url: parse_url(proxy_url)?,
            google_url: parse_url(google_url)?,
            libre_url: parse_url(libre_url)?,
            mymemory_url: parse_url(mymemory_url)?,
        })
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            proxy_url: default_url(DEFAULT_PROXY_URL),
            google_url: default_url(DEFAULT_GOOGLE_URL),
            libre_url: default_url(DEFAULT_LIBRE_URL),
            mymemory_url: default_url(DEFAULT_MYMEMORY_URL),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyTimeout {
    pub millis: u64,
}

impl ProxyTimeout {
    pub fn new(millis: u64) -> Result<Self, ConfigError> {
        if millis == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(Self { millis })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.millis)
    }
}

impl Default for ProxyTimeout {
    fn default() -> Self {
        Self {
            millis: DEFAULT_PROXY_TIMEOUT_MS,
        }
    }
}

/// Everything the client-side cascade needs, passed in explicitly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CascadeConfig {
    pub endpoints: Endpoints,
    pub client_api_key: Option<ApiKey>,
    pub proxy_timeout: ProxyTimeout,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyConfig {
    pub bind: SocketAddr,
    pub path: String,
    pub google_url: Url,
    pub libre_url: Url,
}

impl ProxyConfig {
    pub fn new(
        bind: &str,
        path: &str,
        google_url: &str,
        libre_url: &str,
    ) -> Result<Self, ConfigError> {
        let bind = bind
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(bind.to_owned()))?;
        if !path.starts_with('/') {
            return Err(ConfigError::InvalidPath(path.to_owned()));
        }
        Ok(Self {
            bind,
            path: path.to_owned(),
            google_url: parse_url(google_url)?,
            libre_url: parse_url(libre_url)?,
        })
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("api key must not be empty")]
    EmptyApiKey,
    #[error("proxy timeout must be > 0 ms")]
    ZeroTimeout,
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid bind address: {0}")]
    InvalidBindAddr(String),
    #[error("route path must start with '/': {0}")]
    InvalidPath(String),
}

fn parse_url(value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        url: value.to_owned(),
        reason: e.to_string(),
    })
}

fn default_url(value: &'static str) -> Url {
    Url::parse(value).expect("built-in endpoint urls are valid")
}

pub trait Env: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_api_key(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<ApiKey>, ConfigError> {
    match cli_value {
        Some(v) => Ok(Some(ApiKey::new(v)?)),
        None => match env.var(env_key) {
            Some(v) => Ok(Some(ApiKey::new(v)?)),
            None => Ok(None),
        },
    }
}

/// Reads a secret that is allowed to be absent or blank; both mean "not configured".
pub fn optional_api_key<E: Env + ?Sized>(env_key: &str, env: &E) -> Option<ApiKey> {
    env.var(env_key).and_then(|v| ApiKey::new(v).ok())
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}
