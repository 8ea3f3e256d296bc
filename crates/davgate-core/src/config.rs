use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, FileFormat};
use serde::{Deserialize, Deserializer};

use crate::constants::{
    CONFIG_PATH_ENV, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PORT, DEFAULT_REALM, ENV_PREFIX,
    ENV_REFERENCE_MARKER, LOCAL_CONFIG_NAME, SYSTEM_CONFIG_PATH, WILDCARD,
};
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub defaults: UserDefaults,
    #[serde(default)]
    pub anonymous: Option<AnonymousConfig>,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: u64,
}

impl ServerConfig {
    /// ## Summary
    /// Returns the listen address in the format "host:port".
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub enabled: bool,
    pub realm: String,
}

/// Values inherited by every user entry that leaves them out.
#[derive(Debug, Clone, Deserialize)]
pub struct UserDefaults {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default)]
    pub modify: bool,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl Default for UserDefaults {
    fn default() -> Self {
        Self {
            root: default_root(),
            modify: false,
            rules: Vec::new(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

/// Identity used for requests without credentials while authentication is disabled.
#[derive(Debug, Clone, Deserialize)]
pub struct AnonymousConfig {
    pub root: PathBuf,
    #[serde(default)]
    pub modify: bool,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub username: String,
    #[serde(default)]
    pub password: SecretValue,
    pub root: Option<PathBuf>,
    pub modify: Option<bool>,
    pub rules: Option<Vec<RuleConfig>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuleConfig {
    pub path: String,
    #[serde(default)]
    pub regex: bool,
    #[serde(default)]
    pub allow: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub credentials: bool,
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
    #[serde(default)]
    pub allowed_methods: Vec<String>,
    #[serde(default)]
    pub exposed_headers: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            credentials: false,
            allowed_headers: vec![WILDCARD.to_string()],
            allowed_hosts: vec![WILDCARD.to_string()],
            allowed_methods: vec![WILDCARD.to_string()],
            exposed_headers: Vec::new(),
        }
    }
}

impl CorsConfig {
    /// ## Summary
    /// Replaces empty allow-lists with the wildcard. `exposed_headers` stays as given.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        for list in [
            &mut self.allowed_headers,
            &mut self.allowed_hosts,
            &mut self.allowed_methods,
        ] {
            if list.is_empty() {
                list.push(WILDCARD.to_string());
            }
        }
        self
    }
}

/// Credential material from a user entry. Never printed by `Debug`.
///
/// Accepts both strings and integers in the source file, since a bare
/// numeric password is valid in every supported format.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(***)")
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Integer(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self(text),
            Raw::Integer(number) => Self(number.to_string()),
        })
    }
}

impl Settings {
    /// ## Summary
    /// Loads configuration from the system file, the working directory, an optional
    /// file named by `DAVGATE_CONFIG` and `DAVGATE_*` environment variables, in that
    /// order of increasing precedence.
    ///
    /// ## Errors
    /// Returns an error if building the configuration, deserializing it, or resolving
    /// `{env}` references fails.
    pub fn load() -> Result<Self> {
        let mut builder = with_defaults(Config::builder())?
            .add_source(config::File::with_name(SYSTEM_CONFIG_PATH).required(false))
            .add_source(config::File::with_name(LOCAL_CONFIG_NAME).required(false));

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            tracing::debug!(path = %path, "Loading explicit configuration file");
            builder = builder.add_source(config::File::with_name(&path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Self>()?;

        Ok(settings.resolve(|name| std::env::var(name).ok())?)
    }

    /// ## Summary
    /// Builds settings from an in-memory TOML document on top of the defaults.
    ///
    /// ## Errors
    /// Returns an error if the document does not parse or `{env}` references cannot be
    /// resolved.
    pub fn from_toml(source: &str) -> Result<Self> {
        let settings = with_defaults(Config::builder())?
            .add_source(config::File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize::<Self>()?;

        Ok(settings.resolve(|name| std::env::var(name).ok())?)
    }

    /// ## Summary
    /// Expands `{env}` references in user names and passwords and normalizes the
    /// CORS lists.
    ///
    /// ## Errors
    /// Returns `ConfigError` if a reference names no variable or the variable is empty.
    pub fn resolve<F>(mut self, lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        for user in &mut self.users {
            user.username = resolve_env_reference(&user.username, &lookup)?;
            user.password = SecretValue(resolve_env_reference(user.password.expose(), &lookup)?);
        }
        self.cors = self.cors.normalized();
        Ok(self)
    }
}

fn with_defaults(
    builder: ConfigBuilder<DefaultState>,
) -> std::result::Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", i64::from(DEFAULT_PORT))?
        .set_default("server.max_upload_bytes", DEFAULT_MAX_UPLOAD_BYTES)?
        .set_default("logging.level", "info")?
        .set_default("auth.enabled", true)?
        .set_default("auth.realm", DEFAULT_REALM)
}

/// ## Summary
/// Returns `value` unchanged unless it starts with `{env}`, in which case the rest of
/// the value names an environment variable whose contents are returned instead.
///
/// ## Errors
/// Returns `ConfigError` if no variable name follows the marker or the variable is
/// unset or empty.
pub fn resolve_env_reference<F>(value: &str, lookup: F) -> CoreResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(name) = value.strip_prefix(ENV_REFERENCE_MARKER) else {
        return Ok(value.to_string());
    };

    if name.is_empty() {
        return Err(CoreError::ConfigError(
            "no environment variable specified".to_string(),
        ));
    }

    match lookup(name) {
        Some(resolved) if !resolved.is_empty() => Ok(resolved),
        _ => Err(CoreError::ConfigError(format!(
            "environment variable {name} is unset or empty"
        ))),
    }
}

/// ## Summary
/// Loads configuration from environment variables, `.env` and config files.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
