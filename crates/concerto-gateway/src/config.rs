//! Gateway configuration.
//!
//! Built once at startup and never mutated. Sources, lowest priority first:
//! built-in defaults, an optional config file, `CONCERTO_*` environment
//! variables (`__` separates nested keys), then the flat `DOMAIN`, `PORT`,
//! `REALM` and `MAIN_PATH` variables.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Flat environment variables and the keys they set.
const LEGACY_ENV: [(&str, &str); 4] = [
    ("DOMAIN", "domain"),
    ("PORT", "port"),
    ("REALM", "realm"),
    ("MAIN_PATH", "main_path"),
];

/// Errors raised while loading configuration. All are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    /// A setting has an unusable value.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// A configuration source could not be read or parsed.
    #[error(transparent)]
    Source(#[from] ::config::ConfigError),
}

/// How application names map to repository directories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoLayout {
    /// `<root>/<app>/<subdirectory>`.
    #[default]
    Nested,
    /// `<root>/<app>.git`.
    Suffix,
}

/// Repository layout settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Directory layout.
    pub layout: RepoLayout,
    /// Subdirectory used by the nested layout.
    pub subdirectory: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            layout: RepoLayout::Nested,
            subdirectory: "git".to_string(),
        }
    }
}

/// How Git service subprocesses are started.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// `git` wrapper binary. When unset the dashed `git-<service>` programs
    /// are run directly.
    pub program: Option<String>,
    /// Options placed before the subcommand when `program` is set.
    pub options: Vec<String>,
}

/// Which credential validator answers logins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorKind {
    /// Placeholder: accept iff username equals password.
    #[default]
    Equality,
    /// Fixed table from `auth.users`.
    Static,
}

/// Authentication settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Validator backend.
    pub validator: ValidatorKind,
    /// Username → password table for the static validator.
    pub users: HashMap<String, String>,
    /// Command suggested in the 401 warning.
    pub login_hint: String,
    /// Documentation link appended to the 401 warning.
    pub docs_url: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            validator: ValidatorKind::Equality,
            users: HashMap::new(),
            login_hint: "concerto login".to_string(),
            docs_url: None,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("validator", &self.validator)
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .field("login_hint", &self.login_hint)
            .field("docs_url", &self.docs_url)
            .finish()
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
    /// `pretty` or `json`.
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Configuration for the gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Public domain shown in the invalid-path hint.
    pub domain: String,
    /// Listen port.
    pub port: u16,
    /// Listen address.
    pub bind_address: IpAddr,
    /// Realm in the `WWW-Authenticate` challenge.
    pub realm: String,
    /// Repository root.
    pub main_path: PathBuf,
    /// Repository layout.
    pub repository: RepositoryConfig,
    /// Subprocess settings.
    pub git: GitConfig,
    /// Authentication settings.
    pub auth: AuthConfig,
    /// Logging settings.
    pub log: LogConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            port: 9000,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            realm: String::new(),
            main_path: PathBuf::new(),
            repository: RepositoryConfig::default(),
            git: GitConfig::default(),
            auth: AuthConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Loads configuration from `path` (optional), `.env` and the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(env_file) = dotenvy::dotenv() {
            tracing::debug!(path = %env_file.display(), "loaded .env");
        }
        Self::from_sources(path, std::env::vars())
    }

    /// Loads configuration from `path` (optional) and an explicit set of
    /// environment variables.
    pub fn from_sources<I>(path: Option<&Path>, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: ::config::Map<String, String> = vars.into_iter().collect();

        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(false));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix("CONCERTO")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("git.options")
                .try_parsing(true)
                .source(Some(vars.clone())),
        );
        for (var, key) in LEGACY_ENV {
            builder = builder.set_override_option(key, vars.get(var).cloned())?;
        }

        let config: GatewayConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks required settings and cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domain.is_empty() {
            return Err(ConfigError::Missing("DOMAIN"));
        }
        if self.realm.is_empty() {
            return Err(ConfigError::Missing("REALM"));
        }
        if self.main_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing("MAIN_PATH"));
        }
        if self.realm.contains('"') || self.realm.chars().any(char::is_control) {
            return Err(ConfigError::Invalid(
                "realm must not contain quotes or control characters".to_string(),
            ));
        }
        if self.repository.layout == RepoLayout::Nested && self.repository.subdirectory.is_empty()
        {
            return Err(ConfigError::Invalid(
                "repository.subdirectory must not be empty for the nested layout".to_string(),
            ));
        }
        if self.auth.validator == ValidatorKind::Static && self.auth.users.is_empty() {
            return Err(ConfigError::Invalid(
                "auth.validator = static requires at least one entry in auth.users".to_string(),
            ));
        }
        Ok(())
    }

    /// Socket address to listen on.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}
