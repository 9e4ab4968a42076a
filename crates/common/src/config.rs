//! Harness configuration
//!
//! The configuration is assembled once per process:
//!
//! 1. `.env.<ENV>` is read from the project root (`ENV` defaults to `stage`).
//!    Process environment variables win over file values, as with dotenv.
//! 2. When `use_consul` is set, key/value pairs from the remote store are
//!    overlaid on top. Remote values win. A failed fetch keeps the file
//!    values and logs a warning.
//! 3. The merged result can be written to `runtime-config.json` so that test
//!    workers started later read exactly the same values.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::consul::ConsulKv;
use crate::error::{HarnessError, HarnessResult};

/// File name of the merged configuration shared with workers
pub const RUNTIME_CONFIG_FILE: &str = "runtime-config.json";

/// Environment used when `ENV` is unset
pub const DEFAULT_ENV: &str = "stage";

/// Key/value source backed by an env file and, optionally, the process environment
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    file: HashMap<String, String>,
    process_env: bool,
}

impl EnvSource {
    /// Load `.env.<env_name>` from `root`, falling back to the process
    /// environment alone when the file does not exist
    pub fn load(root: &Path, env_name: &str) -> Self {
        let path = root.join(format!(".env.{}", env_name));
        let mut file = HashMap::new();

        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    match item {
                        Ok((key, value)) => {
                            file.insert(key, value);
                        }
                        Err(e) => warn!("Skipping malformed line in {}: {}", path.display(), e),
                    }
                }
                debug!("Loaded {} values from {}", file.len(), path.display());
            }
            Err(_) => {
                warn!(
                    "Environment file {} not found. Using system environment variables.",
                    path.display()
                );
            }
        }

        Self {
            file,
            process_env: true,
        }
    }

    /// A source that only sees the given pairs
    pub fn isolated<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            file: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            process_env: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if self.process_env {
            if let Ok(value) = std::env::var(key) {
                return Some(value);
            }
        }
        self.file.get(key).cloned()
    }

    fn string(&self, key: &str) -> String {
        self.get(key).unwrap_or_default()
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key).as_deref() == Some("true")
    }

    fn port(&self, key: &str, default: u16) -> u16 {
        match self.get(key).and_then(|v| v.trim().parse::<u16>().ok()) {
            Some(0) | None => default,
            Some(port) => port,
        }
    }
}

/// Complete harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    pub use_consul: bool,
    pub consul_host: String,
    pub consul_port: u16,
    pub consul_prefix: String,

    /// Run browsers without a window
    pub headless: bool,

    pub app_name: String,

    /// Request timeout for API calls in milliseconds
    pub default_timeout_ms: u64,

    pub log_level: String,

    pub api_base_url: String,

    /// Prefix prepended to every service path, e.g. `/api`
    pub api_base_path: String,

    pub dashboard_url: String,
    pub dashboard_domain: String,

    pub auth: AuthConfig,
    pub db: DbConfig,

    /// Environment name the file values were read for
    pub env: String,

    /// Remote keys that have no typed field
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Browser authentication state seeded into the dashboard before page load
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// localStorage key the dashboard reads its session from
    pub key: Option<String>,
    pub token: Option<String>,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

impl AuthConfig {
    /// JSON value stored under [`AuthConfig::key`] in localStorage
    pub fn storage_state(&self) -> Value {
        serde_json::json!({
            "token": self.token,
            "user": self.user,
            "loggingIn": false,
        })
    }
}

/// Database lookup configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbConfig {
    /// When false every query is skipped and returns no rows
    pub enabled: bool,
    pub ssh: SshConfig,
    pub pgsql: DbEndpoint,
    pub mysql: DbEndpoint,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SshConfig {
    pub use_ssh: bool,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub private_key_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbEndpoint {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

impl HarnessConfig {
    /// Build the configuration for `ENV` from the current directory
    pub fn from_env() -> Self {
        let env_name = std::env::var("ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::from_source(&EnvSource::load(&root, &env_name), &env_name)
    }

    /// Build the configuration from an explicit source
    pub fn from_source(src: &EnvSource, env_name: &str) -> Self {
        Self {
            use_consul: src.flag("USE_CONSUL"),
            consul_host: src
                .get("CONSUL_HOST")
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            consul_port: src.port("CONSUL_PORT", 8500),
            consul_prefix: src
                .get("CONSUL_PREFIX")
                .unwrap_or_else(|| "ParcelQuest".to_string()),
            headless: src.flag("HEADLESS"),
            app_name: "PlayType-Hybrid-RestApi-Webui".to_string(),
            default_timeout_ms: 30_000,
            log_level: src.get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            api_base_url: src.string("api_base_url"),
            api_base_path: "/api".to_string(),
            dashboard_url: src.string("dashboard_url"),
            dashboard_domain: src.string("domain"),
            auth: AuthConfig {
                key: src.get("AUTH_KEY"),
                token: src.get("AUTH_TOKEN"),
                user: AuthUser {
                    name: src.get("AUTH_USER_NAME"),
                    email: src.get("AUTH_USER_EMAIL"),
                    given_name: src.get("AUTH_GIVEN_NAME"),
                    family_name: src.get("AUTH_FAMILY_NAME"),
                    picture: src.get("AUTH_USER_PIC"),
                },
            },
            db: DbConfig {
                enabled: src.flag("DB_ENABLED"),
                ssh: SshConfig {
                    use_ssh: src.flag("USE_SSH"),
                    host: src.string("SSH_HOST"),
                    port: src.port("SSH_PORT", 22),
                    username: src.string("SSH_USER"),
                    private_key_path: src.string("SSH_KEY_PATH"),
                },
                pgsql: DbEndpoint {
                    host: src.string("PG_DB_HOST"),
                    port: src.port("PG_DB_PORT", 5432),
                    user: src.string("DB_USER"),
                    password: src.string("DB_PASSWORD"),
                    name: src.string("PG_DB_NAME"),
                },
                mysql: DbEndpoint {
                    host: src.string("MYS_DB_HOST"),
                    port: src.port("MYS_DB_PORT", 3306),
                    user: src.string("DB_USER"),
                    password: src.string("DB_PASSWORD"),
                    name: src.string("MYS_DB_NAME"),
                },
            },
            env: env_name.to_string(),
            extra: Map::new(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Apply remote key/value pairs on top of this configuration.
    ///
    /// Top-level keys replace the matching field, dotted keys (`db.enabled`)
    /// replace nested fields and unknown keys are kept in [`HarnessConfig::extra`].
    pub fn overlay(&self, remote: &Map<String, Value>) -> HarnessResult<Self> {
        let mut doc = serde_json::to_value(self)?;
        for (key, value) in remote {
            set_dotted(&mut doc, key, value.clone());
        }
        serde_json::from_value(doc)
            .map_err(|e| HarnessError::Config(format!("remote values do not fit the config: {}", e)))
    }

    /// Overlay values from the remote store when enabled.
    ///
    /// Never fails: any fetch or merge problem leaves the file values as they are.
    pub async fn with_remote_overlay(self) -> Self {
        if !self.use_consul {
            info!("Using only .env configuration (Consul disabled).");
            return self;
        }

        info!(
            "Attempting to fetch config from Consul ({}:{})...",
            self.consul_host, self.consul_port
        );

        let store = match ConsulKv::new(&self.consul_host, self.consul_port, self.request_timeout()) {
            Ok(store) => store,
            Err(e) => {
                warn!("Failed to load Consul configuration. Falling back to .env: {}", e);
                return self;
            }
        };

        match store.fetch(&self.consul_prefix).await {
            Ok(values) if values.is_empty() => {
                warn!("Consul returned empty config - using .env fallback.");
                self
            }
            Ok(values) => match self.overlay(&values) {
                Ok(merged) => {
                    info!("Consul configuration loaded successfully.");
                    merged
                }
                Err(e) => {
                    warn!("Ignoring Consul configuration: {}", e);
                    self
                }
            },
            Err(e) => {
                warn!("Failed to load Consul configuration. Falling back to .env: {}", e);
                self
            }
        }
    }

    /// Write the merged configuration for workers
    pub fn write_runtime(&self, dir: &Path) -> HarnessResult<PathBuf> {
        let path = dir.join(RUNTIME_CONFIG_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!("Merged config written to: {}", path.display());
        Ok(path)
    }

    /// Read a configuration previously written by [`HarnessConfig::write_runtime`]
    pub fn read_runtime(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Configuration as seen by a test worker.
    ///
    /// With the remote store enabled the merged file written at run start is
    /// preferred; otherwise the env file is used directly.
    pub fn load_for_worker(root: &Path) -> Self {
        let config = Self::from_env();
        if !config.use_consul {
            return config;
        }

        let path = root.join(RUNTIME_CONFIG_FILE);
        match Self::read_runtime(&path) {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Cannot read {}: {}. Using .env configuration.", path.display(), e);
                config
            }
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::from_source(&EnvSource::default(), DEFAULT_ENV)
    }
}

fn set_dotted(doc: &mut Value, key: &str, value: Value) {
    let mut segments = key.split('.').peekable();
    let mut cursor = doc;

    while let Some(segment) = segments.next() {
        if !cursor.is_object() {
            *cursor = Value::Object(Map::new());
        }
        let Value::Object(map) = cursor else {
            return;
        };

        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        cursor = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}
