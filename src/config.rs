//! Configuration management for Hanzo Commerce
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//!
//! Precedence, lowest to highest: built-in defaults, the YAML file,
//! `HANZO_COMMERCE_*` environment variables, command-line flags.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::flow::{IamAuthConfig, DEFAULT_SCOPES};
use crate::client::{CommerceClientConfig, DEFAULT_BASE_URL};
use crate::error::{CommerceError, Result};
use crate::session::SessionTokenStore;
use crate::storage::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};

/// Default IAM server.
pub const DEFAULT_IAM_SERVER_URL: &str = "https://hanzo.id";

/// Default OAuth client identifier.
pub const DEFAULT_IAM_CLIENT_ID: &str = "hanzo-app-client-id";

/// Default redirect URI for the command-line login.
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8765/callback";

/// Storage backends accepted in `storage.backend`.
pub const STORAGE_BACKENDS: [&str; 3] = ["memory", "file", "keyring"];

/// Main configuration structure for Hanzo Commerce
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Identity provider settings
    #[serde(default)]
    pub iam: IamConfig,
    /// Commerce API settings
    #[serde(default)]
    pub commerce: CommerceConfig,
    /// Session storage settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Identity provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IamConfig {
    /// IAM server base URL
    #[serde(default = "default_iam_server_url")]
    pub server_url: String,
    /// OAuth client identifier
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Redirect URI registered for the client
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    /// Space-separated scopes
    #[serde(default = "default_scopes")]
    pub scopes: String,
}

fn default_iam_server_url() -> String {
    DEFAULT_IAM_SERVER_URL.to_string()
}

fn default_client_id() -> String {
    DEFAULT_IAM_CLIENT_ID.to_string()
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

fn default_scopes() -> String {
    DEFAULT_SCOPES.to_string()
}

impl Default for IamConfig {
    fn default() -> Self {
        Self {
            server_url: default_iam_server_url(),
            client_id: default_client_id(),
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
        }
    }
}

/// Commerce API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommerceConfig {
    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Static bearer token; when set it is used instead of the session token
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            token: None,
        }
    }
}

/// Session storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// One of `memory`, `file`, `keyring`
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Session file for the `file` backend; defaults to the platform data dir
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Service name for the `keyring` backend
    #[serde(default = "default_keyring_service")]
    pub keyring_service: String,
}

fn default_backend() -> String {
    "file".to_string()
}

fn default_keyring_service() -> String {
    crate::storage::os_keyring::DEFAULT_SERVICE.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
            keyring_service: default_keyring_service(),
        }
    }
}

impl StorageConfig {
    /// The session file the `file` backend would use.
    pub fn file_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(FileTokenStore::default_path)
    }

    /// Opens the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::Config`] for an unknown backend or when no
    /// session file location can be determined, and the backend's own error
    /// if opening fails.
    pub fn open(&self) -> Result<Arc<dyn TokenStore>> {
        match self.backend.as_str() {
            "memory" => Ok(Arc::new(MemoryTokenStore::new())),
            "file" => {
                let path = self.file_path().ok_or_else(|| {
                    CommerceError::Config(
                        "no home directory; set storage.path or HANZO_COMMERCE_STORAGE_PATH"
                            .to_string(),
                    )
                })?;
                Ok(Arc::new(FileTokenStore::open(path)?))
            }
            "keyring" => Ok(Arc::new(KeyringTokenStore::with_service(
                self.keyring_service.clone(),
            ))),
            other => Err(CommerceError::Config(format!(
                "Invalid storage backend: {}. Must be one of: {}",
                other,
                STORAGE_BACKENDS.join(", ")
            ))),
        }
    }
}

/// Command-line values that override the loaded configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Storage backend
    pub storage: Option<String>,
    /// Session file path
    pub storage_path: Option<PathBuf>,
    /// Commerce API base URL
    pub api_url: Option<String>,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: impl AsRef<Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env_vars();
        config.apply_overrides(overrides);

        Ok(config)
    }

    /// Platform default config file location.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("ai", "hanzo", "hanzo-commerce")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CommerceError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| CommerceError::Config(format!("Failed to parse config: {}", e)))
    }

    fn apply_env_vars(&mut self) {
        if let Ok(url) = std::env::var("HANZO_COMMERCE_IAM_URL") {
            self.iam.server_url = url;
        }

        if let Ok(client_id) = std::env::var("HANZO_COMMERCE_CLIENT_ID") {
            self.iam.client_id = client_id;
        }

        if let Ok(redirect_uri) = std::env::var("HANZO_COMMERCE_REDIRECT_URI") {
            self.iam.redirect_uri = redirect_uri;
        }

        if let Ok(api_url) = std::env::var("HANZO_COMMERCE_API_URL") {
            self.commerce.base_url = api_url;
        }

        if let Ok(timeout) = std::env::var("HANZO_COMMERCE_TIMEOUT_SECS") {
            if let Ok(value) = timeout.trim().parse() {
                self.commerce.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid HANZO_COMMERCE_TIMEOUT_SECS: {}", timeout);
            }
        }

        if let Ok(token) = std::env::var("HANZO_COMMERCE_TOKEN") {
            if !token.is_empty() {
                self.commerce.token = Some(token);
                tracing::debug!("Env override: HANZO_COMMERCE_TOKEN");
            }
        }

        if let Ok(backend) = std::env::var("HANZO_COMMERCE_STORAGE") {
            self.storage.backend = backend.to_lowercase();
        }

        if let Ok(path) = std::env::var("HANZO_COMMERCE_STORAGE_PATH") {
            tracing::debug!(path = %path, "Env override: HANZO_COMMERCE_STORAGE_PATH");
            self.storage.path = Some(PathBuf::from(path));
        }
    }

    fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(backend) = &overrides.storage {
            self.storage.backend = backend.to_lowercase();
        }
        if let Some(path) = &overrides.storage_path {
            self.storage.path = Some(path.clone());
        }
        if let Some(api_url) = &overrides.api_url {
            self.commerce.base_url = api_url.clone();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::Config`] naming the first invalid setting
    pub fn validate(&self) -> Result<()> {
        if self.iam.client_id.trim().is_empty() {
            return Err(CommerceError::Config("iam.client_id cannot be empty".to_string()));
        }

        for (name, value) in [
            ("iam.server_url", &self.iam.server_url),
            ("iam.redirect_uri", &self.iam.redirect_uri),
            ("commerce.base_url", &self.commerce.base_url),
        ] {
            Url::parse(value).map_err(|e| {
                CommerceError::Config(format!("{} is not a valid URL ({}): {}", name, value, e))
            })?;
        }

        if self.commerce.timeout_seconds == 0 {
            return Err(CommerceError::Config(
                "commerce.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if !STORAGE_BACKENDS.contains(&self.storage.backend.as_str()) {
            return Err(CommerceError::Config(format!(
                "Invalid storage backend: {}. Must be one of: {}",
                self.storage.backend,
                STORAGE_BACKENDS.join(", ")
            )));
        }

        Ok(())
    }

    /// Login flow settings.
    pub fn iam_auth_config(&self) -> IamAuthConfig {
        IamAuthConfig {
            iam_server_url: self.iam.server_url.clone(),
            client_id: self.iam.client_id.clone(),
            redirect_uri: self.iam.redirect_uri.clone(),
            scopes: self.iam.scopes.clone(),
        }
    }

    /// Commerce client settings, without a token.
    pub fn client_config(&self) -> CommerceClientConfig {
        CommerceClientConfig {
            base_url: self.commerce.base_url.clone(),
            token: self.commerce.token.clone(),
            timeout: Duration::from_secs(self.commerce.timeout_seconds),
        }
    }

    /// Opens the configured session.
    ///
    /// # Errors
    ///
    /// See [`StorageConfig::open`].
    pub fn open_session(&self) -> Result<SessionTokenStore> {
        Ok(SessionTokenStore::new(self.storage.open()?))
    }
}
