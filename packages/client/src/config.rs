//! Endpoint configuration.
//!
//! One endpoint per deployment, resolved once at session start. The scheme
//! follows the environment: `ws://` locally, `wss://` in production.

use std::fmt;

use crate::error::ConfigError;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 8000;
const WS_PATH: &str = "/ws";

/// The possible runtime environment for the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }

    /// Default for the current build profile
    pub fn from_build_profile() -> Self {
        if cfg!(debug_assertions) {
            Environment::Local
        } else {
            Environment::Production
        }
    }

    fn scheme(&self) -> &'static str {
        match self {
            Environment::Local => "ws",
            Environment::Production => "wss",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Environment {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            _ => Err(ConfigError::InvalidEnvironment(value)),
        }
    }
}

/// Where the room server lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    /// `None` means the scheme's default port
    pub port: Option<u16>,
    pub environment: Environment,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: Some(DEFAULT_PORT),
            environment: Environment::from_build_profile(),
        }
    }
}

impl ClientConfig {
    /// Read `APP_ENVIRONMENT`, `APP_HOST` and `APP_PORT`, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(environment) = lookup("APP_ENVIRONMENT") {
            config.environment = Environment::try_from(environment)?;
        }
        if let Some(host) = lookup("APP_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("APP_PORT") {
            let parsed = port
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
            config.port = Some(parsed);
        }

        Ok(config)
    }

    /// The WebSocket URL sessions connect to
    pub fn endpoint(&self) -> String {
        match self.port {
            Some(port) => format!(
                "{}://{}:{}{}",
                self.environment.scheme(),
                self.host,
                port,
                WS_PATH
            ),
            None => format!("{}://{}{}", self.environment.scheme(), self.host, WS_PATH),
        }
    }
}
