/*
 * Responsibility
 * - Load environment variables / .env (FB_SECRET_CREDENTIAL, PORT, gate switch, timeouts)
 * - Validate values (missing or unparsable -> startup failure)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3333;
pub const MAX_LEEWAY_SECONDS: u64 = 3600;
pub const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<&str>) -> Self {
        match raw.unwrap_or("development").to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Settings for the identity-provider client. Only present when the gate is on.
#[derive(Clone)]
pub struct FirebaseConfig {
    pub credential_json: String,
    pub project_id_override: Option<String>,
    pub jwks_url: String,
    pub leeway_seconds: u64,
    pub verify_timeout: Duration,
}

impl fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The credential blob carries a private key
        f.debug_struct("FirebaseConfig")
            .field("project_id_override", &self.project_id_override)
            .field("jwks_url", &self.jwks_url)
            .field("leeway_seconds", &self.leeway_seconds)
            .field("verify_timeout", &self.verify_timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    // None when AUTH_GATE is switched off
    pub firebase: Option<FirebaseConfig>,

    pub request_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (the process env in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV").as_deref());

        let gate_enabled = match lookup("AUTH_GATE") {
            None => true,
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "" | "on" | "true" | "1" | "enabled" => true,
                "off" | "false" | "0" | "disabled" => false,
                _ => return Err(ConfigError::Invalid("AUTH_GATE")),
            },
        };

        let firebase = if gate_enabled {
            let credential_json = lookup("FB_SECRET_CREDENTIAL")
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing("FB_SECRET_CREDENTIAL"))?;

            let project_id_override = lookup("FIREBASE_PROJECT_ID")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());

            let jwks_url = lookup("FIREBASE_JWKS_URL")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_JWKS_URL.to_string());

            let leeway_seconds = parse_or(&lookup, "ID_TOKEN_LEEWAY_SECONDS", 300u64)?;
            if leeway_seconds > MAX_LEEWAY_SECONDS {
                return Err(ConfigError::Invalid("ID_TOKEN_LEEWAY_SECONDS"));
            }
            let verify_timeout_seconds =
                parse_or(&lookup, "ID_TOKEN_VERIFY_TIMEOUT_SECONDS", 10u64)?;
            if verify_timeout_seconds == 0 {
                return Err(ConfigError::Invalid("ID_TOKEN_VERIFY_TIMEOUT_SECONDS"));
            }

            Some(FirebaseConfig {
                credential_json,
                project_id_override,
                jwks_url,
                leeway_seconds,
                verify_timeout: Duration::from_secs(verify_timeout_seconds),
            })
        } else {
            None
        };

        let request_timeout_seconds = parse_or(&lookup, "REQUEST_TIMEOUT_SECONDS", 30u64)?;
        if request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid("REQUEST_TIMEOUT_SECONDS"));
        }
        let shutdown_grace_seconds = parse_or(&lookup, "SHUTDOWN_GRACE_SECONDS", 3u64)?;

        Ok(Self {
            addr,
            app_env,
            firebase,
            request_timeout: Duration::from_secs(request_timeout_seconds),
            shutdown_grace: Duration::from_secs(shutdown_grace_seconds),
        })
    }

    pub fn gate_enabled(&self) -> bool {
        self.firebase.is_some()
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
    }
}
