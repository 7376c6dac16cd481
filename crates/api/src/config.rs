//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MARQUEE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `MARQUEE_BASE_URL` - Public URL of the API
//! - `MARQUEE_TOKEN_SECRET` - Session token signing key (min 32 chars, high entropy)
//!
//! ## Optional
//! - `MARQUEE_HOST` - Bind address (default: 127.0.0.1)
//! - `MARQUEE_PORT` - Listen port (default: 8080)
//! - `MARQUEE_TOKEN_TTL_SECS` - Session token lifetime in seconds (default: 86400)
//! - `STORAGE_TYPE` - `local` or `s3` (default: local)
//! - `STORAGE_UPLOAD_DIR` - Root directory for the local backend (default: ./uploads)
//! - `AWS_S3_ACCESS_KEY` / `AWS_S3_SECRET_KEY` - Remote credentials
//! - `AWS_S3_BUCKET` / `AWS_S3_REGION` - Required once the remote backend is selected
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` - Outbound email
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_TOKEN_TTL_SECS: u64 = 86_400;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: Url,
    /// Session token configuration
    pub token: TokenConfig,
    /// Artifact storage configuration
    pub storage: StorageConfig,
    /// Outbound email configuration (`None` disables delivery)
    pub email: Option<EmailConfig>,
    /// Sentry error tracking configuration
    pub sentry: SentryConfig,
}

/// Session token signing configuration.
#[derive(Clone)]
pub struct TokenConfig {
    /// HMAC signing key
    pub secret: SecretString,
    /// Fixed lifetime of every issued token
    pub ttl: Duration,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Requested storage backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    #[default]
    Local,
    S3,
}

impl std::str::FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("local") {
            Ok(Self::Local)
        } else if s.eq_ignore_ascii_case("s3") {
            Ok(Self::S3)
        } else {
            Err(format!("expected 'local' or 's3', got '{s}'"))
        }
    }
}

/// Artifact storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Backend requested by the operator
    pub kind: StorageKind,
    /// Root directory of the local backend
    pub upload_dir: PathBuf,
    /// Remote backend settings
    pub s3: S3Config,
}

impl StorageConfig {
    /// Whether the remote backend is selected.
    ///
    /// Remote storage is used only when explicitly requested and both
    /// credential fields are non-blank. Everything else falls back to local.
    #[must_use]
    pub fn remote_selected(&self) -> bool {
        self.kind == StorageKind::S3 && self.s3.has_credentials()
    }
}

/// Remote object storage settings.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct S3Config {
    pub access_key: String,
    pub secret_key: SecretString,
    pub bucket: Option<String>,
    pub region: Option<String>,
}

impl S3Config {
    /// Both credential fields are present and non-blank.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.access_key.trim().is_empty() && !self.secret_key.expose_secret().trim().is_empty()
    }
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("access_key", &self.access_key)
            .field("secret_key", &"[REDACTED]")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish()
    }
}

/// SMTP configuration for outbound email.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_source(&|key: &str| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`ApiConfig::from_env`].
    pub fn from_source(vars: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(vars);

        let database_url = env
            .optional("MARQUEE_DATABASE_URL")
            .or_else(|| env.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("MARQUEE_DATABASE_URL".to_string()))?;
        let host = env.parsed_or("MARQUEE_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = env.parsed_or("MARQUEE_PORT", 8080_u16)?;
        let base_url = Url::parse(&env.required("MARQUEE_BASE_URL")?).map_err(|e| {
            ConfigError::InvalidEnvVar("MARQUEE_BASE_URL".to_string(), e.to_string())
        })?;

        let token = TokenConfig {
            secret: env.validated_secret("MARQUEE_TOKEN_SECRET")?,
            ttl: Duration::from_secs(
                env.parsed_or("MARQUEE_TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?,
            ),
        };
        if token.ttl.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "MARQUEE_TOKEN_TTL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let storage = StorageConfig::from_env(&env)?;
        let email = EmailConfig::from_env(&env)?;
        let sentry = SentryConfig {
            dsn: env.optional("SENTRY_DSN"),
            environment: env.optional("SENTRY_ENVIRONMENT"),
            sample_rate: env.parsed_or("SENTRY_SAMPLE_RATE", 1.0)?,
            traces_sample_rate: env.parsed_or("SENTRY_TRACES_SAMPLE_RATE", 0.1)?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            token,
            storage,
            email,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl StorageConfig {
    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        let kind = env.parsed_or("STORAGE_TYPE", StorageKind::Local)?;
        let config = Self {
            kind,
            upload_dir: PathBuf::from(env.or_default("STORAGE_UPLOAD_DIR", "./uploads")),
            s3: S3Config {
                access_key: env.or_default("AWS_S3_ACCESS_KEY", ""),
                secret_key: SecretString::from(env.or_default("AWS_S3_SECRET_KEY", "")),
                bucket: env.optional("AWS_S3_BUCKET"),
                region: env.optional("AWS_S3_REGION"),
            },
        };

        if config.remote_selected() {
            if config.s3.bucket.is_none() {
                return Err(ConfigError::MissingEnvVar("AWS_S3_BUCKET".to_string()));
            }
            if config.s3.region.is_none() {
                return Err(ConfigError::MissingEnvVar("AWS_S3_REGION".to_string()));
            }
        }

        Ok(config)
    }
}

impl EmailConfig {
    fn from_env(env: &Env<'_>) -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = env.optional("SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(Self {
            smtp_host,
            smtp_port: env.parsed_or("SMTP_PORT", 587_u16)?,
            smtp_username: env.required("SMTP_USERNAME")?,
            smtp_password: SecretString::from(env.required("SMTP_PASSWORD")?),
            from_address: env.required("EMAIL_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with the helpers every section uses.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional variable. Blank values count as absent.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, using `default` when it is absent.
    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    /// Load a signing secret and check its length and strength.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = SecretString::from(self.required(key)?);
        validate_secret_length(&value, key)?;
        validate_secret_strength(value.expose_secret(), key)?;
        Ok(value)
    }
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const GOOD_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%dF8";

    fn load(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ApiConfig::from_source(&move |key: &str| vars.get(key).cloned())
    }

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("MARQUEE_DATABASE_URL", "postgres://localhost/marquee"),
            ("MARQUEE_BASE_URL", "http://localhost:8080"),
            ("MARQUEE_TOKEN_SECRET", GOOD_SECRET),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = load(&base()).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.token.ttl, Duration::from_secs(86_400));
        assert_eq!(config.storage.kind, StorageKind::Local);
        assert_eq!(config.storage.upload_dir, PathBuf::from("./uploads"));
        assert!(config.email.is_none());
        assert!(config.sentry.dsn.is_none());
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[
            ("DATABASE_URL", "postgres://fallback/db"),
            ("MARQUEE_BASE_URL", "http://localhost:8080"),
            ("MARQUEE_TOKEN_SECRET", GOOD_SECRET),
        ])
        .unwrap();
        assert_eq!(config.database_url.expose_secret(), "postgres://fallback/db");
    }

    #[test]
    fn test_missing_token_secret() {
        let result = load(&[
            ("MARQUEE_DATABASE_URL", "postgres://localhost/marquee"),
            ("MARQUEE_BASE_URL", "http://localhost:8080"),
        ]);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(key)) if key == "MARQUEE_TOKEN_SECRET"));
    }

    #[test]
    fn test_weak_token_secret_rejected() {
        let mut vars = base();
        vars[2] = ("MARQUEE_TOKEN_SECRET", "short");
        assert!(matches!(load(&vars), Err(ConfigError::InsecureSecret(_, _))));

        vars[2] = ("MARQUEE_TOKEN_SECRET", "changeme-changeme-changeme-changeme");
        assert!(matches!(load(&vars), Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_storage_type_is_case_insensitive() {
        let mut vars = base();
        vars.push(("STORAGE_TYPE", "S3"));
        let config = load(&vars).unwrap();
        assert_eq!(config.storage.kind, StorageKind::S3);
    }

    #[test]
    fn test_unknown_storage_type_rejected() {
        let mut vars = base();
        vars.push(("STORAGE_TYPE", "gcs"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_remote_without_credentials_falls_back_to_local() {
        let mut vars = base();
        vars.push(("STORAGE_TYPE", "s3"));
        vars.push(("AWS_S3_ACCESS_KEY", "AKIDEXAMPLE"));
        vars.push(("AWS_S3_SECRET_KEY", "  "));
        let config = load(&vars).unwrap();
        assert!(!config.storage.remote_selected());
    }

    #[test]
    fn test_remote_requires_bucket_and_region() {
        let mut vars = base();
        vars.push(("STORAGE_TYPE", "s3"));
        vars.push(("AWS_S3_ACCESS_KEY", "AKIDEXAMPLE"));
        vars.push(("AWS_S3_SECRET_KEY", "wJalrXUtnFEMI/K7MDENG"));
        assert!(matches!(load(&vars), Err(ConfigError::MissingEnvVar(key)) if key == "AWS_S3_BUCKET"));

        vars.push(("AWS_S3_BUCKET", "posters"));
        vars.push(("AWS_S3_REGION", "eu-west-1"));
        assert!(load(&vars).unwrap().storage.remote_selected());
    }

    #[test]
    fn test_email_is_all_or_nothing() {
        let mut vars = base();
        vars.push(("SMTP_HOST", "smtp.mail.test"));
        assert!(matches!(load(&vars), Err(ConfigError::MissingEnvVar(_))));

        vars.push(("SMTP_USERNAME", "mailer"));
        vars.push(("SMTP_PASSWORD", "hunter2"));
        vars.push(("EMAIL_FROM", "Marquee <tickets@marquee.test>"));
        let email = load(&vars).unwrap().email.unwrap();
        assert_eq!(email.smtp_port, 587);
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&base()).unwrap();
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(GOOD_SECRET));
    }
}
