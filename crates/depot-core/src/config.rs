//! Configuration module
//!
//! Configuration is read once from the environment in [`Config::from_env`] and
//! passed explicitly to every component; there are no process-global clients
//! or lazily-initialized singletons.

use std::env;
use std::path::PathBuf;

const DEFAULT_SERVER_PORT: u16 = 8080;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_UPLOAD_SIZE_BYTES: usize = 32 * 1024 * 1024;
const DEFAULT_REMOTE_KEY_PREFIX: &str = "file-store";
const DEFAULT_PRESIGNED_URL_TTL_SECS: u64 = 24 * 3600;
const DEFAULT_TRANSFER_CONSUMERS: usize = 1;
const DEFAULT_TRANSFER_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_TRANSFER_MAX_RETRIES: i32 = 3;
const DEFAULT_UPLOAD_SESSION_TTL_SECS: u64 = 24 * 3600;
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 3600;
const DEFAULT_DELETION_POOL_SIZE: usize = 4;

/// Remote object store backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteBackend {
    S3,
    Local,
}

impl RemoteBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "s3" => Some(RemoteBackend::S3),
            "local" => Some(RemoteBackend::Local),
            _ => None,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,

    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,

    /// Directory holding canonical local copies of accepted files.
    pub file_store_dir: PathBuf,
    /// Directory holding staged chunks, one subdirectory per upload id.
    pub chunk_staging_dir: PathBuf,
    pub max_upload_size_bytes: usize,

    pub remote_backend: RemoteBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub local_remote_dir: Option<PathBuf>,
    pub remote_key_prefix: String,
    pub presigned_url_ttl_secs: u64,

    pub transfer_consumers: usize,
    pub transfer_poll_interval_ms: u64,
    pub transfer_max_retries: i32,

    /// Age after which an unmerged upload session and its staging directory
    /// are reclaimed by the cleanup sweep.
    pub upload_session_ttl_secs: u64,
    pub cleanup_interval_secs: u64,
    pub deletion_pool_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        // Load .env if present; real environment wins.
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let remote_backend = match env::var("REMOTE_BACKEND") {
            Ok(value) => RemoteBackend::parse(&value).ok_or_else(|| {
                anyhow::anyhow!("REMOTE_BACKEND must be 's3' or 'local', got '{}'", value)
            })?,
            Err(_) => RemoteBackend::Local,
        };

        let config = Self {
            server_port: env_parse("SERVER_PORT", DEFAULT_SERVER_PORT),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().to_string())
                .collect(),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            db_timeout_seconds: env_parse("DB_TIMEOUT_SECONDS", DEFAULT_DB_TIMEOUT_SECS),

            file_store_dir: PathBuf::from(
                env::var("FILE_STORE_DIR").unwrap_or_else(|_| "/var/lib/depot/files".to_string()),
            ),
            chunk_staging_dir: PathBuf::from(
                env::var("CHUNK_STAGING_DIR")
                    .unwrap_or_else(|_| "/var/lib/depot/chunks".to_string()),
            ),
            max_upload_size_bytes: env_parse(
                "MAX_UPLOAD_SIZE_BYTES",
                DEFAULT_MAX_UPLOAD_SIZE_BYTES,
            ),

            remote_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_remote_dir: env::var("LOCAL_REMOTE_DIR").ok().map(PathBuf::from),
            remote_key_prefix: env::var("REMOTE_KEY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_REMOTE_KEY_PREFIX.to_string()),
            presigned_url_ttl_secs: env_parse(
                "PRESIGNED_URL_TTL_SECS",
                DEFAULT_PRESIGNED_URL_TTL_SECS,
            ),

            transfer_consumers: env_parse("TRANSFER_CONSUMERS", DEFAULT_TRANSFER_CONSUMERS),
            transfer_poll_interval_ms: env_parse(
                "TRANSFER_POLL_INTERVAL_MS",
                DEFAULT_TRANSFER_POLL_INTERVAL_MS,
            ),
            transfer_max_retries: env_parse("TRANSFER_MAX_RETRIES", DEFAULT_TRANSFER_MAX_RETRIES),

            upload_session_ttl_secs: env_parse(
                "UPLOAD_SESSION_TTL_SECS",
                DEFAULT_UPLOAD_SESSION_TTL_SECS,
            ),
            cleanup_interval_secs: env_parse(
                "CLEANUP_INTERVAL_SECS",
                DEFAULT_CLEANUP_INTERVAL_SECS,
            ),
            deletion_pool_size: env_parse("DELETION_POOL_SIZE", DEFAULT_DELETION_POOL_SIZE),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.remote_backend == RemoteBackend::S3 && self.s3_bucket.is_none() {
            anyhow::bail!("S3_BUCKET must be set when REMOTE_BACKEND=s3");
        }
        if self.remote_backend == RemoteBackend::Local && self.local_remote_dir.is_none() {
            anyhow::bail!("LOCAL_REMOTE_DIR must be set when REMOTE_BACKEND=local");
        }
        if self.transfer_consumers == 0 {
            anyhow::bail!("TRANSFER_CONSUMERS must be at least 1");
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_backend_parse() {
        assert_eq!(RemoteBackend::parse("s3"), Some(RemoteBackend::S3));
        assert_eq!(RemoteBackend::parse("S3"), Some(RemoteBackend::S3));
        assert_eq!(RemoteBackend::parse("local"), Some(RemoteBackend::Local));
        assert_eq!(RemoteBackend::parse("gcs"), None);
    }

    #[test]
    fn env_parse_falls_back_to_default() {
        assert_eq!(env_parse("DEPOT_TEST_UNSET_KEY", 42u32), 42);
    }
}
