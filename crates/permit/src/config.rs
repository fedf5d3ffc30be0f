//! Process configuration.
//!
//! Every setting is a command line flag with an environment variable
//! fallback, so the binary runs unchanged under a process supervisor.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::builder::FalseyValueParser;
use clap::{Args, ValueEnum};
use permit_api::{ApiConfig, DEFAULT_CHECK_REQUESTS_PER_HOUR};
use permit_store::{FsStore, Keeper, SqliteStore};

/// File name of the SQLite database inside the storage directory.
pub const SQLITE_FILE: &str = "permits.db";

/// Which storage backend to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// One JSON file per permit.
    #[default]
    Fs,
    /// A single SQLite database file.
    Sqlite,
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Directory permits are stored in
    #[arg(long, env = "STORAGE_FS_PATH", default_value = "./permits", global = true)]
    pub storage_path: PathBuf,

    /// Storage backend
    #[arg(long, env = "STORAGE_BACKEND", value_enum, default_value_t = Backend::Fs, global = true)]
    pub storage_backend: Backend,

    /// Address the HTTP API listens on
    #[arg(long, env = "API_LISTEN", default_value = "127.0.0.1:8080", global = true)]
    pub listen: SocketAddr,

    /// HS256 secret for create requests; required by `api`
    #[arg(long, env = "JWT_SECRET", hide_env_values = true, global = true)]
    pub jwt_secret: Option<String>,

    /// `/check` requests allowed per client per hour
    #[arg(long, env = "CHECK_REQUESTS_PER_HOUR", default_value_t = DEFAULT_CHECK_REQUESTS_PER_HOUR, global = true)]
    pub check_requests_per_hour: NonZeroU32,

    /// Log filter, e.g. `info` or `permit_api=debug`
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Human readable logs instead of JSON
    #[arg(long, env = "LOG_PRETTY", global = true, value_parser = FalseyValueParser::new())]
    pub log_pretty: bool,
}

impl Settings {
    /// Open the configured store, creating its directory if needed.
    pub fn open_keeper(&self) -> Result<Arc<dyn Keeper>> {
        match self.storage_backend {
            Backend::Fs => {
                let store = FsStore::open(&self.storage_path).with_context(|| {
                    format!("could not open permit directory {}", self.storage_path.display())
                })?;
                Ok(Arc::new(store))
            }
            Backend::Sqlite => {
                std::fs::create_dir_all(&self.storage_path).with_context(|| {
                    format!("could not create {}", self.storage_path.display())
                })?;
                let path = self.storage_path.join(SQLITE_FILE);
                let store = SqliteStore::open(&path)
                    .with_context(|| format!("could not open database {}", path.display()))?;
                Ok(Arc::new(store))
            }
        }
    }

    /// Settings for the HTTP service. Fails without a JWT secret.
    pub fn api_config(&self) -> Result<ApiConfig> {
        let secret = self
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .context("JWT_SECRET is required to serve the API")?;
        Ok(ApiConfig::new(secret).check_requests_per_hour(self.check_requests_per_hour))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        settings: Settings,
    }

    fn parse(args: &[&str]) -> Settings {
        TestCli::try_parse_from(std::iter::once("permit").chain(args.iter().copied()))
            .unwrap()
            .settings
    }

    #[test]
    fn test_flags_override_defaults() {
        let settings = parse(&[
            "--storage-path",
            "/tmp/permits",
            "--storage-backend",
            "sqlite",
            "--listen",
            "0.0.0.0:9000",
            "--check-requests-per-hour",
            "5",
        ]);
        assert_eq!(settings.storage_path, PathBuf::from("/tmp/permits"));
        assert_eq!(settings.storage_backend, Backend::Sqlite);
        assert_eq!(settings.listen.port(), 9000);
        assert_eq!(settings.check_requests_per_hour.get(), 5);
    }

    #[test]
    fn test_api_requires_secret() {
        let mut settings = parse(&[]);
        settings.jwt_secret = None;
        assert!(settings.api_config().is_err());

        settings.jwt_secret = Some(String::new());
        assert!(settings.api_config().is_err());

        settings.jwt_secret = Some("s3cret".into());
        assert!(settings.api_config().is_ok());
    }

    #[test]
    fn test_log_pretty_accepts_shell_booleans() {
        assert!(parse(&["--log-pretty"]).log_pretty);

        for (value, expected) in [("1", true), ("yes", true), ("true", true), ("0", false), ("", false)] {
            std::env::set_var("LOG_PRETTY", value);
            let settings = TestCli::try_parse_from(["permit"]).map(|cli| cli.settings);
            std::env::remove_var("LOG_PRETTY");
            assert_eq!(settings.unwrap().log_pretty, expected, "LOG_PRETTY={value:?}");
        }
    }

    #[test]
    fn test_zero_quota_is_rejected() {
        let result = TestCli::try_parse_from(["permit", "--check-requests-per-hour", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_open_both_backends() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = parse(&[]);
        settings.storage_path = dir.path().join("store");

        settings.open_keeper().unwrap();
        settings.storage_backend = Backend::Sqlite;
        settings.open_keeper().unwrap();
        assert!(settings.storage_path.join(SQLITE_FILE).exists());
    }
}
