use anyhow::{Context, Result};
use clap::Parser;
use std::{env, fmt};

/// Well-known local storage emulator connection string. The embedded account
/// key is the publicly documented emulator credential, safe only for local
/// development; startup warns whenever this fallback is in use.
pub const DEV_CONNECTION_STRING: &str = "DefaultEndpointsProtocol=http;\
AccountName=devstoreaccount1;\
AccountKey=Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==;\
BlobEndpoint=http://127.0.0.1:10000/devstoreaccount1;\
QueueEndpoint=http://127.0.0.1:10001/devstoreaccount1;\
TableEndpoint=http://127.0.0.1:10002/devstoreaccount1;";

/// Development-only storage account key (the public emulator credential).
pub const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_account_key: String,
    pub connection_string: String,
    pub staged_container: String,
    pub validated_container: String,
    pub storage_dir: String,
    pub database_url: String,
    pub storage_timeout_secs: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Data Hub External API")]
pub struct Args {
    /// Host to bind to (overrides DATAHUB_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides DATAHUB_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Storage connection string (overrides DATAHUB_CONNECTION_STRING)
    #[arg(long)]
    pub connection_string: Option<String>,

    /// Staged-data container name (overrides DATAHUB_STAGED_DATA_CONTAINER)
    #[arg(long)]
    pub staged_container: Option<String>,

    /// Validated-data container name (overrides DATAHUB_VALIDATED_DATA_CONTAINER)
    #[arg(long)]
    pub validated_container: Option<String>,

    /// Directory where blob payloads are stored (overrides DATAHUB_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides DATAHUB_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Per-storage-call timeout in seconds (overrides DATAHUB_STORAGE_TIMEOUT_SECS)
    #[arg(long)]
    pub storage_timeout_secs: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("DATAHUB_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("DATAHUB_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing DATAHUB_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 7070,
            Err(err) => return Err(err).context("reading DATAHUB_PORT"),
        };
        // The account key is a secret and deliberately has no CLI flag.
        let env_account_key =
            env::var("DATAHUB_STORAGE_ACCOUNT_KEY").unwrap_or_else(|_| DEV_ACCOUNT_KEY.into());
        let env_connection = env::var("DATAHUB_CONNECTION_STRING")
            .unwrap_or_else(|_| DEV_CONNECTION_STRING.into());
        let env_staged =
            env::var("DATAHUB_STAGED_DATA_CONTAINER").unwrap_or_else(|_| "staging".into());
        let env_validated =
            env::var("DATAHUB_VALIDATED_DATA_CONTAINER").unwrap_or_else(|_| "raw".into());
        let env_storage =
            env::var("DATAHUB_STORAGE_DIR").unwrap_or_else(|_| "./data/blobs".into());
        let env_db = env::var("DATAHUB_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/datahub.db".into());
        let env_timeout = match env::var("DATAHUB_STORAGE_TIMEOUT_SECS") {
            Ok(value) => value
                .parse::<u64>()
                .with_context(|| format!("parsing DATAHUB_STORAGE_TIMEOUT_SECS value `{}`", value))?,
            Err(env::VarError::NotPresent) => 30,
            Err(err) => return Err(err).context("reading DATAHUB_STORAGE_TIMEOUT_SECS"),
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_account_key: env_account_key,
            connection_string: args.connection_string.unwrap_or(env_connection),
            staged_container: args.staged_container.unwrap_or(env_staged),
            validated_container: args.validated_container.unwrap_or(env_validated),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            storage_timeout_secs: args.storage_timeout_secs.unwrap_or(env_timeout),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// True when running on the development-only emulator fallback.
    pub fn uses_dev_fallback(&self) -> bool {
        self.connection_string == DEV_CONNECTION_STRING
    }
}

/// Manual Debug so the startup config log never leaks credentials.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("storage_account_key", &"<redacted>")
            .field("connection_string", &"<redacted>")
            .field("staged_container", &self.staged_container)
            .field("validated_container", &self.validated_container)
            .field("storage_dir", &self.storage_dir)
            .field("database_url", &self.database_url)
            .field("storage_timeout_secs", &self.storage_timeout_secs)
            .finish()
    }
}

/// Parsed view of a storage connection string.
///
/// Only the fields this service needs are extracted; unknown pairs are
/// ignored. The account key itself may contain `=` padding, so pairs split
/// on the first `=` only.
#[derive(Debug, Clone)]
pub struct ConnectionString {
    pub account_name: String,
    pub account_key: String,
    pub blob_endpoint: Option<String>,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut account_name = None;
        let mut account_key = None;
        let mut blob_endpoint = None;

        for pair in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("malformed connection string segment `{}`", pair))?;
            match key {
                "AccountName" => account_name = Some(value.to_string()),
                "AccountKey" => account_key = Some(value.to_string()),
                "BlobEndpoint" => blob_endpoint = Some(value.to_string()),
                _ => {}
            }
        }

        Ok(Self {
            account_name: account_name.context("connection string missing AccountName")?,
            account_key: account_key.context("connection string missing AccountKey")?,
            blob_endpoint,
        })
    }
}
