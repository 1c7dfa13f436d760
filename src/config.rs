use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub session_ttl_hours: i64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "S3 file-manager console API")]
pub struct Args {
    /// Host to bind to (overrides S3_CONSOLE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides S3_CONSOLE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides S3_CONSOLE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Session lifetime in hours (overrides S3_CONSOLE_SESSION_TTL_HOURS)
    #[arg(long)]
    pub session_ttl_hours: Option<i64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,

    /// Create a console user and exit. The password is read from the
    /// S3_CONSOLE_USER_PASSWORD environment variable.
    #[arg(long, value_name = "USERNAME")]
    pub create_user: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and run-mode args.
    pub fn from_env_and_args() -> Result<(Self, Args)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("S3_CONSOLE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("S3_CONSOLE_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing S3_CONSOLE_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading S3_CONSOLE_PORT"),
        };
        let env_db = env::var("S3_CONSOLE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/s3_console.db".into());
        let env_ttl = match env::var("S3_CONSOLE_SESSION_TTL_HOURS") {
            Ok(value) => value
                .parse::<i64>()
                .with_context(|| format!("parsing S3_CONSOLE_SESSION_TTL_HOURS value `{}`", value))?,
            Err(env::VarError::NotPresent) => 24,
            Err(err) => return Err(err).context("reading S3_CONSOLE_SESSION_TTL_HOURS"),
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.clone().unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.clone().unwrap_or(env_db),
            session_ttl_hours: args.session_ttl_hours.unwrap_or(env_ttl),
        };

        Ok((cfg, args))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
