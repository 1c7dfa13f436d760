use anyhow::Result;
use std::{env, io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod errors;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + run mode ---
    let (cfg, args) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting s3-console with config: {:?}", cfg);

    // --- Initialize SQLite connection ---
    let pool = Arc::new(db::connect(&cfg.database_url).await?);

    // --- Handle migration mode ---
    if args.migrate {
        db::apply_migrations(&pool).await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    let state = state::AppState::new(
        pool.clone(),
        chrono::Duration::hours(cfg.session_ttl_hours),
    );

    // --- Handle user-provisioning mode ---
    if let Some(username) = &args.create_user {
        let password = env::var("S3_CONSOLE_USER_PASSWORD")
            .map_err(|_| anyhow::anyhow!("S3_CONSOLE_USER_PASSWORD must be set to create a user"))?;
        let user = state.users.create_user(username, &password).await?;
        tracing::info!("Created user `{}` ({})", user.username, user.id);
        return Ok(());
    }

    // --- Build router ---
    let app = routes::routes::routes(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
