//! PostgreSQL pool construction for the document store.
//!
//! Sessions tag themselves with the configured application name and carry
//! a server-side statement timeout. The pool must hold at least two
//! connections: table bootstrap runs on the pool while an open transaction
//! keeps its own connection checked out.

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

use shipping_core::config::DatabaseConfig;
use shipping_core::error::{AppError, ErrorKind};
use shipping_core::AppResult;

/// One connection for an open transaction, one for table bootstrap.
pub const MIN_POOL_SIZE: u32 = 2;

/// Shared handle to the PostgreSQL pool behind [`PostgresEngine`](crate::PostgresEngine).
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Validate `config`, then open the pool.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let options = connect_options(config)?;
        let pool_options = pool_options(config)?;

        info!(
            url = %mask_password(&config.url),
            application_name = %config.application_name,
            max_connections = config.max_connections,
            statement_timeout_seconds = config.statement_timeout_seconds,
            "Connecting to PostgreSQL"
        );

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to connect to database: {e}"),
                e,
            )
        })?;

        info!(application_name = %config.application_name, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Wrap a pool opened elsewhere, e.g. by a test harness.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Fail once [`close`](Self::close) has run.
    pub fn ensure_open(&self) -> AppResult<()> {
        if self.pool.is_closed() {
            return Err(AppError::database("Database pool is closed"));
        }
        Ok(())
    }

    /// Run `SELECT 1` on a pooled connection.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.ensure_open()?;
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

/// Session options: URL, application name, and statement timeout.
fn connect_options(config: &DatabaseConfig) -> AppResult<PgConnectOptions> {
    let options = PgConnectOptions::from_str(&config.url)
        .map_err(|e| {
            AppError::configuration(format!(
                "Invalid database url '{}': {e}",
                mask_password(&config.url)
            ))
        })?
        .application_name(&config.application_name);

    Ok(match config.statement_timeout_seconds {
        0 => options,
        seconds => options.options([("statement_timeout", format!("{seconds}s"))]),
    })
}

/// Pool sizing and timeouts, rejecting sizes that can starve a transaction.
fn pool_options(config: &DatabaseConfig) -> AppResult<PgPoolOptions> {
    if config.max_connections < MIN_POOL_SIZE {
        return Err(AppError::configuration(format!(
            "database.max_connections must be at least {MIN_POOL_SIZE}, got {}",
            config.max_connections
        )));
    }
    if config.min_connections > config.max_connections {
        return Err(AppError::configuration(format!(
            "database.min_connections ({}) exceeds database.max_connections ({})",
            config.min_connections, config.max_connections
        )));
    }

    Ok(PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds)))
}

/// Replace the password in a database URL with `****`.
pub fn mask_password(url: &str) -> String {
    let scheme_end = url.find("://").map_or(0, |p| p + 3);
    let Some(at) = url[scheme_end..].find('@').map(|p| p + scheme_end) else {
        return url.to_string();
    };
    match url[scheme_end..at].find(':') {
        Some(colon) => {
            let colon = colon + scheme_end;
            format!("{}:****{}", &url[..colon], &url[at..])
        }
        None => url.to_string(),
    }
}
