use gatehouse_core::config::PostgresConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

/// Create a PostgreSQL connection pool and run migrations.
/// Returns None if Postgres is not configured; the caller falls back to
/// the in-memory stores.
pub async fn init_pg_pool(config: &PostgresConfig) -> Option<PgPool> {
    if !config.is_configured() {
        warn!("PG_USERNAME not configured — using in-memory stores, state is lost on restart");
        return None;
    }

    let url = config.connection_string();
    let connect = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&url);
    match connect.await {
        Ok(pool) => {
            info!("PostgreSQL connected: {}", config.host);
            match sqlx::migrate!("../../migrations").run(&pool).await {
                Ok(_) => {
                    info!("Database migrations applied successfully");
                    Some(pool)
                }
                Err(e) => {
                    warn!("Failed to run migrations: {} — falling back to in-memory stores", e);
                    None
                }
            }
        }
        Err(e) => {
            warn!("Failed to connect to PostgreSQL: {} — falling back to in-memory stores", e);
            None
        }
    }
}
