use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub fn build(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db_pool = match config.database_url.as_deref() {
            Some(url) => {
                // Lazy connect keeps startup synchronous; the first query
                // establishes the actual connection.
                let pool = PgPoolOptions::new()
                    .max_connections(config.db_pool_max_connections)
                    .min_connections(config.db_pool_min_connections)
                    .acquire_timeout(Duration::from_secs(config.db_pool_acquire_timeout_seconds))
                    .idle_timeout(Duration::from_secs(config.db_pool_idle_timeout_seconds))
                    .connect_lazy(url)?;
                Some(pool)
            }
            None => {
                tracing::warn!("DATABASE_URL is not set; database-backed routes will fail");
                None
            }
        };

        Ok(Self { config, db_pool })
    }
}
