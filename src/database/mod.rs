use anyhow::Result;
use sqlx::{Pool, Postgres, postgres::PgPoolOptions};
use std::time::Duration;
use tracing::info;

pub type DatabasePool = Pool<Postgres>;

pub async fn setup_database(database_url: &str) -> Result<DatabasePool> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(300))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("SET timezone = 'UTC'").execute(&mut *conn).await?;
                // Settlement locks are short-lived; a stuck lock means a bug
                sqlx::query("SET lock_timeout = '10s'").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    info!("database connection established");

    Ok(pool)
}

pub async fn run_migrations(pool: &DatabasePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("database migrations completed");
    Ok(())
}
