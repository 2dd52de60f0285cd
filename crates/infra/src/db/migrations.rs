use sqlx::migrate::Migrator;
use tracing::info;

use super::DbPool;
use super::DbPoolError;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_migrations(pool: &DbPool) -> Result<(), DbPoolError> {
    info!(count = MIGRATOR.iter().count(), "applying database migrations");
    MIGRATOR.run(pool).await?;
    Ok(())
}
