use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::state::AppState;
use comment_tree_core::service::CommentService;
use comment_tree_core::store::{CommentStore, MemoryCommentStore};
use comment_tree_infra::db::{DbPoolError, PgCommentStore, connect_lazy};

#[derive(Debug, Error)]
pub enum WiringError {
    #[error("db pool error: {0}")]
    Db(#[from] DbPoolError),
}

pub fn build_state(config: AppConfig) -> Result<AppState, WiringError> {
    let (store, db) = match config.database_url.as_deref() {
        Some(url) => {
            let pool = connect_lazy(url, &config.pool_settings())?;
            info!(
                max_connections = config.db_max_connections,
                "using postgres comment store"
            );
            let store: Arc<dyn CommentStore> =
                Arc::new(PgCommentStore::new(pool.clone(), config.retry_policy()));
            (store, Some(pool))
        }
        None => {
            warn!("COMMENT_TREE_DATABASE_URL not set; comments live in memory only");
            let store: Arc<dyn CommentStore> = Arc::new(MemoryCommentStore::new());
            (store, None)
        }
    };
    let comments = CommentService::new(store, config.service_config());
    Ok(AppState {
        config: Arc::new(config),
        comments: Arc::new(comments),
        db,
    })
}
