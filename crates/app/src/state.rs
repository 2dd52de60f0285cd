use std::sync::Arc;

use crate::config::AppConfig;
use comment_tree_core::service::CommentService;
use comment_tree_infra::db::DbPool;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub comments: Arc<CommentService>,
    pub db: Option<DbPool>,
}
