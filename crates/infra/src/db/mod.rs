pub mod comments_repo;
pub mod migrations;
pub mod pool;
pub mod retry;

pub use comments_repo::{CommentsRepoError, PgCommentStore};
pub use migrations::run_migrations;
pub use pool::{DbPool, DbPoolError, PoolSettings, connect_lazy};
pub use retry::{Retry, RetryPolicy};
