pub mod comment_id;
pub mod page;
