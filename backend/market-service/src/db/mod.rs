/// Database access layer
///
/// Each store is an async trait with a Postgres implementation so services
/// can be exercised against mocks or in-memory stores.
pub mod category_repo;
pub mod comment_repo;
pub mod post_repo;

pub use category_repo::{CategoryStore, PgCategoryStore};
pub use comment_repo::{CommentStore, PgCommentStore};
pub use post_repo::{PgPostStore, PostStore};

use sqlx::migrate::Migrator;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");
