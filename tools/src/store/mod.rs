use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    error::StoreError,
    models::comment::{Comment, NewComment, ThreadPlacement},
};

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Everything the migration jobs need from the backing database. Jobs take
/// the store as an argument so they can run against `MemoryStore` in tests.
#[async_trait]
pub trait CommentStore: Send {
    /// Loads the whole comment table, ordered by id.
    async fn read_all(&mut self) -> Result<Vec<Comment>, StoreError>;

    /// Writes `thread_id`, `parent_id`, `order` and `level` of every
    /// placement as one unit. Either all placements land or none do.
    async fn bulk_update_threads(
        &mut self,
        placements: &[ThreadPlacement],
    ) -> Result<(), StoreError>;

    /// Maps legacy account ids to user ids. Unknown ids are left out.
    async fn resolve_authors(&mut self, old_ids: &[i32]) -> Result<HashMap<i32, i32>, StoreError>;

    /// Maps the model names of one app to their content type ids. Unknown
    /// names are left out.
    async fn resolve_content_types(
        &mut self,
        app_label: &str,
        models: &[&str],
    ) -> Result<HashMap<String, i32>, StoreError>;

    async fn insert_comments(&mut self, comments: &[NewComment]) -> Result<usize, StoreError>;
}
