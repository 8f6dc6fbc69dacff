use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    error::StoreError,
    models::comment::{Comment, NewComment, ThreadPlacement},
};

use super::CommentStore;

/// A comment table held in memory. Writes are all-or-nothing like the
/// Postgres store, which makes it a faithful stand-in for job tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub comments: Vec<Comment>,
    /// legacy account id -> user id
    pub accounts: HashMap<i32, i32>,
    /// (app label, model) -> content type id
    pub content_types: HashMap<(String, String), i32>,
    /// Number of successful write batches.
    pub writes: usize,
}

impl MemoryStore {
    pub fn with_comments(comments: Vec<Comment>) -> Self {
        MemoryStore {
            comments,
            ..Default::default()
        }
    }

    pub fn get(&self, id: i32) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    fn next_id(&self) -> i32 {
        self.comments.iter().map(|c| c.id).max().unwrap_or(0) + 1
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn read_all(&mut self) -> Result<Vec<Comment>, StoreError> {
        let mut comments = self.comments.clone();
        comments.sort_unstable_by_key(|c| c.id);
        Ok(comments)
    }

    async fn bulk_update_threads(
        &mut self,
        placements: &[ThreadPlacement],
    ) -> Result<(), StoreError> {
        let positions: HashMap<i32, usize> = self
            .comments
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, i))
            .collect();

        // check everything first so a bad id leaves the table untouched
        let mut targets = Vec::with_capacity(placements.len());
        for placement in placements {
            match positions.get(&placement.id) {
                Some(&i) => targets.push((i, placement)),
                None => return Err(StoreError::CommentNotFound(placement.id)),
            }
        }

        for (i, placement) in targets {
            placement.apply_to(&mut self.comments[i]);
        }
        self.writes += 1;

        Ok(())
    }

    async fn resolve_authors(&mut self, old_ids: &[i32]) -> Result<HashMap<i32, i32>, StoreError> {
        Ok(old_ids
            .iter()
            .filter_map(|old_id| self.accounts.get(old_id).map(|user| (*old_id, *user)))
            .collect())
    }

    async fn resolve_content_types(
        &mut self,
        app_label: &str,
        models: &[&str],
    ) -> Result<HashMap<String, i32>, StoreError> {
        Ok(models
            .iter()
            .filter_map(|m| {
                self.content_types
                    .get(&(app_label.to_string(), m.to_string()))
                    .map(|id| (m.to_string(), *id))
            })
            .collect())
    }

    async fn insert_comments(&mut self, comments: &[NewComment]) -> Result<usize, StoreError> {
        let mut id = self.next_id();
        for new in comments {
            self.comments.push(Comment {
                id,
                old_id: new.old_id,
                author_id: new.author_id,
                thread_id: None,
                parent_id: new.parent_id,
                level: new.level,
                order: new.order,
                object_type_id: new.object_type_id,
                object_id: new.object_id,
                text: new.text.clone(),
                is_deleted: new.is_deleted,
                date_created: new.date_created,
            });
            id += 1;
        }
        self.writes += 1;

        Ok(comments.len())
    }
}
