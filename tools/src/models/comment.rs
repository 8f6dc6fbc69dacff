use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::error::NormalizeError;

pub const ROOT_LEVEL: i32 = 1;
pub const REPLY_LEVEL: i32 = 2;

#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::accounts_comment)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Comment {
    pub id: i32,
    pub old_id: Option<i32>,
    pub author_id: i32,
    pub thread_id: Option<i32>,
    pub parent_id: i32,
    pub level: i32,
    pub order: i64,
    pub object_type_id: i32,
    pub object_id: i32,
    pub text: String,
    pub is_deleted: bool,
    pub date_created: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::accounts_comment)]
pub struct NewComment {
    pub old_id: Option<i32>,
    pub author_id: i32,
    pub parent_id: i32,
    pub level: i32,
    pub order: i64,
    pub object_type_id: i32,
    pub object_id: i32,
    pub text: String,
    pub is_deleted: bool,
    pub date_created: DateTime<Utc>,
}

/// Where a comment hangs before normalization. Legacy rows mark a thread
/// root by pointing `parent_id` at their own `old_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    Root,
    Reply { parent_old_id: i32 },
}

impl Comment {
    pub fn legacy_parent(&self) -> Result<Parent, NormalizeError> {
        let old_id = self
            .old_id
            .ok_or(NormalizeError::MissingLegacyId { id: self.id })?;

        if self.parent_id == old_id {
            Ok(Parent::Root)
        } else {
            Ok(Parent::Reply {
                parent_old_id: self.parent_id,
            })
        }
    }

    /// Only meaningful after normalization, when `parent_id` holds an
    /// internal id.
    pub fn is_root(&self) -> bool {
        self.parent_id == self.id
    }
}

/// The computed thread position of a single comment. Applying it writes
/// exactly `thread_id`, `parent_id`, `order` and `level`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadPlacement {
    pub id: i32,
    pub changes: ThreadChangeset,
}

#[derive(AsChangeset, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::schema::accounts_comment)]
pub struct ThreadChangeset {
    pub thread_id: i32,
    pub parent_id: i32,
    pub order: i64,
    pub level: i32,
}

impl ThreadPlacement {
    pub fn apply_to(&self, comment: &mut Comment) {
        comment.thread_id = Some(self.changes.thread_id);
        comment.parent_id = self.changes.parent_id;
        comment.order = self.changes.order;
        comment.level = self.changes.level;
    }
}
