use std::{collections::BTreeSet, path::Path};

use chrono::DateTime;
use serde::Deserialize;

use crate::{
    error::ImportError,
    models::comment::{NewComment, ROOT_LEVEL},
    store::CommentStore,
};

/// One comment as exported by the legacy forum.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct LegacyComment {
    pub old_id: i32,
    /// Legacy id of the author's account.
    pub author: i32,
    /// Unix timestamp in seconds.
    pub date_created: i64,
    /// Legacy id of the parent comment, or `old_id` itself for a root.
    pub parent_id: i32,
    pub object_type: i32,
    pub object_id: i32,
    pub text: String,
}

/// Django app that owns the course, contest and problem models.
pub const CONTENT_APP_LABEL: &str = "contests";

/// What a legacy comment was attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ObjectKind {
    Course,
    Contest,
    Problem,
}

impl ObjectKind {
    /// The forum only used 1 and 2 explicitly; everything else was a problem.
    pub fn from_legacy(code: i32) -> Self {
        match code {
            1 => ObjectKind::Course,
            2 => ObjectKind::Contest,
            _ => ObjectKind::Problem,
        }
    }

    pub fn model(&self) -> &'static str {
        match self {
            ObjectKind::Course => "course",
            ObjectKind::Contest => "contest",
            ObjectKind::Problem => "problem",
        }
    }
}

pub fn read_legacy_comments(path: &Path) -> Result<Vec<LegacyComment>, ImportError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Inserts the legacy comments as unnormalized rows: `order` carries the
/// creation timestamp and `parent_id` the legacy parent id until
/// `normalize_threads` runs. Every author and content type is resolved
/// before the single bulk insert.
pub async fn import_comments<S: CommentStore + ?Sized>(
    store: &mut S,
    legacy: &[LegacyComment],
) -> Result<usize, ImportError> {
    let authors: Vec<i32> = legacy
        .iter()
        .map(|c| c.author)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let authors = store.resolve_authors(&authors).await?;

    let kinds: BTreeSet<ObjectKind> = legacy
        .iter()
        .map(|c| ObjectKind::from_legacy(c.object_type))
        .collect();
    let models: Vec<&str> = kinds.iter().map(|k| k.model()).collect();
    let content_types = store
        .resolve_content_types(CONTENT_APP_LABEL, &models)
        .await?;

    let mut comments = Vec::with_capacity(legacy.len());
    for c in legacy {
        let author_id = *authors.get(&c.author).ok_or(ImportError::UnknownAuthor {
            old_id: c.old_id,
            author: c.author,
        })?;

        let model = ObjectKind::from_legacy(c.object_type).model();
        let object_type_id = *content_types
            .get(model)
            .ok_or(ImportError::UnknownContentType(model))?;

        let date_created =
            DateTime::from_timestamp(c.date_created, 0).ok_or(ImportError::InvalidTimestamp {
                old_id: c.old_id,
                timestamp: c.date_created,
            })?;

        comments.push(NewComment {
            old_id: Some(c.old_id),
            author_id,
            parent_id: c.parent_id,
            level: ROOT_LEVEL,
            order: c.date_created,
            object_type_id,
            object_id: c.object_id,
            text: c.text.clone(),
            is_deleted: false,
            date_created,
        });
    }

    let inserted = store.insert_comments(&comments).await?;
    tracing::info!("Imported {inserted} legacy comments");

    Ok(inserted)
}
