use std::collections::HashMap;

use crate::{
    error::Error,
    models::comment::{Comment, REPLY_LEVEL, ROOT_LEVEL},
    store::CommentStore,
};

/// A broken thread invariant found in a normalized comment table.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("comment {id} has no thread")]
    Unthreaded { id: i32 },

    #[error("comment {id} belongs to thread {thread_id}, which does not exist")]
    MissingThreadRoot { id: i32, thread_id: i32 },

    #[error("comment {id} belongs to thread {thread_id}, which is not a root")]
    ThreadNotRoot { id: i32, thread_id: i32 },

    #[error("root {id} should be its own thread, found thread {thread_id:?}")]
    RootOutsideOwnThread { id: i32, thread_id: Option<i32> },

    #[error("root {id} has order {order}, expected 1")]
    RootOrder { id: i32, order: i64 },

    #[error("comment {id} has level {level}, expected {expected}")]
    Level { id: i32, level: i32, expected: i32 },

    #[error("comment {id} replies to {parent_id}, which does not exist")]
    MissingParent { id: i32, parent_id: i32 },

    #[error("comment {id} replies to {parent_id}, which is in another thread")]
    ParentInOtherThread { id: i32, parent_id: i32 },
}

pub async fn verify_store<S: CommentStore + ?Sized>(
    store: &mut S,
) -> Result<Vec<Violation>, Error> {
    let comments = store.read_all().await?;
    tracing::info!("Verifying {} comments", comments.len());

    Ok(verify_threads(&comments))
}

/// Checks a normalized snapshot: every thread id names a root, roots come
/// first in their thread, and replies hang off a comment of the same thread.
pub fn verify_threads(comments: &[Comment]) -> Vec<Violation> {
    let by_id: HashMap<i32, &Comment> = comments.iter().map(|c| (c.id, c)).collect();
    let mut violations = vec![];

    for c in comments {
        match c.thread_id {
            None => violations.push(Violation::Unthreaded { id: c.id }),
            Some(thread_id) => match by_id.get(&thread_id) {
                None => violations.push(Violation::MissingThreadRoot {
                    id: c.id,
                    thread_id,
                }),
                Some(root) if !root.is_root() => violations.push(Violation::ThreadNotRoot {
                    id: c.id,
                    thread_id,
                }),
                Some(_) => {}
            },
        }

        if c.is_root() {
            if c.thread_id != Some(c.id) {
                violations.push(Violation::RootOutsideOwnThread {
                    id: c.id,
                    thread_id: c.thread_id,
                });
            }
            if c.order != 1 {
                violations.push(Violation::RootOrder {
                    id: c.id,
                    order: c.order,
                });
            }
            if c.level != ROOT_LEVEL {
                violations.push(Violation::Level {
                    id: c.id,
                    level: c.level,
                    expected: ROOT_LEVEL,
                });
            }
            continue;
        }

        if c.level != REPLY_LEVEL {
            violations.push(Violation::Level {
                id: c.id,
                level: c.level,
                expected: REPLY_LEVEL,
            });
        }

        match by_id.get(&c.parent_id) {
            None => violations.push(Violation::MissingParent {
                id: c.id,
                parent_id: c.parent_id,
            }),
            Some(parent) if parent.thread_id != c.thread_id => {
                violations.push(Violation::ParentInOtherThread {
                    id: c.id,
                    parent_id: c.parent_id,
                })
            }
            Some(_) => {}
        }
    }

    violations
}
