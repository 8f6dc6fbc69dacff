use std::collections::HashMap;

use crate::{
    error::{Error, NormalizeError},
    models::comment::{
        Comment, Parent, REPLY_LEVEL, ROOT_LEVEL, ThreadChangeset, ThreadPlacement,
    },
    store::CommentStore,
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizeSummary {
    pub comments: usize,
    pub threads: usize,
    pub replies: usize,
    /// Replies whose direct parent is itself a reply.
    pub nested_replies: usize,
}

#[derive(Debug)]
pub struct ThreadPlan {
    pub placements: Vec<ThreadPlacement>,
    pub summary: NormalizeSummary,
}

/// Loads every comment, computes its thread placement and writes all of
/// them back in one batch. Nothing is written if any comment fails to
/// resolve, or if `dry_run` is set.
pub async fn normalize_threads<S: CommentStore + ?Sized>(
    store: &mut S,
    dry_run: bool,
) -> Result<NormalizeSummary, Error> {
    let comments = store.read_all().await?;
    tracing::info!("Loaded {} comments", comments.len());

    let plan = plan_threads(&comments)?;

    if dry_run {
        tracing::info!("Dry run, skipping the write of {} placements", plan.placements.len());
    } else {
        store.bulk_update_threads(&plan.placements).await?;
        tracing::info!("Updated {} comments", plan.placements.len());
    }

    Ok(plan.summary)
}

/// Computes the placement of every comment from the untouched snapshot.
///
/// Reply orders are offsets from the direct parent's *original* timestamp,
/// shifted by one. Roots only get `order = 1` in their own placement, so the
/// timestamps that replies are measured against are never overwritten while
/// planning.
pub fn plan_threads(comments: &[Comment]) -> Result<ThreadPlan, NormalizeError> {
    if let Some((id, thread_id)) = comments
        .iter()
        .find_map(|c| c.thread_id.map(|thread_id| (c.id, thread_id)))
    {
        return Err(NormalizeError::AlreadyNormalized { id, thread_id });
    }

    let mut index = LegacyIndex::build(comments)?;

    let mut placements = Vec::with_capacity(comments.len());
    let mut summary = NormalizeSummary {
        comments: comments.len(),
        ..Default::default()
    };

    for comment in comments {
        let placement = match comment.legacy_parent()? {
            Parent::Root => {
                summary.threads += 1;
                ThreadChangeset {
                    thread_id: comment.id,
                    parent_id: comment.id,
                    order: 1,
                    level: ROOT_LEVEL,
                }
            }
            Parent::Reply { parent_old_id } => {
                let parent = index.resolve(comment.id, parent_old_id)?;
                let root = index.root_of(comment)?;

                summary.replies += 1;
                if parent.id != root.id {
                    summary.nested_replies += 1;
                    tracing::debug!(
                        "Comment {} replies to reply {}, flattening into thread {}",
                        comment.id,
                        parent.id,
                        root.id
                    );
                }

                let order = comment
                    .order
                    .checked_sub(parent.order)
                    .and_then(|offset| offset.checked_add(1))
                    .ok_or(NormalizeError::OrderOverflow {
                        id: comment.id,
                        order: comment.order,
                        parent_order: parent.order,
                    })?;
                if order < 1 {
                    tracing::warn!(
                        "Comment {} predates its parent {} (order {order})",
                        comment.id,
                        parent.id
                    );
                }

                ThreadChangeset {
                    thread_id: root.id,
                    parent_id: parent.id,
                    order,
                    level: REPLY_LEVEL,
                }
            }
        };

        placements.push(ThreadPlacement {
            id: comment.id,
            changes: placement,
        });
    }

    Ok(ThreadPlan {
        placements,
        summary,
    })
}

/// Lookup of comments by legacy id, built once per run. Roots found while
/// walking parent chains are remembered so each comment is walked once.
struct LegacyIndex<'a> {
    by_old_id: HashMap<i32, &'a Comment>,
    roots: HashMap<i32, &'a Comment>,
}

impl<'a> LegacyIndex<'a> {
    fn build(comments: &'a [Comment]) -> Result<Self, NormalizeError> {
        let mut by_old_id = HashMap::with_capacity(comments.len());

        for comment in comments {
            let old_id = comment
                .old_id
                .ok_or(NormalizeError::MissingLegacyId { id: comment.id })?;

            if let Some(first) = by_old_id.insert(old_id, comment) {
                return Err(NormalizeError::DuplicateLegacyId {
                    old_id,
                    first: first.id,
                    second: comment.id,
                });
            }
        }

        Ok(LegacyIndex {
            by_old_id,
            roots: HashMap::with_capacity(comments.len()),
        })
    }

    fn resolve(&self, id: i32, parent_old_id: i32) -> Result<&'a Comment, NormalizeError> {
        self.by_old_id
            .get(&parent_old_id)
            .copied()
            .ok_or(NormalizeError::UnresolvedParent { id, parent_old_id })
    }

    /// Follows the parent chain up to the comment that points at itself,
    /// stopping early at any comment whose root is already known.
    fn root_of(&mut self, comment: &'a Comment) -> Result<&'a Comment, NormalizeError> {
        let mut path = vec![];
        let mut current = comment;

        let root = loop {
            let old_id = current
                .old_id
                .ok_or(NormalizeError::MissingLegacyId { id: current.id })?;

            if let Some(root) = self.roots.get(&old_id) {
                break *root;
            }

            // a chain longer than the table has to revisit a comment
            if path.len() > self.by_old_id.len() {
                return Err(NormalizeError::Cycle { id: comment.id });
            }
            path.push(old_id);

            match current.legacy_parent()? {
                Parent::Root => break current,
                Parent::Reply { parent_old_id } => {
                    current = self.resolve(current.id, parent_old_id)?;
                }
            }
        };

        for old_id in path {
            self.roots.insert(old_id, root);
        }

        Ok(root)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::DateTime;

    // Legacy ids equal internal ids unless a test says otherwise
    fn mock_comment(id: i32, parent_id: i32, order: i64) -> Comment {
        Comment {
            id,
            old_id: Some(id),
            author_id: 1,
            thread_id: None,
            parent_id,
            level: ROOT_LEVEL,
            order,
            object_type_id: 1,
            object_id: 1,
            text: format!("Content for comment {}", id),
            is_deleted: false,
            date_created: DateTime::from_timestamp(order, 0).unwrap(),
        }
    }

    fn placement_of(plan: &ThreadPlan, id: i32) -> &ThreadChangeset {
        &plan
            .placements
            .iter()
            .find(|p| p.id == id)
            .unwrap()
            .changes
    }

    #[test]
    fn test_plan_with_no_comments() {
        let plan = plan_threads(&[]).unwrap();
        assert!(plan.placements.is_empty());
        assert_eq!(plan.summary, NormalizeSummary::default());
    }

    #[test]
    fn test_plan_root_and_reply() {
        let comments = vec![mock_comment(1, 1, 1000), mock_comment(2, 1, 1005)];
        let plan = plan_threads(&comments).unwrap();

        assert_eq!(
            placement_of(&plan, 1),
            &ThreadChangeset {
                thread_id: 1,
                parent_id: 1,
                order: 1,
                level: ROOT_LEVEL
            }
        );
        assert_eq!(
            placement_of(&plan, 2),
            &ThreadChangeset {
                thread_id: 1,
                parent_id: 1,
                order: 6,
                level: REPLY_LEVEL
            }
        );
    }

    #[test]
    fn test_plan_reply_listed_before_root() {
        // the root's timestamp must still be the original one when the reply
        // is computed, whatever the row order
        let comments = vec![mock_comment(2, 1, 1005), mock_comment(1, 1, 1000)];
        let plan = plan_threads(&comments).unwrap();

        assert_eq!(placement_of(&plan, 2).order, 6);
        assert_eq!(placement_of(&plan, 1).order, 1);
    }

    #[test]
    fn test_plan_nested_reply_uses_direct_parent_order() {
        let comments = vec![
            mock_comment(1, 1, 1000),
            mock_comment(2, 1, 1005),
            mock_comment(3, 2, 1010),
        ];
        let plan = plan_threads(&comments).unwrap();

        assert_eq!(
            placement_of(&plan, 3),
            &ThreadChangeset {
                thread_id: 1,
                parent_id: 2,
                order: 6,
                level: REPLY_LEVEL
            }
        );
        assert_eq!(plan.summary.nested_replies, 1);
        assert_eq!(plan.summary.threads, 1);
        assert_eq!(plan.summary.replies, 2);
    }

    #[test]
    fn test_plan_resolves_legacy_ids() {
        let mut root = mock_comment(1, 900, 50);
        root.old_id = Some(900);
        let mut reply = mock_comment(2, 900, 80);
        reply.old_id = Some(901);

        let plan = plan_threads(&[root, reply]).unwrap();

        assert_eq!(
            placement_of(&plan, 2),
            &ThreadChangeset {
                thread_id: 1,
                parent_id: 1,
                order: 31,
                level: REPLY_LEVEL
            }
        );
    }

    #[test]
    fn test_plan_equal_timestamps_share_order() {
        let comments = vec![
            mock_comment(1, 1, 1000),
            mock_comment(2, 1, 1003),
            mock_comment(3, 1, 1003),
        ];
        let plan = plan_threads(&comments).unwrap();

        assert_eq!(placement_of(&plan, 2).order, 4);
        assert_eq!(placement_of(&plan, 3).order, 4);
    }

    #[test]
    fn test_plan_reply_predating_parent() {
        let comments = vec![mock_comment(1, 1, 1000), mock_comment(2, 1, 990)];
        let plan = plan_threads(&comments).unwrap();

        assert_eq!(
            placement_of(&plan, 2),
            &ThreadChangeset {
                thread_id: 1,
                parent_id: 1,
                order: -9,
                level: REPLY_LEVEL
            }
        );
    }

    #[test]
    fn test_plan_order_overflow() {
        let mut root = mock_comment(1, 1, 0);
        root.order = i64::MIN;
        let mut reply = mock_comment(2, 1, 0);
        reply.order = i64::MAX;

        assert_eq!(
            plan_threads(&[root, reply]).unwrap_err(),
            NormalizeError::OrderOverflow {
                id: 2,
                order: i64::MAX,
                parent_order: i64::MIN
            }
        );
    }

    #[test]
    fn test_plan_long_reply_chain() {
        // comment i replies to i - 1; walking the chain anew for every
        // reply would make this quadratic
        let n = 20_000;
        let comments: Vec<Comment> = (1..=n)
            .map(|id| mock_comment(id, if id == 1 { 1 } else { id - 1 }, 1000 + id as i64))
            .collect();

        let plan = plan_threads(&comments).unwrap();

        assert_eq!(plan.summary.threads, 1);
        assert_eq!(plan.summary.replies, n as usize - 1);
        assert_eq!(plan.summary.nested_replies, n as usize - 2);
        assert!(plan.placements.iter().all(|p| p.changes.thread_id == 1));
        assert_eq!(
            placement_of(&plan, n),
            &ThreadChangeset {
                thread_id: 1,
                parent_id: n - 1,
                order: 2,
                level: REPLY_LEVEL
            }
        );
    }

    #[test]
    fn test_plan_long_chain_ending_in_cycle() {
        // a tail hanging off a loop must still be reported, not cached
        let mut comments = vec![mock_comment(1, 2, 1000), mock_comment(2, 1, 1001)];
        comments.extend((3..=50).map(|id| mock_comment(id, id - 1, 1000 + id as i64)));

        assert!(matches!(
            plan_threads(&comments).unwrap_err(),
            NormalizeError::Cycle { .. }
        ));
    }

    #[test]
    fn test_plan_unresolved_parent() {
        let comments = vec![mock_comment(1, 1, 1000), mock_comment(2, 42, 1005)];
        assert_eq!(
            plan_threads(&comments).unwrap_err(),
            NormalizeError::UnresolvedParent {
                id: 2,
                parent_old_id: 42
            }
        );
    }

    #[test]
    fn test_plan_cycle_has_no_root() {
        let comments = vec![mock_comment(1, 2, 1000), mock_comment(2, 1, 1005)];
        assert!(matches!(
            plan_threads(&comments).unwrap_err(),
            NormalizeError::Cycle { .. }
        ));
    }

    #[test]
    fn test_plan_duplicate_legacy_id() {
        let mut dup = mock_comment(2, 1, 1005);
        dup.old_id = Some(1);
        let comments = vec![mock_comment(1, 1, 1000), dup];
        assert_eq!(
            plan_threads(&comments).unwrap_err(),
            NormalizeError::DuplicateLegacyId {
                old_id: 1,
                first: 1,
                second: 2
            }
        );
    }

    #[test]
    fn test_plan_missing_legacy_id() {
        let mut c = mock_comment(5, 5, 1000);
        c.old_id = None;
        assert_eq!(
            plan_threads(&[c]).unwrap_err(),
            NormalizeError::MissingLegacyId { id: 5 }
        );
    }

    #[test]
    fn test_plan_rejects_normalized_data() {
        let mut c = mock_comment(1, 1, 1);
        c.thread_id = Some(1);
        assert_eq!(
            plan_threads(&[c]).unwrap_err(),
            NormalizeError::AlreadyNormalized { id: 1, thread_id: 1 }
        );
    }

    #[tokio::test]
    async fn test_normalize_threads_writes_once() {
        let mut store = MemoryStore::with_comments(vec![
            mock_comment(1, 1, 1000),
            mock_comment(2, 1, 1005),
            mock_comment(3, 2, 1010),
            mock_comment(4, 4, 2000),
        ]);

        let summary = normalize_threads(&mut store, false).await.unwrap();

        assert_eq!(
            summary,
            NormalizeSummary {
                comments: 4,
                threads: 2,
                replies: 2,
                nested_replies: 1
            }
        );
        assert_eq!(store.writes, 1);

        let root = store.get(1).unwrap();
        assert_eq!(root.order, 1);
        assert_eq!(root.thread_id, Some(1));
        assert!(root.is_root());

        let reply = store.get(3).unwrap();
        assert_eq!(reply.thread_id, Some(1));
        assert_eq!(reply.parent_id, 2);
        assert_eq!(reply.order, 6);
        assert_eq!(reply.level, REPLY_LEVEL);

        assert_eq!(store.get(4).unwrap().order, 1);
    }

    #[tokio::test]
    async fn test_normalize_threads_twice_is_rejected() {
        let mut store =
            MemoryStore::with_comments(vec![mock_comment(1, 1, 1000), mock_comment(2, 1, 1005)]);

        normalize_threads(&mut store, false).await.unwrap();
        let snapshot = store.comments.clone();

        let err = normalize_threads(&mut store, false).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Normalize(NormalizeError::AlreadyNormalized { .. })
        ));
        assert_eq!(store.comments, snapshot);
        assert_eq!(store.writes, 1);
    }

    #[tokio::test]
    async fn test_normalize_threads_aborts_without_writing() {
        let original = vec![
            mock_comment(1, 1, 1000),
            mock_comment(2, 1, 1005),
            mock_comment(3, 77, 1010),
        ];
        let mut store = MemoryStore::with_comments(original.clone());

        let err = normalize_threads(&mut store, false).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Normalize(NormalizeError::UnresolvedParent { id: 3, .. })
        ));
        assert_eq!(store.comments, original);
        assert_eq!(store.writes, 0);
    }

    #[tokio::test]
    async fn test_normalize_threads_dry_run() {
        let original = vec![mock_comment(1, 1, 1000), mock_comment(2, 1, 1005)];
        let mut store = MemoryStore::with_comments(original.clone());

        let summary = normalize_threads(&mut store, true).await.unwrap();

        assert_eq!(summary.replies, 1);
        assert_eq!(store.comments, original);
        assert_eq!(store.writes, 0);
    }
}
