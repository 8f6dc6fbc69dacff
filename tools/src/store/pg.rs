use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{
    AsyncConnection, AsyncPgConnection, RunQueryDsl,
    pooled_connection::{AsyncDieselConnectionManager, deadpool::Pool},
    scoped_futures::ScopedFutureExt,
};

use crate::{
    config::ToolConfig,
    error::StoreError,
    models::{
        account::Account,
        comment::{Comment, NewComment, ThreadPlacement},
    },
};

use super::CommentStore;

// Postgres caps a statement at 65535 bind parameters; a comment row binds 10.
const INSERT_CHUNK_SIZE: usize = 1000;

pub struct PgStore {
    pool: Pool<AsyncPgConnection>,
}

impl PgStore {
    pub fn connect(config: &ToolConfig) -> Result<Self, StoreError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .build()?;

        Ok(PgStore { pool })
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn read_all(&mut self) -> Result<Vec<Comment>, StoreError> {
        use crate::schema::accounts_comment;

        let mut conn = self.pool.get().await?;

        let comments = accounts_comment::table
            .select(Comment::as_select())
            .order(accounts_comment::id)
            .load(&mut conn)
            .await?;

        Ok(comments)
    }

    async fn bulk_update_threads(
        &mut self,
        placements: &[ThreadPlacement],
    ) -> Result<(), StoreError> {
        use crate::schema::accounts_comment;

        let mut conn = self.pool.get().await?;

        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                for placement in placements {
                    let updated = diesel::update(accounts_comment::table.find(placement.id))
                        .set(&placement.changes)
                        .execute(conn)
                        .await?;

                    if updated == 0 {
                        return Err(StoreError::CommentNotFound(placement.id));
                    }
                }

                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    async fn resolve_authors(&mut self, old_ids: &[i32]) -> Result<HashMap<i32, i32>, StoreError> {
        use crate::schema::accounts_account;

        let mut conn = self.pool.get().await?;

        let accounts: Vec<Account> = accounts_account::table
            .filter(accounts_account::old_id.eq_any(old_ids.to_vec()))
            .select(Account::as_select())
            .load(&mut conn)
            .await?;

        Ok(accounts
            .into_iter()
            .filter_map(|a| a.old_id.map(|old_id| (old_id, a.user_id)))
            .collect())
    }

    async fn resolve_content_types(
        &mut self,
        app_label: &str,
        models: &[&str],
    ) -> Result<HashMap<String, i32>, StoreError> {
        use crate::schema::django_content_type;

        let mut conn = self.pool.get().await?;

        let names: Vec<String> = models.iter().map(|m| m.to_string()).collect();
        let rows = django_content_type::table
            .filter(django_content_type::app_label.eq(app_label))
            .filter(django_content_type::model.eq_any(names))
            .select((django_content_type::model, django_content_type::id))
            .load::<(String, i32)>(&mut conn)
            .await?;

        Ok(rows.into_iter().collect())
    }

    async fn insert_comments(&mut self, comments: &[NewComment]) -> Result<usize, StoreError> {
        use crate::schema::accounts_comment;

        let mut conn = self.pool.get().await?;

        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                let mut inserted = 0;
                for chunk in comments.chunks(INSERT_CHUNK_SIZE) {
                    inserted += diesel::insert_into(accounts_comment::table)
                        .values(chunk)
                        .execute(conn)
                        .await?;
                }
                Ok(inserted)
            }
            .scope_boxed()
        })
        .await
    }
}
