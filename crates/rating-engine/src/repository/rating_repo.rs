//! PostgreSQL 评分仓储
//!
//! 每个 (user_id, content_id) 一行，各类别分数存放在 JSONB 列 `ratings` 中。
//! 表结构由 `rating_shared::database::Database::run_migrations` 创建。
//!
//! 同一行的并发写入依赖 PostgreSQL 行锁串行化，多个进程共享同一数据库时同样成立：
//! - 条件写入把判断放进同一条 SQL（`ON CONFLICT ... DO UPDATE ... WHERE`、`UPDATE ... WHERE ratings ? $3`）
//! - 类别删除先 `SELECT ... FOR UPDATE` 锁定行，再在同一事务内修改或删除

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use super::traits::{CategoryRemoval, RatingRepositoryTrait};
use crate::error::{RatingError, Result};
use crate::models::{Category, RatingKey, RatingRecord, Score};

/// 数据库行结构
#[derive(Debug, sqlx::FromRow)]
struct RatingRow {
    user_id: String,
    content_id: String,
    ratings: Json<BTreeMap<Category, Score>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RatingRow> for RatingRecord {
    fn from(row: RatingRow) -> Self {
        Self {
            user_id: row.user_id,
            content_id: row.content_id,
            ratings: row.ratings.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL 评分仓储
#[derive(Clone)]
pub struct PgRatingRepository {
    pool: PgPool,
}

impl PgRatingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 在事务内读取并锁定一行
    async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        user_id: &str,
        content_id: &str,
    ) -> Result<Option<RatingRecord>> {
        let row = sqlx::query_as::<_, RatingRow>(
            r#"
            SELECT user_id, content_id, ratings, created_at, updated_at
            FROM content_ratings
            WHERE user_id = $1 AND content_id = $2
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(content_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row.map(RatingRecord::from))
    }
}

#[async_trait]
impl RatingRepositoryTrait for PgRatingRepository {
    async fn find_one(&self, user_id: &str, content_id: &str) -> Result<Option<RatingRecord>> {
        let row = sqlx::query_as::<_, RatingRow>(
            r#"
            SELECT user_id, content_id, ratings, created_at, updated_at
            FROM content_ratings
            WHERE user_id = $1 AND content_id = $2
            "#,
        )
        .bind(user_id)
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RatingRecord::from))
    }

    #[instrument(skip(self), fields(category = %category, score = %score))]
    async fn upsert_category(
        &self,
        user_id: &str,
        content_id: &str,
        category: Category,
        score: Score,
    ) -> Result<RatingRecord> {
        let row = sqlx::query_as::<_, RatingRow>(
            r#"
            INSERT INTO content_ratings (user_id, content_id, ratings, created_at, updated_at)
            VALUES ($1, $2, jsonb_build_object($3::text, $4::int), NOW(), NOW())
            ON CONFLICT (user_id, content_id)
            DO UPDATE SET ratings = content_ratings.ratings || EXCLUDED.ratings,
                          updated_at = NOW()
            RETURNING user_id, content_id, ratings, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(content_id)
        .bind(category.as_str())
        .bind(i32::from(score.value()))
        .fetch_one(&self.pool)
        .await?;

        debug!("Rating category upserted");
        Ok(row.into())
    }

    #[instrument(skip(self), fields(category = %category, score = %score))]
    async fn insert_category(
        &self,
        user_id: &str,
        content_id: &str,
        category: Category,
        score: Score,
    ) -> Result<RatingRecord> {
        let mut tx = self.pool.begin().await?;

        // WHERE 不满足时不更新也不返回行，但冲突行仍在本事务内被锁定
        let row = sqlx::query_as::<_, RatingRow>(
            r#"
            INSERT INTO content_ratings (user_id, content_id, ratings, created_at, updated_at)
            VALUES ($1, $2, jsonb_build_object($3::text, $4::int), NOW(), NOW())
            ON CONFLICT (user_id, content_id)
            DO UPDATE SET ratings = content_ratings.ratings || EXCLUDED.ratings,
                          updated_at = NOW()
            WHERE NOT (content_ratings.ratings ? $3::text)
            RETURNING user_id, content_id, ratings, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(content_id)
        .bind(category.as_str())
        .bind(i32::from(score.value()))
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(row) = row {
            tx.commit().await?;
            debug!("Rating category inserted");
            return Ok(row.into());
        }

        let existing = Self::find_for_update(&mut tx, user_id, content_id)
            .await?
            .and_then(|record| record.score(category));
        tx.rollback().await?;

        match existing {
            Some(existing) => Err(RatingError::already_rated(
                user_id, content_id, category, existing,
            )),
            None => Err(RatingError::Internal(format!(
                "conditional insert skipped without existing score: {}:{}:{}",
                user_id, content_id, category
            ))),
        }
    }

    #[instrument(skip(self), fields(category = %category, score = %score))]
    async fn update_category(
        &self,
        user_id: &str,
        content_id: &str,
        category: Category,
        score: Score,
    ) -> Result<RatingRecord> {
        let row = sqlx::query_as::<_, RatingRow>(
            r#"
            UPDATE content_ratings
            SET ratings = ratings || jsonb_build_object($3::text, $4::int), updated_at = NOW()
            WHERE user_id = $1 AND content_id = $2 AND ratings ? $3::text
            RETURNING user_id, content_id, ratings, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(content_id)
        .bind(category.as_str())
        .bind(i32::from(score.value()))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                debug!("Rating category updated");
                Ok(row.into())
            }
            None => Err(RatingError::not_yet_rated(user_id, content_id, Some(category))),
        }
    }

    #[instrument(skip(self), fields(category = %category))]
    async fn delete_category(
        &self,
        user_id: &str,
        content_id: &str,
        category: Category,
    ) -> Result<CategoryRemoval> {
        let key = RatingKey::new(user_id, content_id);
        let mut tx = self.pool.begin().await?;

        let Some(mut record) = Self::find_for_update(&mut tx, user_id, content_id).await? else {
            tx.rollback().await?;
            return Err(RatingError::record_not_found(&key));
        };
        let Some(removed) = record.remove_score(category) else {
            tx.rollback().await?;
            return Err(RatingError::category_not_found(&key, category));
        };

        if record.is_empty() {
            sqlx::query("DELETE FROM content_ratings WHERE user_id = $1 AND content_id = $2")
                .bind(user_id)
                .bind(content_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            debug!("Last rating category removed, record deleted");
            return Ok(CategoryRemoval {
                removed,
                remaining: None,
            });
        }

        let row = sqlx::query_as::<_, RatingRow>(
            r#"
            UPDATE content_ratings
            SET ratings = ratings - $3::text, updated_at = NOW()
            WHERE user_id = $1 AND content_id = $2
            RETURNING user_id, content_id, ratings, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(content_id)
        .bind(category.as_str())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!("Rating category removed");
        Ok(CategoryRemoval {
            removed,
            remaining: Some(row.into()),
        })
    }

    #[instrument(skip(self))]
    async fn delete_record(&self, user_id: &str, content_id: &str) -> Result<RatingRecord> {
        let row = sqlx::query_as::<_, RatingRow>(
            r#"
            DELETE FROM content_ratings
            WHERE user_id = $1 AND content_id = $2
            RETURNING user_id, content_id, ratings, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(RatingRecord::from)
            .ok_or_else(|| RatingError::record_not_found(&RatingKey::new(user_id, content_id)))
    }

    async fn list_by_content(&self, content_id: &str) -> Result<Vec<RatingRecord>> {
        let rows = sqlx::query_as::<_, RatingRow>(
            r#"
            SELECT user_id, content_id, ratings, created_at, updated_at
            FROM content_ratings
            WHERE content_id = $1
            ORDER BY user_id
            "#,
        )
        .bind(content_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RatingRecord::from).collect())
    }
}
