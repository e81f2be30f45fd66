//! 存储后端选择
//!
//! 根据配置在内存仓储与 PostgreSQL 仓储之间分派

use async_trait::async_trait;
use tracing::info;

use rating_shared::config::{AppConfig, StorageBackend};
use rating_shared::database::Database;

use super::memory_repo::MemoryRatingRepository;
use super::rating_repo::PgRatingRepository;
use super::traits::{CategoryRemoval, RatingRepositoryTrait};
use crate::error::Result;
use crate::models::{Category, RatingRecord, Score};

/// 按配置选择的评分存储
#[derive(Clone)]
pub enum RatingStore {
    Memory(MemoryRatingRepository),
    Postgres(PgRatingRepository),
}

impl RatingStore {
    /// 根据应用配置创建存储
    ///
    /// PostgreSQL 后端会建立连接池并执行迁移
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        match config.storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory rating store");
                Ok(Self::Memory(MemoryRatingRepository::new()))
            }
            StorageBackend::Postgres => {
                let db = Database::connect(&config.database).await?;
                db.run_migrations().await?;
                let repo = PgRatingRepository::new(db.pool().clone());
                info!("Using PostgreSQL rating store");
                Ok(Self::Postgres(repo))
            }
        }
    }

    pub fn backend(&self) -> StorageBackend {
        match self {
            Self::Memory(_) => StorageBackend::Memory,
            Self::Postgres(_) => StorageBackend::Postgres,
        }
    }
}

#[async_trait]
impl RatingRepositoryTrait for RatingStore {
    async fn find_one(&self, user_id: &str, content_id: &str) -> Result<Option<RatingRecord>> {
        match self {
            Self::Memory(repo) => repo.find_one(user_id, content_id).await,
            Self::Postgres(repo) => repo.find_one(user_id, content_id).await,
        }
    }

    async fn upsert_category(
        &self,
        user_id: &str,
        content_id: &str,
        category: Category,
        score: Score,
    ) -> Result<RatingRecord> {
        match self {
            Self::Memory(repo) => {
                repo.upsert_category(user_id, content_id, category, score)
                    .await
            }
            Self::Postgres(repo) => {
                repo.upsert_category(user_id, content_id, category, score)
                    .await
            }
        }
    }

    async fn insert_category(
        &self,
        user_id: &str,
        content_id: &str,
        category: Category,
        score: Score,
    ) -> Result<RatingRecord> {
        match self {
            Self::Memory(repo) => {
                repo.insert_category(user_id, content_id, category, score)
                    .await
            }
            Self::Postgres(repo) => {
                repo.insert_category(user_id, content_id, category, score)
                    .await
            }
        }
    }

    async fn update_category(
        &self,
        user_id: &str,
        content_id: &str,
        category: Category,
        score: Score,
    ) -> Result<RatingRecord> {
        match self {
            Self::Memory(repo) => {
                repo.update_category(user_id, content_id, category, score)
                    .await
            }
            Self::Postgres(repo) => {
                repo.update_category(user_id, content_id, category, score)
                    .await
            }
        }
    }

    async fn delete_category(
        &self,
        user_id: &str,
        content_id: &str,
        category: Category,
    ) -> Result<CategoryRemoval> {
        match self {
            Self::Memory(repo) => repo.delete_category(user_id, content_id, category).await,
            Self::Postgres(repo) => repo.delete_category(user_id, content_id, category).await,
        }
    }

    async fn delete_record(&self, user_id: &str, content_id: &str) -> Result<RatingRecord> {
        match self {
            Self::Memory(repo) => repo.delete_record(user_id, content_id).await,
            Self::Postgres(repo) => repo.delete_record(user_id, content_id).await,
        }
    }

    async fn list_by_content(&self, content_id: &str) -> Result<Vec<RatingRecord>> {
        match self {
            Self::Memory(repo) => repo.list_by_content(content_id).await,
            Self::Postgres(repo) => repo.list_by_content(content_id).await,
        }
    }
}
