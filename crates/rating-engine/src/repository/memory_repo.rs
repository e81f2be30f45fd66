//! 内存评分仓储
//!
//! 使用 DashMap 实现的高并发内存存储，适用于测试、开发环境和单实例部署。
//! 每次写操作（包括条件判断）都在对应 key 的 entry 内完成，同一 key 的写入互斥。

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::debug;

use super::traits::{CategoryRemoval, RatingRepositoryTrait};
use crate::error::{RatingError, Result};
use crate::models::{Category, RatingKey, RatingRecord, Score};

/// 内存评分仓储
///
/// clone 后共享同一份数据
#[derive(Debug, Clone, Default)]
pub struct MemoryRatingRepository {
    records: Arc<DashMap<RatingKey, RatingRecord>>,
}

impl MemoryRatingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录总数
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// 清空所有数据
    pub fn clear(&self) {
        self.records.clear();
    }
}

#[async_trait]
impl RatingRepositoryTrait for MemoryRatingRepository {
    async fn find_one(&self, user_id: &str, content_id: &str) -> Result<Option<RatingRecord>> {
        let key = RatingKey::new(user_id, content_id);
        Ok(self.records.get(&key).map(|r| r.value().clone()))
    }

    async fn upsert_category(
        &self,
        user_id: &str,
        content_id: &str,
        category: Category,
        score: Score,
    ) -> Result<RatingRecord> {
        let key = RatingKey::new(user_id, content_id);

        let record = match self.records.entry(key) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().set_score(category, score);
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let record = RatingRecord::new(user_id, content_id, category, score);
                entry.insert(record).value().clone()
            }
        };

        debug!(user_id, content_id, %category, %score, "Rating category upserted");
        Ok(record)
    }

    async fn insert_category(
        &self,
        user_id: &str,
        content_id: &str,
        category: Category,
        score: Score,
    ) -> Result<RatingRecord> {
        let key = RatingKey::new(user_id, content_id);

        let record = match self.records.entry(key) {
            Entry::Occupied(mut entry) => {
                if let Some(existing) = entry.get().score(category) {
                    let err = RatingError::already_rated(user_id, content_id, category, existing);
                    return Err(err);
                }
                entry.get_mut().set_score(category, score);
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let record = RatingRecord::new(user_id, content_id, category, score);
                entry.insert(record).value().clone()
            }
        };

        debug!(user_id, content_id, %category, %score, "Rating category inserted");
        Ok(record)
    }

    async fn update_category(
        &self,
        user_id: &str,
        content_id: &str,
        category: Category,
        score: Score,
    ) -> Result<RatingRecord> {
        let key = RatingKey::new(user_id, content_id);

        match self.records.entry(key) {
            Entry::Occupied(mut entry) if entry.get().has_rated(category) => {
                entry.get_mut().set_score(category, score);
                debug!(user_id, content_id, %category, %score, "Rating category updated");
                Ok(entry.get().clone())
            }
            _ => Err(RatingError::not_yet_rated(user_id, content_id, Some(category))),
        }
    }

    async fn delete_category(
        &self,
        user_id: &str,
        content_id: &str,
        category: Category,
    ) -> Result<CategoryRemoval> {
        let key = RatingKey::new(user_id, content_id);

        match self.records.entry(key.clone()) {
            Entry::Vacant(_) => Err(RatingError::record_not_found(&key)),
            Entry::Occupied(mut entry) => {
                let Some(removed) = entry.get_mut().remove_score(category) else {
                    return Err(RatingError::category_not_found(&key, category));
                };

                let remaining = if entry.get().is_empty() {
                    entry.remove();
                    debug!(
                        user_id,
                        content_id,
                        %category,
                        "Last rating category removed, record deleted"
                    );
                    None
                } else {
                    debug!(user_id, content_id, %category, "Rating category removed");
                    Some(entry.get().clone())
                };

                Ok(CategoryRemoval { removed, remaining })
            }
        }
    }

    async fn delete_record(&self, user_id: &str, content_id: &str) -> Result<RatingRecord> {
        let key = RatingKey::new(user_id, content_id);
        self.records
            .remove(&key)
            .map(|(_, record)| record)
            .ok_or_else(|| RatingError::record_not_found(&key))
    }

    async fn list_by_content(&self, content_id: &str) -> Result<Vec<RatingRecord>> {
        let mut records: Vec<RatingRecord> = self
            .records
            .iter()
            .filter(|entry| entry.key().content_id == content_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(value: i64) -> Score {
        Score::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_creates_then_overwrites() {
        let repo = MemoryRatingRepository::new();
        assert!(repo.find_one("u1", "c1").await.unwrap().is_none());

        let created = repo
            .upsert_category("u1", "c1", Category::Clarity, score(10))
            .await
            .unwrap();
        assert_eq!(created.ratings.len(), 1);
        assert_eq!(created.score(Category::Clarity), Some(score(10)));

        repo.upsert_category("u1", "c1", Category::Difficulty, score(20))
            .await
            .unwrap();
        let updated = repo
            .upsert_category("u1", "c1", Category::Clarity, score(30))
            .await
            .unwrap();
        assert_eq!(updated.score(Category::Clarity), Some(score(30)));
        assert_eq!(updated.score(Category::Difficulty), Some(score(20)));
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(repo.count(), 1);
    }

    #[tokio::test]
    async fn test_find_one_is_idempotent() {
        let repo = MemoryRatingRepository::new();
        repo.upsert_category("u1", "c1", Category::Usefulness, score(5))
            .await
            .unwrap();

        let first = repo.find_one("u1", "c1").await.unwrap();
        let second = repo.find_one("u1", "c1").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_insert_category_keeps_existing_score() {
        let repo = MemoryRatingRepository::new();
        repo.insert_category("u1", "c1", Category::Clarity, score(15))
            .await
            .unwrap();
        let record = repo
            .insert_category("u1", "c1", Category::Difficulty, score(25))
            .await
            .unwrap();
        assert_eq!(record.ratings.len(), 2);

        let err = repo
            .insert_category("u1", "c1", Category::Clarity, score(99))
            .await
            .unwrap_err();
        assert!(matches!(err, RatingError::AlreadyRated { score: 15, .. }));
        let stored = repo.find_one("u1", "c1").await.unwrap().unwrap();
        assert_eq!(stored.score(Category::Clarity), Some(score(15)));
    }

    #[tokio::test]
    async fn test_update_category_requires_existing_score() {
        let repo = MemoryRatingRepository::new();

        let err = repo
            .update_category("u1", "c1", Category::Clarity, score(40))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_YET_RATED");
        assert_eq!(repo.count(), 0);

        repo.insert_category("u1", "c1", Category::Difficulty, score(1))
            .await
            .unwrap();
        let err = repo
            .update_category("u1", "c1", Category::Clarity, score(40))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RatingError::NotYetRated {
                category: Some(Category::Clarity),
                ..
            }
        ));

        let updated = repo
            .update_category("u1", "c1", Category::Difficulty, score(2))
            .await
            .unwrap();
        assert_eq!(updated.score(Category::Difficulty), Some(score(2)));
        assert!(!updated.has_rated(Category::Clarity));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_single_winner() {
        let repo = MemoryRatingRepository::new();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.insert_category("u1", "c1", Category::Usefulness, score(i))
                        .await
                })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in handles {
            if let Ok(record) = handle.await.unwrap() {
                winners.push(record.score(Category::Usefulness));
            }
        }
        assert_eq!(winners.len(), 1);
        let stored = repo.find_one("u1", "c1").await.unwrap().unwrap();
        assert_eq!(stored.score(Category::Usefulness), winners[0]);
    }

    #[tokio::test]
    async fn test_delete_category_not_found() {
        let repo = MemoryRatingRepository::new();

        let err = repo
            .delete_category("u1", "c1", Category::Clarity)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");

        repo.upsert_category("u1", "c1", Category::Clarity, score(1))
            .await
            .unwrap();
        let err = repo
            .delete_category("u1", "c1", Category::Difficulty)
            .await
            .unwrap_err();
        assert!(
            matches!(err, RatingError::NotFound { ref entity, .. } if entity == "RatingCategory")
        );
        // 失败的删除不改变已有数据
        let stored = repo.find_one("u1", "c1").await.unwrap().unwrap();
        assert!(stored.has_rated(Category::Clarity));
    }

    #[tokio::test]
    async fn test_delete_last_category_removes_record() {
        let repo = MemoryRatingRepository::new();
        repo.upsert_category("u1", "c1", Category::Clarity, score(1))
            .await
            .unwrap();
        repo.upsert_category("u1", "c1", Category::Difficulty, score(2))
            .await
            .unwrap();

        let first = repo
            .delete_category("u1", "c1", Category::Clarity)
            .await
            .unwrap();
        assert_eq!(first.removed, score(1));
        assert_eq!(first.remaining.map(|r| r.ratings.len()), Some(1));

        let last = repo
            .delete_category("u1", "c1", Category::Difficulty)
            .await
            .unwrap();
        assert_eq!(last.removed, score(2));
        assert!(last.remaining.is_none());
        assert!(repo.find_one("u1", "c1").await.unwrap().is_none());
        assert_eq!(repo.count(), 0);
    }

    #[tokio::test]
    async fn test_delete_record_and_list_by_content() {
        let repo = MemoryRatingRepository::new();
        repo.upsert_category("u2", "c1", Category::Clarity, score(60))
            .await
            .unwrap();
        repo.upsert_category("u1", "c1", Category::Clarity, score(40))
            .await
            .unwrap();
        repo.upsert_category("u1", "c2", Category::Clarity, score(90))
            .await
            .unwrap();

        let listed = repo.list_by_content("c1").await.unwrap();
        let users: Vec<_> = listed.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(users, vec!["u1", "u2"]);

        let deleted = repo.delete_record("u1", "c1").await.unwrap();
        assert_eq!(deleted.score(Category::Clarity), Some(score(40)));
        assert!(repo.delete_record("u1", "c1").await.is_err());
        assert_eq!(repo.list_by_content("c1").await.unwrap().len(), 1);
        assert!(repo.find_one("u1", "c2").await.unwrap().is_some());
    }
}
