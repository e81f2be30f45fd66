//! 评分服务
//!
//! 将校验器与存储编排为固定顺序的操作流水线：
//! - 提交新评分（同一类别只允许提交一次）
//! - 更新已有评分
//! - 删除某类别评分 / 删除用户对内容的全部评分
//!
//! ## 处理流程
//!
//! 1. 类别校验 -> 2. 分数校验 -> 3. 内容存在性检查 -> 4. 查询当前记录
//! -> 5. 状态守卫 -> 6. 条件写入存储
//!
//! 任一步失败立即返回，不产生部分写入。第 4、5 步读到的状态可能被其他请求抢先修改，
//! 因此第 6 步使用仓储的条件写入（`insert_category` / `update_category` /
//! `delete_category`），由存储在同一次操作内重新判断状态。同一 key 的并发请求
//! 无论经由哪个服务实例，都只有一个能完成状态迁移。

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use rating_shared::observability::metrics::record_rating_operation;

use crate::error::{RatingError, Result};
use crate::models::{Category, RatingRecord};
use crate::repository::{
    ContentCatalogTrait, InMemoryContentCatalog, RatingRepositoryTrait, RatingStore,
};
use crate::service::dto::{RatingRequest, RatingResponse, RemoveRatingRequest};
use crate::validator;

/// 操作名称，用作指标标签
mod operations {
    pub const SUBMIT: &str = "submit";
    pub const UPDATE: &str = "update";
    pub const REMOVE: &str = "remove";
    pub const REMOVE_ALL: &str = "remove_all";
}

/// 评分服务
///
/// 不持有可变状态，可以任意创建多个实例共享同一存储
pub struct RatingService<R = RatingStore, C = InMemoryContentCatalog>
where
    R: RatingRepositoryTrait,
    C: ContentCatalogTrait,
{
    repo: Arc<R>,
    /// 内容目录（外部协作方，只做存在性查询）
    catalog: Arc<C>,
}

impl<R, C> RatingService<R, C>
where
    R: RatingRepositoryTrait,
    C: ContentCatalogTrait,
{
    pub fn new(repo: Arc<R>, catalog: Arc<C>) -> Self {
        Self { repo, catalog }
    }

    /// 提交新评分
    ///
    /// 该类别已有分数时返回 `AlreadyRated`，错误中携带已有分数
    #[instrument(
        skip(self, request),
        fields(
            user_id = %request.user_id,
            content_id = %request.content_id,
            category = %request.category
        )
    )]
    pub async fn submit_new_rating(&self, request: RatingRequest) -> Result<RatingResponse> {
        let started = Instant::now();
        let result = self.do_submit(&request).await;
        observe(operations::SUBMIT, started, &result);

        match &result {
            Ok(response) => info!(score = %response.score, "Rating submitted"),
            Err(e) => warn!(error = %e, "Rating submission rejected"),
        }
        result
    }

    async fn do_submit(&self, request: &RatingRequest) -> Result<RatingResponse> {
        let (user_id, content_id) = (request.user_id.as_str(), request.content_id.as_str());

        let category = validator::check_category_valid(&request.category)?;
        let score = validator::check_score_valid(&request.score)?;
        self.ensure_content_exists(content_id).await?;

        let record = self.repo.find_one(user_id, content_id).await?;
        validator::check_not_already_rated(record.as_ref(), user_id, content_id, category)?;

        self.repo
            .insert_category(user_id, content_id, category, score)
            .await?;

        Ok(RatingResponse::new(user_id, content_id, category, score))
    }

    /// 更新已有评分
    ///
    /// 该类别尚未评分时返回 `NotYetRated`
    #[instrument(
        skip(self, request),
        fields(
            user_id = %request.user_id,
            content_id = %request.content_id,
            category = %request.category
        )
    )]
    pub async fn update_rating(&self, request: RatingRequest) -> Result<RatingResponse> {
        let started = Instant::now();
        let result = self.do_update(&request).await;
        observe(operations::UPDATE, started, &result);

        match &result {
            Ok(response) => info!(score = %response.score, "Rating updated"),
            Err(e) => warn!(error = %e, "Rating update rejected"),
        }
        result
    }

    async fn do_update(&self, request: &RatingRequest) -> Result<RatingResponse> {
        let (user_id, content_id) = (request.user_id.as_str(), request.content_id.as_str());

        let category = validator::check_category_valid(&request.category)?;
        let score = validator::check_score_valid(&request.score)?;
        self.ensure_content_exists(content_id).await?;

        let record = self.repo.find_one(user_id, content_id).await?;
        let previous =
            validator::check_already_rated(record.as_ref(), user_id, content_id, category)?;

        self.repo
            .update_category(user_id, content_id, category, score)
            .await?;

        info!(previous = %previous, "Replacing existing score");
        Ok(RatingResponse::new(user_id, content_id, category, score))
    }

    /// 删除某类别评分
    ///
    /// 返回被删除的分数。删除最后一个类别后整条记录随之删除。
    #[instrument(
        skip(self, request),
        fields(
            user_id = %request.user_id,
            content_id = %request.content_id,
            category = %request.category
        )
    )]
    pub async fn remove_rating(&self, request: RemoveRatingRequest) -> Result<RatingResponse> {
        let started = Instant::now();
        let result = self.do_remove(&request).await;
        observe(operations::REMOVE, started, &result);

        match &result {
            Ok(response) => info!(score = %response.score, "Rating removed"),
            Err(e) => warn!(error = %e, "Rating removal rejected"),
        }
        result
    }

    async fn do_remove(&self, request: &RemoveRatingRequest) -> Result<RatingResponse> {
        let (user_id, content_id) = (request.user_id.as_str(), request.content_id.as_str());

        let category = validator::check_category_valid(&request.category)?;
        self.ensure_content_exists(content_id).await?;

        let record = self.repo.find_one(user_id, content_id).await?;
        validator::check_already_rated(record.as_ref(), user_id, content_id, category)?;

        let removal = self
            .repo
            .delete_category(user_id, content_id, category)
            .await
            .map_err(|e| not_found_as_not_yet_rated(e, user_id, content_id, Some(category)))?;

        Ok(RatingResponse::new(user_id, content_id, category, removal.removed))
    }

    /// 删除用户对内容的全部评分
    ///
    /// 用户未对该内容评过分时返回 `NotYetRated`，成功时返回被删除的记录
    #[instrument(skip(self))]
    pub async fn remove_all_ratings(
        &self,
        user_id: &str,
        content_id: &str,
    ) -> Result<RatingRecord> {
        let started = Instant::now();
        let result = self.do_remove_all(user_id, content_id).await;
        observe(operations::REMOVE_ALL, started, &result);

        match &result {
            Ok(record) => info!(categories = record.ratings.len(), "All ratings removed"),
            Err(e) => warn!(error = %e, "Rating removal rejected"),
        }
        result
    }

    async fn do_remove_all(&self, user_id: &str, content_id: &str) -> Result<RatingRecord> {
        self.ensure_content_exists(content_id).await?;

        let record = self.repo.find_one(user_id, content_id).await?;
        validator::check_has_any_rating(record.as_ref(), user_id, content_id)?;

        self.repo
            .delete_record(user_id, content_id)
            .await
            .map_err(|e| not_found_as_not_yet_rated(e, user_id, content_id, None))
    }

    /// 查询评分记录（只读透传）
    pub async fn get_rating(
        &self,
        user_id: &str,
        content_id: &str,
    ) -> Result<Option<RatingRecord>> {
        self.repo.find_one(user_id, content_id).await
    }

    /// 内容级守卫：用户必须对该内容评过分
    ///
    /// 供边界层在执行依赖既有评分的操作前调用
    pub async fn has_rated_content(&self, user_id: &str, content_id: &str) -> Result<RatingRecord> {
        let record = self.repo.find_one(user_id, content_id).await?;
        validator::check_has_any_rating(record.as_ref(), user_id, content_id).cloned()
    }

    async fn ensure_content_exists(&self, content_id: &str) -> Result<()> {
        if self.catalog.content_exists(content_id).await? {
            Ok(())
        } else {
            Err(RatingError::ContentNotFound(content_id.to_string()))
        }
    }
}

/// 守卫通过后记录被并发删除时，存储返回 `NotFound`，对调用方仍表现为未评分
fn not_found_as_not_yet_rated(
    err: RatingError,
    user_id: &str,
    content_id: &str,
    category: Option<Category>,
) -> RatingError {
    match err {
        RatingError::NotFound { .. } => RatingError::not_yet_rated(user_id, content_id, category),
        other => other,
    }
}

fn observe<T>(operation: &str, started: Instant, result: &Result<T>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) => e.error_code(),
    };
    record_rating_operation(operation, outcome, started.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RatingKey, Score, ScoreInput};
    use crate::repository::{CategoryRemoval, MockContentCatalogTrait, MockRatingRepositoryTrait};

    fn score(value: i64) -> Score {
        Score::new(value).unwrap()
    }

    fn record(user_id: &str, content_id: &str, category: Category, value: i64) -> RatingRecord {
        RatingRecord::new(user_id, content_id, category, score(value))
    }

    fn open_catalog() -> MockContentCatalogTrait {
        let mut catalog = MockContentCatalogTrait::new();
        catalog.expect_content_exists().returning(|_| Ok(true));
        catalog
    }

    fn service(
        repo: MockRatingRepositoryTrait,
        catalog: MockContentCatalogTrait,
    ) -> RatingService<MockRatingRepositoryTrait, MockContentCatalogTrait> {
        RatingService::new(Arc::new(repo), Arc::new(catalog))
    }

    #[tokio::test]
    async fn test_submit_writes_after_checks_pass() {
        let mut repo = MockRatingRepositoryTrait::new();
        repo.expect_find_one().times(1).returning(|_, _| Ok(None));
        repo.expect_upsert_category().never();
        repo.expect_insert_category()
            .times(1)
            .returning(|user, content, category, score| {
                Ok(RatingRecord::new(user, content, category, score))
            });

        let response = service(repo, open_catalog())
            .submit_new_rating(RatingRequest::new("u1", "c1", "clarity", 70))
            .await
            .unwrap();

        assert_eq!(response.category, Category::Clarity);
        assert_eq!(response.score, score(70));
        assert_eq!(response.user_id, "u1");
        assert_eq!(response.content_id, "c1");
    }

    #[tokio::test]
    async fn test_invalid_category_short_circuits() {
        let mut repo = MockRatingRepositoryTrait::new();
        repo.expect_find_one().never();
        repo.expect_insert_category().never();
        let mut catalog = MockContentCatalogTrait::new();
        catalog.expect_content_exists().never();

        let err = service(repo, catalog)
            .submit_new_rating(RatingRequest::new("u1", "c1", "fun", 70))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CATEGORY");
    }

    #[tokio::test]
    async fn test_category_checked_before_score() {
        let mut repo = MockRatingRepositoryTrait::new();
        repo.expect_find_one().never();

        let err = service(repo, open_catalog())
            .update_rating(RatingRequest::new("u1", "c1", "fun", 500))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CATEGORY");
    }

    #[tokio::test]
    async fn test_invalid_score_never_reaches_store() {
        let mut repo = MockRatingRepositoryTrait::new();
        repo.expect_find_one().never();
        repo.expect_insert_category().never();
        let mut catalog = MockContentCatalogTrait::new();
        catalog.expect_content_exists().never();

        let svc = service(repo, catalog);
        for input in [ScoreInput::from(101), ScoreInput::Missing, ScoreInput::from(7.5)] {
            let err = svc
                .submit_new_rating(RatingRequest::new("u1", "c1", "clarity", input))
                .await
                .unwrap_err();
            assert_eq!(err.error_code(), "INVALID_SCORE");
        }
    }

    #[tokio::test]
    async fn test_missing_content_rejected_before_lookup() {
        let mut repo = MockRatingRepositoryTrait::new();
        repo.expect_find_one().never();
        let mut catalog = MockContentCatalogTrait::new();
        catalog.expect_content_exists().times(1).returning(|_| Ok(false));

        let err = service(repo, catalog)
            .submit_new_rating(RatingRequest::new("u1", "missing", "clarity", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, RatingError::ContentNotFound(ref id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_already_rated_does_not_write() {
        let mut repo = MockRatingRepositoryTrait::new();
        repo.expect_find_one()
            .returning(|user, content| Ok(Some(record(user, content, Category::Difficulty, 42))));
        repo.expect_insert_category().never();

        let err = service(repo, open_catalog())
            .submit_new_rating(RatingRequest::new("u1", "c1", "difficulty", 90))
            .await
            .unwrap_err();
        assert!(matches!(err, RatingError::AlreadyRated { score: 42, .. }));
    }

    #[tokio::test]
    async fn test_submit_loses_race_to_concurrent_writer() {
        // 读取时尚未评分，写入时已被其他请求抢先
        let mut repo = MockRatingRepositoryTrait::new();
        repo.expect_find_one().returning(|_, _| Ok(None));
        repo.expect_insert_category()
            .times(1)
            .returning(|user, content, category, _| {
                Err(RatingError::already_rated(user, content, category, score(11)))
            });

        let err = service(repo, open_catalog())
            .submit_new_rating(RatingRequest::new("u1", "c1", "clarity", 90))
            .await
            .unwrap_err();
        assert!(matches!(err, RatingError::AlreadyRated { score: 11, .. }));
    }

    #[tokio::test]
    async fn test_update_requires_existing_category() {
        let mut repo = MockRatingRepositoryTrait::new();
        repo.expect_find_one()
            .returning(|user, content| Ok(Some(record(user, content, Category::Clarity, 1))));
        repo.expect_update_category().never();

        let err = service(repo, open_catalog())
            .update_rating(RatingRequest::new("u1", "c1", "usefulness", 20))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RatingError::NotYetRated {
                category: Some(Category::Usefulness),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_update_uses_conditional_write() {
        let mut repo = MockRatingRepositoryTrait::new();
        repo.expect_find_one()
            .returning(|user, content| Ok(Some(record(user, content, Category::Clarity, 1))));
        repo.expect_upsert_category().never();
        repo.expect_update_category()
            .times(1)
            .returning(|user, content, category, score| {
                Ok(RatingRecord::new(user, content, category, score))
            });

        let response = service(repo, open_catalog())
            .update_rating(RatingRequest::new("u1", "c1", "clarity", 20))
            .await
            .unwrap();
        assert_eq!(response.score, score(20));
    }

    #[tokio::test]
    async fn test_remove_returns_removed_score() {
        let mut repo = MockRatingRepositoryTrait::new();
        repo.expect_find_one()
            .returning(|user, content| Ok(Some(record(user, content, Category::Usefulness, 64))));
        repo.expect_delete_category().times(1).returning(|_, _, _| {
            Ok(CategoryRemoval {
                removed: score(65),
                remaining: None,
            })
        });

        let response = service(repo, open_catalog())
            .remove_rating(RemoveRatingRequest::new("u1", "c1", "usefulness"))
            .await
            .unwrap();
        // 以存储实际删除的分数为准
        assert_eq!(response.score, score(65));
    }

    #[tokio::test]
    async fn test_remove_unrated_does_not_delete() {
        let mut repo = MockRatingRepositoryTrait::new();
        repo.expect_find_one().returning(|_, _| Ok(None));
        repo.expect_delete_category().never();

        let err = service(repo, open_catalog())
            .remove_rating(RemoveRatingRequest::new("u1", "c1", "clarity"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_YET_RATED");
    }

    #[tokio::test]
    async fn test_remove_after_concurrent_delete_is_not_yet_rated() {
        let mut repo = MockRatingRepositoryTrait::new();
        repo.expect_find_one()
            .returning(|user, content| Ok(Some(record(user, content, Category::Clarity, 3))));
        repo.expect_delete_category()
            .returning(|user, content, category| {
                let key = RatingKey::new(user, content);
                Err(RatingError::category_not_found(&key, category))
            });

        let err = service(repo, open_catalog())
            .remove_rating(RemoveRatingRequest::new("u1", "c1", "clarity"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RatingError::NotYetRated {
                category: Some(Category::Clarity),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_remove_all_requires_record() {
        let mut repo = MockRatingRepositoryTrait::new();
        repo.expect_find_one().returning(|_, _| Ok(None));
        repo.expect_delete_record().never();

        let err = service(repo, open_catalog())
            .remove_all_ratings("u1", "c1")
            .await
            .unwrap_err();
        assert!(matches!(err, RatingError::NotYetRated { category: None, .. }));
    }

    #[tokio::test]
    async fn test_store_error_propagates() {
        let mut repo = MockRatingRepositoryTrait::new();
        repo.expect_find_one()
            .returning(|_, _| Err(RatingError::Database(sqlx::Error::PoolTimedOut)));
        repo.expect_insert_category().never();

        let err = service(repo, open_catalog())
            .submit_new_rating(RatingRequest::new("u1", "c1", "clarity", 5))
            .await
            .unwrap_err();
        assert!(!err.is_business_error());
    }

    #[tokio::test]
    async fn test_has_rated_content() {
        let mut repo = MockRatingRepositoryTrait::new();
        repo.expect_find_one().times(1).returning(|_, _| Ok(None));

        let err = service(repo, MockContentCatalogTrait::new())
            .has_rated_content("u1", "c1")
            .await
            .unwrap_err();
        assert!(matches!(err, RatingError::NotYetRated { category: None, .. }));
    }
}
