//! 评分查询服务
//!
//! 只读查询与聚合统计，不获取 key 锁

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::Result;
use crate::models::RatingRecord;
use crate::repository::{RatingRepositoryTrait, RatingStore};
use crate::service::dto::ContentRatingSummary;

/// 评分查询服务
pub struct RatingQueryService<R = RatingStore>
where
    R: RatingRepositoryTrait,
{
    repo: Arc<R>,
}

impl<R> RatingQueryService<R>
where
    R: RatingRepositoryTrait,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// 列出某内容的全部评分记录，按 user_id 排序
    pub async fn list_content_ratings(&self, content_id: &str) -> Result<Vec<RatingRecord>> {
        self.repo.list_by_content(content_id).await
    }

    /// 汇总某内容的评分
    #[instrument(skip(self))]
    pub async fn summarize_content(&self, content_id: &str) -> Result<ContentRatingSummary> {
        let records = self.repo.list_by_content(content_id).await?;
        let summary = ContentRatingSummary::from_records(content_id, &records);

        debug!(rater_count = summary.rater_count, "Content rating summary computed");
        Ok(summary)
    }
}
