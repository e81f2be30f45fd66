//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Category, RatingRecord, Score};

/// 删除某类别分数的结果
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRemoval {
    /// 被删除的分数
    pub removed: Score,
    /// 删除后的记录，最后一个类别被删除时整条记录随之删除，此时为 None
    pub remaining: Option<RatingRecord>,
}

/// 评分记录仓储接口
///
/// 评分记录由仓储独占，其他组件不直接修改。所有写操作对单个 (user_id, content_id)
/// 原子执行：带条件的写入在同一次存储操作内完成判断与修改，多个服务实例或多个进程
/// 共享同一存储时同样成立。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RatingRepositoryTrait: Send + Sync {
    /// 按 (user_id, content_id) 查询评分记录，无副作用
    async fn find_one(&self, user_id: &str, content_id: &str) -> Result<Option<RatingRecord>>;

    /// 写入某类别分数
    ///
    /// 记录不存在时创建单类别记录，否则设置或覆盖该类别分数。返回写入后的记录。
    async fn upsert_category(
        &self,
        user_id: &str,
        content_id: &str,
        category: Category,
        score: Score,
    ) -> Result<RatingRecord>;

    /// 仅当该类别尚无分数时写入
    ///
    /// 已有分数时不做修改，返回携带已有分数的 `AlreadyRated`
    async fn insert_category(
        &self,
        user_id: &str,
        content_id: &str,
        category: Category,
        score: Score,
    ) -> Result<RatingRecord>;

    /// 仅当该类别已有分数时覆盖
    ///
    /// 记录或类别不存在时不做修改，返回 `NotYetRated`
    async fn update_category(
        &self,
        user_id: &str,
        content_id: &str,
        category: Category,
        score: Score,
    ) -> Result<RatingRecord>;

    /// 删除某类别分数
    ///
    /// 记录或类别不存在时返回 `NotFound`
    async fn delete_category(
        &self,
        user_id: &str,
        content_id: &str,
        category: Category,
    ) -> Result<CategoryRemoval>;

    /// 删除整条评分记录并返回被删除的记录，记录不存在时返回 `NotFound`
    async fn delete_record(&self, user_id: &str, content_id: &str) -> Result<RatingRecord>;

    /// 列出某内容的所有评分记录
    async fn list_by_content(&self, content_id: &str) -> Result<Vec<RatingRecord>>;
}

/// 内容目录接口
///
/// 内容（课程、作品等）的存在性由外部系统维护，评分引擎只做查询
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentCatalogTrait: Send + Sync {
    async fn content_exists(&self, content_id: &str) -> Result<bool>;
}
