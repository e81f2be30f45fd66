//! 内容评分引擎
//!
//! 对课程等内容按固定类别收集用户评分，并在写入前完成全部合法性校验。
//!
//! ## 核心功能
//!
//! - **类别注册表**：固定的评分类别集合（clarity / difficulty / usefulness）
//! - **评分校验**：类别合法性、分数区间、重复评分与未评分守卫
//! - **评分存储**：每个 (user_id, content_id) 一条记录，支持内存与 PostgreSQL 后端
//! - **并发控制**：存储层条件写入，同一 key 的并发请求只有一个能完成状态迁移
//! - **聚合统计**：按类别汇总评分人数、平均分、最高最低分
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `validator`: 纯函数校验器
//! - `repository`: 仓储层
//! - `service`: 业务服务层

pub mod error;
pub mod models;
pub mod repository;
pub mod service;
pub mod validator;

pub use error::{RatingError, Result};
pub use models::*;
pub use repository::{
    CategoryRemoval, ContentCatalogTrait, InMemoryContentCatalog, MemoryRatingRepository,
    OpenContentCatalog, PgRatingRepository, RatingRepositoryTrait, RatingStore,
};
pub use service::{RatingQueryService, RatingService, dto};
