//! 评分仓储层
//!
//! 提供评分记录的数据访问接口与内容存在性查询。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含校验逻辑
//! - 单条记录的写入在仓储内部是原子的
//! - 新增与更新提供条件写入，状态判断与修改在同一次存储操作内完成
//! - 定义 trait 接口以支持 mock 测试

mod content_catalog;
mod memory_repo;
mod rating_repo;
mod store;
mod traits;

pub use content_catalog::{InMemoryContentCatalog, OpenContentCatalog};
pub use memory_repo::MemoryRatingRepository;
pub use rating_repo::PgRatingRepository;
pub use store::RatingStore;
pub use traits::*;
