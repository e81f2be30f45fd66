//! 服务层
//!
//! 编排校验器与存储，实现评分业务操作。
//!
//! ## 模块结构
//!
//! - `dto`: 数据传输对象定义
//! - `rating_service`: 评分写操作（提交、更新、删除）
//! - `query_service`: 评分查询与聚合（只读操作）

pub mod dto;
pub mod query_service;
pub mod rating_service;

pub use dto::*;
pub use query_service::RatingQueryService;
pub use rating_service::RatingService;
