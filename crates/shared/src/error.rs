//! 基础设施错误模块
//!
//! 定义配置加载、数据库连接与迁移等基础设施层的错误类型，业务错误由各服务自行定义。

use thiserror::Error;

/// 基础设施错误类型
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库迁移错误: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, InfraError>;
