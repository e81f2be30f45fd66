//! 数据库连接管理模块
//!
//! 提供 PostgreSQL 连接池与评分表的迁移。迁移脚本位于工作区根目录的 `migrations/`，
//! 编译期嵌入二进制。

use crate::config::DatabaseConfig;
use crate::error::Result;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// 数据库连接池包装
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 创建数据库连接池
    #[instrument(skip(config), fields(max_connections = config.max_connections))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await?;

        info!("Rating database pool created");
        Ok(Self { pool })
    }

    /// 获取连接池引用
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 执行未应用的迁移
    ///
    /// 迁移记录在 `_sqlx_migrations` 表中，重复调用只会执行新增脚本；
    /// 多个进程同时调用时由迁移器的 advisory lock 串行化
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        info!(
            migrations = MIGRATOR.iter().count(),
            "Rating schema migrations applied"
        );
        Ok(())
    }
}
