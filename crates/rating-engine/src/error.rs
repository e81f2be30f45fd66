//! 评分服务错误类型
//!
//! 定义校验层的业务错误和存储层的系统错误

use thiserror::Error;

use rating_shared::error::InfraError;

use crate::models::{Category, RatingKey, Score};

/// 评分服务错误类型
#[derive(Debug, Error)]
pub enum RatingError {
    // === 校验错误 ===
    #[error("无效的评分类别: {category}，可选类别: {valid}")]
    InvalidCategory { category: String, valid: String },

    #[error("无效的分数: {raw}，分数必须是 [0, 100] 区间内的整数")]
    InvalidScore { raw: String },

    #[error(
        "用户已评分: user_id={user_id}, content_id={content_id}, category={category}, score={score}"
    )]
    AlreadyRated {
        user_id: String,
        content_id: String,
        category: Category,
        score: u8,
    },

    #[error(
        "用户尚未评分: user_id={user_id}, content_id={content_id}{}",
        category_suffix(.category)
    )]
    NotYetRated {
        user_id: String,
        content_id: String,
        /// 为 None 时表示内容级检查（用户未对该内容做过任何评分）
        category: Option<Category>,
    },

    // === 存储错误 ===
    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    #[error("内容不存在: content_id={0}")]
    ContentNotFound(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

fn category_suffix(category: &Option<Category>) -> String {
    category
        .map(|c| format!(", category={}", c))
        .unwrap_or_default()
}

/// 评分服务 Result 类型别名
pub type Result<T> = std::result::Result<T, RatingError>;

impl RatingError {
    /// 该类别已有分数
    pub fn already_rated(
        user_id: &str,
        content_id: &str,
        category: Category,
        score: Score,
    ) -> Self {
        Self::AlreadyRated {
            user_id: user_id.to_string(),
            content_id: content_id.to_string(),
            category,
            score: score.value(),
        }
    }

    /// 尚未评分，`category` 为 None 时表示内容级
    pub fn not_yet_rated(user_id: &str, content_id: &str, category: Option<Category>) -> Self {
        Self::NotYetRated {
            user_id: user_id.to_string(),
            content_id: content_id.to_string(),
            category,
        }
    }

    /// 评分记录不存在
    pub fn record_not_found(key: &RatingKey) -> Self {
        Self::NotFound {
            entity: "RatingRecord".to_string(),
            id: key.to_string(),
        }
    }

    /// 评分记录中不存在该类别
    pub fn category_not_found(key: &RatingKey, category: Category) -> Self {
        Self::NotFound {
            entity: "RatingCategory".to_string(),
            id: format!("{}:{}", key, category),
        }
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::Serialization(_) | Self::Internal(_)
        )
    }

    /// 获取错误码（用于边界层响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCategory { .. } => "INVALID_CATEGORY",
            Self::InvalidScore { .. } => "INVALID_SCORE",
            Self::AlreadyRated { .. } => "ALREADY_RATED",
            Self::NotYetRated { .. } => "NOT_YET_RATED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::ContentNotFound(_) => "CONTENT_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<InfraError> for RatingError {
    fn from(err: InfraError) -> Self {
        match err {
            InfraError::Database(e) => Self::Database(e),
            other => Self::Internal(other.to_string()),
        }
    }
}
