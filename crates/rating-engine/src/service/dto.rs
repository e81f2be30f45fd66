//! 服务层数据传输对象
//!
//! 定义服务层与边界层交互使用的 DTO，与内部领域模型解耦

use serde::{Deserialize, Serialize};

use crate::models::{Category, RatingRecord, Score, ScoreInput};

/// 新增 / 更新评分请求
///
/// user_id 由已认证的会话提供，服务层直接信任；category 与 score 原样来自请求，
/// 由校验器判定是否合法
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingRequest {
    pub user_id: String,
    pub content_id: String,
    pub category: String,
    #[serde(default)]
    pub score: ScoreInput,
}

impl RatingRequest {
    pub fn new(
        user_id: impl Into<String>,
        content_id: impl Into<String>,
        category: impl Into<String>,
        score: impl Into<ScoreInput>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            content_id: content_id.into(),
            category: category.into(),
            score: score.into(),
        }
    }
}

/// 删除评分请求
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRatingRequest {
    pub user_id: String,
    pub content_id: String,
    pub category: String,
}

impl RemoveRatingRequest {
    pub fn new(
        user_id: impl Into<String>,
        content_id: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            content_id: content_id.into(),
            category: category.into(),
        }
    }
}

/// 评分操作成功响应
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingResponse {
    pub user_id: String,
    pub content_id: String,
    pub category: Category,
    pub score: Score,
}

impl RatingResponse {
    pub fn new(user_id: &str, content_id: &str, category: Category, score: Score) -> Self {
        Self {
            user_id: user_id.to_string(),
            content_id: content_id.to_string(),
            category,
            score,
        }
    }
}

/// 单个类别的统计
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category: Category,
    /// 在该类别上评过分的用户数
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Score>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Score>,
}

/// 内容评分汇总
///
/// categories 按类别注册顺序排列，未被评分的类别 count 为 0
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRatingSummary {
    pub content_id: String,
    /// 对该内容做过评分的用户数
    pub rater_count: usize,
    pub categories: Vec<CategorySummary>,
}

impl ContentRatingSummary {
    /// 从评分记录聚合
    pub fn from_records(content_id: &str, records: &[RatingRecord]) -> Self {
        let categories = Category::all()
            .iter()
            .map(|&category| {
                let scores: Vec<Score> = records.iter().filter_map(|r| r.score(category)).collect();
                let count = scores.len();
                let average = (count > 0).then(|| {
                    scores.iter().map(|s| f64::from(s.value())).sum::<f64>() / count as f64
                });

                CategorySummary {
                    category,
                    count,
                    average,
                    min: scores.iter().min().copied(),
                    max: scores.iter().max().copied(),
                }
            })
            .collect();

        Self {
            content_id: content_id.to_string(),
            rater_count: records.iter().filter(|r| !r.is_empty()).count(),
            categories,
        }
    }

    pub fn category(&self, category: Category) -> Option<&CategorySummary> {
        self.categories.iter().find(|c| c.category == category)
    }
}
