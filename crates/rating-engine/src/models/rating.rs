//! 评分记录相关实体定义
//!
//! 包含分数、原始分数输入、记录主键和评分记录

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::category::Category;

/// 分数
///
/// [0, 100] 区间内的整数，只能通过校验构造
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 100;

    pub fn new(value: i64) -> Option<Self> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Some(Self(value as u8))
        } else {
            None
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Score {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("score {} is not in [0, 100]", value))
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 边界层传入的原始分数
///
/// 请求体中的 score 可能缺失、不是数字或超出范围，统一在校验器中判定
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Option<Value>")]
pub enum ScoreInput {
    /// 字段缺失或为 null
    #[default]
    Missing,
    /// 数字（可能带小数）
    Number(f64),
    /// 非数字的值，保留原始 JSON 文本
    Malformed(String),
}

impl From<Option<Value>> for ScoreInput {
    fn from(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Missing,
            Some(Value::Number(n)) => match n.as_f64() {
                Some(f) => Self::Number(f),
                None => Self::Malformed(n.to_string()),
            },
            Some(other) => Self::Malformed(other.to_string()),
        }
    }
}

impl From<i64> for ScoreInput {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for ScoreInput {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<f64> for ScoreInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Score> for ScoreInput {
    fn from(score: Score) -> Self {
        Self::Number(f64::from(score.value()))
    }
}

impl fmt::Display for ScoreInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("<missing>"),
            Self::Number(n) => write!(f, "{}", n),
            Self::Malformed(raw) => f.write_str(raw),
        }
    }
}

/// 评分记录主键
///
/// 每个 (user_id, content_id) 至多对应一条评分记录
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RatingKey {
    pub user_id: String,
    pub content_id: String,
}

impl RatingKey {
    pub fn new(user_id: impl Into<String>, content_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            content_id: content_id.into(),
        }
    }
}

impl fmt::Display for RatingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.content_id)
    }
}

/// 评分记录
///
/// 某用户对某内容在各类别上的全部评分。缺失的类别表示尚未评分。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingRecord {
    pub user_id: String,
    pub content_id: String,
    /// 类别 -> 分数
    pub ratings: BTreeMap<Category, Score>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RatingRecord {
    /// 创建只含一个类别的新记录
    pub fn new(
        user_id: impl Into<String>,
        content_id: impl Into<String>,
        category: Category,
        score: Score,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            content_id: content_id.into(),
            ratings: BTreeMap::from([(category, score)]),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> RatingKey {
        RatingKey::new(self.user_id.clone(), self.content_id.clone())
    }

    pub fn score(&self, category: Category) -> Option<Score> {
        self.ratings.get(&category).copied()
    }

    pub fn has_rated(&self, category: Category) -> bool {
        self.ratings.contains_key(&category)
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// 设置或覆盖某类别分数，返回旧分数
    pub fn set_score(&mut self, category: Category, score: Score) -> Option<Score> {
        self.updated_at = Utc::now();
        self.ratings.insert(category, score)
    }

    /// 移除某类别分数，返回被移除的分数
    pub fn remove_score(&mut self, category: Category) -> Option<Score> {
        let removed = self.ratings.remove(&category);
        if removed.is_some() {
            self.updated_at = Utc::now();
        }
        removed
    }
}
