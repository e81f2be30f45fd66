//! 评分类别注册表
//!
//! 评分类别是一个封闭、有序的集合，进程启动后不可变更。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 评分类别
///
/// 内容从这些维度被评分，声明顺序即展示顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// 清晰度
    Clarity,
    /// 难度
    Difficulty,
    /// 实用性
    Usefulness,
}

const ALL_CATEGORIES: [Category; 3] = [
    Category::Clarity,
    Category::Difficulty,
    Category::Usefulness,
];

impl Category {
    /// 所有合法类别（有序）
    pub fn all() -> &'static [Category] {
        &ALL_CATEGORIES
    }

    /// 类别的外部标识
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clarity => "clarity",
            Self::Difficulty => "difficulty",
            Self::Usefulness => "usefulness",
        }
    }

    /// 按外部标识查找类别，大小写敏感
    pub fn parse(value: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.as_str() == value)
    }

    pub fn is_valid(value: &str) -> bool {
        Self::parse(value).is_some()
    }

    /// 合法类别列表，用于错误提示
    pub fn valid_list() -> String {
        Self::all()
            .iter()
            .map(Category::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 类别解析失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownCategory(s.to_string()))
    }
}
