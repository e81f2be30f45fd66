//! 领域模型
//!
//! - `category`: 评分类别注册表
//! - `rating`: 分数、评分记录等实体

mod category;
mod rating;

pub use category::{Category, UnknownCategory};
pub use rating::{RatingKey, RatingRecord, Score, ScoreInput};
