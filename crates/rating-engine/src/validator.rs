//! 评分校验器
//!
//! 纯函数，不做任何 I/O。每个检查接收当前评分记录（可能不存在）与请求参数，
//! 通过时返回 `Ok`，否则返回携带完整上下文的 [`RatingError`]。
//!
//! 检查的组合顺序由服务层决定。

use crate::error::{RatingError, Result};
use crate::models::{Category, RatingRecord, Score, ScoreInput};

/// 类别必须在注册表中
pub fn check_category_valid(category: &str) -> Result<Category> {
    Category::parse(category).ok_or_else(|| RatingError::InvalidCategory {
        category: category.to_string(),
        valid: Category::valid_list(),
    })
}

/// 分数必须是 [0, 100] 区间内的整数
///
/// 缺失、非数字、带小数、非有限值均视为无效
pub fn check_score_valid(score: &ScoreInput) -> Result<Score> {
    let invalid = || RatingError::InvalidScore {
        raw: score.to_string(),
    };

    match score {
        ScoreInput::Number(n) if n.is_finite() && n.fract() == 0.0 => {
            // 超出 i64 的值会饱和转换，随后同样被区间检查拒绝
            Score::new(*n as i64).ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

/// 新增评分守卫：该类别不能已有分数
pub fn check_not_already_rated(
    record: Option<&RatingRecord>,
    user_id: &str,
    content_id: &str,
    category: Category,
) -> Result<()> {
    match record.and_then(|r| r.score(category)) {
        Some(existing) => Err(RatingError::already_rated(user_id, content_id, category, existing)),
        None => Ok(()),
    }
}

/// 更新 / 删除守卫：该类别必须已有分数，返回当前分数
pub fn check_already_rated(
    record: Option<&RatingRecord>,
    user_id: &str,
    content_id: &str,
    category: Category,
) -> Result<Score> {
    record
        .and_then(|r| r.score(category))
        .ok_or_else(|| RatingError::not_yet_rated(user_id, content_id, Some(category)))
}

/// 内容级守卫：用户必须对该内容做过至少一次评分
pub fn check_has_any_rating<'a>(
    record: Option<&'a RatingRecord>,
    user_id: &str,
    content_id: &str,
) -> Result<&'a RatingRecord> {
    record.ok_or_else(|| RatingError::not_yet_rated(user_id, content_id, None))
}
