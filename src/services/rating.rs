//! 评分服务
//!
//! 维护题目的社区平均评分（无权重滑动均值，保留一位小数）。

use tracing::debug;

use crate::error::{AppError, Result};
use crate::store::{rows, Store};

/// 评分服务
#[derive(Clone)]
pub struct RatingService {
    store: Store,
}

impl RatingService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// 提交一次评分
    ///
    /// 评分必须在 [1.0, 5.0] 内，否则校验失败且不产生任何写入。
    /// 均值更新是共享行上的读-改-写，放在立即事务内串行执行，
    /// 并发提交不会丢失更新。
    ///
    /// # 返回
    /// 返回更新后的平均评分。
    pub fn submit_rating(&self, question_id: i64, rating: f64) -> Result<f64> {
        if !(1.0..=5.0).contains(&rating) {
            return Err(AppError::validation(format!(
                "评分必须在 1-5 分之间: {}",
                rating
            )));
        }

        let new_score = self.store.with_immediate_tx(|tx| {
            let (score, count) = rows::question_rating(tx, question_id)?;
            let new_count = count + 1;
            let new_score = round_to_tenth((score * count as f64 + rating) / new_count as f64);
            rows::update_question_rating(tx, question_id, new_score, new_count)?;
            Ok(new_score)
        })?;

        debug!("题目 {} 评分更新为 {}", question_id, new_score);
        Ok(new_score)
    }
}

/// 保留一位小数
fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_tenth() {
        assert_eq!(round_to_tenth(3.4999), 3.5);
        assert_eq!(round_to_tenth(4.0), 4.0);
        assert_eq!(round_to_tenth(3.04), 3.0);
    }
}
