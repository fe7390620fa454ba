// ==========================================
// 服务覆盖排班系统 - 评分报告
// ==========================================

use crate::domain::types::WeightBand;
use crate::engine::scoring::RestrictionError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 单项约束结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RestrictionOutcome {
    Scored { score: f64, contribution: f64 },
    Failed { reason: String },
}

impl RestrictionOutcome {
    pub(crate) fn from_result(weight: f64, result: Result<f64, RestrictionError>) -> Self {
        let checked = result.and_then(|score| {
            if score.is_finite() && (0.0..=100.0).contains(&score) {
                Ok(score)
            } else {
                Err(RestrictionError::ScoreOutOfRange(score))
            }
        });
        match checked {
            Ok(score) => RestrictionOutcome::Scored {
                score,
                contribution: weight * score,
            },
            Err(e) => RestrictionOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RestrictionOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestrictionResult {
    pub name: String,
    pub weight: f64,
    pub band: WeightBand,
    pub outcome: RestrictionOutcome,
}

// ==========================================
// ScoreReport - 评分报告
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    /// Σ weight * score (仅成功项,不重新归一化)
    pub total: f64,
    /// 全部已注册约束的权重合计
    pub weight_sum: f64,
    /// 成功项的权重合计
    pub effective_weight_sum: f64,
    /// 按注册顺序
    pub results: Vec<RestrictionResult>,
}

impl ScoreReport {
    pub fn get(&self, name: &str) -> Option<&RestrictionResult> {
        self.results.iter().find(|r| r.name == name)
    }

    pub fn failed(&self) -> impl Iterator<Item = &RestrictionResult> {
        self.results.iter().filter(|r| r.outcome.is_failed())
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    /// 权重合计是否为 1 (容差 1e-6)
    pub fn weights_balanced(&self) -> bool {
        (self.weight_sum - 1.0).abs() < 1e-6
    }

    /// 按分档分组
    pub fn by_band(&self) -> BTreeMap<WeightBand, Vec<&RestrictionResult>> {
        let mut map: BTreeMap<WeightBand, Vec<&RestrictionResult>> = BTreeMap::new();
        for r in &self.results {
            map.entry(r.band).or_default().push(r);
        }
        map
    }
}
