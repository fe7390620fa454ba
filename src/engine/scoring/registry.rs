// ==========================================
// 服务覆盖排班系统 - 约束注册表
// ==========================================

use crate::domain::types::WeightBand;
use crate::engine::scoring::context::CandidateSchedule;
use crate::engine::scoring::report::{RestrictionOutcome, RestrictionResult, ScoreReport};
use crate::engine::scoring::{RestrictionError, ScoringError};
use tracing::{debug, instrument, warn};

/// 约束评估函数: 完整候选排班 → 0~100
pub type Evaluator =
    Box<dyn Fn(&CandidateSchedule<'_>) -> Result<f64, RestrictionError> + Send + Sync>;

pub struct Restriction {
    pub name: String,
    pub weight: f64,
    evaluator: Evaluator,
}

impl Restriction {
    pub fn band(&self) -> WeightBand {
        WeightBand::classify(self.weight)
    }

    pub fn evaluate(&self, schedule: &CandidateSchedule<'_>) -> Result<f64, RestrictionError> {
        (self.evaluator)(schedule)
    }
}

impl std::fmt::Debug for Restriction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Restriction")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish()
    }
}

// ==========================================
// RestrictionRegistry - 约束注册表
// ==========================================
#[derive(Debug, Default)]
pub struct RestrictionRegistry {
    restrictions: Vec<Restriction>,
}

impl RestrictionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册约束 (权重须在 (0, 1],名称唯一)
    pub fn register<F>(&mut self, name: &str, weight: f64, evaluator: F) -> Result<(), ScoringError>
    where
        F: Fn(&CandidateSchedule<'_>) -> Result<f64, RestrictionError> + Send + Sync + 'static,
    {
        let name = name.trim();
        if name.is_empty() {
            return Err(ScoringError::EmptyName);
        }
        if !(weight.is_finite() && weight > 0.0 && weight <= 1.0) {
            return Err(ScoringError::InvalidWeight {
                name: name.to_string(),
                weight,
            });
        }
        if self.restrictions.iter().any(|r| r.name == name) {
            return Err(ScoringError::DuplicateRestriction(name.to_string()));
        }

        self.restrictions.push(Restriction {
            name: name.to_string(),
            weight,
            evaluator: Box::new(evaluator),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.restrictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.restrictions.is_empty()
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    pub fn weight_sum(&self) -> f64 {
        self.restrictions.iter().map(|r| r.weight).sum()
    }

    /// 评估候选排班
    #[instrument(skip(self, schedule), fields(
        restrictions = self.restrictions.len(),
        assignments = schedule.assignments.len()
    ))]
    pub fn evaluate(&self, schedule: &CandidateSchedule<'_>) -> ScoreReport {
        let mut report = ScoreReport {
            weight_sum: self.weight_sum(),
            ..Default::default()
        };

        for restriction in &self.restrictions {
            let outcome =
                RestrictionOutcome::from_result(restriction.weight, restriction.evaluate(schedule));

            match &outcome {
                RestrictionOutcome::Scored { score, contribution } => {
                    report.total += contribution;
                    report.effective_weight_sum += restriction.weight;
                    debug!(name = %restriction.name, score, contribution, "约束评分");
                }
                RestrictionOutcome::Failed { reason } => {
                    warn!(name = %restriction.name, reason = %reason, "约束评估失败,已排除");
                }
            }

            report.results.push(RestrictionResult {
                name: restriction.name.clone(),
                weight: restriction.weight,
                band: restriction.band(),
                outcome,
            });
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::history::HistoryBook;
    use crate::domain::reconciliation::ExclusionMap;
    use crate::engine::scoring::context::PlanningContext;
    use std::collections::{BTreeMap, BTreeSet, HashSet};

    fn empty_context() -> PlanningContext {
        PlanningContext {
            workers: BTreeMap::new(),
            positions: BTreeMap::new(),
            leaves: HashSet::new(),
            demand: BTreeSet::new(),
            history: HistoryBook::new(),
            exclusions: ExclusionMap::new(),
            schedulable_group: "A".to_string(),
            max_consecutive_days: 9,
            default_annual_cap: 1605.0,
        }
    }

    #[test]
    fn test_failed_restriction_excluded_without_renormalising() {
        let mut registry = RestrictionRegistry::new();
        registry.register("r1", 0.5, |_| Ok(80.0)).unwrap();
        registry
            .register("r2", 0.5, |_| Err(RestrictionError::Failed("boom".to_string())))
            .unwrap();

        let ctx = empty_context();
        let report = registry.evaluate(&CandidateSchedule::new(&[], &ctx));

        assert!((report.total - 40.0).abs() < 1e-9);
        assert!((report.weight_sum - 1.0).abs() < 1e-9);
        assert!((report.effective_weight_sum - 0.5).abs() < 1e-9);
        assert!(report.get("r2").unwrap().outcome.is_failed());
        assert_eq!(report.failed().count(), 1);
    }

    #[test]
    fn test_out_of_range_score_is_a_failure() {
        let mut registry = RestrictionRegistry::new();
        registry.register("high", 0.2, |_| Ok(140.0)).unwrap();
        registry.register("nan", 0.2, |_| Ok(f64::NAN)).unwrap();
        registry.register("ok", 0.2, |_| Ok(100.0)).unwrap();

        let ctx = empty_context();
        let report = registry.evaluate(&CandidateSchedule::new(&[], &ctx));

        assert_eq!(report.failed().count(), 2);
        assert!((report.total - 20.0).abs() < 1e-9);
        assert!(!report.weights_balanced());
    }

    #[test]
    fn test_register_validation() {
        let mut registry = RestrictionRegistry::new();
        assert!(matches!(
            registry.register("zero", 0.0, |_| Ok(1.0)),
            Err(ScoringError::InvalidWeight { .. })
        ));
        assert!(matches!(
            registry.register("big", 1.5, |_| Ok(1.0)),
            Err(ScoringError::InvalidWeight { .. })
        ));
        assert_eq!(registry.register(" ", 0.1, |_| Ok(1.0)), Err(ScoringError::EmptyName));

        registry.register("dup", 1.0, |_| Ok(1.0)).unwrap();
        assert_eq!(
            registry.register("dup", 0.1, |_| Ok(1.0)),
            Err(ScoringError::DuplicateRestriction("dup".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_bands_are_reporting_only() {
        let mut registry = RestrictionRegistry::new();
        registry.register("critical", 0.10, |_| Ok(50.0)).unwrap();
        registry.register("important", 0.03, |_| Ok(50.0)).unwrap();
        registry.register("equity", 0.02, |_| Ok(50.0)).unwrap();

        let ctx = empty_context();
        let report = registry.evaluate(&CandidateSchedule::new(&[], &ctx));
        let bands = report.by_band();

        assert_eq!(bands[&WeightBand::Critical].len(), 1);
        assert_eq!(bands[&WeightBand::Important].len(), 1);
        assert_eq!(bands[&WeightBand::Equity].len(), 1);
        assert!((report.total - 7.5).abs() < 1e-9);
    }
}
