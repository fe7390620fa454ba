// ==========================================
// 服务覆盖排班系统 - 历史对账领域模型
// ==========================================
// 职责: 对账计划 (撤回计划 / 排除表) 与执行报告
// 红线: 计划是纯数据,生成计划不改动任何持久化状态
// ==========================================

use crate::domain::history::HistoricalAssignmentRecord;
use crate::domain::types::ConflictPolicy;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ==========================================
// ExclusionMap - 排除表 (日期 → 不可用人员)
// ==========================================
// 供外部优化器使用: 表内 (人员, 日期) 组合不得再分配
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionMap {
    entries: BTreeMap<NaiveDate, BTreeSet<String>>,
}

impl ExclusionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate, worker_id: &str) {
        self.entries
            .entry(date)
            .or_default()
            .insert(worker_id.to_string());
    }

    pub fn is_excluded(&self, worker_id: &str, date: NaiveDate) -> bool {
        self.entries
            .get(&date)
            .map(|set| set.contains(worker_id))
            .unwrap_or(false)
    }

    pub fn workers_on(&self, date: NaiveDate) -> Option<&BTreeSet<String>> {
        self.entries.get(&date)
    }

    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.entries.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 被排除的 (人员, 日期) 组合数
    pub fn pair_count(&self) -> usize {
        self.entries.values().map(|s| s.len()).sum()
    }
}

// ==========================================
// CounterDelta - 单人计数器回退量
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterDelta {
    pub hours: f64,
    pub zone_changes: u32,
    pub shift_changes: u32,
    pub records: usize,
}

impl CounterDelta {
    pub fn add(&mut self, record: &HistoricalAssignmentRecord) {
        self.hours += record.duration_hours;
        if record.is_zone_change {
            self.zone_changes += 1;
        }
        if record.is_shift_change {
            self.shift_changes += 1;
        }
        self.records += 1;
    }
}

// ==========================================
// RetractionPlan - 撤回计划 (ReplaceAll)
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetractionPlan {
    pub overlap_dates: BTreeSet<NaiveDate>,
    pub retractions: Vec<HistoricalAssignmentRecord>,
    pub deltas: BTreeMap<String, CounterDelta>,
}

impl RetractionPlan {
    /// 由待撤回记录构建,并按人员汇总回退量
    pub fn from_records(
        overlap_dates: BTreeSet<NaiveDate>,
        retractions: Vec<HistoricalAssignmentRecord>,
    ) -> Self {
        let mut deltas: BTreeMap<String, CounterDelta> = BTreeMap::new();
        for record in &retractions {
            deltas.entry(record.worker_id.clone()).or_default().add(record);
        }
        Self {
            overlap_dates,
            retractions,
            deltas,
        }
    }

    pub fn retracted_count(&self) -> usize {
        self.retractions.len()
    }

    pub fn affected_workers(&self) -> impl Iterator<Item = &String> {
        self.deltas.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.retractions.is_empty()
    }
}

// ==========================================
// ReconciliationPlan - 对账计划
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconciliationPlan {
    /// 窗口内无历史记录,两种策略均无操作
    NoOverlap { policy: ConflictPolicy },
    Replace(RetractionPlan),
    Exclude(ExclusionMap),
}

impl ReconciliationPlan {
    pub fn policy(&self) -> ConflictPolicy {
        match self {
            ReconciliationPlan::NoOverlap { policy } => *policy,
            ReconciliationPlan::Replace(_) => ConflictPolicy::ReplaceAll,
            ReconciliationPlan::Exclude(_) => ConflictPolicy::AddNewOnly,
        }
    }

    pub fn has_overlap(&self) -> bool {
        !matches!(self, ReconciliationPlan::NoOverlap { .. })
    }

    /// 排除表 (ReplaceAll / 无重叠时为空)
    pub fn exclusion_map(&self) -> ExclusionMap {
        match self {
            ReconciliationPlan::Exclude(map) => map.clone(),
            _ => ExclusionMap::new(),
        }
    }
}

// ==========================================
// RetractionReport - 撤回执行报告
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetractionReport {
    pub retracted_records: usize,
    pub affected_workers: usize,
    pub overlap_dates: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, worker: &str, hours: f64, zone: bool) -> HistoricalAssignmentRecord {
        HistoricalAssignmentRecord {
            record_id: id.to_string(),
            worker_id: worker.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            position_code: "SV-1".to_string(),
            duration_hours: hours,
            is_zone_change: zone,
            is_shift_change: false,
        }
    }

    #[test]
    fn test_plan_aggregates_deltas_per_worker() {
        let plan = RetractionPlan::from_records(
            BTreeSet::new(),
            vec![rec("R1", "W1", 8.0, true), rec("R2", "W1", 6.5, false), rec("R3", "W2", 8.0, false)],
        );

        let w1 = plan.deltas.get("W1").unwrap();
        assert!((w1.hours - 14.5).abs() < 1e-9);
        assert_eq!(w1.zone_changes, 1);
        assert_eq!(w1.records, 2);
        assert_eq!(plan.affected_workers().count(), 2);
        assert_eq!(plan.retracted_count(), 3);
    }

    #[test]
    fn test_exclusion_map_lookup() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let mut map = ExclusionMap::new();
        map.insert(day, "W1");
        map.insert(day, "W1");
        map.insert(day, "W2");

        assert!(map.is_excluded("W1", day));
        assert!(!map.is_excluded("W3", day));
        assert_eq!(map.pair_count(), 2);

        let on_day: Vec<&str> = map.workers_on(day).unwrap().iter().map(String::as_str).collect();
        assert_eq!(on_day, vec!["W1", "W2"]);
        assert!(map.workers_on(day.succ_opt().unwrap()).is_none());
    }
}
