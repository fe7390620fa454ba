// ==========================================
// 服务覆盖排班系统 - 历史对账引擎
// ==========================================
// 职责: 新批次与已持久化历史在日期重叠时的处理
// 流程:
//   1) plan: 检测重叠日期并生成计划 (纯函数,无副作用)
//   2) commit: 显式提交,ReplaceAll 在单一事务内撤回记录并回退计数器
// 红线: 调用方放弃 (丢弃计划) 时不得留下任何持久化变更
// 红线: 提交失败整体回滚并上抛
// ==========================================

use crate::domain::history::HistoryBook;
use crate::domain::reconciliation::{
    ExclusionMap, ReconciliationPlan, RetractionPlan, RetractionReport,
};
use crate::domain::types::{ConflictPolicy, DateWindow};
use crate::domain::worker::Worker;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::HistoryRepository;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, instrument, warn};

// ==========================================
// Reconciler - 历史对账引擎
// ==========================================
pub struct Reconciler {
    // 无状态引擎
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self {}
    }

    /// 窗口内已有历史记录的日期
    pub fn overlap_dates(&self, book: &HistoryBook, window: DateWindow) -> BTreeSet<NaiveDate> {
        book.records()
            .map(|r| r.date)
            .filter(|d| window.contains(*d))
            .collect()
    }

    /// 生成对账计划 (不改动 book)
    #[instrument(skip(self, book), fields(start = %window.start, end = %window.end, policy = %policy))]
    pub fn plan(
        &self,
        book: &HistoryBook,
        window: DateWindow,
        policy: ConflictPolicy,
    ) -> ReconciliationPlan {
        let overlap = self.overlap_dates(book, window);
        if overlap.is_empty() {
            return ReconciliationPlan::NoOverlap { policy };
        }

        let plan = match policy {
            ConflictPolicy::ReplaceAll => {
                let retractions = book
                    .records()
                    .filter(|r| overlap.contains(&r.date))
                    .cloned()
                    .collect();
                ReconciliationPlan::Replace(RetractionPlan::from_records(overlap, retractions))
            }
            ConflictPolicy::AddNewOnly => {
                let mut map = ExclusionMap::new();
                for record in book.records().filter(|r| overlap.contains(&r.date)) {
                    map.insert(record.date, &record.worker_id);
                }
                ReconciliationPlan::Exclude(map)
            }
        };

        info!(overlap_dates = plan_overlap_len(&plan), "检测到历史日期重叠");
        plan
    }

    /// 提交对账计划
    ///
    /// - Replace: 单一事务撤回记录、回退计数器、刷新最近分配指针
    /// - Exclude / NoOverlap: 不改动历史,返回空报告
    pub fn commit(
        &self,
        history_repo: &HistoryRepository,
        plan: &ReconciliationPlan,
    ) -> EngineResult<RetractionReport> {
        match plan {
            ReconciliationPlan::Replace(retraction) => {
                history_repo.retract(retraction).map_err(|e| {
                    warn!(error = %e, "历史撤回失败");
                    EngineError::ReconciliationFailed(e.to_string())
                })
            }
            ReconciliationPlan::Exclude(_) | ReconciliationPlan::NoOverlap { .. } => {
                Ok(RetractionReport::default())
            }
        }
    }

    /// 在内存副本上执行撤回 (预览用,不触碰持久化)
    ///
    /// 计数器回退下限为 0,最近分配指针取剩余最晚记录
    pub fn apply_in_memory(
        &self,
        plan: &RetractionPlan,
        book: &mut HistoryBook,
        workers: &mut BTreeMap<String, Worker>,
    ) -> EngineResult<RetractionReport> {
        for record in &plan.retractions {
            if !workers.contains_key(&record.worker_id) {
                return Err(EngineError::Integrity(format!(
                    "历史记录 {} 指向不存在的人员 {}",
                    record.record_id, record.worker_id
                )));
            }
        }

        for record in &plan.retractions {
            let history = book.history_mut(&record.worker_id);
            if history.retract_record(&record.record_id).is_none() {
                continue;
            }
            if let Some(worker) = workers.get_mut(&record.worker_id) {
                worker.counters.retract(record);
                worker.last_record_id = history.latest().map(|r| r.record_id.clone());
            }
        }

        Ok(RetractionReport {
            retracted_records: plan.retracted_count(),
            affected_workers: plan.deltas.len(),
            overlap_dates: plan.overlap_dates.len(),
        })
    }
}

fn plan_overlap_len(plan: &ReconciliationPlan) -> usize {
    match plan {
        ReconciliationPlan::Replace(r) => r.overlap_dates.len(),
        ReconciliationPlan::Exclude(map) => map.dates().count(),
        ReconciliationPlan::NoOverlap { .. } => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::history::HistoricalAssignmentRecord;
    use crate::domain::worker::WorkloadCounters;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn rec(id: &str, worker: &str, day: u32, hours: f64) -> HistoricalAssignmentRecord {
        HistoricalAssignmentRecord {
            record_id: id.to_string(),
            worker_id: worker.to_string(),
            date: d(day),
            position_code: "SV-1".to_string(),
            duration_hours: hours,
            is_zone_change: false,
            is_shift_change: true,
        }
    }

    fn workers_with_hours(hours: f64) -> BTreeMap<String, Worker> {
        let mut map = BTreeMap::new();
        for id in ["W1", "W2"] {
            let mut w = Worker::new(id, id, "A");
            w.counters = WorkloadCounters::new(hours, 0, 3);
            map.insert(id.to_string(), w);
        }
        map
    }

    #[test]
    fn test_no_overlap_is_noop_for_both_policies() {
        let book = HistoryBook::from_records(vec![rec("R1", "W1", 20, 8.0)]);
        let window = DateWindow::new(d(1), d(7));

        for policy in [ConflictPolicy::ReplaceAll, ConflictPolicy::AddNewOnly] {
            let plan = Reconciler::new().plan(&book, window, policy);
            assert!(!plan.has_overlap());
            assert!(plan.exclusion_map().is_empty());
        }
    }

    #[test]
    fn test_add_new_only_is_idempotent_and_pure() {
        let book = HistoryBook::from_records(vec![
            rec("R1", "W1", 1, 8.0),
            rec("R2", "W2", 1, 8.0),
            rec("R3", "W1", 3, 8.0),
        ]);
        let before = book.clone();
        let window = DateWindow::new(d(1), d(2));
        let reconciler = Reconciler::new();

        let first = reconciler.plan(&book, window, ConflictPolicy::AddNewOnly);
        let second = reconciler.plan(&book, window, ConflictPolicy::AddNewOnly);

        assert_eq!(first, second);
        assert_eq!(book, before);
        let map = first.exclusion_map();
        assert!(map.is_excluded("W1", d(1)));
        assert!(map.is_excluded("W2", d(1)));
        assert!(!map.is_excluded("W1", d(3)));
        assert_eq!(map.pair_count(), 2);
    }

    #[test]
    fn test_replace_then_readd_restores_counters() {
        let records = vec![rec("R1", "W1", 1, 7.5), rec("R2", "W1", 2, 8.0), rec("R3", "W2", 2, 6.0)];
        let mut book = HistoryBook::from_records(records);
        let mut workers = workers_with_hours(100.0);
        let reconciler = Reconciler::new();

        let plan = reconciler.plan(&book, DateWindow::new(d(2), d(5)), ConflictPolicy::ReplaceAll);
        let ReconciliationPlan::Replace(retraction) = plan else {
            panic!("expected a retraction plan");
        };
        let report = reconciler
            .apply_in_memory(&retraction, &mut book, &mut workers)
            .unwrap();

        assert_eq!(report.retracted_records, 2);
        assert!((workers["W1"].counters.annual_hours() - 92.0).abs() < 1e-9);
        assert_eq!(workers["W1"].counters.shift_changes(), 2);
        assert_eq!(workers["W1"].last_record_id.as_deref(), Some("R1"));
        assert!(workers["W2"].last_record_id.is_none());

        for record in &retraction.retractions {
            workers.get_mut(&record.worker_id).unwrap().counters.apply(record);
            book.add(record.clone());
        }
        assert!((workers["W1"].counters.annual_hours() - 100.0).abs() < 1e-9);
        assert!((workers["W2"].counters.annual_hours() - 100.0).abs() < 1e-9);
        assert_eq!(book.record_count(), 3);
    }

    #[test]
    fn test_in_memory_retraction_floors_hours() {
        let mut book = HistoryBook::from_records(vec![rec("R1", "W1", 1, 8.0)]);
        let mut workers = workers_with_hours(3.0);
        let reconciler = Reconciler::new();

        let plan = reconciler.plan(&book, DateWindow::new(d(1), d(1)), ConflictPolicy::ReplaceAll);
        if let ReconciliationPlan::Replace(retraction) = plan {
            reconciler
                .apply_in_memory(&retraction, &mut book, &mut workers)
                .unwrap();
        }

        assert_eq!(workers["W1"].counters.annual_hours(), 0.0);
    }

    #[test]
    fn test_in_memory_unknown_worker_changes_nothing() {
        let mut book = HistoryBook::from_records(vec![rec("R1", "W1", 1, 8.0), rec("R2", "W9", 1, 8.0)]);
        let mut workers = workers_with_hours(50.0);
        let reconciler = Reconciler::new();

        let plan = reconciler.plan(&book, DateWindow::new(d(1), d(1)), ConflictPolicy::ReplaceAll);
        let ReconciliationPlan::Replace(retraction) = plan else {
            panic!("expected a retraction plan");
        };

        assert!(reconciler.apply_in_memory(&retraction, &mut book, &mut workers).is_err());
        assert_eq!(book.record_count(), 2);
        assert_eq!(workers["W1"].counters.annual_hours(), 50.0);
    }
}
