// ==========================================
// 服务覆盖排班系统 - 历史分配领域模型
// ==========================================
// 生命周期: 提交排班时追加;对账 ReplaceAll 时按日期撤回
// 每人历史按日期有序,并缓存 "最近一次分配" 指针
// ==========================================

use crate::domain::assignment::CandidateAssignment;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

// ==========================================
// HistoricalAssignmentRecord - 历史分配记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalAssignmentRecord {
    pub record_id: String,
    pub worker_id: String,
    pub date: NaiveDate,
    pub position_code: String,
    pub duration_hours: f64,
    pub is_zone_change: bool,
    pub is_shift_change: bool,
}

impl HistoricalAssignmentRecord {
    /// 由候选分配生成历史记录 (分配新 record_id)
    pub fn from_candidate(candidate: &CandidateAssignment) -> Self {
        Self {
            record_id: Uuid::new_v4().to_string(),
            worker_id: candidate.worker_id.clone(),
            date: candidate.date,
            position_code: candidate.position_code.clone(),
            duration_hours: candidate.duration_hours,
            is_zone_change: candidate.is_zone_change,
            is_shift_change: candidate.is_shift_change,
        }
    }

    /// 排序键: 日期优先,同日按岗位编码
    fn sort_key(&self) -> (NaiveDate, &str, &str) {
        (self.date, self.position_code.as_str(), self.record_id.as_str())
    }
}

// ==========================================
// WorkerHistory - 单人历史
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerHistory {
    pub worker_id: String,
    assignments: Vec<HistoricalAssignmentRecord>,
    latest: Option<HistoricalAssignmentRecord>,
}

impl WorkerHistory {
    pub fn new(worker_id: &str) -> Self {
        Self {
            worker_id: worker_id.to_string(),
            assignments: Vec::new(),
            latest: None,
        }
    }

    pub fn assignments(&self) -> &[HistoricalAssignmentRecord] {
        &self.assignments
    }

    /// 最近一次分配
    pub fn latest(&self) -> Option<&HistoricalAssignmentRecord> {
        self.latest.as_ref()
    }

    /// 追加记录并保持按日期有序
    pub fn add_assignment(&mut self, record: HistoricalAssignmentRecord) {
        let pos = self
            .assignments
            .partition_point(|r| r.sort_key() <= record.sort_key());
        self.assignments.insert(pos, record);
        self.refresh_latest();
    }

    /// 撤回落在指定日期集合内的记录,返回被撤回的记录
    pub fn retract_dates(&mut self, dates: &BTreeSet<NaiveDate>) -> Vec<HistoricalAssignmentRecord> {
        let (removed, kept): (Vec<_>, Vec<_>) = self
            .assignments
            .drain(..)
            .partition(|r| dates.contains(&r.date));
        self.assignments = kept;
        self.refresh_latest();
        removed
    }

    /// 按 record_id 撤回
    pub fn retract_record(&mut self, record_id: &str) -> Option<HistoricalAssignmentRecord> {
        let idx = self.assignments.iter().position(|r| r.record_id == record_id)?;
        let removed = self.assignments.remove(idx);
        self.refresh_latest();
        Some(removed)
    }

    pub fn total_zone_changes(&self) -> usize {
        self.assignments.iter().filter(|r| r.is_zone_change).count()
    }

    pub fn total_shift_changes(&self) -> usize {
        self.assignments.iter().filter(|r| r.is_shift_change).count()
    }

    pub fn total_hours(&self) -> f64 {
        self.assignments.iter().map(|r| r.duration_hours).sum()
    }

    fn refresh_latest(&mut self) {
        self.latest = self.assignments.last().cloned();
    }
}

// ==========================================
// HistoryBook - 全体人员历史
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryBook {
    histories: BTreeMap<String, WorkerHistory>,
}

impl HistoryBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由记录列表构建
    pub fn from_records(records: impl IntoIterator<Item = HistoricalAssignmentRecord>) -> Self {
        let mut book = Self::new();
        for record in records {
            book.add(record);
        }
        book
    }

    pub fn add(&mut self, record: HistoricalAssignmentRecord) {
        self.history_mut(&record.worker_id.clone()).add_assignment(record);
    }

    pub fn get(&self, worker_id: &str) -> Option<&WorkerHistory> {
        self.histories.get(worker_id)
    }

    /// 获取(或创建)某人的历史
    pub fn history_mut(&mut self, worker_id: &str) -> &mut WorkerHistory {
        self.histories
            .entry(worker_id.to_string())
            .or_insert_with(|| WorkerHistory::new(worker_id))
    }

    pub fn histories(&self) -> impl Iterator<Item = &WorkerHistory> {
        self.histories.values()
    }

    /// 全部记录 (按人员、日期排序)
    pub fn records(&self) -> impl Iterator<Item = &HistoricalAssignmentRecord> {
        self.histories.values().flat_map(|h| h.assignments.iter())
    }

    pub fn record_count(&self) -> usize {
        self.histories.values().map(|h| h.assignments.len()).sum()
    }

    /// 存在历史记录的日期集合
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.records().map(|r| r.date).collect()
    }

    // ===== 公平性统计 =====

    pub fn mean_zone_changes(&self) -> f64 {
        mean(self.histories.values().map(|h| h.total_zone_changes() as f64))
    }

    pub fn stddev_zone_changes(&self) -> f64 {
        population_stddev(self.histories.values().map(|h| h.total_zone_changes() as f64))
    }

    pub fn mean_shift_changes(&self) -> f64 {
        mean(self.histories.values().map(|h| h.total_shift_changes() as f64))
    }

    pub fn stddev_shift_changes(&self) -> f64 {
        population_stddev(self.histories.values().map(|h| h.total_shift_changes() as f64))
    }
}

/// 算术平均 (空集为 0)
pub fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// 总体标准差 (空集为 0)
pub fn population_stddev(values: impl Iterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values.iter().copied());
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}
