// ==========================================
// 服务覆盖排班系统 - 评分上下文
// ==========================================
// PlanningContext: 一次运行内不变的输入 (人员、岗位、休假、需求、历史、配置)
// CandidateSchedule: 待评估的完整候选排班
// ==========================================

use crate::config::RosterSettings;
use crate::domain::assignment::CandidateAssignment;
use crate::domain::history::HistoryBook;
use crate::domain::position::Position;
use crate::domain::reconciliation::ExclusionMap;
use crate::domain::worker::Worker;
use crate::engine::roster::RosterSnapshot;
use crate::engine::scoring::RestrictionError;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashSet};

#[derive(Debug, Clone)]
pub struct PlanningContext {
    pub workers: BTreeMap<String, Worker>,
    pub positions: BTreeMap<String, Position>,
    /// 当日不亲自到岗的 (人员, 日期)
    pub leaves: HashSet<(String, NaiveDate)>,
    /// 需覆盖的 (日期, 岗位)
    pub demand: BTreeSet<(NaiveDate, String)>,
    pub history: HistoryBook,
    /// AddNewOnly 对账产出的不可用组合
    pub exclusions: ExclusionMap,
    pub schedulable_group: String,
    pub max_consecutive_days: u32,
    pub default_annual_cap: f64,
}

impl PlanningContext {
    /// 由快照、历史与配置构建;需求为窗口内每日每个岗位
    pub fn from_snapshot(
        snapshot: &RosterSnapshot,
        history: HistoryBook,
        settings: &RosterSettings,
    ) -> Self {
        let demand = snapshot
            .window()
            .dates()
            .into_iter()
            .flat_map(move |date| {
                snapshot
                    .positions()
                    .iter()
                    .map(move |p| (date, p.position_code.clone()))
            })
            .collect();

        Self {
            workers: snapshot.workers().clone(),
            positions: snapshot
                .positions()
                .iter()
                .map(|p| (p.position_code.clone(), p.clone()))
                .collect(),
            leaves: snapshot
                .leaves()
                .map(|l| (l.worker_id.clone(), l.date))
                .collect(),
            demand,
            history,
            exclusions: ExclusionMap::new(),
            schedulable_group: settings.schedulable_group.clone(),
            max_consecutive_days: settings.max_consecutive_days,
            default_annual_cap: settings.annual_hour_cap,
        }
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionMap) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn worker(&self, worker_id: &str) -> Result<&Worker, RestrictionError> {
        self.workers
            .get(worker_id)
            .ok_or_else(|| RestrictionError::UnknownWorker(worker_id.to_string()))
    }

    pub fn position(&self, position_code: &str) -> Result<&Position, RestrictionError> {
        self.positions
            .get(position_code)
            .ok_or_else(|| RestrictionError::UnknownPosition(position_code.to_string()))
    }

    /// 该人员当日是否不可分配 (休假或排除表)
    pub fn is_unavailable(&self, worker_id: &str, date: NaiveDate) -> bool {
        self.leaves.contains(&(worker_id.to_string(), date))
            || self.exclusions.is_excluded(worker_id, date)
    }
}

// ==========================================
// CandidateSchedule - 候选排班
// ==========================================
pub struct CandidateSchedule<'a> {
    pub assignments: &'a [CandidateAssignment],
    pub context: &'a PlanningContext,
}

impl<'a> CandidateSchedule<'a> {
    pub fn new(assignments: &'a [CandidateAssignment], context: &'a PlanningContext) -> Self {
        Self {
            assignments,
            context,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// 按人员分组的分配
    pub fn by_worker(&self) -> BTreeMap<&str, Vec<&CandidateAssignment>> {
        let mut map: BTreeMap<&str, Vec<&CandidateAssignment>> = BTreeMap::new();
        for a in self.assignments {
            map.entry(a.worker_id.as_str()).or_default().push(a);
        }
        map
    }
}
