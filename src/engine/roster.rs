// ==========================================
// 服务覆盖排班系统 - 排班数据快照
// ==========================================
// 职责: 一次运行所需的人员/岗位/休假数据 (只读)
// 索引: 人员按 worker_id 与本岗位编码;休假按 (worker_id, date)
// 说明: 同一本岗位编码对应多人时,取 worker_id 最小者
// ==========================================

use crate::domain::leave::LeaveRecord;
use crate::domain::position::Position;
use crate::domain::types::DateWindow;
use crate::domain::worker::Worker;
use crate::engine::repositories::RosterRepositories;
use crate::repository::RepositoryResult;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RosterSnapshot {
    window: DateWindow,
    workers: BTreeMap<String, Worker>,
    by_home_position: HashMap<String, String>,
    positions: Vec<Position>,
    leaves: HashMap<(String, NaiveDate), LeaveRecord>,
}

impl RosterSnapshot {
    /// 从仓储加载窗口内的快照
    pub fn load(repos: &RosterRepositories, window: DateWindow) -> RepositoryResult<Self> {
        let workers = repos.worker_repo.list_all()?;
        let positions = repos.position_repo.list_ordered()?;
        let leaves = repos.leave_repo.list_in_range(window)?;

        debug!(
            workers = workers.len(),
            positions = positions.len(),
            leaves = leaves.len(),
            start = %window.start,
            end = %window.end,
            "排班快照已加载"
        );

        Ok(Self::from_parts(window, workers, positions, leaves))
    }

    /// 由内存数据构建 (岗位顺序即处理顺序)
    pub fn from_parts(
        window: DateWindow,
        workers: Vec<Worker>,
        positions: Vec<Position>,
        leaves: Vec<LeaveRecord>,
    ) -> Self {
        let mut workers: Vec<Worker> = workers;
        workers.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));

        let mut by_home_position = HashMap::new();
        for worker in &workers {
            if let Some(code) = worker.home_position.as_deref().map(str::trim) {
                if code.is_empty() {
                    continue;
                }
                if let Some(existing) = by_home_position.get(code) {
                    warn!(
                        home_position = code,
                        kept = %existing,
                        ignored = %worker.worker_id,
                        "本岗位编码重复"
                    );
                    continue;
                }
                by_home_position.insert(code.to_string(), worker.worker_id.clone());
            }
        }

        let leaves = leaves
            .into_iter()
            .map(|l| ((l.worker_id.clone(), l.date), l))
            .collect();

        Self {
            window,
            workers: workers
                .into_iter()
                .map(|w| (w.worker_id.clone(), w))
                .collect(),
            by_home_position,
            positions,
            leaves,
        }
    }

    pub fn window(&self) -> DateWindow {
        self.window
    }

    pub fn worker(&self, worker_id: &str) -> Option<&Worker> {
        self.workers.get(worker_id)
    }

    pub fn workers(&self) -> &BTreeMap<String, Worker> {
        &self.workers
    }

    /// 按本岗位编码查找人员
    pub fn worker_by_home_position(&self, home_position: &str) -> Option<&Worker> {
        self.by_home_position
            .get(home_position.trim())
            .and_then(|id| self.workers.get(id))
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn leave(&self, worker_id: &str, date: NaiveDate) -> Option<&LeaveRecord> {
        self.leaves.get(&(worker_id.to_string(), date))
    }

    pub fn leaves(&self) -> impl Iterator<Item = &LeaveRecord> {
        self.leaves.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(id: &str, home: &str) -> Worker {
        let mut w = Worker::new(id, id, "A");
        w.home_position = Some(home.to_string());
        w
    }

    #[test]
    fn test_duplicate_home_position_keeps_smallest_worker_id() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let snapshot = RosterSnapshot::from_parts(
            DateWindow::new(day, day),
            vec![worker("W9", "PL-1"), worker("W2", " PL-1 "), worker("W5", "PL-2")],
            Vec::new(),
            Vec::new(),
        );

        assert_eq!(
            snapshot.worker_by_home_position("PL-1").map(|w| w.worker_id.as_str()),
            Some("W2")
        );
        assert_eq!(
            snapshot.worker_by_home_position("PL-2").map(|w| w.worker_id.as_str()),
            Some("W5")
        );
        assert_eq!(snapshot.workers().len(), 3);
    }
}
