// ==========================================
// 服务覆盖排班系统 - 有效人员解析
// ==========================================
// 职责: (本岗位人员, 日期) → 当日实际到岗人员
// 规则:
//   1) 人员不存在           → NotFound (数据完整性问题)
//   2) 当日无休假记录       → 本人
//   3) 休假且指定顶班人员   → 顶班人员
//   4) 休假且无顶班人员     → Uncovered
// 红线: 只查一跳,不检查顶班人员本人当日是否休假
// ==========================================

use crate::domain::assignment::SlotStatus;
use crate::engine::roster::RosterSnapshot;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 解析结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// 实际到岗人员 (substituted=true 表示由顶班人员覆盖)
    Effective {
        worker_id: String,
        home_worker_id: String,
        substituted: bool,
    },
    /// 本岗位人员休假且无顶班
    Uncovered { home_worker_id: String },
    /// 引用的人员/岗位不存在
    NotFound { reference: String },
}

impl Resolution {
    pub fn effective_worker_id(&self) -> Option<&str> {
        match self {
            Resolution::Effective { worker_id, .. } => Some(worker_id),
            _ => None,
        }
    }

    /// 转换为槽位状态 (用于缺口检测)
    pub fn to_slot_status(&self) -> SlotStatus {
        match self {
            Resolution::Effective {
                worker_id,
                home_worker_id,
                substituted: true,
            } => SlotStatus::SubstitutedBy {
                worker_id: home_worker_id.clone(),
                substitute_id: worker_id.clone(),
            },
            Resolution::Effective { worker_id, .. } => SlotStatus::Available {
                worker_id: worker_id.clone(),
            },
            Resolution::Uncovered { home_worker_id } => SlotStatus::OnLeave {
                worker_id: home_worker_id.clone(),
            },
            Resolution::NotFound { .. } => SlotStatus::Invalid,
        }
    }
}

// ==========================================
// EffectiveWorkerResolver - 有效人员解析器
// ==========================================
pub struct EffectiveWorkerResolver<'a> {
    snapshot: &'a RosterSnapshot,
}

impl<'a> EffectiveWorkerResolver<'a> {
    pub fn new(snapshot: &'a RosterSnapshot) -> Self {
        Self { snapshot }
    }

    /// 按本岗位人员 ID 解析
    pub fn resolve(&self, home_worker_id: &str, date: NaiveDate) -> Resolution {
        if self.snapshot.worker(home_worker_id).is_none() {
            return Resolution::NotFound {
                reference: home_worker_id.to_string(),
            };
        }

        match self.snapshot.leave(home_worker_id, date) {
            None => Resolution::Effective {
                worker_id: home_worker_id.to_string(),
                home_worker_id: home_worker_id.to_string(),
                substituted: false,
            },
            Some(leave) if leave.has_substitute() => Resolution::Effective {
                worker_id: leave
                    .substitute_worker_id
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string(),
                home_worker_id: home_worker_id.to_string(),
                substituted: true,
            },
            Some(_) => Resolution::Uncovered {
                home_worker_id: home_worker_id.to_string(),
            },
        }
    }

    /// 按槽位引用 (本岗位编码) 解析
    pub fn resolve_slot(&self, slot_reference: &str, date: NaiveDate) -> Resolution {
        match self.snapshot.worker_by_home_position(slot_reference) {
            Some(worker) => self.resolve(&worker.worker_id, date),
            None => Resolution::NotFound {
                reference: slot_reference.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::leave::LeaveRecord;
    use crate::domain::types::{DateWindow, LeaveKind};
    use crate::domain::worker::Worker;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn worker(id: &str, home: &str) -> Worker {
        let mut w = Worker::new(id, id, "A");
        w.home_position = Some(home.to_string());
        w
    }

    fn snapshot(leaves: Vec<LeaveRecord>) -> RosterSnapshot {
        RosterSnapshot::from_parts(
            DateWindow::new(day(), day()),
            vec![worker("W1", "PL-1"), worker("W2", "PL-2"), worker("W3", "PL-3")],
            Vec::new(),
            leaves,
        )
    }

    #[test]
    fn test_no_leave_resolves_to_self() {
        let snap = snapshot(Vec::new());
        let resolver = EffectiveWorkerResolver::new(&snap);

        for id in ["W1", "W2", "W3"] {
            assert_eq!(resolver.resolve(id, day()).effective_worker_id(), Some(id));
        }
    }

    #[test]
    fn test_substitute_returned_never_original() {
        let snap = snapshot(vec![LeaveRecord::substitution("W1", day(), "W2")]);
        let resolver = EffectiveWorkerResolver::new(&snap);

        let resolution = resolver.resolve_slot("PL-1", day());
        assert_eq!(resolution.effective_worker_id(), Some("W2"));
        assert_eq!(
            resolution.to_slot_status(),
            SlotStatus::SubstitutedBy {
                worker_id: "W1".to_string(),
                substitute_id: "W2".to_string()
            }
        );
    }

    #[test]
    fn test_leave_without_substitute_is_uncovered() {
        let snap = snapshot(vec![LeaveRecord::rest("W1", day(), LeaveKind::Base)]);
        let resolver = EffectiveWorkerResolver::new(&snap);

        assert_eq!(
            resolver.resolve("W1", day()),
            Resolution::Uncovered {
                home_worker_id: "W1".to_string()
            }
        );
    }

    #[test]
    fn test_single_hop_only() {
        // W2 顶 W1,但 W2 本人当日也休假: 仍解析为 W2
        let snap = snapshot(vec![
            LeaveRecord::substitution("W1", day(), "W2"),
            LeaveRecord::rest("W2", day(), LeaveKind::Manual),
        ]);
        let resolver = EffectiveWorkerResolver::new(&snap);

        assert_eq!(resolver.resolve("W1", day()).effective_worker_id(), Some("W2"));
    }

    #[test]
    fn test_unknown_references() {
        let snap = snapshot(Vec::new());
        let resolver = EffectiveWorkerResolver::new(&snap);

        assert!(matches!(resolver.resolve("W9", day()), Resolution::NotFound { .. }));
        assert_eq!(resolver.resolve_slot("PL-9", day()).to_slot_status(), SlotStatus::Invalid);
    }
}
