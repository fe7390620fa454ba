// ==========================================
// 服务覆盖排班系统 - 休假记录领域模型
// ==========================================
// 约束: (worker_id, date) 唯一
// ==========================================

use crate::domain::types::LeaveKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// LeaveRecord - 休假记录
// ==========================================
// 含义: 指定人员当日不亲自覆盖本岗位;可选指定顶班人员
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRecord {
    pub worker_id: String,
    pub date: NaiveDate,
    pub kind: LeaveKind,
    pub reason: Option<String>,
    pub substitute_worker_id: Option<String>,
}

impl LeaveRecord {
    /// 无顶班人员的休假
    pub fn rest(worker_id: &str, date: NaiveDate, kind: LeaveKind) -> Self {
        Self {
            worker_id: worker_id.to_string(),
            date,
            kind,
            reason: None,
            substitute_worker_id: None,
        }
    }

    /// 指定顶班人员的替换
    pub fn substitution(worker_id: &str, date: NaiveDate, substitute_worker_id: &str) -> Self {
        Self {
            worker_id: worker_id.to_string(),
            date,
            kind: LeaveKind::Substitution,
            reason: None,
            substitute_worker_id: Some(substitute_worker_id.to_string()),
        }
    }

    pub fn has_substitute(&self) -> bool {
        self.substitute_worker_id
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    }
}

// ==========================================
// LeavePeriodOutcome - 区间登记结果
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeavePeriodOutcome {
    pub inserted: usize, // 新增天数
    pub updated: usize,  // 已存在且更新了顶班人员的天数
    pub skipped: usize,  // 已存在且未变更的天数
}

// ==========================================
// ExpiringLeave - 即将到期/已过期的长期假
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiringLeave {
    pub worker_id: String,
    pub worker_name: String,
    pub home_position: Option<String>,
    pub last_leave_date: NaiveDate,
    pub reason: Option<String>,
    pub expired: bool, // last_leave_date < today
}
