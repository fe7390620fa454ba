// ==========================================
// 服务覆盖排班系统 - 分配结果领域模型
// ==========================================
// 职责: 候选分配 / 未覆盖原因 / 单次分配输出
// 红线: 每条未覆盖记录必须带结构化原因
// ==========================================

use crate::domain::types::SlotPriority;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// CandidateAssignment - 候选分配
// ==========================================
// 属性继承: zone/rotation/group 取自有效人员,资质/线路取自岗位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateAssignment {
    pub date: NaiveDate,
    pub position_code: String,
    pub worker_id: String,          // 有效人员 (本人或顶班人员)
    pub priority_used: SlotPriority,
    pub covered_slot: String,       // 被覆盖的槽位 (本岗位编码)
    pub duration_hours: f64,
    pub is_zone_change: bool,
    pub is_shift_change: bool,

    // ===== 来自有效人员 =====
    pub zone: Option<String>,
    pub rotation: Option<String>,
    pub member_group: String,

    // ===== 来自岗位 =====
    pub qualifications: Vec<String>,
    pub line: Option<String>,
}

// ==========================================
// UncoveredReason - 未覆盖原因
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum UncoveredReason {
    /// 槽位引用不存在 (数据完整性问题)
    SlotNotFound { slot: SlotPriority, reference: String },
    /// 休假且无顶班人员
    OnLeaveUnsubstituted { slot: SlotPriority, worker_id: String },
    /// 有效人员当日已被分配
    EffectiveWorkerAlreadyAssigned { slot: SlotPriority, worker_id: String },
    /// 顶班人员不存在于人员表 (数据完整性问题,中止该岗位当日处理)
    EffectiveWorkerNotFound { slot: SlotPriority, worker_id: String },
    /// 两个槽位均未配置
    NoCandidateSlots,
}

impl UncoveredReason {
    /// 持久化用原因码
    pub fn code(&self) -> &'static str {
        match self {
            UncoveredReason::SlotNotFound { .. } => "slot_not_found",
            UncoveredReason::OnLeaveUnsubstituted { .. } => "on_leave_unsubstituted",
            UncoveredReason::EffectiveWorkerAlreadyAssigned { .. } => {
                "effective_worker_already_assigned"
            }
            UncoveredReason::EffectiveWorkerNotFound { .. } => "effective_worker_not_found",
            UncoveredReason::NoCandidateSlots => "no_candidate_slots",
        }
    }

    /// 是否属于数据完整性问题
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            UncoveredReason::SlotNotFound { .. } | UncoveredReason::EffectiveWorkerNotFound { .. }
        )
    }
}

impl fmt::Display for UncoveredReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UncoveredReason::SlotNotFound { slot, reference } => {
                write!(f, "{} 槽位 {} 不存在", slot, reference)
            }
            UncoveredReason::OnLeaveUnsubstituted { slot, worker_id } => {
                write!(f, "{} 槽位人员 {} 休假且无顶班", slot, worker_id)
            }
            UncoveredReason::EffectiveWorkerAlreadyAssigned { slot, worker_id } => {
                write!(f, "{} 槽位有效人员 {} 当日已被分配", slot, worker_id)
            }
            UncoveredReason::EffectiveWorkerNotFound { slot, worker_id } => {
                write!(f, "{} 槽位有效人员 {} 不存在", slot, worker_id)
            }
            UncoveredReason::NoCandidateSlots => write!(f, "未配置候选槽位"),
        }
    }
}

// ==========================================
// UncoveredPosition - 未覆盖岗位
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncoveredPosition {
    pub date: NaiveDate,
    pub position_code: String,
    pub reason: UncoveredReason,

    // ===== 岗位属性 (便于报表) =====
    pub rotation: Option<String>,
    pub qualifications: Vec<String>,
    pub line: Option<String>,
    pub zone: Option<String>,
}

// ==========================================
// CoverageOutcome - 单次分配输出
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageOutcome {
    pub covered: Vec<CandidateAssignment>,
    pub uncovered: Vec<UncoveredPosition>,
}

impl CoverageOutcome {
    pub fn total_slots(&self) -> usize {
        self.covered.len() + self.uncovered.len()
    }

    /// 覆盖率 (0~100)
    pub fn coverage_pct(&self) -> f64 {
        let total = self.total_slots();
        if total == 0 {
            return 0.0;
        }
        self.covered.len() as f64 / total as f64 * 100.0
    }

    /// 按日期分组的覆盖分配
    pub fn covered_by_date(&self) -> BTreeMap<NaiveDate, Vec<&CandidateAssignment>> {
        let mut map: BTreeMap<NaiveDate, Vec<&CandidateAssignment>> = BTreeMap::new();
        for a in &self.covered {
            map.entry(a.date).or_default().push(a);
        }
        map
    }

    /// 按原因码统计未覆盖数量
    pub fn uncovered_by_reason(&self) -> BTreeMap<&'static str, usize> {
        let mut map = BTreeMap::new();
        for u in &self.uncovered {
            *map.entry(u.reason.code()).or_insert(0) += 1;
        }
        map
    }
}

// ==========================================
// CoverageGap - 覆盖缺口 (不考虑占用的纯解析视角)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageGap {
    pub date: NaiveDate,
    pub position_code: String,
    pub primary_status: SlotStatus,
    pub secondary_status: SlotStatus,
}

/// 槽位当日状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SlotStatus {
    Available { worker_id: String },
    SubstitutedBy { worker_id: String, substitute_id: String },
    OnLeave { worker_id: String },
    Invalid,
}

impl SlotStatus {
    pub fn is_covered(&self) -> bool {
        matches!(self, SlotStatus::Available { .. } | SlotStatus::SubstitutedBy { .. })
    }
}
