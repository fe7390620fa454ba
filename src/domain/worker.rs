// ==========================================
// 服务覆盖排班系统 - 人员领域模型
// ==========================================
// 职责: 人员主数据 + 年度工作量计数器
// 红线: 计数器只能通过 "提交排班" 与 "历史对账撤回" 两条路径变更
// ==========================================

use crate::domain::history::HistoricalAssignmentRecord;
use serde::{Deserialize, Serialize};

/// 默认年度工时上限（小时）
pub const DEFAULT_ANNUAL_HOUR_CAP: f64 = 1605.0;

// ==========================================
// Worker - 人员
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    // ===== 主键 =====
    pub worker_id: String,

    // ===== 基础属性 =====
    pub name: String,
    pub home_position: Option<String>, // 本岗位编码 (槽位引用指向此字段)
    pub rotation: Option<String>,      // 轮班组
    pub zone: Option<String>,          // 区域
    pub member_group: String,          // 所属组 (仅一个组参与排班)
    pub qualifications: Vec<String>,   // 资质标签
    #[serde(default)]
    pub lines: Vec<String>,            // 可上岗线路 (为空表示不限线路)

    // ===== 年度工时 =====
    pub annual_hour_cap: Option<f64>,

    // ===== 工作量计数器 =====
    pub counters: WorkloadCounters,

    // ===== 最近一次历史分配 (缓存指针) =====
    pub last_record_id: Option<String>,
}

impl Worker {
    /// 创建只含必填字段的人员
    pub fn new(worker_id: &str, name: &str, member_group: &str) -> Self {
        Self {
            worker_id: worker_id.to_string(),
            name: name.to_string(),
            home_position: None,
            rotation: None,
            zone: None,
            member_group: member_group.to_string(),
            qualifications: Vec::new(),
            lines: Vec::new(),
            annual_hour_cap: None,
            counters: WorkloadCounters::default(),
            last_record_id: None,
        }
    }

    /// 实际生效的年度工时上限
    pub fn effective_hour_cap(&self, default_cap: f64) -> f64 {
        self.annual_hour_cap.unwrap_or(default_cap)
    }

    /// 剩余可用工时（不小于 0）
    pub fn available_hours(&self, default_cap: f64) -> f64 {
        (self.effective_hour_cap(default_cap) - self.counters.annual_hours()).max(0.0)
    }

    pub fn is_within_cap(&self, default_cap: f64) -> bool {
        self.counters.annual_hours() <= self.effective_hour_cap(default_cap)
    }

    /// 是否具备全部资质
    pub fn has_qualifications(&self, required: &[String]) -> bool {
        required.iter().all(|q| self.qualifications.contains(q))
    }

    /// 能否在指定线路上岗 (岗位未标线路或人员不限线路时视为可以)
    pub fn serves_line(&self, line: Option<&str>) -> bool {
        match line {
            None => true,
            Some(_) if self.lines.is_empty() => true,
            Some(line) => self.lines.iter().any(|l| l == line),
        }
    }
}

// ==========================================
// WorkloadCounters - 工作量计数器
// ==========================================
// 字段私有: 外部只读,变更只走 crate 内的 apply/retract
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadCounters {
    annual_hours: f64,
    zone_changes: u32,
    shift_changes: u32,
}

impl WorkloadCounters {
    /// 从持久化数据恢复计数器
    pub fn new(annual_hours: f64, zone_changes: u32, shift_changes: u32) -> Self {
        Self {
            annual_hours: annual_hours.max(0.0),
            zone_changes,
            shift_changes,
        }
    }

    pub fn annual_hours(&self) -> f64 {
        self.annual_hours
    }

    pub fn zone_changes(&self) -> u32 {
        self.zone_changes
    }

    pub fn shift_changes(&self) -> u32 {
        self.shift_changes
    }

    /// 计入一条历史分配
    pub(crate) fn apply(&mut self, record: &HistoricalAssignmentRecord) {
        self.annual_hours += record.duration_hours;
        if record.is_zone_change {
            self.zone_changes += 1;
        }
        if record.is_shift_change {
            self.shift_changes += 1;
        }
    }

    /// 撤回一条历史分配（所有计数器下限为 0）
    pub(crate) fn retract(&mut self, record: &HistoricalAssignmentRecord) {
        self.annual_hours = (self.annual_hours - record.duration_hours).max(0.0);
        if record.is_zone_change {
            self.zone_changes = self.zone_changes.saturating_sub(1);
        }
        if record.is_shift_change {
            self.shift_changes = self.shift_changes.saturating_sub(1);
        }
    }
}
