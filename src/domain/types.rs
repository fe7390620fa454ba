// ==========================================
// 服务覆盖排班系统 - 领域类型定义
// ==========================================
// 职责: 休假类型 / 候选槽位优先级 / 对账冲突策略 / 权重分档
// 序列化格式: 数据库统一存储 snake_case 字符串
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 休假类型 (Leave Kind)
// ==========================================
// 说明: 任一类型都表示"本人当日不亲自覆盖其岗位"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveKind {
    Base,         // 基础轮休
    Manual,       // 人工登记
    Temporary,    // 临时休假
    MedicalLeave, // 病假/长期假
    Substitution, // 顶班替换
}

impl fmt::Display for LeaveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl LeaveKind {
    /// 从字符串解析休假类型
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "base" => Some(LeaveKind::Base),
            "manual" => Some(LeaveKind::Manual),
            "temporary" => Some(LeaveKind::Temporary),
            "medical_leave" => Some(LeaveKind::MedicalLeave),
            "substitution" => Some(LeaveKind::Substitution),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LeaveKind::Base => "base",
            LeaveKind::Manual => "manual",
            LeaveKind::Temporary => "temporary",
            LeaveKind::MedicalLeave => "medical_leave",
            LeaveKind::Substitution => "substitution",
        }
    }
}

// ==========================================
// 候选槽位优先级 (Slot Priority)
// ==========================================
// 红线: 先评估主槽位,主槽位未接受时才评估次槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotPriority {
    Primary,
    Secondary,
}

impl fmt::Display for SlotPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl SlotPriority {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "primary" => Some(SlotPriority::Primary),
            "secondary" => Some(SlotPriority::Secondary),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            SlotPriority::Primary => "primary",
            SlotPriority::Secondary => "secondary",
        }
    }
}

// ==========================================
// 对账冲突策略 (Conflict Policy)
// ==========================================
// 用途: 新批次与历史记录日期重叠时的处理方式
// 说明: 由调用方显式传入,引擎内不做交互式询问
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    ReplaceAll, // 撤回重叠日期的历史记录并回退计数器
    AddNewOnly, // 保留历史,产出 (日期 → 不可用人员) 排除表
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictPolicy::ReplaceAll => write!(f, "replace_all"),
            ConflictPolicy::AddNewOnly => write!(f, "add_new_only"),
        }
    }
}

impl ConflictPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "replace_all" | "replace" => Some(ConflictPolicy::ReplaceAll),
            "add_new_only" | "add_new" => Some(ConflictPolicy::AddNewOnly),
            _ => None,
        }
    }
}

// ==========================================
// 约束权重分档 (Weight Band)
// ==========================================
// 仅用于报告分组,不参与计算
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightBand {
    Critical,  // weight >= 0.10
    Important, // 0.03 <= weight < 0.10
    Equity,    // weight < 0.03
}

impl WeightBand {
    pub const CRITICAL_MIN: f64 = 0.10;
    pub const IMPORTANT_MIN: f64 = 0.03;

    /// 按权重分档
    pub fn classify(weight: f64) -> Self {
        if weight >= Self::CRITICAL_MIN {
            WeightBand::Critical
        } else if weight >= Self::IMPORTANT_MIN {
            WeightBand::Important
        } else {
            WeightBand::Equity
        }
    }
}

impl fmt::Display for WeightBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightBand::Critical => write!(f, "critical"),
            WeightBand::Important => write!(f, "important"),
            WeightBand::Equity => write!(f, "equity"),
        }
    }
}

// ==========================================
// 日期窗口 (Date Window)
// ==========================================
// 闭区间 [start, end]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// 创建日期窗口,起止颠倒时自动交换
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// 按时间顺序列出窗口内所有日期
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.start
            .iter_days()
            .take_while(|d| *d <= self.end)
            .collect()
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// 日期统一存储格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_band_boundaries() {
        assert_eq!(WeightBand::classify(0.30), WeightBand::Critical);
        assert_eq!(WeightBand::classify(0.10), WeightBand::Critical);
        assert_eq!(WeightBand::classify(0.05), WeightBand::Important);
        assert_eq!(WeightBand::classify(0.03), WeightBand::Important);
        assert_eq!(WeightBand::classify(0.02), WeightBand::Equity);
    }

    #[test]
    fn test_date_window_swaps_and_lists_days() {
        let a = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
        let b = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let window = DateWindow::new(a, b);

        assert_eq!(window.start, b);
        assert_eq!(window.len_days(), 3);
        assert_eq!(window.dates().len(), 3);
        assert!(window.contains(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()));
    }

    #[test]
    fn test_leave_kind_round_trip_db_str() {
        for kind in [
            LeaveKind::Base,
            LeaveKind::Manual,
            LeaveKind::Temporary,
            LeaveKind::MedicalLeave,
            LeaveKind::Substitution,
        ] {
            assert_eq!(LeaveKind::from_str(kind.to_db_str()), Some(kind));
        }
        assert_eq!(LeaveKind::from_str("vacances"), None);
    }

    #[test]
    fn test_conflict_policy_parse() {
        assert_eq!(ConflictPolicy::from_str("replace_all"), Some(ConflictPolicy::ReplaceAll));
        assert_eq!(ConflictPolicy::from_str("ADD_NEW_ONLY"), Some(ConflictPolicy::AddNewOnly));
        assert_eq!(ConflictPolicy::from_str("abort"), None);
    }
}
