// ==========================================
// 服务覆盖排班系统 - 岗位(服务)领域模型
// ==========================================
// 岗位有两个按优先级排列的候选槽位,槽位引用的是人员的本岗位编码
// 单次分配运行内岗位数据不可变
// ==========================================

use crate::domain::types::SlotPriority;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    // ===== 主键 =====
    pub position_code: String,

    // ===== 候选槽位 =====
    pub primary_slot: Option<String>,
    pub secondary_slot: Option<String>,

    // ===== 岗位属性 =====
    pub required_qualifications: Vec<String>,
    pub line: Option<String>,
    pub zone: Option<String>,
    pub rotation: Option<String>,
    pub duration_hours: Option<f64>,

    // ===== 处理顺序 =====
    pub sort_order: i64,
}

impl Position {
    pub fn new(position_code: &str, primary_slot: Option<&str>, secondary_slot: Option<&str>) -> Self {
        Self {
            position_code: position_code.to_string(),
            primary_slot: primary_slot.map(str::to_string),
            secondary_slot: secondary_slot.map(str::to_string),
            required_qualifications: Vec::new(),
            line: None,
            zone: None,
            rotation: None,
            duration_hours: None,
            sort_order: 0,
        }
    }

    /// 取槽位引用（空白视为未配置）
    pub fn slot(&self, priority: SlotPriority) -> Option<&str> {
        let raw = match priority {
            SlotPriority::Primary => self.primary_slot.as_deref(),
            SlotPriority::Secondary => self.secondary_slot.as_deref(),
        };
        raw.map(str::trim).filter(|s| !s.is_empty())
    }

    /// 岗位时长,未配置时使用默认班次时长
    pub fn duration_or(&self, default_hours: f64) -> f64 {
        match self.duration_hours {
            Some(h) if h.is_finite() && h > 0.0 => h,
            _ => default_hours,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_slot_is_absent() {
        let position = Position::new("SV-01", Some("  "), Some("PL-2"));
        assert_eq!(position.slot(SlotPriority::Primary), None);
        assert_eq!(position.slot(SlotPriority::Secondary), Some("PL-2"));
    }

    #[test]
    fn test_duration_fallback() {
        let mut position = Position::new("SV-01", None, None);
        assert_eq!(position.duration_or(8.0), 8.0);
        position.duration_hours = Some(7.25);
        assert_eq!(position.duration_or(8.0), 7.25);
        position.duration_hours = Some(-1.0);
        assert_eq!(position.duration_or(8.0), 8.0);
    }
}
