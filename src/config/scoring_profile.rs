use serde::{Deserialize, Serialize};

/// 评分权重方案（持久化对象）
///
/// 存储位置：config_kv（scope_id='global'，key='scoring_profile'）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScoringProfile {
    /// 方案 ID
    #[serde(default)]
    pub profile_id: Option<String>,

    /// 显示名称
    #[serde(default)]
    pub title: Option<String>,

    /// 各约束权重覆写（未填写的沿用内置默认值）
    #[serde(default)]
    pub weights: ScoringWeights,

    /// 停用的约束名称
    #[serde(default)]
    pub disabled: Vec<String>,
}

/// 约束权重覆写（取值范围 (0, 1]）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScoringWeights {
    #[serde(default)]
    pub one_assignment_per_day: Option<f64>,

    #[serde(default)]
    pub schedulable_group_only: Option<f64>,

    #[serde(default)]
    pub no_leave_conflict: Option<f64>,

    #[serde(default)]
    pub required_qualification: Option<f64>,

    #[serde(default)]
    pub annual_hours_cap: Option<f64>,

    #[serde(default)]
    pub coverage_complete: Option<f64>,

    #[serde(default)]
    pub line_correct: Option<f64>,

    #[serde(default)]
    pub max_consecutive_days: Option<f64>,

    #[serde(default)]
    pub zone_change_equity: Option<f64>,

    #[serde(default)]
    pub shift_change_equity: Option<f64>,

    #[serde(default)]
    pub balanced_distribution: Option<f64>,
}

impl ScoringProfile {
    /// 按约束名称取覆写权重
    pub fn weight_for(&self, name: &str) -> Option<f64> {
        let w = &self.weights;
        match name {
            "one_assignment_per_day" => w.one_assignment_per_day,
            "schedulable_group_only" => w.schedulable_group_only,
            "no_leave_conflict" => w.no_leave_conflict,
            "required_qualification" => w.required_qualification,
            "annual_hours_cap" => w.annual_hours_cap,
            "coverage_complete" => w.coverage_complete,
            "line_correct" => w.line_correct,
            "max_consecutive_days" => w.max_consecutive_days,
            "zone_change_equity" => w.zone_change_equity,
            "shift_change_equity" => w.shift_change_equity,
            "balanced_distribution" => w.balanced_distribution,
            _ => None,
        }
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.iter().any(|d| d == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_profile_deserializes() {
        let raw = r#"{"weights": {"coverage_complete": 0.2}, "disabled": ["balanced_distribution"]}"#;
        let profile: ScoringProfile = serde_json::from_str(raw).unwrap();

        assert_eq!(profile.weight_for("coverage_complete"), Some(0.2));
        assert_eq!(profile.weight_for("no_leave_conflict"), None);
        assert!(profile.is_disabled("balanced_distribution"));
    }
}
