// ==========================================
// 服务覆盖排班系统 - 排班配置读取 Trait
// ==========================================
// 职责: 定义引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::scoring_profile::ScoringProfile;
use std::error::Error;

// ==========================================
// RosterConfigReader Trait
// ==========================================
// 用途: 分配/评分引擎所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait RosterConfigReader {
    /// 参与排班的人员组
    ///
    /// # 默认值
    /// - "A"
    fn get_schedulable_group(&self) -> Result<String, Box<dyn Error>>;

    /// 岗位未声明时长时使用的班次时长（小时）
    ///
    /// # 默认值
    /// - 8.0
    fn get_default_shift_hours(&self) -> Result<f64, Box<dyn Error>>;

    /// 人员未设置上限时的年度工时上限（小时）
    ///
    /// # 默认值
    /// - 1605.0
    fn get_annual_hour_cap(&self) -> Result<f64, Box<dyn Error>>;

    /// 最大连续上班天数
    ///
    /// # 默认值
    /// - 9
    fn get_max_consecutive_days(&self) -> Result<u32, Box<dyn Error>>;

    /// 评分权重方案（未配置时返回 None,使用内置权重）
    fn get_scoring_profile(&self) -> Result<Option<ScoringProfile>, Box<dyn Error>>;
}

// ==========================================
// RosterSettings - 一次运行使用的配置快照
// ==========================================
#[derive(Debug, Clone)]
pub struct RosterSettings {
    pub schedulable_group: String,
    pub default_shift_hours: f64,
    pub annual_hour_cap: f64,
    pub max_consecutive_days: u32,
    pub scoring_profile: ScoringProfile,
}

impl Default for RosterSettings {
    fn default() -> Self {
        Self {
            schedulable_group: "A".to_string(),
            default_shift_hours: 8.0,
            annual_hour_cap: crate::domain::worker::DEFAULT_ANNUAL_HOUR_CAP,
            max_consecutive_days: 9,
            scoring_profile: ScoringProfile::default(),
        }
    }
}

impl RosterSettings {
    /// 从配置读取器加载全部配置
    pub fn load(reader: &dyn RosterConfigReader) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            schedulable_group: reader.get_schedulable_group()?,
            default_shift_hours: reader.get_default_shift_hours()?,
            annual_hour_cap: reader.get_annual_hour_cap()?,
            max_consecutive_days: reader.get_max_consecutive_days()?,
            scoring_profile: reader.get_scoring_profile()?.unwrap_or_default(),
        })
    }
}
