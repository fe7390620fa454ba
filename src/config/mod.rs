// ==========================================
// 服务覆盖排班系统 - 配置层
// ==========================================
// 职责: 系统配置管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod roster_config_trait;
pub mod scoring_profile;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use roster_config_trait::{RosterConfigReader, RosterSettings};
pub use scoring_profile::{ScoringProfile, ScoringWeights};
