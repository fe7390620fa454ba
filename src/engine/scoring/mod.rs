// ==========================================
// 服务覆盖排班系统 - 加权评分框架
// ==========================================
// 职责: 注册命名约束 (名称, 权重, 评估函数) 并聚合为适应度
// 规则: contribution = weight * score;total = Σ contribution (仅计成功项)
// 红线: 单项评估失败只影响该项,记录原因后排除,不中止其他约束
// 说明: 权重之和不强制为 1,报告中给出实际合计
// ==========================================

pub mod context;
pub mod registry;
pub mod report;
pub mod restrictions;

pub use context::{CandidateSchedule, PlanningContext};
pub use registry::{Evaluator, Restriction, RestrictionRegistry};
pub use report::{RestrictionOutcome, RestrictionResult, ScoreReport};
pub use restrictions::{builtin_restrictions, default_registry, BuiltinRestriction};

use thiserror::Error;

/// 注册错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("约束名称为空")]
    EmptyName,

    #[error("约束 {name} 权重非法: {weight}（取值范围 (0, 1]）")]
    InvalidWeight { name: String, weight: f64 },

    #[error("约束 {0} 重复注册")]
    DuplicateRestriction(String),
}

/// 单项约束评估错误 (隔离,不向上传播)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RestrictionError {
    #[error("人员 {0} 不存在")]
    UnknownWorker(String),

    #[error("岗位 {0} 不存在")]
    UnknownPosition(String),

    #[error("评分越界: {0}（应在 0~100）")]
    ScoreOutOfRange(f64),

    #[error("{0}")]
    Failed(String),
}
