// ==========================================
// 服务覆盖排班系统 - 引擎层
// ==========================================
// 职责: 有效人员解析 / 贪心覆盖分配 / 历史对账 / 加权评分
// 红线: Engine 不拼 SQL;所有未覆盖必须输出 reason
// 红线: 单线程、同步执行;同输入同顺序 ⇒ 同输出
// ==========================================

pub mod assigner;
pub mod error;
pub mod orchestrator;
pub mod reconciliation;
pub mod repositories;
pub mod resolver;
pub mod roster;
pub mod scoring;

// 重导出核心引擎
pub use assigner::CoverageAssigner;
pub use error::{EngineError, EngineResult};
pub use orchestrator::CoverageOrchestrator;
pub use reconciliation::Reconciler;
pub use repositories::RosterRepositories;
pub use resolver::{EffectiveWorkerResolver, Resolution};
pub use roster::RosterSnapshot;
pub use scoring::{
    default_registry, CandidateSchedule, PlanningContext, RestrictionError, RestrictionOutcome,
    RestrictionRegistry, ScoreReport, ScoringError,
};
