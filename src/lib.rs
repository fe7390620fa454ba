// ==========================================
// 服务覆盖排班系统 - 核心库
// ==========================================
// 职责: 有效人员解析 / 贪心覆盖分配 / 历史对账 / 加权评分
// 技术栈: Rust + SQLite
// 系统定位: 排班优化器的确定性内核 (搜索算法在外部)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 休假 CSV
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ConflictPolicy, DateWindow, LeaveKind, SlotPriority, WeightBand};

// 领域实体
pub use domain::{
    CandidateAssignment, CoverageOutcome, HistoricalAssignmentRecord, HistoryBook, LeaveRecord,
    Position, ReconciliationPlan, UncoveredPosition, UncoveredReason, Worker,
};

// 引擎
pub use engine::{
    CoverageAssigner, CoverageOrchestrator, EffectiveWorkerResolver, EngineError, Reconciler,
    RestrictionRegistry, RosterRepositories, ScoreReport,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "服务覆盖排班系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
