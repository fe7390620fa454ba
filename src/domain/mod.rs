// ==========================================
// 服务覆盖排班系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod assignment;
pub mod history;
pub mod leave;
pub mod position;
pub mod reconciliation;
pub mod types;
pub mod worker;

// 重导出核心类型
pub use assignment::{
    CandidateAssignment, CoverageGap, CoverageOutcome, SlotStatus, UncoveredPosition,
    UncoveredReason,
};
pub use history::{HistoricalAssignmentRecord, HistoryBook, WorkerHistory};
pub use leave::{ExpiringLeave, LeavePeriodOutcome, LeaveRecord};
pub use position::Position;
pub use reconciliation::{
    CounterDelta, ExclusionMap, ReconciliationPlan, RetractionPlan, RetractionReport,
};
pub use types::{ConflictPolicy, DateWindow, LeaveKind, SlotPriority, WeightBand};
pub use worker::{Worker, WorkloadCounters, DEFAULT_ANNUAL_HOUR_CAP};
