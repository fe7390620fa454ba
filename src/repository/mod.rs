// ==========================================
// 服务覆盖排班系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod coverage_repo;
pub mod error;
pub mod history_repo;
pub mod leave_repo;
pub mod position_repo;
pub mod worker_repo;

// 重导出核心仓储
pub use coverage_repo::{CoverageRepository, CoverageSaveSummary, StoredGap};
pub use error::{RepositoryError, RepositoryResult};
pub use history_repo::HistoryRepository;
pub use leave_repo::{LeaveRepository, LeaveWriteOutcome, SubstituteUpdateScope};
pub use position_repo::PositionRepository;
pub use worker_repo::WorkerRepository;
