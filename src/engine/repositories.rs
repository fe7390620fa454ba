// ==========================================
// 服务覆盖排班系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合排班引擎所需的所有 Repository
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::repository::{
    CoverageRepository, HistoryRepository, LeaveRepository, PositionRepository, WorkerRepository,
};

/// 排班引擎仓储集合
///
/// 聚合排班引擎所需的所有 Repository，简化依赖注入。
///
/// # 包含的仓储
/// - `worker_repo`: 人员主数据与工作量计数器
/// - `leave_repo`: 休假/顶班记录
/// - `position_repo`: 岗位
/// - `coverage_repo`: 覆盖结果输出表
/// - `history_repo`: 历史分配 (追加/撤回)
#[derive(Clone)]
pub struct RosterRepositories {
    pub worker_repo: Arc<WorkerRepository>,
    pub leave_repo: Arc<LeaveRepository>,
    pub position_repo: Arc<PositionRepository>,
    pub coverage_repo: Arc<CoverageRepository>,
    pub history_repo: Arc<HistoryRepository>,
}

impl RosterRepositories {
    /// 创建新的仓储集合
    pub fn new(
        worker_repo: Arc<WorkerRepository>,
        leave_repo: Arc<LeaveRepository>,
        position_repo: Arc<PositionRepository>,
        coverage_repo: Arc<CoverageRepository>,
        history_repo: Arc<HistoryRepository>,
    ) -> Self {
        Self {
            worker_repo,
            leave_repo,
            position_repo,
            coverage_repo,
            history_repo,
        }
    }

    /// 所有仓储共享同一连接
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self::new(
            Arc::new(WorkerRepository::new(conn.clone())),
            Arc::new(LeaveRepository::new(conn.clone())),
            Arc::new(PositionRepository::new(conn.clone())),
            Arc::new(CoverageRepository::new(conn.clone())),
            Arc::new(HistoryRepository::new(conn)),
        )
    }
}
