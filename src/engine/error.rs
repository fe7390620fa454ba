// ==========================================
// 服务覆盖排班系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 仅完整性违例与事务失败升级为硬错误;
//       未覆盖 / 重复分配 / 单项约束失败均以结构化结果返回
// ==========================================

use crate::engine::scoring::ScoringError;
use crate::repository::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 依赖层错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("配置读取失败: {0}")]
    Config(String),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    // ===== 数据完整性 =====
    #[error("数据完整性错误: {0}")]
    Integrity(String),

    // ===== 对账 =====
    #[error("历史对账失败,已整体回滚: {0}")]
    ReconciliationFailed(String),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// 配置读取错误
    pub fn config(err: Box<dyn std::error::Error>) -> Self {
        EngineError::Config(err.to_string())
    }
}
