// ==========================================
// 服务覆盖排班系统 - 导入层
// ==========================================
// 职责: 休假 CSV 导入 (单日变更 / 临时休假区间)
// 红线: 行级错误不中止整个文件;文件级错误直接返回
// ==========================================

pub mod error;
pub mod leave_csv;

pub use error::{ImportError, ImportResult, RowError};
pub use leave_csv::{LeaveCsvImporter, ModificationImportSummary, PeriodImportSummary};
