// ==========================================
// 服务覆盖排班系统 - 休假 CSV 导入
// ==========================================
// 文件 1 (单日变更): worker_id, date, kind, reason, substitute_worker_id
//   - 已存在的 (人员, 日期) 跳过;替换类型且带顶班人员时更新该日已有记录
//     (不论已有记录类型) 的顶班人员
//   - kind 为空时按 manual 处理
// 文件 2 (临时休假区间): worker_id, start_date, end_date, reason
//   - 逐日展开为 temporary 记录,已存在的日期跳过
// 日期格式: YYYY-MM-DD
// ==========================================

use crate::domain::leave::LeaveRecord;
use crate::domain::types::{DateWindow, LeaveKind, DATE_FORMAT};
use crate::importer::error::{ImportError, ImportResult, RowError};
use crate::repository::{LeaveRepository, LeaveWriteOutcome, SubstituteUpdateScope};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const MODIFICATION_COLUMNS: [&str; 2] = ["worker_id", "date"];
const PERIOD_COLUMNS: [&str; 3] = ["worker_id", "start_date", "end_date"];

#[derive(Debug, Deserialize)]
struct ModificationRow {
    worker_id: String,
    date: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    substitute_worker_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PeriodRow {
    worker_id: String,
    start_date: String,
    end_date: String,
    #[serde(default)]
    reason: Option<String>,
}

/// 单日变更导入汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModificationImportSummary {
    pub inserted: usize,
    pub substitutes_updated: usize,
    pub duplicates_skipped: usize,
    pub errors: Vec<RowError>,
}

impl ModificationImportSummary {
    pub fn processed(&self) -> usize {
        self.inserted + self.substitutes_updated
    }
}

/// 区间导入汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PeriodImportSummary {
    pub periods: usize,
    pub days_added: usize,
    pub days_skipped: usize,
    pub errors: Vec<RowError>,
}

// ==========================================
// LeaveCsvImporter - 休假 CSV 导入器
// ==========================================
pub struct LeaveCsvImporter {
    leave_repo: Arc<LeaveRepository>,
}

impl LeaveCsvImporter {
    pub fn new(leave_repo: Arc<LeaveRepository>) -> Self {
        Self { leave_repo }
    }

    /// 导入单日变更文件
    pub fn import_modifications(&self, path: &Path) -> ImportResult<ModificationImportSummary> {
        let file = open_csv(path)?;
        self.import_modifications_from_reader(file)
    }

    pub fn import_modifications_from_reader<R: Read>(
        &self,
        reader: R,
    ) -> ImportResult<ModificationImportSummary> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        require_columns(reader.headers()?, &MODIFICATION_COLUMNS)?;

        let mut summary = ModificationImportSummary::default();
        for (idx, result) in reader.deserialize::<ModificationRow>().enumerate() {
            let row_no = idx + 1;
            let outcome = result
                .map_err(|e| e.to_string())
                .and_then(|row| parse_modification(&row))
                .and_then(|record| {
                    self.leave_repo
                        .write_day_with_scope(&record, SubstituteUpdateScope::AnyKind)
                        .map_err(|e| e.to_string())
                });

            match outcome {
                Ok(LeaveWriteOutcome::Inserted) => summary.inserted += 1,
                Ok(LeaveWriteOutcome::SubstituteUpdated) => summary.substitutes_updated += 1,
                Ok(LeaveWriteOutcome::Skipped) => summary.duplicates_skipped += 1,
                Err(message) => {
                    warn!(row = row_no, error = %message, "变更行导入失败");
                    summary.errors.push(RowError { row: row_no, message });
                }
            }
        }

        info!(
            inserted = summary.inserted,
            updated = summary.substitutes_updated,
            skipped = summary.duplicates_skipped,
            errors = summary.errors.len(),
            "休假变更导入完成"
        );
        Ok(summary)
    }

    /// 导入临时休假区间文件
    pub fn import_temporary_periods(&self, path: &Path) -> ImportResult<PeriodImportSummary> {
        let file = open_csv(path)?;
        self.import_temporary_periods_from_reader(file)
    }

    pub fn import_temporary_periods_from_reader<R: Read>(
        &self,
        reader: R,
    ) -> ImportResult<PeriodImportSummary> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        require_columns(reader.headers()?, &PERIOD_COLUMNS)?;

        let mut summary = PeriodImportSummary::default();
        for (idx, result) in reader.deserialize::<PeriodRow>().enumerate() {
            let row_no = idx + 1;
            let outcome = result
                .map_err(|e| e.to_string())
                .and_then(|row| parse_period(&row).map(|window| (row, window)))
                .and_then(|(row, window)| {
                    self.leave_repo
                        .add_period(
                            row.worker_id.trim(),
                            window,
                            LeaveKind::Temporary,
                            non_empty(&row.reason),
                            None,
                        )
                        .map_err(|e| e.to_string())
                });

            match outcome {
                Ok(period) => {
                    summary.periods += 1;
                    summary.days_added += period.inserted;
                    summary.days_skipped += period.skipped + period.updated;
                }
                Err(message) => {
                    warn!(row = row_no, error = %message, "区间行导入失败");
                    summary.errors.push(RowError { row: row_no, message });
                }
            }
        }

        info!(
            periods = summary.periods,
            days_added = summary.days_added,
            errors = summary.errors.len(),
            "临时休假区间导入完成"
        );
        Ok(summary)
    }
}

fn open_csv(path: &Path) -> ImportResult<File> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(File::open(path)?)
}

fn require_columns(headers: &csv::StringRecord, required: &[&str]) -> ImportResult<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|col| !headers.iter().any(|h| h.trim() == **col))
        .map(|col| col.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ImportError::MissingColumns(missing))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| format!("{} 日期格式错误,期望 YYYY-MM-DD,实际 {}", field, raw))
}

fn parse_modification(row: &ModificationRow) -> Result<LeaveRecord, String> {
    let worker_id = row.worker_id.trim();
    if worker_id.is_empty() {
        return Err("worker_id 为空".to_string());
    }
    let date = parse_date("date", &row.date)?;
    let kind = match non_empty(&row.kind) {
        None => LeaveKind::Manual,
        Some(raw) => LeaveKind::from_str(raw).ok_or_else(|| format!("未知休假类型: {}", raw))?,
    };

    Ok(LeaveRecord {
        worker_id: worker_id.to_string(),
        date,
        kind,
        reason: non_empty(&row.reason).map(str::to_string),
        substitute_worker_id: non_empty(&row.substitute_worker_id).map(str::to_string),
    })
}

fn parse_period(row: &PeriodRow) -> Result<DateWindow, String> {
    if row.worker_id.trim().is_empty() {
        return Err("worker_id 为空".to_string());
    }
    let start = parse_date("start_date", &row.start_date)?;
    let end = parse_date("end_date", &row.end_date)?;
    if end < start {
        return Err(format!("结束日期 {} 早于开始日期 {}", end, start));
    }
    Ok(DateWindow::new(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::domain::worker::Worker;
    use crate::repository::WorkerRepository;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn setup() -> (LeaveCsvImporter, Arc<LeaveRepository>) {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let workers = WorkerRepository::new(conn.clone());
        for id in ["W1", "W2", "W3"] {
            workers.upsert(&Worker::new(id, id, "A")).unwrap();
        }
        let leave_repo = Arc::new(LeaveRepository::new(conn));
        (LeaveCsvImporter::new(leave_repo.clone()), leave_repo)
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    #[test]
    fn test_modifications_duplicates_and_substitute_update() {
        let (importer, leaves) = setup();
        let csv = "\
worker_id,date,kind,reason,substitute_worker_id
W1,2025-06-01,substitution,curs,W2
W1,2025-06-01,substitution,canvi,W3
W2,2025-06-01,base,,
W2,2025-06-01,manual,,
W3,2025/06/02,manual,,
W3,2025-06-02,holiday,,
W1,2025-06-03,substitution,,W1
";
        let summary = importer
            .import_modifications_from_reader(csv.as_bytes())
            .unwrap();

        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.substitutes_updated, 1);
        assert_eq!(summary.duplicates_skipped, 1);
        assert_eq!(summary.errors.len(), 3);
        assert_eq!(summary.errors[0].row, 5);

        let record = leaves.find("W1", d(1)).unwrap().unwrap();
        assert_eq!(record.substitute_worker_id.as_deref(), Some("W3"));
    }

    #[test]
    fn test_modifications_missing_columns() {
        let (importer, _) = setup();
        let result = importer.import_modifications_from_reader("worker_id,kind\nW1,base\n".as_bytes());
        assert!(matches!(result, Err(ImportError::MissingColumns(cols)) if cols == vec!["date".to_string()]));
    }

    #[test]
    fn test_temporary_periods_expand_per_day() {
        let (importer, leaves) = setup();
        leaves
            .write_day(&LeaveRecord::rest("W1", d(2), LeaveKind::Base))
            .unwrap();

        let csv = "\
worker_id,start_date,end_date,reason
W1,2025-06-01,2025-06-03,baixa curta
W2,2025-06-05,2025-06-04,
";
        let summary = importer
            .import_temporary_periods_from_reader(csv.as_bytes())
            .unwrap();

        assert_eq!(summary.periods, 1);
        assert_eq!(summary.days_added, 2);
        assert_eq!(summary.days_skipped, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(leaves.find("W1", d(2)).unwrap().unwrap().kind, LeaveKind::Base);
        assert_eq!(leaves.find("W1", d(3)).unwrap().unwrap().kind, LeaveKind::Temporary);
    }
}
