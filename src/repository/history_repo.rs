// ==========================================
// 服务覆盖排班系统 - 历史分配数据仓储
// ==========================================
// 表: assignment_history (仅追加 / 撤回)
// 红线: 人员计数器只在本仓储的两个事务内变更
//   - append_schedule: 提交排班,计数器累加
//   - retract: 对账撤回,计数器回退 (下限为 0)
// 红线: 任一步失败整体回滚,不允许部分生效
// ==========================================

use crate::domain::history::{HistoricalAssignmentRecord, HistoryBook};
use crate::domain::reconciliation::{RetractionPlan, RetractionReport};
use crate::domain::types::{DateWindow, DATE_FORMAT};
use crate::repository::error::{parse_date_column, RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use tracing::info;

const HISTORY_COLUMNS: &str = r#"
    record_id, worker_id, assign_date, position_code, duration_hours,
    is_zone_change, is_shift_change
"#;

struct HistoryRow {
    record_id: String,
    worker_id: String,
    assign_date: String,
    position_code: String,
    duration_hours: f64,
    is_zone_change: bool,
    is_shift_change: bool,
}

impl HistoryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            record_id: row.get(0)?,
            worker_id: row.get(1)?,
            assign_date: row.get(2)?,
            position_code: row.get(3)?,
            duration_hours: row.get(4)?,
            is_zone_change: row.get(5)?,
            is_shift_change: row.get(6)?,
        })
    }

    fn into_domain(self) -> RepositoryResult<HistoricalAssignmentRecord> {
        Ok(HistoricalAssignmentRecord {
            record_id: self.record_id,
            worker_id: self.worker_id,
            date: parse_date_column("assign_date", &self.assign_date)?,
            position_code: self.position_code,
            duration_hours: self.duration_hours,
            is_zone_change: self.is_zone_change,
            is_shift_change: self.is_shift_change,
        })
    }
}

// ==========================================
// HistoryRepository - 历史分配仓储
// ==========================================
pub struct HistoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl HistoryRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 全部历史记录 (按人员、日期排序)
    pub fn list_all(&self) -> RepositoryResult<Vec<HistoricalAssignmentRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM assignment_history ORDER BY worker_id, assign_date, position_code, record_id",
            HISTORY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], HistoryRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(HistoryRow::into_domain).collect()
    }

    /// 载入为内存历史簿
    pub fn load_book(&self) -> RepositoryResult<HistoryBook> {
        Ok(HistoryBook::from_records(self.list_all()?))
    }

    /// 窗口内的历史记录
    pub fn list_in_range(
        &self,
        window: DateWindow,
    ) -> RepositoryResult<Vec<HistoricalAssignmentRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM assignment_history WHERE assign_date BETWEEN ?1 AND ?2 \
             ORDER BY assign_date, worker_id, position_code, record_id",
            HISTORY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![
                    window.start.format(DATE_FORMAT).to_string(),
                    window.end.format(DATE_FORMAT).to_string(),
                ],
                HistoryRow::from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(HistoryRow::into_domain).collect()
    }

    /// 窗口内存在历史记录的日期
    pub fn dates_in_range(&self, window: DateWindow) -> RepositoryResult<BTreeSet<NaiveDate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT assign_date FROM assignment_history WHERE assign_date BETWEEN ?1 AND ?2",
        )?;
        let raw = stmt
            .query_map(
                params![
                    window.start.format(DATE_FORMAT).to_string(),
                    window.end.format(DATE_FORMAT).to_string(),
                ],
                |row| row.get::<_, String>(0),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.iter()
            .map(|d| parse_date_column("assign_date", d))
            .collect()
    }

    pub fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM assignment_history", [], |row| {
            row.get(0)
        })?;
        Ok(n.max(0) as usize)
    }

    // ==========================================
    // 提交排班 (计数器累加)
    // ==========================================

    /// 追加一批历史记录并累加人员计数器
    pub fn append_schedule(&self, records: &[HistoricalAssignmentRecord]) -> RepositoryResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut touched: BTreeMap<&str, (f64, u32, u32)> = BTreeMap::new();
        for record in records {
            tx.execute(
                r#"
                INSERT INTO assignment_history (
                    record_id, worker_id, assign_date, position_code, duration_hours,
                    is_zone_change, is_shift_change
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    record.record_id,
                    record.worker_id,
                    record.date.format(DATE_FORMAT).to_string(),
                    record.position_code,
                    record.duration_hours,
                    record.is_zone_change,
                    record.is_shift_change,
                ],
            )?;

            let entry = touched.entry(record.worker_id.as_str()).or_default();
            entry.0 += record.duration_hours;
            entry.1 += record.is_zone_change as u32;
            entry.2 += record.is_shift_change as u32;
        }

        for (worker_id, (hours, zone, shift)) in &touched {
            let updated = tx.execute(
                r#"
                UPDATE worker SET
                    annual_hours = annual_hours + ?2,
                    zone_changes = zone_changes + ?3,
                    shift_changes = shift_changes + ?4
                WHERE worker_id = ?1
                "#,
                params![worker_id, hours, zone, shift],
            )?;
            if updated != 1 {
                return Err(RepositoryError::NotFound {
                    entity: "Worker".to_string(),
                    id: worker_id.to_string(),
                });
            }
            refresh_last_record(&tx, worker_id)?;
        }

        tx.commit()?;

        info!(
            records = records.len(),
            workers = touched.len(),
            "历史分配已提交"
        );
        Ok(records.len())
    }

    // ==========================================
    // 对账撤回 (计数器回退)
    // ==========================================

    /// 执行撤回计划
    ///
    /// 说明: 逐条按 record_id 删除,任一条未命中即整体回滚;
    /// 删除后重叠日期上仍有记录 (计划生成后新增) 时同样整体回滚;
    /// 计数器回退下限为 0,且汇总回退与逐条回退结果一致 (回退量非负)
    pub fn retract(&self, plan: &RetractionPlan) -> RepositoryResult<RetractionReport> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        for record in &plan.retractions {
            let deleted = tx.execute(
                "DELETE FROM assignment_history WHERE record_id = ?1 AND worker_id = ?2",
                params![record.record_id, record.worker_id],
            )?;
            if deleted != 1 {
                return Err(RepositoryError::DatabaseTransactionError(format!(
                    "历史记录 {} 已不存在,撤回中止",
                    record.record_id
                )));
            }
        }

        for date in &plan.overlap_dates {
            let remaining: i64 = tx.query_row(
                "SELECT COUNT(*) FROM assignment_history WHERE assign_date = ?1",
                params![date.format(DATE_FORMAT).to_string()],
                |row| row.get(0),
            )?;
            if remaining > 0 {
                return Err(RepositoryError::DatabaseTransactionError(format!(
                    "{} 存在计划外的历史记录 {} 条,撤回计划已过期",
                    date, remaining
                )));
            }
        }

        for (worker_id, delta) in &plan.deltas {
            let updated = tx.execute(
                r#"
                UPDATE worker SET
                    annual_hours = MAX(0, annual_hours - ?2),
                    zone_changes = MAX(0, zone_changes - ?3),
                    shift_changes = MAX(0, shift_changes - ?4)
                WHERE worker_id = ?1
                "#,
                params![worker_id, delta.hours, delta.zone_changes, delta.shift_changes],
            )?;
            if updated != 1 {
                return Err(RepositoryError::NotFound {
                    entity: "Worker".to_string(),
                    id: worker_id.clone(),
                });
            }
            refresh_last_record(&tx, worker_id)?;
        }

        tx.commit()?;

        let report = RetractionReport {
            retracted_records: plan.retracted_count(),
            affected_workers: plan.deltas.len(),
            overlap_dates: plan.overlap_dates.len(),
        };
        info!(
            retracted = report.retracted_records,
            workers = report.affected_workers,
            dates = report.overlap_dates,
            "历史分配已撤回"
        );
        Ok(report)
    }
}

/// 以剩余记录中最晚的一条刷新人员的最近分配指针 (无记录时置空)
fn refresh_last_record(conn: &Connection, worker_id: &str) -> RepositoryResult<()> {
    conn.execute(
        r#"
        UPDATE worker SET last_record_id = (
            SELECT record_id FROM assignment_history
            WHERE worker_id = ?1
            ORDER BY assign_date DESC, position_code DESC, record_id DESC
            LIMIT 1
        )
        WHERE worker_id = ?1
        "#,
        params![worker_id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::domain::worker::Worker;
    use crate::repository::worker_repo::WorkerRepository;

    fn setup() -> (HistoryRepository, WorkerRepository) {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let workers = WorkerRepository::new(conn.clone());
        workers.upsert(&Worker::new("W1", "Anna", "A")).unwrap();
        (HistoryRepository::new(conn), workers)
    }

    fn rec(id: &str, worker: &str, day: u32, hours: f64) -> HistoricalAssignmentRecord {
        HistoricalAssignmentRecord {
            record_id: id.to_string(),
            worker_id: worker.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            position_code: "SV-1".to_string(),
            duration_hours: hours,
            is_zone_change: true,
            is_shift_change: false,
        }
    }

    #[test]
    fn test_append_updates_counters_and_pointer() {
        let (history, workers) = setup();
        history
            .append_schedule(&[rec("R2", "W1", 2, 8.0), rec("R1", "W1", 1, 7.0)])
            .unwrap();

        let w1 = workers.find_by_id("W1").unwrap().unwrap();
        assert!((w1.counters.annual_hours() - 15.0).abs() < 1e-9);
        assert_eq!(w1.counters.zone_changes(), 2);
        assert_eq!(w1.last_record_id.as_deref(), Some("R2"));
        assert_eq!(history.count().unwrap(), 2);
    }

    #[test]
    fn test_append_unknown_worker_rolls_back() {
        let (history, _workers) = setup();
        let result = history.append_schedule(&[rec("R1", "W1", 1, 8.0), rec("R2", "W9", 1, 8.0)]);

        assert!(result.is_err());
        assert_eq!(history.count().unwrap(), 0);
    }

    #[test]
    fn test_retract_missing_record_rolls_back() {
        let (history, workers) = setup();
        history.append_schedule(&[rec("R1", "W1", 1, 8.0)]).unwrap();

        let dates: BTreeSet<_> = [NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()].into();
        let plan = RetractionPlan::from_records(
            dates,
            vec![rec("R1", "W1", 1, 8.0), rec("R-GONE", "W1", 1, 8.0)],
        );
        assert!(history.retract(&plan).is_err());

        let w1 = workers.find_by_id("W1").unwrap().unwrap();
        assert!((w1.counters.annual_hours() - 8.0).abs() < 1e-9);
        assert_eq!(history.count().unwrap(), 1);
    }

    #[test]
    fn test_retract_clears_pointer_when_nothing_remains() {
        let (history, workers) = setup();
        history.append_schedule(&[rec("R1", "W1", 1, 8.0)]).unwrap();

        let dates: BTreeSet<_> = [NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()].into();
        let plan = RetractionPlan::from_records(dates, vec![rec("R1", "W1", 1, 8.0)]);
        let report = history.retract(&plan).unwrap();

        assert_eq!(report.retracted_records, 1);
        let w1 = workers.find_by_id("W1").unwrap().unwrap();
        assert_eq!(w1.counters.annual_hours(), 0.0);
        assert_eq!(w1.counters.zone_changes(), 0);
        assert!(w1.last_record_id.is_none());
    }

    #[test]
    fn test_retract_rejects_records_added_after_planning() {
        let (history, workers) = setup();
        history.append_schedule(&[rec("R1", "W1", 1, 8.0)]).unwrap();

        let dates: BTreeSet<_> = [NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()].into();
        let plan = RetractionPlan::from_records(dates, vec![rec("R1", "W1", 1, 8.0)]);
        history.append_schedule(&[rec("R-LATE", "W1", 1, 4.0)]).unwrap();

        let result = history.retract(&plan);
        assert!(matches!(result, Err(RepositoryError::DatabaseTransactionError(_))));
        assert_eq!(history.count().unwrap(), 2);
        let w1 = workers.find_by_id("W1").unwrap().unwrap();
        assert!((w1.counters.annual_hours() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_dates_in_range_is_distinct_and_bounded() {
        let (history, workers) = setup();
        workers.upsert(&Worker::new("W2", "Bernat", "A")).unwrap();
        history
            .append_schedule(&[
                rec("R1", "W1", 1, 8.0),
                rec("R2", "W2", 1, 8.0),
                rec("R3", "W1", 3, 8.0),
                rec("R4", "W1", 9, 8.0),
            ])
            .unwrap();

        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
        );
        let dates = history.dates_in_range(window).unwrap();
        let expected: BTreeSet<_> = [1, 3]
            .into_iter()
            .map(|day| NaiveDate::from_ymd_opt(2025, 6, day).unwrap())
            .collect();
        assert_eq!(dates, expected);
    }
}
