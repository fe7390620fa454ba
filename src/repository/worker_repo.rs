// ==========================================
// 服务覆盖排班系统 - 人员数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 工作量计数器不在此处改写 (只在 HistoryRepository 事务内变更)
// ==========================================

use crate::domain::worker::{Worker, WorkloadCounters};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const WORKER_COLUMNS: &str = r#"
    worker_id, name, home_position, rotation, zone, member_group,
    qualifications_json, annual_hour_cap, annual_hours, zone_changes,
    shift_changes, last_record_id, lines_json
"#;

// ==========================================
// WorkerRow - 原始行
// ==========================================
struct WorkerRow {
    worker_id: String,
    name: String,
    home_position: Option<String>,
    rotation: Option<String>,
    zone: Option<String>,
    member_group: String,
    qualifications_json: String,
    annual_hour_cap: Option<f64>,
    annual_hours: f64,
    zone_changes: i64,
    shift_changes: i64,
    last_record_id: Option<String>,
    lines_json: String,
}

impl WorkerRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            worker_id: row.get(0)?,
            name: row.get(1)?,
            home_position: row.get(2)?,
            rotation: row.get(3)?,
            zone: row.get(4)?,
            member_group: row.get(5)?,
            qualifications_json: row.get(6)?,
            annual_hour_cap: row.get(7)?,
            annual_hours: row.get(8)?,
            zone_changes: row.get(9)?,
            shift_changes: row.get(10)?,
            last_record_id: row.get(11)?,
            lines_json: row.get(12)?,
        })
    }

    fn into_domain(self) -> RepositoryResult<Worker> {
        let qualifications: Vec<String> = serde_json::from_str(&self.qualifications_json)?;
        let lines: Vec<String> = serde_json::from_str(&self.lines_json)?;
        Ok(Worker {
            worker_id: self.worker_id,
            name: self.name,
            home_position: self.home_position,
            rotation: self.rotation,
            zone: self.zone,
            member_group: self.member_group,
            qualifications,
            lines,
            annual_hour_cap: self.annual_hour_cap,
            counters: WorkloadCounters::new(
                self.annual_hours,
                self.zone_changes.max(0) as u32,
                self.shift_changes.max(0) as u32,
            ),
            last_record_id: self.last_record_id,
        })
    }
}

// ==========================================
// WorkerRepository - 人员仓储
// ==========================================
pub struct WorkerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WorkerRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增或更新人员主数据
    ///
    /// 说明: 首次插入时写入计数器初值;已存在时只更新主数据字段
    pub fn upsert(&self, worker: &Worker) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let qualifications_json = serde_json::to_string(&worker.qualifications)?;
        let lines_json = serde_json::to_string(&worker.lines)?;

        conn.execute(
            r#"
            INSERT INTO worker (
                worker_id, name, home_position, rotation, zone, member_group,
                qualifications_json, annual_hour_cap, annual_hours, zone_changes,
                shift_changes, last_record_id, lines_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(worker_id) DO UPDATE SET
                name = excluded.name,
                home_position = excluded.home_position,
                rotation = excluded.rotation,
                zone = excluded.zone,
                member_group = excluded.member_group,
                qualifications_json = excluded.qualifications_json,
                lines_json = excluded.lines_json,
                annual_hour_cap = excluded.annual_hour_cap
            "#,
            params![
                worker.worker_id,
                worker.name,
                worker.home_position,
                worker.rotation,
                worker.zone,
                worker.member_group,
                qualifications_json,
                worker.annual_hour_cap,
                worker.counters.annual_hours(),
                worker.counters.zone_changes(),
                worker.counters.shift_changes(),
                worker.last_record_id,
                lines_json,
            ],
        )?;

        Ok(())
    }

    /// 按 ID 查询
    pub fn find_by_id(&self, worker_id: &str) -> RepositoryResult<Option<Worker>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM worker WHERE worker_id = ?1", WORKER_COLUMNS);
        let row = conn
            .query_row(&sql, params![worker_id], WorkerRow::from_row)
            .optional()?;

        row.map(WorkerRow::into_domain).transpose()
    }

    /// 按本岗位编码查询
    pub fn find_by_home_position(&self, home_position: &str) -> RepositoryResult<Option<Worker>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM worker WHERE home_position = ?1 ORDER BY worker_id LIMIT 1",
            WORKER_COLUMNS
        );
        let row = conn
            .query_row(&sql, params![home_position], WorkerRow::from_row)
            .optional()?;

        row.map(WorkerRow::into_domain).transpose()
    }

    /// 查询全部人员 (按 worker_id 排序)
    pub fn list_all(&self) -> RepositoryResult<Vec<Worker>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM worker ORDER BY worker_id", WORKER_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], WorkerRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(WorkerRow::into_domain).collect()
    }

    /// 按所属组查询
    pub fn list_by_group(&self, member_group: &str) -> RepositoryResult<Vec<Worker>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM worker WHERE member_group = ?1 ORDER BY worker_id",
            WORKER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![member_group], WorkerRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(WorkerRow::into_domain).collect()
    }

    /// 按名称/本岗位模糊搜索
    pub fn search(&self, term: &str) -> RepositoryResult<Vec<Worker>> {
        let conn = self.get_conn()?;
        let pattern = format!("%{}%", term.trim());
        let sql = format!(
            "SELECT {} FROM worker WHERE name LIKE ?1 OR home_position LIKE ?1 ORDER BY worker_id",
            WORKER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![pattern], WorkerRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(WorkerRow::into_domain).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};

    fn setup_test_db() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    #[test]
    fn test_upsert_keeps_counters_on_update() {
        let repo = WorkerRepository::new(setup_test_db());

        let mut worker = Worker::new("W1", "Anna", "A");
        worker.home_position = Some("PL-1".to_string());
        worker.qualifications = vec!["TRAM".to_string()];
        worker.lines = vec!["L1".to_string(), "L5".to_string()];
        worker.counters = WorkloadCounters::new(120.0, 2, 1);
        repo.upsert(&worker).unwrap();

        let mut renamed = worker.clone();
        renamed.name = "Anna B.".to_string();
        renamed.counters = WorkloadCounters::default();
        repo.upsert(&renamed).unwrap();

        let found = repo.find_by_id("W1").unwrap().unwrap();
        assert_eq!(found.name, "Anna B.");
        assert_eq!(found.qualifications, vec!["TRAM".to_string()]);
        assert_eq!(found.lines, vec!["L1".to_string(), "L5".to_string()]);
        assert_eq!(found.counters.annual_hours(), 120.0);
        assert_eq!(found.counters.zone_changes(), 2);
    }

    #[test]
    fn test_find_by_home_position_and_group() {
        let repo = WorkerRepository::new(setup_test_db());

        let mut w1 = Worker::new("W1", "Anna", "A");
        w1.home_position = Some("PL-1".to_string());
        let mut w2 = Worker::new("W2", "Biel", "B");
        w2.home_position = Some("PL-2".to_string());
        repo.upsert(&w1).unwrap();
        repo.upsert(&w2).unwrap();

        let found = repo.find_by_home_position("PL-2").unwrap().unwrap();
        assert_eq!(found.worker_id, "W2");
        assert!(repo.find_by_home_position("PL-9").unwrap().is_none());
        assert_eq!(repo.list_by_group("A").unwrap().len(), 1);
        assert_eq!(repo.list_all().unwrap().len(), 2);
        assert_eq!(repo.search("Bie").unwrap().len(), 1);
    }
}
