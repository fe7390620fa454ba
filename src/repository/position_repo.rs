// ==========================================
// 服务覆盖排班系统 - 岗位数据仓储
// ==========================================
// 处理顺序: sort_order, position_code
// ==========================================

use crate::domain::position::Position;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

struct PositionRow {
    position_code: String,
    primary_slot: Option<String>,
    secondary_slot: Option<String>,
    qualifications_json: String,
    line: Option<String>,
    zone: Option<String>,
    rotation: Option<String>,
    duration_hours: Option<f64>,
    sort_order: i64,
}

impl PositionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            position_code: row.get(0)?,
            primary_slot: row.get(1)?,
            secondary_slot: row.get(2)?,
            qualifications_json: row.get(3)?,
            line: row.get(4)?,
            zone: row.get(5)?,
            rotation: row.get(6)?,
            duration_hours: row.get(7)?,
            sort_order: row.get(8)?,
        })
    }

    fn into_domain(self) -> RepositoryResult<Position> {
        Ok(Position {
            position_code: self.position_code,
            primary_slot: self.primary_slot,
            secondary_slot: self.secondary_slot,
            required_qualifications: serde_json::from_str(&self.qualifications_json)?,
            line: self.line,
            zone: self.zone,
            rotation: self.rotation,
            duration_hours: self.duration_hours,
            sort_order: self.sort_order,
        })
    }
}

// ==========================================
// PositionRepository - 岗位仓储
// ==========================================
pub struct PositionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PositionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增或整体替换岗位
    pub fn upsert(&self, position: &Position) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO position (
                position_code, primary_slot, secondary_slot, qualifications_json,
                line, zone, rotation, duration_hours, sort_order
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                position.position_code,
                position.primary_slot,
                position.secondary_slot,
                serde_json::to_string(&position.required_qualifications)?,
                position.line,
                position.zone,
                position.rotation,
                position.duration_hours,
                position.sort_order,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_code(&self, position_code: &str) -> RepositoryResult<Option<Position>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                r#"
                SELECT position_code, primary_slot, secondary_slot, qualifications_json,
                       line, zone, rotation, duration_hours, sort_order
                FROM position WHERE position_code = ?1
                "#,
                params![position_code],
                PositionRow::from_row,
            )
            .optional()?;

        row.map(PositionRow::into_domain).transpose()
    }

    /// 按处理顺序列出全部岗位
    pub fn list_ordered(&self) -> RepositoryResult<Vec<Position>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT position_code, primary_slot, secondary_slot, qualifications_json,
                   line, zone, rotation, duration_hours, sort_order
            FROM position
            ORDER BY sort_order, position_code
            "#,
        )?;
        let rows = stmt
            .query_map([], PositionRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(PositionRow::into_domain).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};

    #[test]
    fn test_list_ordered_by_sort_order() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        let repo = PositionRepository::new(Arc::new(Mutex::new(conn)));

        let mut late = Position::new("SV-A", Some("PL-1"), None);
        late.sort_order = 2;
        let mut early = Position::new("SV-B", Some("PL-2"), Some("PL-3"));
        early.sort_order = 1;
        early.required_qualifications = vec!["L1".to_string()];
        repo.upsert(&late).unwrap();
        repo.upsert(&early).unwrap();

        let positions = repo.list_ordered().unwrap();
        assert_eq!(positions[0].position_code, "SV-B");
        assert_eq!(positions[0].required_qualifications, vec!["L1".to_string()]);
        assert_eq!(positions[1].position_code, "SV-A");
        assert!(repo.find_by_code("SV-Z").unwrap().is_none());
    }
}
