// ==========================================
// 服务覆盖排班系统 - 覆盖结果数据仓储
// ==========================================
// 表: coverage_assignment (已覆盖) / coverage_gap (未覆盖 + 原因码)
// 红线: 保存新批次前整表清空,且与写入处于同一事务
// ==========================================

use crate::domain::assignment::{CandidateAssignment, CoverageOutcome, UncoveredPosition};
use crate::domain::types::{DateWindow, SlotPriority, DATE_FORMAT};
use crate::repository::error::{parse_date_column, RepositoryError, RepositoryResult};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// 已持久化的未覆盖记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredGap {
    pub date: NaiveDate,
    pub position_code: String,
    pub reason_code: String,
    pub reason_detail: String,
}

/// 保存结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSaveSummary {
    pub cleared_assignments: usize,
    pub cleared_gaps: usize,
    pub saved_assignments: usize,
    pub saved_gaps: usize,
}

// ==========================================
// CoverageRepository - 覆盖结果仓储
// ==========================================
pub struct CoverageRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CoverageRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 清空两张结果表并写入新批次
    pub fn replace_all(&self, outcome: &CoverageOutcome) -> RepositoryResult<CoverageSaveSummary> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut summary = CoverageSaveSummary {
            cleared_assignments: tx.execute("DELETE FROM coverage_assignment", [])?,
            cleared_gaps: tx.execute("DELETE FROM coverage_gap", [])?,
            ..Default::default()
        };

        for assignment in &outcome.covered {
            insert_assignment(&tx, assignment)?;
            summary.saved_assignments += 1;
        }
        for gap in &outcome.uncovered {
            insert_gap(&tx, gap)?;
            summary.saved_gaps += 1;
        }

        tx.commit()?;
        Ok(summary)
    }

    /// 查询窗口内已覆盖记录 (按日期、写入顺序)
    pub fn list_assignments(&self, window: DateWindow) -> RepositoryResult<Vec<CandidateAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT assign_date, position_code, worker_id, priority, covered_slot,
                   duration_hours, is_zone_change, is_shift_change, zone, rotation,
                   member_group, qualifications_json, line
            FROM coverage_assignment
            WHERE assign_date BETWEEN ?1 AND ?2
            ORDER BY assign_date, id
            "#,
        )?;
        let rows = stmt
            .query_map(
                params![
                    window.start.format(DATE_FORMAT).to_string(),
                    window.end.format(DATE_FORMAT).to_string(),
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, f64>(5)?,
                        row.get::<_, bool>(6)?,
                        row.get::<_, bool>(7)?,
                        row.get::<_, Option<String>>(8)?,
                        row.get::<_, Option<String>>(9)?,
                        row.get::<_, String>(10)?,
                        row.get::<_, String>(11)?,
                        row.get::<_, Option<String>>(12)?,
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|r| {
                let priority_used =
                    SlotPriority::from_str(&r.3).ok_or_else(|| RepositoryError::FieldValueError {
                        field: "priority".to_string(),
                        message: r.3.clone(),
                    })?;
                Ok(CandidateAssignment {
                    date: parse_date_column("assign_date", &r.0)?,
                    position_code: r.1,
                    worker_id: r.2,
                    priority_used,
                    covered_slot: r.4,
                    duration_hours: r.5,
                    is_zone_change: r.6,
                    is_shift_change: r.7,
                    zone: r.8,
                    rotation: r.9,
                    member_group: r.10,
                    qualifications: serde_json::from_str(&r.11)?,
                    line: r.12,
                })
            })
            .collect()
    }

    /// 查询窗口内未覆盖记录
    pub fn list_gaps(&self, window: DateWindow) -> RepositoryResult<Vec<StoredGap>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT gap_date, position_code, reason_code, reason_detail
            FROM coverage_gap
            WHERE gap_date BETWEEN ?1 AND ?2
            ORDER BY gap_date, id
            "#,
        )?;
        let rows = stmt
            .query_map(
                params![
                    window.start.format(DATE_FORMAT).to_string(),
                    window.end.format(DATE_FORMAT).to_string(),
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(date, position_code, reason_code, reason_detail)| {
                Ok(StoredGap {
                    date: parse_date_column("gap_date", &date)?,
                    position_code,
                    reason_code,
                    reason_detail,
                })
            })
            .collect()
    }
}

fn insert_assignment(conn: &Connection, a: &CandidateAssignment) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO coverage_assignment (
            assign_date, position_code, worker_id, priority, covered_slot, member_group,
            rotation, zone, qualifications_json, line, duration_hours,
            is_zone_change, is_shift_change, recorded_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
        params![
            a.date.format(DATE_FORMAT).to_string(),
            a.position_code,
            a.worker_id,
            a.priority_used.to_db_str(),
            a.covered_slot,
            a.member_group,
            a.rotation,
            a.zone,
            serde_json::to_string(&a.qualifications)?,
            a.line,
            a.duration_hours,
            a.is_zone_change,
            a.is_shift_change,
            Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        ],
    )?;
    Ok(())
}

fn insert_gap(conn: &Connection, gap: &UncoveredPosition) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO coverage_gap (
            gap_date, position_code, reason_code, reason_detail,
            rotation, zone, qualifications_json, line
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            gap.date.format(DATE_FORMAT).to_string(),
            gap.position_code,
            gap.reason.code(),
            gap.reason.to_string(),
            gap.rotation,
            gap.zone,
            serde_json::to_string(&gap.qualifications)?,
            gap.line,
        ],
    )?;
    Ok(())
}
