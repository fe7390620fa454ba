// ==========================================
// 服务覆盖排班系统 - 休假记录数据仓储
// ==========================================
// 约束: (worker_id, leave_date) 唯一
// 说明: 区间登记逐日写入,已存在的日期跳过;
//       替换类型且指定了顶班人员时,覆盖已有替换记录的顶班人员
// ==========================================

use crate::domain::leave::{ExpiringLeave, LeavePeriodOutcome, LeaveRecord};
use crate::domain::types::{DateWindow, LeaveKind, DATE_FORMAT};
use crate::repository::error::{parse_date_column, RepositoryError, RepositoryResult};
use chrono::{Duration, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

/// 单日写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveWriteOutcome {
    Inserted,
    SubstituteUpdated,
    Skipped,
}

/// 重复 (人员, 日期) 时顶班人员的更新范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstituteUpdateScope {
    /// 只更新已有的替换记录 (区间登记)
    SubstitutionOnly,
    /// 任意类型的已有记录都更新顶班人员,类型保持不变 (单日变更导入)
    AnyKind,
}

struct LeaveRow {
    worker_id: String,
    leave_date: String,
    kind: String,
    reason: Option<String>,
    substitute_worker_id: Option<String>,
}

impl LeaveRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            worker_id: row.get(0)?,
            leave_date: row.get(1)?,
            kind: row.get(2)?,
            reason: row.get(3)?,
            substitute_worker_id: row.get(4)?,
        })
    }

    fn into_domain(self) -> RepositoryResult<LeaveRecord> {
        let kind = LeaveKind::from_str(&self.kind).ok_or_else(|| RepositoryError::FieldValueError {
            field: "kind".to_string(),
            message: format!("未知休假类型: {}", self.kind),
        })?;
        Ok(LeaveRecord {
            worker_id: self.worker_id,
            date: parse_date_column("leave_date", &self.leave_date)?,
            kind,
            reason: self.reason,
            substitute_worker_id: self.substitute_worker_id,
        })
    }
}

// ==========================================
// LeaveRepository - 休假记录仓储
// ==========================================
pub struct LeaveRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LeaveRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 写入单日记录 (重复时只更新已有替换记录的顶班人员)
    pub fn write_day(&self, record: &LeaveRecord) -> RepositoryResult<LeaveWriteOutcome> {
        self.write_day_with_scope(record, SubstituteUpdateScope::SubstitutionOnly)
    }

    /// 写入单日记录,按指定范围处理重复日期上的顶班人员
    pub fn write_day_with_scope(
        &self,
        record: &LeaveRecord,
        scope: SubstituteUpdateScope,
    ) -> RepositoryResult<LeaveWriteOutcome> {
        validate_substitute(record)?;
        let conn = self.get_conn()?;
        write_leave_day(&conn, record, scope)
    }

    /// 登记区间休假/替换
    ///
    /// # 返回
    /// - LeavePeriodOutcome: 新增 / 更新顶班 / 跳过 的天数
    pub fn add_period(
        &self,
        worker_id: &str,
        window: DateWindow,
        kind: LeaveKind,
        reason: Option<&str>,
        substitute_worker_id: Option<&str>,
    ) -> RepositoryResult<LeavePeriodOutcome> {
        let template = LeaveRecord {
            worker_id: worker_id.to_string(),
            date: window.start,
            kind,
            reason: reason.map(str::to_string),
            substitute_worker_id: substitute_worker_id.map(str::to_string),
        };
        validate_substitute(&template)?;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut outcome = LeavePeriodOutcome::default();
        for date in window.dates() {
            let record = LeaveRecord {
                date,
                ..template.clone()
            };
            match write_leave_day(&tx, &record, SubstituteUpdateScope::SubstitutionOnly)? {
                LeaveWriteOutcome::Inserted => outcome.inserted += 1,
                LeaveWriteOutcome::SubstituteUpdated => outcome.updated += 1,
                LeaveWriteOutcome::Skipped => outcome.skipped += 1,
            }
        }

        tx.commit()?;
        tracing::info!(
            worker_id,
            kind = %kind,
            inserted = outcome.inserted,
            updated = outcome.updated,
            skipped = outcome.skipped,
            "休假区间登记完成"
        );
        Ok(outcome)
    }

    /// 删除区间内的休假记录,返回删除天数
    pub fn delete_period(&self, worker_id: &str, window: DateWindow) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM leave_day WHERE worker_id = ?1 AND leave_date BETWEEN ?2 AND ?3",
            params![
                worker_id,
                window.start.format(DATE_FORMAT).to_string(),
                window.end.format(DATE_FORMAT).to_string(),
            ],
        )?;
        Ok(rows)
    }

    /// 删除区间内的替换记录 (只删除 substitution 类型)
    pub fn delete_substitutions(&self, worker_id: &str, window: DateWindow) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            DELETE FROM leave_day
            WHERE worker_id = ?1 AND leave_date BETWEEN ?2 AND ?3 AND kind = 'substitution'
            "#,
            params![
                worker_id,
                window.start.format(DATE_FORMAT).to_string(),
                window.end.format(DATE_FORMAT).to_string(),
            ],
        )?;
        Ok(rows)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find(&self, worker_id: &str, date: NaiveDate) -> RepositoryResult<Option<LeaveRecord>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                r#"
                SELECT worker_id, leave_date, kind, reason, substitute_worker_id
                FROM leave_day
                WHERE worker_id = ?1 AND leave_date = ?2
                LIMIT 1
                "#,
                params![worker_id, date.format(DATE_FORMAT).to_string()],
                LeaveRow::from_row,
            )
            .optional()?;

        row.map(LeaveRow::into_domain).transpose()
    }

    /// 查询窗口内全部记录 (按日期、人员排序)
    pub fn list_in_range(&self, window: DateWindow) -> RepositoryResult<Vec<LeaveRecord>> {
        self.query_list(
            r#"
            SELECT worker_id, leave_date, kind, reason, substitute_worker_id
            FROM leave_day
            WHERE leave_date BETWEEN ?1 AND ?2
            ORDER BY leave_date, worker_id
            "#,
            window,
        )
    }

    /// 查询窗口内的替换记录
    pub fn list_substitutions(&self, window: DateWindow) -> RepositoryResult<Vec<LeaveRecord>> {
        self.query_list(
            r#"
            SELECT worker_id, leave_date, kind, reason, substitute_worker_id
            FROM leave_day
            WHERE leave_date BETWEEN ?1 AND ?2
              AND substitute_worker_id IS NOT NULL
            ORDER BY leave_date, worker_id
            "#,
            window,
        )
    }

    /// 查询某人的全部休假
    pub fn list_for_worker(&self, worker_id: &str) -> RepositoryResult<Vec<LeaveRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT worker_id, leave_date, kind, reason, substitute_worker_id
            FROM leave_day
            WHERE worker_id = ?1
            ORDER BY leave_date
            "#,
        )?;
        let rows = stmt
            .query_map(params![worker_id], LeaveRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(LeaveRow::into_domain).collect()
    }

    /// 拟定顶班人员自身在窗口内的休假日期
    ///
    /// 说明: 仅作提示;有效人员解析仍然只做一跳查找
    pub fn substitute_leave_days(
        &self,
        substitute_worker_id: &str,
        window: DateWindow,
    ) -> RepositoryResult<Vec<NaiveDate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT leave_date FROM leave_day
            WHERE worker_id = ?1 AND leave_date BETWEEN ?2 AND ?3
            ORDER BY leave_date
            "#,
        )?;
        let raw = stmt
            .query_map(
                params![
                    substitute_worker_id,
                    window.start.format(DATE_FORMAT).to_string(),
                    window.end.format(DATE_FORMAT).to_string(),
                ],
                |row| row.get::<_, String>(0),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.iter().map(|s| parse_date_column("leave_date", s)).collect()
    }

    /// 已过期或即将到期的长期病假
    ///
    /// # 参数
    /// - today: 当前日期
    /// - margin_days: 预警天数 (最后病假日 <= today + margin_days 即列出)
    pub fn expiring_medical_leaves(
        &self,
        today: NaiveDate,
        margin_days: i64,
    ) -> RepositoryResult<Vec<ExpiringLeave>> {
        let limit = Duration::try_days(margin_days)
            .and_then(|margin| today.checked_add_signed(margin))
            .ok_or_else(|| RepositoryError::FieldValueError {
                field: "margin_days".to_string(),
                message: format!("预警天数超出日期范围: {}", margin_days),
            })?;
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            WITH last_medical AS (
                SELECT worker_id, MAX(leave_date) AS last_date
                FROM leave_day
                WHERE kind = 'medical_leave'
                GROUP BY worker_id
            )
            SELECT w.worker_id, w.name, w.home_position, lm.last_date,
                   (SELECT reason FROM leave_day d
                     WHERE d.worker_id = lm.worker_id AND d.leave_date = lm.last_date)
            FROM worker w
            JOIN last_medical lm ON lm.worker_id = w.worker_id
            WHERE lm.last_date <= ?1
            ORDER BY lm.last_date, w.worker_id
            "#,
        )?;
        let rows = stmt
            .query_map(params![limit.format(DATE_FORMAT).to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(worker_id, worker_name, home_position, last, reason)| {
                let last_leave_date = parse_date_column("leave_date", &last)?;
                Ok(ExpiringLeave {
                    worker_id,
                    worker_name,
                    home_position,
                    last_leave_date,
                    reason,
                    expired: last_leave_date < today,
                })
            })
            .collect()
    }

    fn query_list(&self, sql: &str, window: DateWindow) -> RepositoryResult<Vec<LeaveRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(
                params![
                    window.start.format(DATE_FORMAT).to_string(),
                    window.end.format(DATE_FORMAT).to_string(),
                ],
                LeaveRow::from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(LeaveRow::into_domain).collect()
    }
}

/// 人员不能顶替自己
fn validate_substitute(record: &LeaveRecord) -> RepositoryResult<()> {
    if record.substitute_worker_id.as_deref() == Some(record.worker_id.as_str()) {
        return Err(RepositoryError::BusinessRuleViolation(format!(
            "人员 {} 不能顶替自己",
            record.worker_id
        )));
    }
    Ok(())
}

/// 写入单日记录;已存在时仅在 "替换 + 指定顶班人员" 时按 scope 更新顶班人员
fn write_leave_day(
    conn: &Connection,
    record: &LeaveRecord,
    scope: SubstituteUpdateScope,
) -> RepositoryResult<LeaveWriteOutcome> {
    let date_str = record.date.format(DATE_FORMAT).to_string();
    let inserted = conn.execute(
        r#"
        INSERT OR IGNORE INTO leave_day (worker_id, leave_date, kind, reason, substitute_worker_id)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            record.worker_id,
            date_str,
            record.kind.to_db_str(),
            record.reason,
            record.substitute_worker_id,
        ],
    )?;
    if inserted > 0 {
        return Ok(LeaveWriteOutcome::Inserted);
    }

    if record.kind == LeaveKind::Substitution && record.has_substitute() {
        let sql = match scope {
            SubstituteUpdateScope::SubstitutionOnly => {
                r#"
                UPDATE leave_day
                SET substitute_worker_id = ?1, reason = COALESCE(?2, reason)
                WHERE worker_id = ?3 AND leave_date = ?4 AND kind = 'substitution'
                "#
            }
            SubstituteUpdateScope::AnyKind => {
                r#"
                UPDATE leave_day
                SET substitute_worker_id = ?1, reason = COALESCE(?2, reason)
                WHERE worker_id = ?3 AND leave_date = ?4
                "#
            }
        };
        let updated = conn.execute(
            sql,
            params![
                record.substitute_worker_id,
                record.reason,
                record.worker_id,
                date_str,
            ],
        )?;
        if updated > 0 {
            return Ok(LeaveWriteOutcome::SubstituteUpdated);
        }
    }

    Ok(LeaveWriteOutcome::Skipped)
}
