// ==========================================
// 服务覆盖排班系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout,减少并发写入时的偶发 busy 错误
// - 提供最小建表脚本 (测试/命令行首次运行使用)
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表 (幂等)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

// ==========================================
// 默认数据库路径
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 COVERAGE_ROSTER_DB_PATH (非空时优先)
/// - 用户数据目录/coverage-roster/coverage_roster.db
/// - 拿不到数据目录时回退到 ./coverage_roster.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var("COVERAGE_ROSTER_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./coverage_roster.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("coverage-roster");
        // 目录创建失败时由后续 open 报错
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("coverage_roster.db");
    }

    path.to_string_lossy().to_string()
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS worker (
    worker_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    home_position TEXT,
    rotation TEXT,
    zone TEXT,
    member_group TEXT NOT NULL,
    qualifications_json TEXT NOT NULL DEFAULT '[]',
    lines_json TEXT NOT NULL DEFAULT '[]',
    annual_hour_cap REAL,
    annual_hours REAL NOT NULL DEFAULT 0,
    zone_changes INTEGER NOT NULL DEFAULT 0,
    shift_changes INTEGER NOT NULL DEFAULT 0,
    last_record_id TEXT
);

CREATE INDEX IF NOT EXISTS idx_worker_home_position ON worker(home_position);

CREATE TABLE IF NOT EXISTS leave_day (
    worker_id TEXT NOT NULL REFERENCES worker(worker_id) ON DELETE CASCADE,
    leave_date TEXT NOT NULL,
    kind TEXT NOT NULL,
    reason TEXT,
    substitute_worker_id TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (worker_id, leave_date)
);

CREATE TABLE IF NOT EXISTS position (
    position_code TEXT PRIMARY KEY,
    primary_slot TEXT,
    secondary_slot TEXT,
    qualifications_json TEXT NOT NULL DEFAULT '[]',
    line TEXT,
    zone TEXT,
    rotation TEXT,
    duration_hours REAL,
    sort_order INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS coverage_assignment (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    assign_date TEXT NOT NULL,
    position_code TEXT NOT NULL,
    worker_id TEXT NOT NULL,
    priority TEXT NOT NULL,
    covered_slot TEXT NOT NULL,
    member_group TEXT NOT NULL,
    rotation TEXT,
    zone TEXT,
    qualifications_json TEXT NOT NULL DEFAULT '[]',
    line TEXT,
    duration_hours REAL NOT NULL,
    is_zone_change INTEGER NOT NULL DEFAULT 0,
    is_shift_change INTEGER NOT NULL DEFAULT 0,
    recorded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS coverage_gap (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    gap_date TEXT NOT NULL,
    position_code TEXT NOT NULL,
    reason_code TEXT NOT NULL,
    reason_detail TEXT NOT NULL,
    rotation TEXT,
    zone TEXT,
    qualifications_json TEXT NOT NULL DEFAULT '[]',
    line TEXT
);

CREATE TABLE IF NOT EXISTS assignment_history (
    record_id TEXT PRIMARY KEY,
    worker_id TEXT NOT NULL REFERENCES worker(worker_id),
    assign_date TEXT NOT NULL,
    position_code TEXT NOT NULL,
    duration_hours REAL NOT NULL,
    is_zone_change INTEGER NOT NULL DEFAULT 0,
    is_shift_change INTEGER NOT NULL DEFAULT 0,
    committed_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_history_date ON assignment_history(assign_date);
CREATE INDEX IF NOT EXISTS idx_history_worker ON assignment_history(worker_id, assign_date);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }
}
