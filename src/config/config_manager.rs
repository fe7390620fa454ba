// ==========================================
// 服务覆盖排班系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::roster_config_trait::RosterConfigReader;
use crate::config::scoring_profile::ScoringProfile;
use crate::db::open_sqlite_connection;
use crate::domain::worker::DEFAULT_ANNUAL_HOUR_CAP;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }
}

// ==========================================
// RosterConfigReader Trait 实现
// ==========================================
impl RosterConfigReader for ConfigManager {
    fn get_schedulable_group(&self) -> Result<String, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::SCHEDULABLE_GROUP, "A")?;
        let value = value.trim();
        if value.is_empty() {
            Ok("A".to_string())
        } else {
            Ok(value.to_string())
        }
    }

    fn get_default_shift_hours(&self) -> Result<f64, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEFAULT_SHIFT_HOURS, "8.0")?;
        Ok(value
            .parse::<f64>()
            .ok()
            .filter(|h| h.is_finite() && *h > 0.0)
            .unwrap_or(8.0))
    }

    fn get_annual_hour_cap(&self) -> Result<f64, Box<dyn Error>> {
        let default = DEFAULT_ANNUAL_HOUR_CAP.to_string();
        let value = self.get_config_or_default(config_keys::ANNUAL_HOUR_CAP, &default)?;
        Ok(value
            .parse::<f64>()
            .ok()
            .filter(|h| h.is_finite() && *h > 0.0)
            .unwrap_or(DEFAULT_ANNUAL_HOUR_CAP))
    }

    fn get_max_consecutive_days(&self) -> Result<u32, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::MAX_CONSECUTIVE_DAYS, "9")?;
        Ok(value.parse::<u32>().ok().filter(|d| *d > 0).unwrap_or(9))
    }

    fn get_scoring_profile(&self) -> Result<Option<ScoringProfile>, Box<dyn Error>> {
        let raw = match self.get_config_value(config_keys::SCORING_PROFILE)? {
            Some(v) => v,
            None => return Ok(None),
        };

        match serde_json::from_str::<ScoringProfile>(&raw) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                tracing::warn!(
                    config_key = config_keys::SCORING_PROFILE,
                    error = %e,
                    "评分权重方案格式错误，使用内置权重"
                );
                Ok(None)
            }
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 排班范围
    pub const SCHEDULABLE_GROUP: &str = "schedulable_group";

    // 工时
    pub const DEFAULT_SHIFT_HOURS: &str = "default_shift_hours";
    pub const ANNUAL_HOUR_CAP: &str = "annual_hour_cap";
    pub const MAX_CONSECUTIVE_DAYS: &str = "max_consecutive_days";

    // 评分
    pub const SCORING_PROFILE: &str = "scoring_profile"; // 权重覆写 (JSON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_table_empty() {
        let config = manager();

        assert_eq!(config.get_schedulable_group().unwrap(), "A");
        assert_eq!(config.get_default_shift_hours().unwrap(), 8.0);
        assert_eq!(config.get_annual_hour_cap().unwrap(), 1605.0);
        assert_eq!(config.get_max_consecutive_days().unwrap(), 9);
        assert!(config.get_scoring_profile().unwrap().is_none());
    }

    #[test]
    fn test_overrides_and_invalid_values() {
        let config = manager();
        config.set_global_config_value(config_keys::SCHEDULABLE_GROUP, "B").unwrap();
        config.set_global_config_value(config_keys::DEFAULT_SHIFT_HOURS, "-3").unwrap();
        config.set_global_config_value(config_keys::SCORING_PROFILE, "{not json").unwrap();

        assert_eq!(config.get_schedulable_group().unwrap(), "B");
        assert_eq!(config.get_default_shift_hours().unwrap(), 8.0);
        assert!(config.get_scoring_profile().unwrap().is_none());

        config.set_global_config_value(config_keys::SCHEDULABLE_GROUP, "C").unwrap();
        assert_eq!(
            config.get_global_config_value(config_keys::SCHEDULABLE_GROUP).unwrap().as_deref(),
            Some("C")
        );
    }
}
