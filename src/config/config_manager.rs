// ==========================================
// 药房配送协同系统 - 配置管理器
// ==========================================
// 职责: 定价表加载、保存、配置快照
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::pricing_config_trait::PricingConfigReader;
use crate::config::pricing_tables::{ConfigResult, PricingTables};
use crate::db::{configure_sqlite_connection, open_sqlite_connection};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

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
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入 global 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    // ===== 定价表 =====

    /// 读取定价表
    ///
    /// - 未配置 → 内置默认表
    /// - JSON 损坏或不满足不变式 → 返回错误（不静默回退）
    pub fn get_pricing_tables(&self) -> ConfigResult<PricingTables> {
        match self.get_global_config_value(config_keys::PRICING_TABLES)? {
            Some(raw) => {
                debug!("从 config_kv 加载定价表");
                PricingTables::from_json(&raw)
            }
            None => {
                debug!("未配置定价表,使用内置默认表");
                Ok(PricingTables::builtin())
            }
        }
    }

    /// 保存定价表（先校验再写入）
    pub fn save_pricing_tables(&self, tables: &PricingTables) -> ConfigResult<()> {
        tables.validate()?;
        let raw = tables.to_json()?;
        self.set_global_config_value(config_keys::PRICING_TABLES, &raw)?;
        info!("定价表已保存");
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 对账时记录当时生效的定价表
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.get_conn()?;

        let mut stmt = conn
            .prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")
            .map_err(RepositoryError::from)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(RepositoryError::from)?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        for row in rows {
            let (key, value) = row.map_err(RepositoryError::from)?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

#[async_trait]
impl PricingConfigReader for ConfigManager {
    async fn load_pricing_tables(&self) -> ConfigResult<PricingTables> {
        self.get_pricing_tables()
    }
}

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    // 定价表 (JSON)
    pub const PRICING_TABLES: &str = "pricing/tables";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::pricing_tables::{ConfigError, RateEntry};
    use crate::domain::types::{CarrierName, RegionCode};

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_missing_tables_fall_back_to_builtin() {
        let manager = setup_manager();
        let tables = manager.get_pricing_tables().unwrap();
        assert_eq!(tables, PricingTables::builtin());
    }

    #[test]
    fn test_save_and_reload_tables() {
        let manager = setup_manager();
        let mut tables = PricingTables::builtin();
        tables.rates.insert(
            CarrierName::CarrierB,
            RegionCode::Bc,
            RateEntry::tiered(8.0, 13.0),
        );

        manager.save_pricing_tables(&tables).unwrap();
        let reloaded = manager.get_pricing_tables().unwrap();

        assert_eq!(
            reloaded.rates.get(CarrierName::CarrierB, RegionCode::Bc),
            Some(&RateEntry::tiered(8.0, 13.0))
        );
    }

    #[test]
    fn test_save_rejects_invalid_tables() {
        let manager = setup_manager();
        let mut tables = PricingTables::builtin();
        tables.rates.insert(
            CarrierName::CarrierB,
            RegionCode::Bc,
            RateEntry::tiered(12.0, 7.0),
        );

        assert!(manager.save_pricing_tables(&tables).is_err());
        // 未写入
        assert!(manager
            .get_global_config_value(config_keys::PRICING_TABLES)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_corrupt_json_is_an_error() {
        let manager = setup_manager();
        manager
            .set_global_config_value(config_keys::PRICING_TABLES, "{not json")
            .unwrap();

        let err = manager.get_pricing_tables().unwrap_err();
        assert!(matches!(err, ConfigError::Serialization(_)));
    }

    #[test]
    fn test_config_snapshot_contains_tables_key() {
        let manager = setup_manager();
        manager
            .save_pricing_tables(&PricingTables::builtin())
            .unwrap();

        let snapshot = manager.get_config_snapshot().unwrap();
        let map: HashMap<String, String> = serde_json::from_str(&snapshot).unwrap();
        assert!(map.contains_key(config_keys::PRICING_TABLES));
    }

    #[tokio::test]
    async fn test_reader_trait_loads_tables() {
        let manager = setup_manager();
        let reader: &dyn PricingConfigReader = &manager;
        let tables = reader.load_pricing_tables().await.unwrap();
        assert!(tables.validate().is_ok());
    }
}
