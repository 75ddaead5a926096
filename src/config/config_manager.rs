// ==========================================
// 订单瓶颈分析系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::stage_policy_reader::StagePolicyReader;
use crate::db::open_sqlite_connection;
use crate::domain::stage::{StageCatalog, StageDefinition};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

/// 默认分析窗口（月）
pub const DEFAULT_WINDOW_MONTHS: u32 = 3;
/// 默认补全批大小
pub const DEFAULT_BACKFILL_BATCH_SIZE: usize = 100;
/// 默认缓存容量
pub const DEFAULT_ORDER_CACHE_CAPACITY: usize = 16;
/// 默认缓存过期秒数
pub const DEFAULT_ORDER_CACHE_TTL_SECONDS: u64 = 300;

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
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
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

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
            ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 写入阶段表（JSON 数组）
    ///
    /// 写入前先校验，非法阶段表直接拒绝
    pub fn set_stage_definitions(&self, definitions: &[StageDefinition]) -> Result<(), Box<dyn Error>> {
        StageCatalog::new(definitions.to_vec())?;
        let raw = serde_json::to_string(definitions)?;
        self.set_global_config_value(config_keys::STAGE_DEFINITIONS, &raw)
    }

    /// 获取所有 global 配置（调试/导出用）
    pub fn get_config_snapshot(&self) -> Result<HashMap<String, String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key"
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(config_map)
    }

    /// 读取正整数配置，缺失或非法时回退默认值
    fn get_positive_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: std::str::FromStr + PartialOrd + Default + Copy + std::fmt::Display,
    {
        let value = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };

        match value.trim().parse::<T>() {
            Ok(parsed) if parsed > T::default() => Ok(parsed),
            _ => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %value,
                    default = %default,
                    "配置值无效，使用默认值"
                );
                Ok(default)
            }
        }
    }
}

// ==========================================
// StagePolicyReader Trait 实现
// ==========================================
#[async_trait]
impl StagePolicyReader for ConfigManager {
    async fn get_stage_catalog(&self) -> Result<StageCatalog, Box<dyn Error>> {
        let raw = match self.get_config_value(config_keys::STAGE_DEFINITIONS)? {
            Some(v) => v,
            None => return Ok(StageCatalog::canonical()),
        };

        let parsed = serde_json::from_str::<Vec<StageDefinition>>(&raw)
            .map_err(|e| e.to_string())
            .and_then(StageCatalog::new);

        match parsed {
            Ok(catalog) => Ok(catalog),
            Err(reason) => {
                tracing::warn!(
                    config_key = config_keys::STAGE_DEFINITIONS,
                    reason = %reason,
                    "阶段表配置无效，使用规范阶段表"
                );
                Ok(StageCatalog::canonical())
            }
        }
    }

    async fn get_default_window_months(&self) -> Result<u32, Box<dyn Error>> {
        self.get_positive_or_default(config_keys::DEFAULT_WINDOW_MONTHS, DEFAULT_WINDOW_MONTHS)
    }

    async fn get_backfill_batch_size(&self) -> Result<usize, Box<dyn Error>> {
        self.get_positive_or_default(config_keys::BACKFILL_BATCH_SIZE, DEFAULT_BACKFILL_BATCH_SIZE)
    }

    async fn get_order_cache_capacity(&self) -> Result<usize, Box<dyn Error>> {
        self.get_positive_or_default(config_keys::ORDER_CACHE_CAPACITY, DEFAULT_ORDER_CACHE_CAPACITY)
    }

    async fn get_order_cache_ttl_seconds(&self) -> Result<u64, Box<dyn Error>> {
        let value = self.get_config_or_default(
            config_keys::ORDER_CACHE_TTL_SECONDS,
            &DEFAULT_ORDER_CACHE_TTL_SECONDS.to_string(),
        )?;
        // 0 合法: 表示不缓存
        Ok(value.trim().parse::<u64>().unwrap_or(DEFAULT_ORDER_CACHE_TTL_SECONDS))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 阶段策略 (JSON 数组)
    pub const STAGE_DEFINITIONS: &str = "stage_definitions";

    // 请求回退
    pub const DEFAULT_WINDOW_MONTHS: &str = "analysis_default_window_months";

    // 补全任务
    pub const BACKFILL_BATCH_SIZE: &str = "backfill_batch_size";

    // 订单缓存
    pub const ORDER_CACHE_CAPACITY: &str = "order_cache_capacity";
    pub const ORDER_CACHE_TTL_SECONDS: &str = "order_cache_ttl_seconds";
}
