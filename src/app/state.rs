// ==========================================
// 订单瓶颈分析系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::api::AnalyticsApi;
use crate::config::{AnalyticsSettings, ConfigManager};
use crate::db::{init_schema, open_sqlite_connection};
use crate::repository::{MaintenanceLogRepository, OrderRepository};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "ORDER_BOTTLENECK_DB";

/// 应用状态
///
/// 包含所有API实例和共享资源（单连接共享）
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 订单仓储（导入/维护使用）
    pub order_repo: Arc<OrderRepository>,

    /// 分析API
    pub analytics_api: Arc<AnalyticsApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并初始化表结构（幂等）
    /// 2. 从 config_kv 读取分析配置快照
    /// 3. 创建仓储与 API 实例
    pub async fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库表结构初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("配置管理器初始化失败: {}", e))?,
        );
        let settings = AnalyticsSettings::load(config_manager.as_ref())
            .await
            .map_err(|e| format!("分析配置读取失败: {}", e))?;

        let order_repo = Arc::new(OrderRepository::new(conn.clone()));
        let maintenance_log_repo = Arc::new(MaintenanceLogRepository::new(conn));
        let analytics_api = Arc::new(AnalyticsApi::new(
            order_repo.clone(),
            maintenance_log_repo,
            settings,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            config_manager,
            order_repo,
            analytics_api,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 ORDER_BOTTLENECK_DB > 用户本地数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./orders.db");

    if let Some(data_dir) = dirs::data_local_dir() {
        let dir = data_dir.join("order-bottleneck-analytics");
        // 目录创建失败时由后续打开数据库报错
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("orders.db");
    }

    path.to_string_lossy().to_string()
}
