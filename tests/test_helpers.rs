// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、订单数据生成等功能
// ==========================================

#![allow(dead_code)]

use order_bottleneck_analytics::api::AnalyticsApi;
use order_bottleneck_analytics::config::AnalyticsSettings;
use order_bottleneck_analytics::db::{init_schema, open_sqlite_connection};
use order_bottleneck_analytics::domain::{Order, StatusEvent};
use order_bottleneck_analytics::repository::{MaintenanceLogRepository, OrderRepository};
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开测试数据库连接（共享连接）
pub fn open_test_connection(db_path: &str) -> Result<Arc<Mutex<Connection>>, Box<dyn Error>> {
    Ok(Arc::new(Mutex::new(open_sqlite_connection(db_path)?)))
}

/// 构造分析 API（默认配置）
pub fn build_api(db_path: &str) -> Result<(AnalyticsApi, Arc<OrderRepository>), Box<dyn Error>> {
    build_api_with(db_path, AnalyticsSettings::default())
}

pub fn build_api_with(
    db_path: &str,
    settings: AnalyticsSettings,
) -> Result<(AnalyticsApi, Arc<OrderRepository>), Box<dyn Error>> {
    let conn = open_test_connection(db_path)?;
    let order_repo = Arc::new(OrderRepository::new(conn.clone()));
    let log_repo = Arc::new(MaintenanceLogRepository::new(conn));
    let api = AnalyticsApi::new(order_repo.clone(), log_repo, settings);
    Ok((api, order_repo))
}

/// 构造带状态历史的订单
///
/// # 参数
/// - events: (阶段, 时间) 列表
pub fn order_with_history(order_id: &str, created_at: &str, events: &[(&str, &str)]) -> Order {
    let status = events.last().map(|(s, _)| *s).unwrap_or("Initiated");
    let mut order = Order::new(order_id, created_at, status);
    order.status_history = events
        .iter()
        .map(|(stage, ts)| StatusEvent::new(*stage, *ts))
        .collect();
    order
}

/// 只有时间字段、没有状态历史的订单
pub fn order_without_history(
    order_id: &str,
    created_at: &str,
    status: &str,
    payment_date: Option<&str>,
    delivery_date: Option<&str>,
    completed_at: Option<&str>,
) -> Order {
    let mut order = Order::new(order_id, created_at, status);
    order.payment_date = payment_date.map(str::to_string);
    order.delivery_date = delivery_date.map(str::to_string);
    order.completed_at = completed_at.map(str::to_string);
    order
}

/// 写入测试订单
pub fn seed_orders(repo: &OrderRepository, orders: &[Order]) -> Result<(), Box<dyn Error>> {
    repo.batch_upsert(orders)?;
    Ok(())
}

/// 生成 n 个缺少状态历史的订单（补全任务用）
pub fn legacy_orders(n: usize) -> Vec<Order> {
    (0..n)
        .map(|i| {
            let day = (i % 28) + 1;
            order_without_history(
                &format!("LEGACY-{:04}", i),
                &format!("2024-02-{:02}T08:00:00Z", day),
                "Delivered",
                Some(&format!("2024-02-{:02}T20:00:00Z", day)),
                Some(&format!("2024-03-{:02}T12:00:00Z", day)),
                None,
            )
        })
        .collect()
}
