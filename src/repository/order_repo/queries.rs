use super::core::OrderRepository;
use crate::domain::order::{Order, StatusEvent};
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::collections::HashMap;

const ORDER_COLUMNS: &str = r#"
    order_id, created_at, status, updated_at,
    payment_date, delivery_date, completed_at
"#;

impl OrderRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 order_id 查询单个订单（含状态历史）
    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;

        let sql = format!("SELECT {} FROM orders WHERE order_id = ?1", ORDER_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let mut order = match stmt.query_row(params![order_id], map_order_row) {
            Ok(order) => order,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        order.status_history = load_history(&conn, order_id)?;
        Ok(Some(order))
    }

    /// 查询全部订单（含状态历史），按 order_id 升序
    pub fn find_all(&self) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;

        let sql = format!("SELECT {} FROM orders ORDER BY order_id", ORDER_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let mut orders = stmt
            .query_map([], map_order_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        // 一次性读取全部历史后按订单分组，避免 N+1 查询
        let mut history_stmt = conn.prepare(
            r#"
            SELECT order_id, status, event_ts, comment, synthetic
            FROM order_status_history
            ORDER BY order_id, seq_no
            "#,
        )?;
        let mut grouped: HashMap<String, Vec<StatusEvent>> = HashMap::new();
        let rows = history_stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, map_event_columns(row, 1)?))
        })?;
        for row in rows {
            let (order_id, event) = row?;
            grouped.entry(order_id).or_default().push(event);
        }

        for order in orders.iter_mut() {
            if let Some(history) = grouped.remove(&order.order_id) {
                order.status_history = history;
            }
        }

        Ok(orders)
    }

    /// keyset 分页查询（order_id > after），按 order_id 升序
    pub fn find_page(&self, after: Option<&str>, limit: usize) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;

        // 首页不带游标，空字符串 order_id 也要覆盖到
        let mut orders = match after {
            Some(after) => {
                let sql = format!(
                    "SELECT {} FROM orders WHERE order_id > ?1 ORDER BY order_id LIMIT ?2",
                    ORDER_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![after, limit as i64], map_order_row)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
            None => {
                let sql = format!("SELECT {} FROM orders ORDER BY order_id LIMIT ?1", ORDER_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![limit as i64], map_order_row)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
        };

        for order in orders.iter_mut() {
            order.status_history = load_history(&conn, &order.order_id)?;
        }

        Ok(orders)
    }

    /// 订单总数
    pub fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?;
        Ok(n.max(0) as usize)
    }
}

// ==========================================
// 行映射
// ==========================================

fn load_history(conn: &Connection, order_id: &str) -> RepositoryResult<Vec<StatusEvent>> {
    let mut stmt = conn.prepare_cached(
        r#"
        SELECT status, event_ts, comment, synthetic
        FROM order_status_history
        WHERE order_id = ?1
        ORDER BY seq_no
        "#,
    )?;

    let events = stmt
        .query_map(params![order_id], |row| map_event_columns(row, 0))?
        .collect::<SqliteResult<Vec<_>>>()?;
    Ok(events)
}

fn map_order_row(row: &Row) -> SqliteResult<Order> {
    Ok(Order {
        order_id: row.get(0)?,
        created_at: row.get(1)?,
        status: row.get(2)?,
        status_history: Vec::new(),
        updated_at: row.get(3)?,
        payment_date: row.get(4)?,
        delivery_date: row.get(5)?,
        completed_at: row.get(6)?,
    })
}

/// 从 offset 列开始映射 (status, event_ts, comment, synthetic)
fn map_event_columns(row: &Row, offset: usize) -> SqliteResult<StatusEvent> {
    let synthetic: i64 = row.get(offset + 3)?;
    Ok(StatusEvent {
        status: row.get(offset)?,
        timestamp: row.get(offset + 1)?,
        comment: row.get(offset + 2)?,
        synthetic: synthetic != 0,
    })
}
