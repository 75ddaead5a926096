use crate::domain::order::{Order, StatusEvent};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::order_store::{OrderHistoryStore, OrderReader};
use rusqlite::{params, Connection, Transaction};
use std::sync::{Arc, Mutex};

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    /// 创建新的订单仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 写入订单（存在则覆盖），连同状态历史
    pub fn upsert(&self, order: &Order) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        Self::upsert_in_tx(&tx, order)?;
        tx.commit()?;
        Ok(())
    }

    /// 批量写入订单
    pub fn batch_upsert(&self, orders: &[Order]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        for order in orders {
            Self::upsert_in_tx(&tx, order)?;
        }

        tx.commit()?;
        Ok(orders.len())
    }

    fn upsert_in_tx(tx: &Transaction, order: &Order) -> RepositoryResult<()> {
        tx.execute(
            r#"
            INSERT INTO orders (
                order_id, created_at, status, updated_at,
                payment_date, delivery_date, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(order_id) DO UPDATE SET
                created_at = ?2, status = ?3, updated_at = ?4,
                payment_date = ?5, delivery_date = ?6, completed_at = ?7
            "#,
            params![
                order.order_id,
                order.created_at,
                order.status,
                order.updated_at,
                order.payment_date,
                order.delivery_date,
                order.completed_at,
            ],
        )?;

        Self::replace_history_in_tx(tx, &order.order_id, &order.status_history)
    }

    /// 替换单个订单的状态历史（先删后插）
    pub(super) fn replace_history_in_tx(
        tx: &Transaction,
        order_id: &str,
        history: &[StatusEvent],
    ) -> RepositoryResult<()> {
        tx.execute(
            "DELETE FROM order_status_history WHERE order_id = ?1",
            params![order_id],
        )?;

        let mut stmt = tx.prepare(
            r#"
            INSERT INTO order_status_history (
                order_id, seq_no, status, event_ts, comment, synthetic
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )?;

        for (seq_no, event) in history.iter().enumerate() {
            stmt.execute(params![
                order_id,
                seq_no as i64,
                event.status,
                event.timestamp,
                event.comment,
                if event.synthetic { 1 } else { 0 },
            ])?;
        }

        Ok(())
    }
}

impl OrderReader for OrderRepository {
    fn list_all_orders(&self) -> RepositoryResult<Vec<Order>> {
        self.find_all()
    }
}

impl OrderHistoryStore for OrderRepository {
    fn list_orders_page(&self, after: Option<&str>, limit: usize) -> RepositoryResult<Vec<Order>> {
        self.find_page(after, limit)
    }

    fn save_status_history_batch(&self, batch: &[(String, Vec<StatusEvent>)]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        for (order_id, history) in batch {
            let exists: i64 = tx.query_row(
                "SELECT COUNT(*) FROM orders WHERE order_id = ?1",
                params![order_id],
                |row| row.get(0),
            )?;
            if exists == 0 {
                return Err(RepositoryError::NotFound {
                    entity: "Order".to_string(),
                    id: order_id.clone(),
                });
            }
            Self::replace_history_in_tx(&tx, order_id, history)?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(batch.len())
    }
}
