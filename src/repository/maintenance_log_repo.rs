// ==========================================
// 订单瓶颈分析系统 - 维护任务日志仓储
// ==========================================
// 表: maintenance_log
// 用途: 状态历史补全任务的持久化运行记录（开始/结束/批次数/失败原因）
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// 维护任务状态
pub mod job_status {
    pub const RUNNING: &str = "RUNNING";
    pub const SUCCESS: &str = "SUCCESS";
    pub const FAILED: &str = "FAILED";
}

/// 维护任务日志记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceLogEntry {
    pub job_id: String,
    pub job_type: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: String,
    pub batches_committed: usize,
    pub orders_scanned: usize,
    pub orders_updated: usize,
    pub message: Option<String>,
}

/// 任务结束时的统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobCounters {
    pub batches_committed: usize,
    pub orders_scanned: usize,
    pub orders_updated: usize,
}

// ==========================================
// MaintenanceLogRepository
// ==========================================
pub struct MaintenanceLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MaintenanceLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 记录任务开始
    pub fn log_start(&self, job_id: &str, job_type: &str, started_at: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO maintenance_log (job_id, job_type, started_at, status)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![job_id, job_type, started_at, job_status::RUNNING],
        )?;
        Ok(())
    }

    /// 记录任务结束（成功或失败）
    pub fn log_finish(
        &self,
        job_id: &str,
        status: &str,
        finished_at: &str,
        counters: JobCounters,
        message: Option<&str>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE maintenance_log
            SET finished_at = ?2,
                status = ?3,
                batches_committed = ?4,
                orders_scanned = ?5,
                orders_updated = ?6,
                message = ?7
            WHERE job_id = ?1
            "#,
            params![
                job_id,
                finished_at,
                status,
                counters.batches_committed as i64,
                counters.orders_scanned as i64,
                counters.orders_updated as i64,
                message,
            ],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "MaintenanceLog".to_string(),
                id: job_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn find_by_id(&self, job_id: &str) -> RepositoryResult<Option<MaintenanceLogEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT job_id, job_type, started_at, finished_at, status,
                   batches_committed, orders_scanned, orders_updated, message
            FROM maintenance_log
            WHERE job_id = ?1
            "#,
        )?;

        match stmt.query_row(params![job_id], map_row) {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 最近的任务记录（按开始时间倒序）
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<MaintenanceLogEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT job_id, job_type, started_at, finished_at, status,
                   batches_committed, orders_scanned, orders_updated, message
            FROM maintenance_log
            ORDER BY started_at DESC
            LIMIT ?1
            "#,
        )?;

        let entries = stmt
            .query_map(params![limit as i64], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

fn map_row(row: &Row) -> rusqlite::Result<MaintenanceLogEntry> {
    Ok(MaintenanceLogEntry {
        job_id: row.get(0)?,
        job_type: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        status: row.get(4)?,
        batches_committed: row.get::<_, i64>(5)?.max(0) as usize,
        orders_scanned: row.get::<_, i64>(6)?.max(0) as usize,
        orders_updated: row.get::<_, i64>(7)?.max(0) as usize,
        message: row.get(8)?,
    })
}
