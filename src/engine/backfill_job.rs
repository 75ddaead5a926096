// ==========================================
// 订单瓶颈分析系统 - 状态历史补全维护任务
// ==========================================
// 职责: 对订单库批量执行补全并回写（enhanceOrdersWithStatusHistory）
// 约束:
// - 按批分页读取 + 按批事务写入，峰值内存受批大小限制
// - 每批独立提交；中途失败不回滚已提交批次，但任务整体报告失败
// - 幂等: 已补全的订单不会再次写入
// - 运行记录写入 maintenance_log 表
// ==========================================

use crate::domain::stage::StageCatalog;
use crate::domain::timestamp::format_timestamp;
use crate::engine::backfill::StatusHistoryBackfill;
use crate::repository::maintenance_log_repo::{job_status, JobCounters, MaintenanceLogRepository};
use crate::repository::{OrderHistoryStore, RepositoryError};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

/// 维护任务类型
pub const BACKFILL_JOB_TYPE: &str = "STATUS_HISTORY_BACKFILL";

/// 补全任务报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    pub job_id: String,
    pub orders_scanned: usize,
    pub orders_updated: usize,
    pub batches_committed: usize,
}

/// 补全任务错误
#[derive(Error, Debug)]
pub enum BackfillError {
    #[error("读取第 {batch_index} 批订单失败 (已提交 {batches_committed} 批): {source}")]
    ReadFailed {
        batch_index: usize,
        batches_committed: usize,
        #[source]
        source: RepositoryError,
    },

    #[error("写入第 {batch_index} 批状态历史失败 (已提交 {batches_committed} 批): {source}")]
    WriteFailed {
        batch_index: usize,
        batches_committed: usize,
        #[source]
        source: RepositoryError,
    },
}

impl BackfillError {
    /// 失败前已提交的批次数
    pub fn batches_committed(&self) -> usize {
        match self {
            BackfillError::ReadFailed { batches_committed, .. } => *batches_committed,
            BackfillError::WriteFailed { batches_committed, .. } => *batches_committed,
        }
    }
}

// ==========================================
// StatusHistoryBackfillJob
// ==========================================
pub struct StatusHistoryBackfillJob<'a> {
    store: &'a dyn OrderHistoryStore,
    log_repo: Option<&'a MaintenanceLogRepository>,
    backfill: StatusHistoryBackfill,
    batch_size: usize,
}

impl<'a> StatusHistoryBackfillJob<'a> {
    /// 创建补全任务
    ///
    /// # 参数
    /// - store: 订单存储（分页读取 + 批量回写）
    /// - log_repo: 维护日志仓储（None 时只写 tracing 日志）
    /// - catalog: 阶段表（决定创建时刻对应的首阶段）
    /// - batch_size: 每批订单数（0 视为 1）
    pub fn new(
        store: &'a dyn OrderHistoryStore,
        log_repo: Option<&'a MaintenanceLogRepository>,
        catalog: &StageCatalog,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            log_repo,
            backfill: StatusHistoryBackfill::new(catalog),
            batch_size: batch_size.max(1),
        }
    }

    /// 执行补全
    #[instrument(skip(self), fields(batch_size = self.batch_size))]
    pub fn run(&self) -> Result<BackfillReport, BackfillError> {
        let job_id = uuid::Uuid::new_v4().to_string();
        self.log_start(&job_id);

        let mut counters = JobCounters::default();
        let result = self.process_batches(&mut counters);

        match &result {
            Ok(()) => {
                tracing::info!(
                    job_id = %job_id,
                    orders_scanned = counters.orders_scanned,
                    orders_updated = counters.orders_updated,
                    batches_committed = counters.batches_committed,
                    "状态历史补全完成"
                );
                self.log_finish(&job_id, job_status::SUCCESS, counters, None);
            }
            Err(e) => {
                tracing::error!(
                    job_id = %job_id,
                    batches_committed = counters.batches_committed,
                    error = %e,
                    "状态历史补全失败"
                );
                self.log_finish(&job_id, job_status::FAILED, counters, Some(&e.to_string()));
            }
        }

        result.map(|()| BackfillReport {
            job_id,
            orders_scanned: counters.orders_scanned,
            orders_updated: counters.orders_updated,
            batches_committed: counters.batches_committed,
        })
    }

    fn process_batches(&self, counters: &mut JobCounters) -> Result<(), BackfillError> {
        let mut after: Option<String> = None;
        let mut batch_index = 0usize;

        loop {
            batch_index += 1;
            let page = self
                .store
                .list_orders_page(after.as_deref(), self.batch_size)
                .map_err(|source| BackfillError::ReadFailed {
                    batch_index,
                    batches_committed: counters.batches_committed,
                    source,
                })?;

            let last_id = match page.last() {
                Some(order) => order.order_id.clone(),
                None => break,
            };
            counters.orders_scanned += page.len();

            let changes: Vec<_> = page
                .iter()
                .map(|order| self.backfill.backfill(order))
                .filter(|outcome| outcome.is_changed())
                .map(|outcome| (outcome.order.order_id, outcome.order.status_history))
                .collect();

            if !changes.is_empty() {
                let written = self
                    .store
                    .save_status_history_batch(&changes)
                    .map_err(|source| BackfillError::WriteFailed {
                        batch_index,
                        batches_committed: counters.batches_committed,
                        source,
                    })?;
                counters.orders_updated += written;
                counters.batches_committed += 1;
            }

            tracing::debug!(
                batch_index,
                scanned = page.len(),
                updated = changes.len(),
                "补全批次处理完成"
            );

            if page.len() < self.batch_size {
                break;
            }
            after = Some(last_id);
        }

        Ok(())
    }

    // 维护日志写入失败不影响任务本身
    fn log_start(&self, job_id: &str) {
        if let Some(repo) = self.log_repo {
            let started_at = format_timestamp(&Utc::now());
            if let Err(e) = repo.log_start(job_id, BACKFILL_JOB_TYPE, &started_at) {
                tracing::warn!(job_id, error = %e, "维护日志写入失败");
            }
        }
    }

    fn log_finish(&self, job_id: &str, status: &str, counters: JobCounters, message: Option<&str>) {
        if let Some(repo) = self.log_repo {
            let finished_at = format_timestamp(&Utc::now());
            if let Err(e) = repo.log_finish(job_id, status, &finished_at, counters, message) {
                tracing::warn!(job_id, error = %e, "维护日志写入失败");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Order, StatusEvent};
    use crate::repository::RepositoryResult;
    use std::sync::Mutex;

    /// 内存订单存储，可在第 N 次写入时注入失败
    struct MemoryStore {
        orders: Mutex<Vec<Order>>,
        fail_on_write: Option<usize>,
        writes: Mutex<usize>,
    }

    impl MemoryStore {
        fn new(orders: Vec<Order>, fail_on_write: Option<usize>) -> Self {
            let mut orders = orders;
            orders.sort_by(|a, b| a.order_id.cmp(&b.order_id));
            Self {
                orders: Mutex::new(orders),
                fail_on_write,
                writes: Mutex::new(0),
            }
        }

        fn snapshot(&self) -> Vec<Order> {
            self.orders.lock().unwrap().clone()
        }
    }

    impl OrderHistoryStore for MemoryStore {
        fn list_orders_page(&self, after: Option<&str>, limit: usize) -> RepositoryResult<Vec<Order>> {
            let orders = self.orders.lock().unwrap();
            Ok(orders
                .iter()
                .filter(|o| after.map_or(true, |a| o.order_id.as_str() > a))
                .take(limit)
                .cloned()
                .collect())
        }

        fn save_status_history_batch(&self, batch: &[(String, Vec<StatusEvent>)]) -> RepositoryResult<usize> {
            let mut writes = self.writes.lock().unwrap();
            *writes += 1;
            if self.fail_on_write == Some(*writes) {
                return Err(RepositoryError::DatabaseTransactionError("disk full".to_string()));
            }
            let mut orders = self.orders.lock().unwrap();
            for (order_id, history) in batch {
                if let Some(order) = orders.iter_mut().find(|o| &o.order_id == order_id) {
                    order.status_history = history.clone();
                }
            }
            Ok(batch.len())
        }
    }

    fn bare_orders(n: usize) -> Vec<Order> {
        (1..=n)
            .map(|i| Order::new(format!("O-{:03}", i), "2024-01-01T00:00:00Z", "Initiated"))
            .collect()
    }

    #[test]
    fn test_run_in_batches() {
        let store = MemoryStore::new(bare_orders(5), None);
        let job = StatusHistoryBackfillJob::new(&store, None, &StageCatalog::canonical(), 2);

        let report = job.run().unwrap();
        assert_eq!(report.orders_scanned, 5);
        assert_eq!(report.orders_updated, 5);
        assert_eq!(report.batches_committed, 3);
        assert!(store.snapshot().iter().all(|o| o.status_history.len() == 1));
    }

    #[test]
    fn test_second_run_writes_nothing() {
        let store = MemoryStore::new(bare_orders(3), None);
        let catalog = StageCatalog::canonical();

        StatusHistoryBackfillJob::new(&store, None, &catalog, 10).run().unwrap();
        let first = store.snapshot();

        let report = StatusHistoryBackfillJob::new(&store, None, &catalog, 10).run().unwrap();
        assert_eq!(report.orders_updated, 0);
        assert_eq!(report.batches_committed, 0);
        assert_eq!(store.snapshot(), first);
    }

    #[test]
    fn test_failure_keeps_committed_batches() {
        let store = MemoryStore::new(bare_orders(6), Some(2));
        let job = StatusHistoryBackfillJob::new(&store, None, &StageCatalog::canonical(), 2);

        let err = job.run().unwrap_err();
        assert!(matches!(err, BackfillError::WriteFailed { batch_index: 2, .. }));
        assert_eq!(err.batches_committed(), 1);

        let orders = store.snapshot();
        assert_eq!(orders[0].status_history.len(), 1);
        assert_eq!(orders[1].status_history.len(), 1);
        assert!(orders[2].status_history.is_empty());
        assert!(orders[5].status_history.is_empty());
    }
}
