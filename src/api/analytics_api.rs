// ==========================================
// 订单瓶颈分析系统 - 分析 API
// ==========================================
// 职责:
// 1. analyzeBottlenecks: 只读瓶颈分析（永不失败）
// 2. enhanceOrdersWithStatusHistory: 状态历史补全维护任务
// 3. 热力图导出、维护记录查询
// ==========================================

use std::path::Path;
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::export::export_heat_map_csv;
use crate::config::AnalyticsSettings;
use crate::domain::analysis::AnalysisResult;
use crate::engine::analysis::AnalysisResultAssembler;
use crate::engine::backfill_job::{BackfillReport, StatusHistoryBackfillJob};
use crate::engine::request::{AnalysisRequest, RawAnalysisRequest};
use crate::repository::{
    CacheStats, CachedOrderReader, MaintenanceLogEntry, MaintenanceLogRepository, OrderReader,
    OrderRepository,
};
use chrono::Utc;

// ==========================================
// AnalyticsApi - 分析 API
// ==========================================
pub struct AnalyticsApi {
    order_repo: Arc<OrderRepository>,
    order_reader: CachedOrderReader<Arc<OrderRepository>>,
    maintenance_log_repo: Arc<MaintenanceLogRepository>,
    settings: AnalyticsSettings,
}

impl AnalyticsApi {
    /// 创建新的AnalyticsApi实例
    ///
    /// 读取路径自动套上有界缓存（容量与过期时间来自配置）
    pub fn new(
        order_repo: Arc<OrderRepository>,
        maintenance_log_repo: Arc<MaintenanceLogRepository>,
        settings: AnalyticsSettings,
    ) -> Self {
        let order_reader = CachedOrderReader::new(
            order_repo.clone(),
            settings.order_cache_capacity,
            settings.order_cache_ttl,
        );
        Self {
            order_repo,
            order_reader,
            maintenance_log_repo,
            settings,
        }
    }

    pub fn settings(&self) -> &AnalyticsSettings {
        &self.settings
    }

    /// 瓶颈分析
    ///
    /// # 参数
    /// - start_date / end_date: 任意日期字符串（缺失或无效时使用默认窗口）
    /// - resolution: hour / day / week（其他值回退为 day）
    ///
    /// # 返回
    /// 始终返回结果；内部失败时返回带 metadata.error 的空结果
    pub fn analyze_bottlenecks(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
        resolution: Option<&str>,
    ) -> AnalysisResult {
        self.analyze(&RawAnalysisRequest::new(start_date, end_date, resolution))
    }

    /// 区间终点锚定在当前时间（缺省或回退）的请求每次都不同，不走缓存
    pub fn analyze(&self, request: &RawAnalysisRequest) -> AnalysisResult {
        let now = Utc::now();
        let normalized =
            AnalysisRequest::normalize(request, now, self.settings.default_window_months);
        let reader: &dyn OrderReader = if normalized.end == now {
            self.order_repo.as_ref()
        } else {
            &self.order_reader
        };
        AnalysisResultAssembler::new(reader, &self.settings).analyze_at(request, now)
    }

    /// 状态历史补全
    ///
    /// 无论成功与否都清空读取缓存（失败前已提交的批次同样改变了数据）
    pub fn enhance_orders_with_status_history(&self) -> ApiResult<BackfillReport> {
        let job = StatusHistoryBackfillJob::new(
            self.order_repo.as_ref(),
            Some(self.maintenance_log_repo.as_ref()),
            &self.settings.stage_catalog,
            self.settings.backfill_batch_size,
        );
        let result = job.run();

        if let Err(e) = self.order_reader.invalidate() {
            tracing::warn!(error = %e, "订单缓存清空失败");
        }

        Ok(result?)
    }

    /// 分析并导出热力图 CSV
    ///
    /// # 返回
    /// - Ok((AnalysisResult, usize)): 分析结果 + 导出行数
    pub fn export_heat_map(
        &self,
        request: &RawAnalysisRequest,
        path: impl AsRef<Path>,
    ) -> ApiResult<(AnalysisResult, usize)> {
        let result = self.analyze(request);
        let rows = export_heat_map_csv(path, &result)?;
        Ok((result, rows))
    }

    /// 最近的维护任务记录
    pub fn list_maintenance_runs(&self, limit: usize) -> ApiResult<Vec<MaintenanceLogEntry>> {
        Ok(self.maintenance_log_repo.list_recent(limit)?)
    }

    pub fn cache_stats(&self) -> ApiResult<CacheStats> {
        Ok(self.order_reader.stats()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::domain::order::{Order, StatusEvent};
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn setup() -> (AnalyticsApi, Arc<OrderRepository>) {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));

        let order_repo = Arc::new(OrderRepository::new(conn.clone()));
        let log_repo = Arc::new(MaintenanceLogRepository::new(conn));
        let api = AnalyticsApi::new(order_repo.clone(), log_repo, AnalyticsSettings::default());
        (api, order_repo)
    }

    #[test]
    fn test_second_analysis_hits_cache() {
        let (api, repo) = setup();
        let mut order = Order::new("O-1", "2024-01-02T00:00:00Z", "Requests Sent");
        order.status_history = vec![
            StatusEvent::new("Initiated", "2024-01-02T00:00:00Z"),
            StatusEvent::new("Requests Sent", "2024-01-04T00:00:00Z"),
        ];
        repo.upsert(&order).unwrap();

        let first = api.analyze_bottlenecks(Some("2024-01-01"), Some("2024-01-31"), Some("day"));
        let second = api.analyze_bottlenecks(Some("2024-01-01"), Some("2024-01-31"), Some("day"));

        assert_eq!(first.stage_transitions, second.stage_transitions);
        let stats = api.cache_stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_enhance_invalidates_cache() {
        let (api, repo) = setup();
        let mut order = Order::new("O-1", "2024-01-02T00:00:00Z", "Paid");
        order.payment_date = Some("2024-01-05T00:00:00Z".to_string());
        repo.upsert(&order).unwrap();

        api.analyze_bottlenecks(Some("2024-01-01"), Some("2024-01-31"), None);
        assert_eq!(api.cache_stats().unwrap().entries, 1);

        let report = api.enhance_orders_with_status_history().unwrap();
        assert_eq!(report.orders_scanned, 1);
        assert_eq!(report.orders_updated, 1);
        assert_eq!(api.cache_stats().unwrap().entries, 0);

        let runs = api.list_maintenance_runs(10).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].job_id, report.job_id);
    }
}
