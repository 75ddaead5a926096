// ==========================================
// 订单瓶颈分析系统 - 分析结果组装
// ==========================================
// 流水线（单次请求、无跨请求状态）:
//   校验/归一化 → 读取订单（内存中补全，不回写） → 提取转换
//   → { 评分, 分桶 → 热力图 } → 组装 → 返回
// 红线: 对外入口绝不返回错误；内部失败记录日志并返回规范空结果
// ==========================================

use crate::config::AnalyticsSettings;
use crate::domain::analysis::{AnalysisMetadata, AnalysisResult, TimeSeriesData};
use crate::domain::order::Order;
use crate::domain::stage::StageCatalog;
use crate::domain::timestamp::format_timestamp;
use crate::engine::backfill::StatusHistoryBackfill;
use crate::engine::error::AnalysisError;
use crate::engine::heatmap::HeatMapAggregator;
use crate::engine::request::{AnalysisRequest, RawAnalysisRequest};
use crate::engine::scoring::BottleneckScorer;
use crate::engine::time_bucket::TimeBucketer;
use crate::engine::transition::StageTransitionExtractor;
use crate::perf::PerfGuard;
use crate::repository::OrderReader;
use chrono::{DateTime, Utc};
use tracing::instrument;

// ==========================================
// AnalysisResultAssembler
// ==========================================
pub struct AnalysisResultAssembler<'a> {
    reader: &'a dyn OrderReader,
    settings: &'a AnalyticsSettings,
}

impl<'a> AnalysisResultAssembler<'a> {
    /// # 参数
    /// - reader: 只读订单访问（可为带缓存的装饰器）
    /// - settings: 阶段表 + 默认窗口等配置快照
    pub fn new(reader: &'a dyn OrderReader, settings: &'a AnalyticsSettings) -> Self {
        Self { reader, settings }
    }

    /// 分析入口（永不失败）
    pub fn analyze(&self, raw: &RawAnalysisRequest) -> AnalysisResult {
        self.analyze_at(raw, Utc::now())
    }

    /// 指定“当前时间”的分析入口（默认窗口基于 now 计算）
    #[instrument(skip(self, raw), fields(resolution = ?raw.resolution))]
    pub fn analyze_at(&self, raw: &RawAnalysisRequest, now: DateTime<Utc>) -> AnalysisResult {
        let request = AnalysisRequest::normalize(raw, now, self.settings.default_window_months);

        match self.run(&request, now) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    start = %request.start_str(),
                    end = %request.end_str(),
                    error = %e,
                    "瓶颈分析失败，返回空结果"
                );
                AnalysisResult::empty_with_error(
                    request.start_str(),
                    request.end_str(),
                    request.resolution,
                    e.to_string(),
                )
            }
        }
    }

    /// 执行流水线（内部使用，错误由 analyze_at 统一兜底）
    pub fn run(&self, request: &AnalysisRequest, now: DateTime<Utc>) -> Result<AnalysisResult, AnalysisError> {
        let catalog = &self.settings.stage_catalog;
        catalog.validate().map_err(AnalysisError::InvalidStageCatalog)?;

        let mut perf = PerfGuard::new("analyze_bottlenecks");
        let orders = self.reader.list_orders_in_range(request.start, request.end)?;
        perf.set_items(orders.len());

        Ok(assemble(&orders, request, catalog, now))
    }
}

/// 纯计算部分: 订单 → 分析结果
pub fn assemble(
    orders: &[Order],
    request: &AnalysisRequest,
    catalog: &StageCatalog,
    now: DateTime<Utc>,
) -> AnalysisResult {
    let backfill = StatusHistoryBackfill::new(catalog);
    let extractor = StageTransitionExtractor::new(catalog);
    let mut scorer = BottleneckScorer::new(catalog);

    let mut stage_transitions = Vec::new();
    let mut orders_with_transitions = 0usize;
    let mut skipped_events = 0usize;

    for order in orders {
        let prepared = backfill.backfill(order);
        skipped_events += prepared.dropped_events;

        let outcome = extractor.extract(&prepared.order);
        skipped_events += outcome.skipped_pairs;

        if outcome.transitions.is_empty() {
            continue;
        }
        orders_with_transitions += 1;
        scorer.record_all(&outcome.transitions);
        stage_transitions.extend(outcome.transitions);
    }

    let summary = scorer.finish();
    let plan = TimeBucketer::plan(request.start, request.end, request.resolution);
    let (grid, _) = HeatMapAggregator::aggregate(catalog, &summary.delay_entries, &plan);

    let synthetic_transitions = stage_transitions.iter().filter(|t| t.synthetic).count();

    tracing::info!(
        total_orders = orders.len(),
        orders_with_transitions,
        transitions = stage_transitions.len(),
        buckets = plan.buckets.len(),
        effective_resolution = %plan.resolution,
        "瓶颈分析完成"
    );

    AnalysisResult {
        bottleneck_scores: summary.scores,
        sorted_bottlenecks: summary.sorted,
        average_delays: summary.average_delays,
        stage_transitions,
        metadata: AnalysisMetadata {
            analysis_start_date: request.start_str(),
            analysis_end_date: request.end_str(),
            resolution: request.resolution,
            total_orders_analyzed: orders.len(),
            orders_with_transitions,
            synthetic_transitions,
            skipped_events,
            effective_resolution: plan.resolution,
            heat_map_start_date: Some(format_timestamp(&plan.start)),
            heat_map_truncated: plan.truncated,
            generated_at: format_timestamp(&now),
            error: false,
            message: None,
        },
        time_series_data: TimeSeriesData {
            time_buckets: plan.buckets,
            data: grid,
        },
    }
}
