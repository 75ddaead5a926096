// ==========================================
// 订单瓶颈分析系统 - 分析配置快照
// ==========================================
// 职责: 一次性从 StagePolicyReader 读取配置，交给同步的分析引擎使用
// ==========================================

use crate::config::config_manager::{
    DEFAULT_BACKFILL_BATCH_SIZE, DEFAULT_ORDER_CACHE_CAPACITY, DEFAULT_ORDER_CACHE_TTL_SECONDS,
    DEFAULT_WINDOW_MONTHS,
};
use crate::config::stage_policy_reader::StagePolicyReader;
use crate::domain::stage::StageCatalog;
use std::error::Error;
use std::time::Duration;

/// 分析配置快照
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSettings {
    pub stage_catalog: StageCatalog,
    pub default_window_months: u32,
    pub backfill_batch_size: usize,
    pub order_cache_capacity: usize,
    pub order_cache_ttl: Duration,
}

impl AnalyticsSettings {
    /// 从配置读取器加载
    pub async fn load(reader: &dyn StagePolicyReader) -> Result<Self, Box<dyn Error>> {
        let settings = Self {
            stage_catalog: reader.get_stage_catalog().await?,
            default_window_months: reader.get_default_window_months().await?,
            backfill_batch_size: reader.get_backfill_batch_size().await?,
            order_cache_capacity: reader.get_order_cache_capacity().await?,
            order_cache_ttl: Duration::from_secs(reader.get_order_cache_ttl_seconds().await?),
        };

        tracing::info!(
            stages = settings.stage_catalog.len(),
            default_window_months = settings.default_window_months,
            backfill_batch_size = settings.backfill_batch_size,
            "分析配置已加载"
        );
        Ok(settings)
    }
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            stage_catalog: StageCatalog::canonical(),
            default_window_months: DEFAULT_WINDOW_MONTHS,
            backfill_batch_size: DEFAULT_BACKFILL_BATCH_SIZE,
            order_cache_capacity: DEFAULT_ORDER_CACHE_CAPACITY,
            order_cache_ttl: Duration::from_secs(DEFAULT_ORDER_CACHE_TTL_SECONDS),
        }
    }
}
