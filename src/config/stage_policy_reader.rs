// ==========================================
// 订单瓶颈分析系统 - 阶段策略配置读取 Trait
// ==========================================
// 职责: 定义分析引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::stage::StageCatalog;
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// StagePolicyReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait StagePolicyReader: Send + Sync {
    // ===== 阶段策略 =====

    /// 获取阶段表（阶段链 + 期望耗时）
    ///
    /// # 默认值
    /// - 规范 9 阶段表（Initiated → ... → Completed）
    async fn get_stage_catalog(&self) -> Result<StageCatalog, Box<dyn Error>>;

    // ===== 请求回退 =====

    /// 日期参数无效时默认分析窗口的月数
    ///
    /// # 默认值
    /// - 3
    async fn get_default_window_months(&self) -> Result<u32, Box<dyn Error>>;

    // ===== 补全任务 =====

    /// 状态历史补全每批订单数
    ///
    /// # 默认值
    /// - 100
    async fn get_backfill_batch_size(&self) -> Result<usize, Box<dyn Error>>;

    // ===== 订单缓存 =====

    /// 缓存的区间查询数上限
    ///
    /// # 默认值
    /// - 16
    async fn get_order_cache_capacity(&self) -> Result<usize, Box<dyn Error>>;

    /// 缓存条目过期秒数
    ///
    /// # 默认值
    /// - 300
    async fn get_order_cache_ttl_seconds(&self) -> Result<u64, Box<dyn Error>>;
}
