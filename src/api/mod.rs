// ==========================================
// 订单瓶颈分析系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供 CLI 调用
// ==========================================

pub mod analytics_api;
pub mod error;
pub mod export;

// 重导出核心类型
pub use analytics_api::AnalyticsApi;
pub use error::{ApiError, ApiResult};
pub use export::{export_heat_map_csv, write_heat_map_csv};
