// ==========================================
// 订单瓶颈分析系统 - 配置层
// ==========================================
// 职责: 阶段策略与分析参数配置（可注入，改策略无需重新发布引擎）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod settings;
pub mod stage_policy_reader;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use settings::AnalyticsSettings;
pub use stage_policy_reader::StagePolicyReader;
