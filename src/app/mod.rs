// ==========================================
// 订单瓶颈分析系统 - 应用层
// ==========================================
// 职责: 组装数据库连接、配置、仓储与 API，供 CLI 使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
