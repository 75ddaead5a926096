// ==========================================
// 订单瓶颈分析系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供订单读取/状态历史回写/维护日志接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod maintenance_log_repo;
pub mod order_cache;
pub mod order_repo;
pub mod order_store;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use maintenance_log_repo::{JobCounters, MaintenanceLogEntry, MaintenanceLogRepository};
pub use order_cache::{CacheStats, CachedOrderReader};
pub use order_repo::OrderRepository;
pub use order_store::{OrderHistoryStore, OrderReader};
