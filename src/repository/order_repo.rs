// ==========================================
// 订单瓶颈分析系统 - 订单数据仓储 (SQLite)
// ==========================================
// 表: orders + order_status_history
// 红线: Repository 不含业务逻辑,只做数据映射
// ==========================================

mod core;
mod queries;


pub use self::core::OrderRepository;
