// ==========================================
// 订单瓶颈分析系统 - 订单存储接口
// ==========================================
// 分析核心只依赖只读的 OrderReader
// 状态历史补全任务额外依赖 OrderHistoryStore（分页读取 + 批量回写）
// ==========================================

use crate::domain::order::{Order, StatusEvent};
use crate::repository::error::RepositoryResult;
use chrono::{DateTime, Utc};

/// 只读订单访问
pub trait OrderReader: Send + Sync {
    /// 读取全部订单（含状态历史）
    fn list_all_orders(&self) -> RepositoryResult<Vec<Order>>;

    /// 读取落在 [start, end] 区间内的订单
    ///
    /// 默认实现: 全量读取后按 `Order::falls_within` 过滤
    fn list_orders_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Order>> {
        Ok(self
            .list_all_orders()?
            .into_iter()
            .filter(|order| order.falls_within(&start, &end))
            .collect())
    }
}

/// 状态历史批量维护
pub trait OrderHistoryStore: Send + Sync {
    /// 按 order_id 升序分页读取（keyset 分页: order_id > after）
    fn list_orders_page(&self, after: Option<&str>, limit: usize) -> RepositoryResult<Vec<Order>>;

    /// 在单个事务内替换一批订单的状态历史
    ///
    /// 返回写入的订单数；失败时本批全部回滚，不影响之前已提交的批次
    fn save_status_history_batch(&self, batch: &[(String, Vec<StatusEvent>)]) -> RepositoryResult<usize>;
}

impl<T: OrderReader + ?Sized> OrderReader for std::sync::Arc<T> {
    fn list_all_orders(&self) -> RepositoryResult<Vec<Order>> {
        (**self).list_all_orders()
    }

    fn list_orders_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Order>> {
        (**self).list_orders_in_range(start, end)
    }
}

impl<T: OrderHistoryStore + ?Sized> OrderHistoryStore for std::sync::Arc<T> {
    fn list_orders_page(&self, after: Option<&str>, limit: usize) -> RepositoryResult<Vec<Order>> {
        (**self).list_orders_page(after, limit)
    }

    fn save_status_history_batch(&self, batch: &[(String, Vec<StatusEvent>)]) -> RepositoryResult<usize> {
        (**self).save_status_history_batch(batch)
    }
}
