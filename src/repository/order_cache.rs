// ==========================================
// 订单瓶颈分析系统 - 订单读取缓存
// ==========================================
// 职责: 在任意 OrderReader 之上提供有界、带过期时间的区间查询缓存
// 约束: 容量达到上限时淘汰最早写入的条目；补全任务写库后必须 invalidate
// ==========================================

use crate::domain::order::Order;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::order_store::OrderReader;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// 缓存键: (区间起点毫秒, 区间终点毫秒)；None 表示全量读取
type CacheKey = Option<(i64, i64)>;

struct CacheEntry {
    orders: Arc<Vec<Order>>,
    inserted_at: Instant,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    insertion_order: VecDeque<CacheKey>,
    hits: u64,
    misses: u64,
}

/// 缓存命中统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

// ==========================================
// CachedOrderReader - 有界缓存装饰器
// ==========================================
pub struct CachedOrderReader<R: OrderReader> {
    inner: R,
    capacity: usize,
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl<R: OrderReader> CachedOrderReader<R> {
    /// 创建缓存装饰器
    ///
    /// # 参数
    /// - inner: 被装饰的订单读取器
    /// - capacity: 最多缓存的区间查询数（0 视为 1）
    /// - ttl: 条目过期时间
    pub fn new(inner: R, capacity: usize, ttl: Duration) -> Self {
        Self {
            inner,
            capacity: capacity.max(1),
            ttl,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// 清空全部缓存（订单数据写入后调用）
    pub fn invalidate(&self) -> RepositoryResult<()> {
        let mut state = self.lock_state()?;
        let dropped = state.entries.len();
        state.entries.clear();
        state.insertion_order.clear();
        tracing::debug!(dropped, "订单缓存已清空");
        Ok(())
    }

    pub fn stats(&self) -> RepositoryResult<CacheStats> {
        let state = self.lock_state()?;
        Ok(CacheStats {
            entries: state.entries.len(),
            hits: state.hits,
            misses: state.misses,
        })
    }

    fn lock_state(&self) -> RepositoryResult<std::sync::MutexGuard<'_, CacheState>> {
        self.state
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn get_or_load<F>(&self, key: CacheKey, load: F) -> RepositoryResult<Vec<Order>>
    where
        F: FnOnce(&R) -> RepositoryResult<Vec<Order>>,
    {
        {
            let mut state = self.lock_state()?;
            let fresh = state
                .entries
                .get(&key)
                .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
                .map(|entry| entry.orders.clone());

            match fresh {
                Some(orders) => {
                    state.hits += 1;
                    return Ok(orders.as_ref().clone());
                }
                None => {
                    state.misses += 1;
                    if state.entries.remove(&key).is_some() {
                        state.insertion_order.retain(|k| *k != key);
                    }
                }
            }
        }

        // 读库期间不持有缓存锁
        let orders = Arc::new(load(&self.inner)?);

        let mut state = self.lock_state()?;
        while state.entries.len() >= self.capacity {
            match state.insertion_order.pop_front() {
                Some(oldest) => {
                    state.entries.remove(&oldest);
                }
                None => break,
            }
        }
        if state.entries.contains_key(&key) {
            state.insertion_order.retain(|k| *k != key);
        }
        state.entries.insert(
            key,
            CacheEntry {
                orders: orders.clone(),
                inserted_at: Instant::now(),
            },
        );
        state.insertion_order.push_back(key);

        Ok(orders.as_ref().clone())
    }
}

impl<R: OrderReader> OrderReader for CachedOrderReader<R> {
    fn list_all_orders(&self) -> RepositoryResult<Vec<Order>> {
        self.get_or_load(None, |inner| inner.list_all_orders())
    }

    fn list_orders_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Order>> {
        let key = Some((start.timestamp_millis(), end.timestamp_millis()));
        self.get_or_load(key, |inner| inner.list_orders_in_range(start, end))
    }
}
