// ==========================================
// 订单瓶颈分析系统 - 性能计时
// ==========================================
// 开关:
// - `ORDER_BOTTLENECK_SLOW_OP_MS=300` 配置慢操作阈值（毫秒）
// - 未配置时 Debug 200ms / Release 500ms
// ==========================================

use std::sync::OnceLock;
use std::time::Instant;

static SLOW_OP_THRESHOLD_MS: OnceLock<u64> = OnceLock::new();

fn slow_op_threshold_ms() -> u64 {
    *SLOW_OP_THRESHOLD_MS.get_or_init(|| {
        std::env::var("ORDER_BOTTLENECK_SLOW_OP_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(if cfg!(debug_assertions) { 200 } else { 500 })
    })
}

/// 性能统计 Guard：drop 时记录 elapsed_ms，超过阈值升级为 warn
///
/// 使用方式：
/// ```ignore
/// let _perf = order_bottleneck_analytics::perf::PerfGuard::new("analyze_bottlenecks");
/// // do work...
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    items: Option<usize>,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            start: Instant::now(),
            items: None,
        }
    }

    /// 记录本次处理的条目数（订单数等），随耗时一起输出
    pub fn set_items(&mut self, items: usize) {
        self.items = Some(items);
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed_ms();
        let items = self.items.unwrap_or(0);

        if elapsed_ms >= slow_op_threshold_ms() {
            tracing::warn!(target: "perf", op = self.op, elapsed_ms, items, "slow op");
        } else {
            tracing::info!(target: "perf", op = self.op, elapsed_ms, items, "done");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_tracks_items() {
        let mut guard = PerfGuard::new("unit");
        guard.set_items(42);
        assert_eq!(guard.items, Some(42));
        assert!(guard.elapsed_ms() < 60_000);
    }
}
