// ==========================================
// 订单瓶颈分析系统 - 热力图聚合
// ==========================================
// 职责: 把各阶段延迟记录投影到时间桶上，计算归一化强度
// 规则:
// - 每个 (阶段, 桶) 先初始化为零单元格
// - 延迟记录按与分桶相同的规则算 key，命中则累加 count/totalDelay，
//   落在（可能被截断的）桶范围外则丢弃
// - 每个阶段单独归一化: intensity = 单元格平均延迟 / 该阶段最大平均延迟
// ==========================================

use crate::domain::analysis::{HeatMapCell, HeatMapGrid};
use crate::domain::stage::StageCatalog;
use crate::engine::scoring::DelayEntriesByStage;
use crate::engine::time_bucket::{bucket_key, BucketPlan};
use std::collections::BTreeMap;

/// 聚合统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeatMapStats {
    pub placed: usize,
    /// 超出桶范围而丢弃的记录数
    pub dropped: usize,
}

// ==========================================
// HeatMapAggregator
// ==========================================
pub struct HeatMapAggregator;

impl HeatMapAggregator {
    /// 聚合热力图
    ///
    /// # 参数
    /// - catalog: 阶段表（决定网格的行）
    /// - delays: 阶段 → 延迟记录
    /// - plan: 分桶方案（已降级/截断）
    pub fn aggregate(
        catalog: &StageCatalog,
        delays: &DelayEntriesByStage,
        plan: &BucketPlan,
    ) -> (HeatMapGrid, HeatMapStats) {
        let mut grid: HeatMapGrid = catalog
            .stage_names()
            .map(|stage| {
                let row: BTreeMap<String, HeatMapCell> = plan
                    .buckets
                    .iter()
                    .map(|bucket| (bucket.key.clone(), HeatMapCell::default()))
                    .collect();
                (stage.to_string(), row)
            })
            .collect();

        let mut stats = HeatMapStats::default();

        for (stage, entries) in delays {
            let row = match grid.get_mut(stage) {
                Some(row) => row,
                None => {
                    stats.dropped += entries.len();
                    continue;
                }
            };

            for entry in entries {
                let key = bucket_key(entry.timestamp, plan.resolution);
                match row.get_mut(&key) {
                    Some(cell) => {
                        cell.count += 1;
                        cell.total_delay += entry.delay;
                        stats.placed += 1;
                    }
                    None => stats.dropped += 1,
                }
            }
        }

        for row in grid.values_mut() {
            normalize_row(row);
        }

        if stats.dropped > 0 {
            tracing::debug!(
                placed = stats.placed,
                dropped = stats.dropped,
                "部分延迟记录落在热力图范围外"
            );
        }

        (grid, stats)
    }
}

/// 单个阶段行内归一化
fn normalize_row(row: &mut BTreeMap<String, HeatMapCell>) {
    let max_avg_delay = row
        .values()
        .map(HeatMapCell::avg_delay)
        .fold(0.0_f64, f64::max);

    for cell in row.values_mut() {
        cell.intensity = if max_avg_delay > 0.0 && cell.count > 0 {
            (cell.avg_delay() / max_avg_delay).clamp(0.0, 1.0)
        } else {
            0.0
        };
    }
}
