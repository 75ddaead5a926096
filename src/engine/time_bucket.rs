// ==========================================
// 订单瓶颈分析系统 - 时间分桶
// ==========================================
// 职责: 把分析区间切成与粒度匹配、数量有上限的时间桶
// 规则:
// 1. hour 超过 366 桶降级为 day；day 超过 366 桶降级为 week
// 2. 降级后仍超过 366 桶: 起点前移，只保留以 end 结尾的最近 366 桶
//    （只影响热力图，瓶颈评分仍使用完整区间）
// 3. 桶 key 可按字典序排序: hour → YYYY-MM-DD-HH, day → YYYY-MM-DD, week → 周一 YYYY-MM-DD
// 4. 生成循环以 366 为安全计数，保证终止；时间运算溢出时提前结束
// 调用方负责保证 start <= end（见 request 模块）
// ==========================================

use crate::domain::analysis::TimeBucket;
use crate::domain::types::{Resolution, MAX_TIME_BUCKETS};
use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};

/// 分桶方案
#[derive(Debug, Clone, PartialEq)]
pub struct BucketPlan {
    pub requested: Resolution,
    /// 降级后的实际粒度
    pub resolution: Resolution,
    /// 首个桶起点（截断后）
    pub start: DateTime<Utc>,
    pub buckets: Vec<TimeBucket>,
    /// 是否因超出上限而丢弃了较早的桶
    pub truncated: bool,
}

impl BucketPlan {
    pub fn downgraded(&self) -> bool {
        self.requested != self.resolution
    }
}

/// 一个桶的时长
pub fn bucket_step(resolution: Resolution) -> Duration {
    match resolution {
        Resolution::Hour => Duration::hours(1),
        Resolution::Day => Duration::days(1),
        Resolution::Week => Duration::weeks(1),
    }
}

/// 向下取整到桶起点（week 取所在周的周一 00:00）
pub fn floor_to_bucket(ts: DateTime<Utc>, resolution: Resolution) -> DateTime<Utc> {
    let date = ts.date_naive();
    let midnight = |d: chrono::NaiveDate| Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).unwrap_or_default());

    match resolution {
        Resolution::Hour => {
            let hour = date.and_hms_opt(ts.hour(), 0, 0).unwrap_or_default();
            Utc.from_utc_datetime(&hour)
        }
        Resolution::Day => midnight(date),
        Resolution::Week => {
            let offset = date.weekday().num_days_from_monday() as i64;
            midnight(date.checked_sub_signed(Duration::days(offset)).unwrap_or(date))
        }
    }
}

/// 桶 key（与 TimeBucketer 同一规则，热力图聚合复用）
pub fn bucket_key(ts: DateTime<Utc>, resolution: Resolution) -> String {
    let start = floor_to_bucket(ts, resolution);
    match resolution {
        Resolution::Hour => start.format("%Y-%m-%d-%H").to_string(),
        Resolution::Day | Resolution::Week => start.format("%Y-%m-%d").to_string(),
    }
}

/// 桶标签（桶起点的可读形式）
pub fn bucket_label(start: DateTime<Utc>, resolution: Resolution) -> String {
    match resolution {
        Resolution::Hour => start.format("%b %d, %H:00").to_string(),
        Resolution::Day => start.format("%b %d, %Y").to_string(),
        Resolution::Week => format!("Week of {}", start.format("%b %d, %Y")),
    }
}

/// [start, end] 区间在该粒度下的桶数（含两端）
pub fn bucket_count(start: DateTime<Utc>, end: DateTime<Utc>, resolution: Resolution) -> i64 {
    let first = floor_to_bucket(start, resolution);
    let last = floor_to_bucket(end, resolution);
    if last < first {
        return 0;
    }
    let step_ms = bucket_step(resolution).num_milliseconds();
    (last - first).num_milliseconds() / step_ms + 1
}

// ==========================================
// TimeBucketer
// ==========================================
pub struct TimeBucketer;

impl TimeBucketer {
    /// 生成分桶方案
    pub fn plan(start: DateTime<Utc>, end: DateTime<Utc>, requested: Resolution) -> BucketPlan {
        let cap = MAX_TIME_BUCKETS as i64;

        // 1. 逐级降级
        let mut resolution = requested;
        while bucket_count(start, end, resolution) > cap {
            match resolution.coarser() {
                Some(coarser) => resolution = coarser,
                None => break,
            }
        }

        // 2. 仍超上限则截断较早的桶
        let step = bucket_step(resolution);
        let last = floor_to_bucket(end, resolution);
        let mut first = floor_to_bucket(start, resolution);
        let truncated = bucket_count(start, end, resolution) > cap;
        if truncated {
            if let Some(earliest) = last.checked_sub_signed(step * (MAX_TIME_BUCKETS as i32 - 1)) {
                first = earliest;
            }
        }

        if resolution != requested || truncated {
            tracing::debug!(
                requested = %requested,
                effective = %resolution,
                truncated,
                "时间桶粒度调整"
            );
        }

        // 3. 生成（安全计数 = 上限）
        let mut buckets = Vec::new();
        let mut cursor = first;
        for _ in 0..MAX_TIME_BUCKETS {
            if cursor > last {
                break;
            }
            buckets.push(TimeBucket {
                key: bucket_key(cursor, resolution),
                label: bucket_label(cursor, resolution),
            });
            cursor = match cursor.checked_add_signed(step) {
                Some(next) => next,
                None => break,
            };
        }

        BucketPlan {
            requested,
            resolution,
            start: first,
            buckets,
            truncated,
        }
    }
}
