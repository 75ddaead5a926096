// ==========================================
// 订单瓶颈分析系统 - 热力图 CSV 导出
// ==========================================
// 列: stage,bucket_key,bucket_label,count,total_delay,avg_delay,intensity
// 行序: 阶段名升序，同一阶段内按时间桶先后
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::analysis::AnalysisResult;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
struct HeatMapRow<'a> {
    stage: &'a str,
    bucket_key: &'a str,
    bucket_label: &'a str,
    count: u32,
    total_delay: f64,
    avg_delay: f64,
    intensity: f64,
}

/// 将热力图写入任意 Writer
///
/// # 返回
/// - Ok(usize): 写出的数据行数（不含表头）
pub fn write_heat_map_csv<W: Write>(writer: W, result: &AnalysisResult) -> ApiResult<usize> {
    if result.is_error() {
        return Err(ApiError::InvalidInput(format!(
            "分析结果带错误标记，无法导出: {}",
            result.metadata.message.as_deref().unwrap_or("unknown")
        )));
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut rows = 0usize;

    for (stage, row) in &result.time_series_data.data {
        for bucket in &result.time_series_data.time_buckets {
            let cell = row.get(&bucket.key).copied().unwrap_or_default();
            csv_writer.serialize(HeatMapRow {
                stage,
                bucket_key: &bucket.key,
                bucket_label: &bucket.label,
                count: cell.count,
                total_delay: cell.total_delay,
                avg_delay: cell.avg_delay(),
                intensity: cell.intensity,
            })?;
            rows += 1;
        }
    }

    // 没有数据行时也输出表头
    if rows == 0 {
        csv_writer.write_record([
            "stage",
            "bucket_key",
            "bucket_label",
            "count",
            "total_delay",
            "avg_delay",
            "intensity",
        ])?;
    }

    csv_writer.flush()?;
    Ok(rows)
}

/// 导出到文件
pub fn export_heat_map_csv(path: impl AsRef<Path>, result: &AnalysisResult) -> ApiResult<usize> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let rows = write_heat_map_csv(file, result)?;
    tracing::info!(path = %path.display(), rows, "热力图已导出");
    Ok(rows)
}
