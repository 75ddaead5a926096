// ==========================================
// 订单瓶颈分析系统 - 分析结果模型
// ==========================================
// 以下对象均为单次请求内的临时计算结果，响应后即丢弃
// 序列化格式: camelCase (前端热力图/表格直接消费)
// ==========================================

use crate::domain::types::Resolution;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// StageTransition - 阶段转换
// ==========================================
// 不变量: duration >= 0, delay = max(0, duration - expected_duration)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTransition {
    pub order_id: String,
    pub from_stage: String,
    pub to_stage: String,
    pub duration: f64,          // 实际耗时（小时）
    pub expected_duration: f64, // 期望耗时（小时）
    pub delay: f64,             // 超出期望的小时数
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub synthetic: bool,        // 任一端点为补全合成事件
}

impl StageTransition {
    /// 是否超出期望耗时
    pub fn is_delayed(&self) -> bool {
        self.duration > self.expected_duration
    }

    /// 延迟系数 = 实际耗时 / 期望耗时
    pub fn delay_factor(&self) -> f64 {
        if self.expected_duration > 0.0 {
            self.duration / self.expected_duration
        } else {
            0.0
        }
    }
}

// ==========================================
// DelayEntry - 延迟记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayEntry {
    pub order_id: String,
    pub delay: f64,
    pub delay_factor: f64,
    pub timestamp: DateTime<Utc>, // = 转换开始时间
    pub synthetic: bool,
}

// ==========================================
// TimeBucket - 时间桶
// ==========================================
// key 可按字典序排序: hour → YYYY-MM-DD-HH, day → YYYY-MM-DD, week → 周一 YYYY-MM-DD
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBucket {
    pub key: String,
    pub label: String,
}

// ==========================================
// HeatMapCell - 热力图单元格
// ==========================================
// 不变量: intensity ∈ [0, 1]；count = 0 时 intensity = 0
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatMapCell {
    pub count: u32,
    pub total_delay: f64,
    pub intensity: f64,
}

impl HeatMapCell {
    /// 单元格平均延迟（无数据为 0）
    pub fn avg_delay(&self) -> f64 {
        if self.count > 0 {
            self.total_delay / self.count as f64
        } else {
            0.0
        }
    }
}

/// 阶段 → 桶 key → 单元格
pub type HeatMapGrid = BTreeMap<String, BTreeMap<String, HeatMapCell>>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesData {
    pub time_buckets: Vec<TimeBucket>,
    pub data: HeatMapGrid,
}

/// 排名条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageScore {
    pub stage: String,
    pub score: f64,
}

// ==========================================
// AnalysisMetadata - 分析元数据
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    // ===== 回退后的请求参数 =====
    pub analysis_start_date: String,
    pub analysis_end_date: String,
    pub resolution: Resolution,

    // ===== 统计 =====
    pub total_orders_analyzed: usize,
    pub orders_with_transitions: usize,
    #[serde(default)]
    pub synthetic_transitions: usize,
    #[serde(default)]
    pub skipped_events: usize,

    // ===== 热力图实际口径（降级/截断后） =====
    pub effective_resolution: Resolution,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heat_map_start_date: Option<String>,
    #[serde(default)]
    pub heat_map_truncated: bool,

    pub generated_at: String,

    // ===== 失败标记 =====
    #[serde(default)]
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ==========================================
// AnalysisResult - 分析结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub bottleneck_scores: BTreeMap<String, f64>,
    pub sorted_bottlenecks: Vec<StageScore>,
    pub average_delays: BTreeMap<String, f64>,
    pub stage_transitions: Vec<StageTransition>,
    pub time_series_data: TimeSeriesData,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    /// 规范空结果（内部失败时返回）
    ///
    /// 元数据仍报告回退后的起止日期与粒度
    pub fn empty_with_error(
        analysis_start_date: String,
        analysis_end_date: String,
        resolution: Resolution,
        message: impl Into<String>,
    ) -> Self {
        Self {
            bottleneck_scores: BTreeMap::new(),
            sorted_bottlenecks: Vec::new(),
            average_delays: BTreeMap::new(),
            stage_transitions: Vec::new(),
            time_series_data: TimeSeriesData::default(),
            metadata: AnalysisMetadata {
                analysis_start_date,
                analysis_end_date,
                resolution,
                total_orders_analyzed: 0,
                orders_with_transitions: 0,
                synthetic_transitions: 0,
                skipped_events: 0,
                effective_resolution: resolution,
                heat_map_start_date: None,
                heat_map_truncated: false,
                generated_at: crate::domain::timestamp::format_timestamp(&Utc::now()),
                error: true,
                message: Some(message.into()),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        self.metadata.error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_with_error_shape() {
        let result = AnalysisResult::empty_with_error(
            "2024-01-01T00:00:00.000Z".to_string(),
            "2024-01-31T23:59:59.999Z".to_string(),
            Resolution::Day,
            "订单读取失败",
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["bottleneckScores"], serde_json::json!({}));
        assert_eq!(json["sortedBottlenecks"], serde_json::json!([]));
        assert_eq!(json["timeSeriesData"]["timeBuckets"], serde_json::json!([]));
        assert_eq!(json["timeSeriesData"]["data"], serde_json::json!({}));
        assert_eq!(json["metadata"]["error"], serde_json::json!(true));
        assert_eq!(json["metadata"]["message"], serde_json::json!("订单读取失败"));
        assert_eq!(json["metadata"]["resolution"], serde_json::json!("day"));
    }

    #[test]
    fn test_cell_avg_delay() {
        let empty = HeatMapCell::default();
        assert_eq!(empty.avg_delay(), 0.0);

        let cell = HeatMapCell { count: 4, total_delay: 10.0, intensity: 0.0 };
        assert_eq!(cell.avg_delay(), 2.5);
    }
}
