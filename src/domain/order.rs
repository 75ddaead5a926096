// ==========================================
// 订单瓶颈分析系统 - 订单领域模型
// ==========================================
// 订单与状态历史由订单管理子系统维护，本引擎只读
// 例外: 状态历史补全维护任务会回写合成的 StatusEvent
// ==========================================

use crate::domain::timestamp::parse_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// StatusEvent - 状态事件
// ==========================================
// 时间戳保留原始字符串: 历史数据可能不可解析，由下游逐条跳过
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub status: String,          // 阶段名称（自由文本，下游按阶段定义校验）
    pub timestamp: String,       // 事件时间
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>, // 备注
    #[serde(default)]
    pub synthetic: bool,         // 是否由补全逻辑合成
}

impl StatusEvent {
    /// 创建真实事件
    pub fn new(status: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            timestamp: timestamp.into(),
            comment: None,
            synthetic: false,
        }
    }

    /// 创建合成事件
    pub fn synthesized(
        status: impl Into<String>,
        timestamp: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            status: status.into(),
            timestamp: timestamp.into(),
            comment: Some(comment.into()),
            synthetic: true,
        }
    }

    /// 解析后的事件时间
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// 事件是否可用: 阶段名非空 且 时间可解析
    pub fn is_usable(&self) -> bool {
        !self.status.trim().is_empty() && self.parsed_timestamp().is_some()
    }
}

// ==========================================
// TimestampSource - 订单辅助时间字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSource {
    Created,
    Updated,
    Payment,
    Delivery,
    Completion,
}

impl TimestampSource {
    pub fn field_name(&self) -> &'static str {
        match self {
            TimestampSource::Created => "createdAt",
            TimestampSource::Updated => "updatedAt",
            TimestampSource::Payment => "paymentDate",
            TimestampSource::Delivery => "deliveryDate",
            TimestampSource::Completion => "completedAt",
        }
    }
}

// ==========================================
// Order - 订单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    // ===== 主键 =====
    pub order_id: String,

    // ===== 生命周期 =====
    pub created_at: String,  // 创建时间（原始字符串）
    pub status: String,      // 当前阶段
    #[serde(default)]
    pub status_history: Vec<StatusEvent>,

    // ===== 辅助时间（可选） =====
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl Order {
    /// 创建仅含基础字段的订单
    pub fn new(
        order_id: impl Into<String>,
        created_at: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            created_at: created_at.into(),
            status: status.into(),
            status_history: Vec::new(),
            updated_at: None,
            payment_date: None,
            delivery_date: None,
            completed_at: None,
        }
    }

    pub fn created_ts(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }

    /// 所有可解析的时间字段（创建/更新/付款/交付/完成），按字段顺序
    pub fn known_timestamps(&self) -> Vec<(TimestampSource, DateTime<Utc>)> {
        let fields: [(TimestampSource, Option<&str>); 5] = [
            (TimestampSource::Created, Some(self.created_at.as_str())),
            (TimestampSource::Updated, self.updated_at.as_deref()),
            (TimestampSource::Payment, self.payment_date.as_deref()),
            (TimestampSource::Delivery, self.delivery_date.as_deref()),
            (TimestampSource::Completion, self.completed_at.as_deref()),
        ];

        fields
            .into_iter()
            .filter_map(|(source, raw)| raw.and_then(parse_timestamp).map(|ts| (source, ts)))
            .collect()
    }

    /// 订单是否落在 [start, end] 区间
    ///
    /// 规则:
    /// - 创建时间可解析: 以创建时间判定
    /// - 创建时间不可解析: 任一事件/辅助时间落在区间内即视为命中
    /// - 没有任何可解析时间: 视为命中（计入分析总数，但不产生阶段转换）
    pub fn falls_within(&self, start: &DateTime<Utc>, end: &DateTime<Utc>) -> bool {
        if let Some(created) = self.created_ts() {
            return created >= *start && created <= *end;
        }

        let mut candidates: Vec<DateTime<Utc>> = self
            .known_timestamps()
            .into_iter()
            .map(|(_, ts)| ts)
            .collect();
        candidates.extend(self.status_history.iter().filter_map(|e| e.parsed_timestamp()));

        if candidates.is_empty() {
            return true;
        }
        candidates.iter().any(|ts| ts >= start && ts <= end)
    }
}
