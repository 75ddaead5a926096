// ==========================================
// 订单瓶颈分析系统 - 状态历史补全
// ==========================================
// 职责: 保证每个订单都有可用的、按时间升序的事件时间线
// 输入: 原始订单（状态历史可能为空/不完整/含脏数据）
// 输出: 补全后的订单 + 补全动作说明
// ==========================================
// 规则:
// 1. 有效时间线（≥2 条可用事件）: 丢弃脏条目、稳定排序；
//    若缺少创建时刻，在最前补一条锚定在创建时间的首阶段事件
// 2. 否则: 用订单已有时间字段（创建/付款/交付/完成/更新）合成时间线，
//    与仍可用的原始事件合并，同一时刻只保留一条
// 3. 没有任何可用时间: 原样返回，下游不会产生阶段转换
// 补全结果是幂等的: 对补全结果再次补全不会产生新条目
// ==========================================

use crate::domain::order::{Order, StatusEvent, TimestampSource};
use crate::domain::stage::StageCatalog;
use crate::domain::timestamp::format_timestamp;
use chrono::{DateTime, Utc};

/// 合成事件的阶段猜测（缺省阶段名）
const PAID_STAGE: &str = "Paid";
const DELIVERED_STAGE: &str = "Delivered";
const COMPLETED_STAGE: &str = "Completed";

/// 合成时间线时各时间字段的优先级（同一时刻先到先得）
const SYNTHESIS_PRIORITY: [TimestampSource; 5] = [
    TimestampSource::Created,
    TimestampSource::Payment,
    TimestampSource::Delivery,
    TimestampSource::Completion,
    TimestampSource::Updated,
];

// ==========================================
// BackfillAction - 补全动作
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillAction {
    /// 时间线已有效，无改动
    Unchanged,
    /// 丢弃脏条目和/或重新排序
    Normalized,
    /// 在最前补了创建时刻事件
    PrependedCreation,
    /// 由时间字段合成
    Synthesized,
    /// 没有任何可用时间，原样返回
    NoUsableTimestamps,
}

/// 单个订单的补全结果
#[derive(Debug, Clone)]
pub struct BackfillOutcome {
    pub order: Order,
    pub action: BackfillAction,
    /// 被丢弃的脏条目数
    pub dropped_events: usize,
}

impl BackfillOutcome {
    /// 状态历史是否发生变化（需要回写）
    pub fn is_changed(&self) -> bool {
        !matches!(
            self.action,
            BackfillAction::Unchanged | BackfillAction::NoUsableTimestamps
        )
    }
}

// ==========================================
// StatusHistoryBackfill - 状态历史补全器
// ==========================================
pub struct StatusHistoryBackfill {
    first_stage: String,
}

impl StatusHistoryBackfill {
    /// 以阶段表首阶段作为“创建时刻”对应的阶段
    pub fn new(catalog: &StageCatalog) -> Self {
        Self {
            first_stage: catalog.first_stage().unwrap_or("Initiated").to_string(),
        }
    }

    /// 补全单个订单（纯函数，不落库）
    pub fn backfill(&self, order: &Order) -> BackfillOutcome {
        let total = order.status_history.len();
        let usable: Vec<(StatusEvent, DateTime<Utc>)> = order
            .status_history
            .iter()
            .filter(|e| !e.status.trim().is_empty())
            .filter_map(|e| e.parsed_timestamp().map(|ts| (e.clone(), ts)))
            .collect();
        let dropped_events = total - usable.len();

        if dropped_events > 0 {
            tracing::debug!(
                order_id = %order.order_id,
                dropped_events,
                "丢弃不可用的状态事件"
            );
        }

        if usable.len() >= 2 {
            self.normalize_valid(order, usable, dropped_events)
        } else {
            self.synthesize(order, usable, dropped_events)
        }
    }

    /// 有效时间线: 排序 + 可能补创建时刻
    fn normalize_valid(
        &self,
        order: &Order,
        mut usable: Vec<(StatusEvent, DateTime<Utc>)>,
        dropped_events: usize,
    ) -> BackfillOutcome {
        let was_sorted = usable.windows(2).all(|w| w[0].1 <= w[1].1);
        usable.sort_by_key(|(_, ts)| *ts);

        let mut history: Vec<StatusEvent> = Vec::with_capacity(usable.len() + 1);
        let mut action = if was_sorted && dropped_events == 0 {
            BackfillAction::Unchanged
        } else {
            BackfillAction::Normalized
        };

        if let Some(created) = order.created_ts() {
            if self.creation_omitted(&usable, created) {
                history.push(StatusEvent::synthesized(
                    self.first_stage.clone(),
                    format_timestamp(&created),
                    synthesized_comment(TimestampSource::Created),
                ));
                action = BackfillAction::PrependedCreation;
            }
        }

        history.extend(usable.into_iter().map(|(event, _)| event));

        let mut updated = order.clone();
        updated.status_history = history;
        BackfillOutcome {
            order: updated,
            action,
            dropped_events,
        }
    }

    /// 创建时刻是否缺失:
    /// - 没有任何事件落在创建时间上
    /// - 最早事件晚于创建时间
    /// - 没有首阶段事件
    fn creation_omitted(&self, sorted: &[(StatusEvent, DateTime<Utc>)], created: DateTime<Utc>) -> bool {
        let earliest = match sorted.first() {
            Some((_, ts)) => *ts,
            None => return false,
        };
        earliest > created
            && !sorted.iter().any(|(_, ts)| *ts == created)
            && !sorted.iter().any(|(e, _)| e.status == self.first_stage)
    }

    /// 由时间字段合成时间线
    fn synthesize(
        &self,
        order: &Order,
        existing: Vec<(StatusEvent, DateTime<Utc>)>,
        dropped_events: usize,
    ) -> BackfillOutcome {
        let known = order.known_timestamps();
        let mut merged = existing;
        let original_len = merged.len();

        for source in SYNTHESIS_PRIORITY {
            let ts = match known.iter().find(|(s, _)| *s == source) {
                Some((_, ts)) => *ts,
                None => continue,
            };
            if merged.iter().any(|(_, existing_ts)| *existing_ts == ts) {
                continue;
            }
            let stage = match self.guess_stage(source, order) {
                Some(stage) => stage,
                None => continue,
            };
            merged.push((
                StatusEvent::synthesized(stage, format_timestamp(&ts), synthesized_comment(source)),
                ts,
            ));
        }

        if merged.is_empty() {
            tracing::debug!(order_id = %order.order_id, "订单没有任何可用时间，跳过补全");
            return BackfillOutcome {
                order: order.clone(),
                action: BackfillAction::NoUsableTimestamps,
                dropped_events,
            };
        }

        let synthesized_any = merged.len() > original_len;
        merged.sort_by_key(|(_, ts)| *ts);

        let action = if synthesized_any {
            BackfillAction::Synthesized
        } else if dropped_events > 0 {
            BackfillAction::Normalized
        } else {
            BackfillAction::Unchanged
        };

        let mut updated = order.clone();
        updated.status_history = merged.into_iter().map(|(event, _)| event).collect();
        BackfillOutcome {
            order: updated,
            action,
            dropped_events,
        }
    }

    /// 时间字段 → 阶段猜测
    fn guess_stage(&self, source: TimestampSource, order: &Order) -> Option<String> {
        match source {
            TimestampSource::Created => Some(self.first_stage.clone()),
            TimestampSource::Payment => Some(PAID_STAGE.to_string()),
            TimestampSource::Delivery => Some(DELIVERED_STAGE.to_string()),
            TimestampSource::Completion => Some(COMPLETED_STAGE.to_string()),
            TimestampSource::Updated => {
                let current = order.status.trim();
                if current.is_empty() {
                    None
                } else {
                    Some(current.to_string())
                }
            }
        }
    }
}

fn synthesized_comment(source: TimestampSource) -> String {
    format!("synthesized from {}", source.field_name())
}
