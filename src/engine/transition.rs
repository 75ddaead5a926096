// ==========================================
// 订单瓶颈分析系统 - 阶段转换提取
// ==========================================
// 职责: 遍历单个订单的时间线，输出相邻事件之间的阶段转换
// 规则:
// - 每对相邻事件产生一条转换，from 阶段必须在阶段表中，否则整对跳过
// - 任一端时间不可解析: 整对跳过
// - duration = max(0, 两事件相隔小时数)
// - delay = max(0, duration - expected)
// ==========================================

use crate::domain::analysis::StageTransition;
use crate::domain::order::Order;
use crate::domain::stage::StageCatalog;
use crate::domain::timestamp::hours_between;

/// 单个订单的提取结果
#[derive(Debug, Clone, Default)]
pub struct ExtractionOutcome {
    pub transitions: Vec<StageTransition>,
    /// 时间不可解析而跳过的事件对
    pub skipped_pairs: usize,
    /// from 阶段不在阶段表中而跳过的事件对
    pub unknown_stage_pairs: usize,
}

// ==========================================
// StageTransitionExtractor
// ==========================================
pub struct StageTransitionExtractor<'a> {
    catalog: &'a StageCatalog,
}

impl<'a> StageTransitionExtractor<'a> {
    pub fn new(catalog: &'a StageCatalog) -> Self {
        Self { catalog }
    }

    /// 提取单个订单的阶段转换
    ///
    /// 事件少于 2 条时返回空结果
    pub fn extract(&self, order: &Order) -> ExtractionOutcome {
        let mut outcome = ExtractionOutcome::default();

        for pair in order.status_history.windows(2) {
            let (from, to) = (&pair[0], &pair[1]);

            let (start, end) = match (from.parsed_timestamp(), to.parsed_timestamp()) {
                (Some(start), Some(end)) => (start, end),
                _ => {
                    outcome.skipped_pairs += 1;
                    continue;
                }
            };

            let definition = match self.catalog.get(&from.status) {
                Some(def) => def,
                None => {
                    tracing::trace!(
                        order_id = %order.order_id,
                        stage = %from.status,
                        "未知阶段，跳过"
                    );
                    outcome.unknown_stage_pairs += 1;
                    continue;
                }
            };

            let duration = hours_between(&start, &end).max(0.0);
            let expected_duration = definition.expected_duration_hours;

            outcome.transitions.push(StageTransition {
                order_id: order.order_id.clone(),
                from_stage: from.status.clone(),
                to_stage: to.status.clone(),
                duration,
                expected_duration,
                delay: (duration - expected_duration).max(0.0),
                start_time: start,
                end_time: end,
                synthetic: from.synthetic || to.synthetic,
            });
        }

        outcome
    }
}
