// ==========================================
// 订单瓶颈分析系统 - 瓶颈评分
// ==========================================
// 职责: 汇总全部阶段转换，计算每个阶段的瓶颈分数
// 规则:
// - 仅超时转换 (duration > expected) 累加延迟系数 duration / expected
// - 阶段分数 = 延迟系数累计 / 离开该阶段的转换总数（按次数归一化，不按总量）
// - 无转换的阶段分数为 0
// - 排名按分数降序，并列时按阶段表顺序
// - 平均延迟 = 该阶段延迟记录的原始延迟小时数均值
// ==========================================

use crate::domain::analysis::{DelayEntry, StageScore, StageTransition};
use crate::domain::stage::StageCatalog;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// 阶段 → 延迟记录
pub type DelayEntriesByStage = HashMap<String, Vec<DelayEntry>>;

/// 评分汇总
#[derive(Debug, Clone, Default)]
pub struct BottleneckSummary {
    pub scores: BTreeMap<String, f64>,
    pub sorted: Vec<StageScore>,
    pub average_delays: BTreeMap<String, f64>,
    pub delay_entries: DelayEntriesByStage,
}

// ==========================================
// BottleneckScorer - 累加器
// ==========================================
pub struct BottleneckScorer<'a> {
    catalog: &'a StageCatalog,
    factor_totals: HashMap<String, f64>,
    transition_counts: HashMap<String, usize>,
    delay_entries: DelayEntriesByStage,
}

impl<'a> BottleneckScorer<'a> {
    pub fn new(catalog: &'a StageCatalog) -> Self {
        Self {
            catalog,
            factor_totals: HashMap::new(),
            transition_counts: HashMap::new(),
            delay_entries: HashMap::new(),
        }
    }

    /// 记录一条转换
    pub fn record(&mut self, transition: &StageTransition) {
        if !self.catalog.contains(&transition.from_stage) {
            return;
        }

        *self
            .transition_counts
            .entry(transition.from_stage.clone())
            .or_insert(0) += 1;

        if !transition.is_delayed() {
            return;
        }

        let delay_factor = transition.delay_factor();
        *self
            .factor_totals
            .entry(transition.from_stage.clone())
            .or_insert(0.0) += delay_factor;

        self.delay_entries
            .entry(transition.from_stage.clone())
            .or_default()
            .push(DelayEntry {
                order_id: transition.order_id.clone(),
                delay: transition.duration - transition.expected_duration,
                delay_factor,
                timestamp: transition.start_time,
                synthetic: transition.synthetic,
            });
    }

    /// 批量记录
    pub fn record_all<'t>(&mut self, transitions: impl IntoIterator<Item = &'t StageTransition>) {
        for transition in transitions {
            self.record(transition);
        }
    }

    /// 结束累加，产出分数/排名/平均延迟
    pub fn finish(self) -> BottleneckSummary {
        let mut scores = BTreeMap::new();
        let mut average_delays = BTreeMap::new();
        let mut ranked: Vec<(usize, StageScore)> = Vec::with_capacity(self.catalog.len());

        for (position, stage) in self.catalog.stage_names().enumerate() {
            let count = self.transition_counts.get(stage).copied().unwrap_or(0);
            let total = self.factor_totals.get(stage).copied().unwrap_or(0.0);
            let score = if count > 0 { total / count as f64 } else { 0.0 };

            let average_delay = match self.delay_entries.get(stage) {
                Some(entries) if !entries.is_empty() => {
                    entries.iter().map(|e| e.delay).sum::<f64>() / entries.len() as f64
                }
                _ => 0.0,
            };

            scores.insert(stage.to_string(), score);
            average_delays.insert(stage.to_string(), average_delay);
            ranked.push((
                position,
                StageScore {
                    stage: stage.to_string(),
                    score,
                },
            ));
        }

        ranked.sort_by(|(pa, a), (pb, b)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(pa.cmp(pb))
        });

        BottleneckSummary {
            scores,
            sorted: ranked.into_iter().map(|(_, s)| s).collect(),
            average_delays,
            delay_entries: self.delay_entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timestamp::parse_timestamp;

    fn transition(order_id: &str, from: &str, duration: f64, expected: f64) -> StageTransition {
        let start = parse_timestamp("2024-01-01T00:00:00Z").unwrap();
        StageTransition {
            order_id: order_id.to_string(),
            from_stage: from.to_string(),
            to_stage: "next".to_string(),
            duration,
            expected_duration: expected,
            delay: (duration - expected).max(0.0),
            start_time: start,
            end_time: start,
            synthetic: false,
        }
    }

    #[test]
    fn test_on_time_transition_contributes_nothing() {
        let catalog = StageCatalog::canonical();
        let mut scorer = BottleneckScorer::new(&catalog);
        scorer.record(&transition("O-1", "Initiated", 10.0, 24.0));

        let summary = scorer.finish();
        assert_eq!(summary.scores["Initiated"], 0.0);
        assert!(summary.delay_entries.get("Initiated").is_none());
        assert_eq!(summary.average_delays["Initiated"], 0.0);
    }

    #[test]
    fn test_score_normalized_by_transition_count() {
        let catalog = StageCatalog::canonical();
        let mut scorer = BottleneckScorer::new(&catalog);
        // 一条超时 (50/24)，一条正常
        scorer.record(&transition("O-1", "Initiated", 50.0, 24.0));
        scorer.record(&transition("O-2", "Initiated", 10.0, 24.0));

        let summary = scorer.finish();
        let expected = (50.0 / 24.0) / 2.0;
        assert!((summary.scores["Initiated"] - expected).abs() < 1e-9);

        let entries = &summary.delay_entries["Initiated"];
        assert_eq!(entries.len(), 1);
        assert!((entries[0].delay - 26.0).abs() < 1e-9);
        assert!((entries[0].delay_factor - 50.0 / 24.0).abs() < 1e-9);
        assert!((summary.average_delays["Initiated"] - 26.0).abs() < 1e-9);
    }

    #[test]
    fn test_sorted_descending_with_catalog_tiebreak() {
        let catalog = StageCatalog::canonical();
        let mut scorer = BottleneckScorer::new(&catalog);
        scorer.record(&transition("O-1", "Quoted", 48.0, 24.0)); // 2.0
        scorer.record(&transition("O-2", "Paid", 144.0, 48.0)); // 3.0

        let summary = scorer.finish();
        assert_eq!(summary.sorted.len(), catalog.len());
        assert_eq!(summary.sorted[0].stage, "Paid");
        assert_eq!(summary.sorted[1].stage, "Quoted");
        // 其余 0 分阶段按阶段表顺序
        assert_eq!(summary.sorted[2].stage, "Initiated");
        assert_eq!(summary.sorted[3].stage, "Requests Sent");
        assert!(summary.scores.values().all(|s| *s >= 0.0));
    }

    #[test]
    fn test_unknown_stage_ignored() {
        let catalog = StageCatalog::canonical();
        let mut scorer = BottleneckScorer::new(&catalog);
        scorer.record(&transition("O-1", "Cancelled", 100.0, 1.0));

        let summary = scorer.finish();
        assert!(!summary.scores.contains_key("Cancelled"));
        assert!(summary.delay_entries.is_empty());
    }
}
