// ==========================================
// 订单瓶颈分析系统 - 引擎层
// ==========================================
// 职责: 实现分析算法,不拼 SQL
// 组件（叶子在前）:
//   backfill → transition → scoring
//                         → time_bucket → heatmap
//   analysis（编排） / backfill_job（维护任务）
// ==========================================

pub mod analysis;
pub mod backfill;
pub mod backfill_job;
pub mod error;
pub mod heatmap;
pub mod request;
pub mod scoring;
pub mod time_bucket;
pub mod transition;

// 重导出核心引擎
pub use analysis::{assemble, AnalysisResultAssembler};
pub use backfill::{BackfillAction, BackfillOutcome, StatusHistoryBackfill};
pub use backfill_job::{BackfillError, BackfillReport, StatusHistoryBackfillJob};
pub use error::AnalysisError;
pub use heatmap::{HeatMapAggregator, HeatMapStats};
pub use request::{AnalysisRequest, RawAnalysisRequest};
pub use scoring::{BottleneckScorer, BottleneckSummary};
pub use time_bucket::{BucketPlan, TimeBucketer};
pub use transition::{ExtractionOutcome, StageTransitionExtractor};
