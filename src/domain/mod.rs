// ==========================================
// 订单瓶颈分析系统 - 领域模型层
// ==========================================
// 职责: 定义订单、阶段、分析结果等实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod analysis;
pub mod order;
pub mod stage;
pub mod timestamp;
pub mod types;

// 重导出核心类型
pub use analysis::{
    AnalysisMetadata, AnalysisResult, DelayEntry, HeatMapCell, HeatMapGrid, StageScore,
    StageTransition, TimeBucket, TimeSeriesData,
};
pub use order::{Order, StatusEvent, TimestampSource};
pub use stage::{StageCatalog, StageDefinition};
pub use types::{Resolution, MAX_TIME_BUCKETS};
