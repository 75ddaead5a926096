// ==========================================
// 订单瓶颈分析系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 只读分析（阶段耗时评分 + 时间热力图），另含状态历史补全维护任务
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 分析算法
pub mod engine;

// 配置层 - 阶段策略
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/表结构）
pub mod db;

// 日志系统
pub mod logging;

// 性能计时
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Resolution, MAX_TIME_BUCKETS};

// 领域实体
pub use domain::{
    AnalysisMetadata, AnalysisResult, HeatMapCell, Order, StageCatalog, StageDefinition,
    StageScore, StageTransition, StatusEvent, TimeBucket,
};

// 引擎
pub use engine::{
    AnalysisResultAssembler, BottleneckScorer, HeatMapAggregator, RawAnalysisRequest,
    StageTransitionExtractor, StatusHistoryBackfill, StatusHistoryBackfillJob, TimeBucketer,
};

// API
pub use api::AnalyticsApi;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "订单瓶颈分析系统";
