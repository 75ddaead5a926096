// ==========================================
// 订单瓶颈分析系统 - 引擎层错误类型
// ==========================================
// 只在流水线内部传播；对外入口统一转换为带 error 标记的空结果
// ==========================================

use crate::repository::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("订单读取失败: {0}")]
    OrderStore(#[from] RepositoryError),

    #[error("阶段表无效: {0}")]
    InvalidStageCatalog(String),
}
