// ==========================================
// 订单瓶颈分析系统 - 领域类型定义
// ==========================================
// 热力图时间粒度 + 硬性桶数上限
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 热力图时间桶数量硬上限（任何粒度、任何跨度都不能超过）
pub const MAX_TIME_BUCKETS: usize = 366;

// ==========================================
// 时间粒度 (Resolution)
// ==========================================
// 序列化格式: lowercase (与前端请求参数一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Hour, // 小时
    Day,  // 天
    Week, // 周（周一起算）
}

impl Resolution {
    /// 从请求字符串解析（大小写不敏感，前后空白忽略）
    ///
    /// 不支持的值返回 None，由调用方决定回退策略
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "hour" => Some(Resolution::Hour),
            "day" => Some(Resolution::Day),
            "week" => Some(Resolution::Week),
            _ => None,
        }
    }

    /// 降一级粒度（hour → day → week）；week 已是最粗粒度
    pub fn coarser(self) -> Option<Self> {
        match self {
            Resolution::Hour => Some(Resolution::Day),
            Resolution::Day => Some(Resolution::Week),
            Resolution::Week => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Hour => "hour",
            Resolution::Day => "day",
            Resolution::Week => "week",
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::Day
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
