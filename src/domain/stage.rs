// ==========================================
// 订单瓶颈分析系统 - 阶段定义
// ==========================================
// 阶段链与期望耗时属于业务策略，由配置注入
// 这里只提供缺省的规范阶段表
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 规范阶段表（阶段名, 下一阶段, 期望耗时/小时）
const CANONICAL_STAGES: &[(&str, Option<&str>, f64)] = &[
    ("Initiated", Some("Requests Sent"), 24.0),
    ("Requests Sent", Some("Quoted"), 48.0),
    ("Quoted", Some("Accepted"), 24.0),
    ("Accepted", Some("Paid"), 24.0),
    ("Paid", Some("In Progress"), 48.0),
    ("In Progress", Some("In Transit"), 72.0),
    ("In Transit", Some("Delivered"), 48.0),
    ("Delivered", Some("Completed"), 24.0),
    ("Completed", None, 24.0),
];

// ==========================================
// StageDefinition - 单个阶段定义
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDefinition {
    pub stage: String,
    #[serde(default)]
    pub next_stage: Option<String>,
    pub expected_duration_hours: f64,
}

// ==========================================
// StageCatalog - 有序阶段表
// ==========================================
// 顺序即排名并列时的次序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageCatalog {
    definitions: Vec<StageDefinition>,
}

impl StageCatalog {
    /// 从定义列表构建，校验失败返回错误描述
    pub fn new(definitions: Vec<StageDefinition>) -> Result<Self, String> {
        let catalog = Self { definitions };
        catalog.validate()?;
        Ok(catalog)
    }

    /// 规范阶段表
    pub fn canonical() -> Self {
        let definitions = CANONICAL_STAGES
            .iter()
            .map(|(stage, next, hours)| StageDefinition {
                stage: stage.to_string(),
                next_stage: next.map(|s| s.to_string()),
                expected_duration_hours: *hours,
            })
            .collect();
        Self { definitions }
    }

    /// 校验规则:
    /// - 至少一个阶段
    /// - 阶段名非空且不重复
    /// - 期望耗时为正的有限数（作为延迟系数的分母）
    pub fn validate(&self) -> Result<(), String> {
        if self.definitions.is_empty() {
            return Err("阶段定义为空".to_string());
        }

        let mut seen = HashSet::new();
        for def in &self.definitions {
            let name = def.stage.trim();
            if name.is_empty() {
                return Err("阶段名称不能为空".to_string());
            }
            if !seen.insert(name.to_string()) {
                return Err(format!("阶段名称重复: {}", name));
            }
            if !def.expected_duration_hours.is_finite() || def.expected_duration_hours <= 0.0 {
                return Err(format!(
                    "阶段 {} 的期望耗时无效: {}",
                    name, def.expected_duration_hours
                ));
            }
        }
        Ok(())
    }

    pub fn get(&self, stage: &str) -> Option<&StageDefinition> {
        self.definitions.iter().find(|d| d.stage == stage)
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.get(stage).is_some()
    }

    /// 首个阶段（订单创建时刻对应的阶段）
    pub fn first_stage(&self) -> Option<&str> {
        self.definitions.first().map(|d| d.stage.as_str())
    }

    pub fn definitions(&self) -> &[StageDefinition] {
        &self.definitions
    }

    /// 按表顺序的阶段名
    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.stage.as_str())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for StageCatalog {
    fn default() -> Self {
        Self::canonical()
    }
}
