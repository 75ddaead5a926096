// ==========================================
// 订单瓶颈分析系统 - 请求校验与归一化
// ==========================================
// 职责: 在流水线入口一次性把原始请求参数转换为完全有效的类型化请求，
//       之后的各环节直接假定参数有效
// 回退规则:
// - 日期不可解析、超出支持年份 或 start > end → 默认窗口 (end = now, start = now - N 个月)
// - 缺少 end → now；缺少 start → end - N 个月
// - 纯日期的 end 包含当天（取当天最后一毫秒）
// - 不支持的 resolution → day
// ==========================================

use crate::domain::timestamp::{end_of_day, format_timestamp, parse_date, parse_timestamp};
use crate::domain::types::Resolution;
use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

/// 支持的年份范围，超出视为无效日期
const MIN_SUPPORTED_YEAR: i32 = 1900;
const MAX_SUPPORTED_YEAR: i32 = 9999;

/// 调用方传入的原始参数（任意字符串）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnalysisRequest {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
}

impl RawAnalysisRequest {
    pub fn new(start_date: Option<&str>, end_date: Option<&str>, resolution: Option<&str>) -> Self {
        Self {
            start_date: start_date.map(str::to_string),
            end_date: end_date.map(str::to_string),
            resolution: resolution.map(str::to_string),
        }
    }
}

/// 归一化后的请求
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub resolution: Resolution,
    /// 日期参数是否走了默认窗口
    pub date_fallback: bool,
    /// resolution 是否走了默认值
    pub resolution_fallback: bool,
}

impl AnalysisRequest {
    /// 归一化原始请求
    ///
    /// # 参数
    /// - raw: 原始参数
    /// - now: 当前时间（注入以便测试）
    /// - default_window_months: 默认窗口月数
    pub fn normalize(raw: &RawAnalysisRequest, now: DateTime<Utc>, default_window_months: u32) -> Self {
        let (resolution, resolution_fallback) = match raw.resolution.as_deref().map(str::trim) {
            None | Some("") => (Resolution::Day, false),
            Some(value) => match Resolution::parse(value) {
                Some(res) => (res, false),
                None => {
                    tracing::debug!(resolution = value, "不支持的粒度，回退为 day");
                    (Resolution::Day, true)
                }
            },
        };

        let start = raw.start_date.as_deref().map(parse_start);
        let end = raw.end_date.as_deref().map(parse_end);

        let default_window = || (months_before(now, default_window_months), now);

        let (start, end, date_fallback) = match (start, end) {
            // 提供了但无法解析
            (Some(None), _) | (_, Some(None)) => {
                let (s, e) = default_window();
                (s, e, true)
            }
            (start, end) => {
                let end = end.flatten().unwrap_or(now);
                let start = start
                    .flatten()
                    .unwrap_or_else(|| months_before(end, default_window_months));
                if start > end {
                    let (s, e) = default_window();
                    (s, e, true)
                } else {
                    (start, end, false)
                }
            }
        };

        if date_fallback {
            tracing::debug!(
                start_date = ?raw.start_date,
                end_date = ?raw.end_date,
                "日期参数无效，使用默认分析窗口"
            );
        }

        Self {
            start,
            end,
            resolution,
            date_fallback,
            resolution_fallback,
        }
    }

    pub fn start_str(&self) -> String {
        format_timestamp(&self.start)
    }

    pub fn end_str(&self) -> String {
        format_timestamp(&self.end)
    }
}

fn parse_start(raw: &str) -> Option<DateTime<Utc>> {
    parse_timestamp(raw).filter(in_supported_years)
}

fn parse_end(raw: &str) -> Option<DateTime<Utc>> {
    let end = match parse_date(raw) {
        Some(date) => Some(end_of_day(date)),
        None => parse_timestamp(raw),
    };
    end.filter(in_supported_years)
}

fn in_supported_years(ts: &DateTime<Utc>) -> bool {
    (MIN_SUPPORTED_YEAR..=MAX_SUPPORTED_YEAR).contains(&ts.year())
}

fn months_before(ts: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    ts.checked_sub_months(Months::new(months))
        .or_else(|| ts.checked_sub_signed(Duration::days(30 * months as i64)))
        .unwrap_or(ts)
}
