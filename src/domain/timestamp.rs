// ==========================================
// 订单瓶颈分析系统 - 时间戳解析
// ==========================================
// 职责: 宽松解析历史订单中的时间字符串
// 约定: 所有时间统一按 UTC 处理，精度截断到毫秒（与输出格式一致）
// ==========================================

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, SubsecRound, TimeZone, Utc};

/// 支持的无时区日期时间格式（按顺序尝试）
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// 解析时间戳
///
/// 依次尝试:
/// 1. RFC 3339（带时区，转换为 UTC）
/// 2. 无时区的日期时间（视为 UTC）
/// 3. 纯日期（视为当天 00:00:00 UTC）
///
/// 空字符串或无法识别的格式返回 None；毫秒以下的部分直接截断
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    parse_full_precision(raw.trim()).map(|ts| ts.trunc_subsecs(3))
}

fn parse_full_precision(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    parse_date(s).map(start_of_day)
}

/// 解析纯日期 (YYYY-MM-DD)
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// 当天 00:00:00 UTC
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// 当天最后一毫秒 (23:59:59.999 UTC)
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&date.and_time(last))
}

/// 统一输出格式 (RFC 3339, 毫秒精度, Z 后缀)
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 两个时间点之间的小时数（可能为负）
pub fn hours_between(start: &DateTime<Utc>, end: &DateTime<Utc>) -> f64 {
    (*end - *start).num_milliseconds() as f64 / 3_600_000.0
}
