// ==========================================
// 学校报名管理系统 - 行映射工具
// ==========================================
// 职责: 日期/时间/枚举列的统一编解码
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;

pub const DATE_FMT: &str = "%Y-%m-%d";
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

pub fn format_datetime(ts: NaiveDateTime) -> String {
    ts.format(DATETIME_FMT).to_string()
}

/// 构造列转换失败错误
pub fn conversion_error(idx: usize, value: &str, what: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("无法解析{}: {}", what, value).into(),
    )
}

pub fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FMT).map_err(|_| conversion_error(idx, raw, "日期"))
}

pub fn parse_opt_date(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    raw.map(|s| parse_date(idx, &s)).transpose()
}

pub fn parse_datetime(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FMT)
        .map_err(|_| conversion_error(idx, raw, "时间戳"))
}

/// 按 "?N" 占位符解析枚举列
pub fn parse_enum<T>(idx: usize, raw: &str, parse: fn(&str) -> Option<T>, what: &str) -> rusqlite::Result<T> {
    parse(raw).ok_or_else(|| conversion_error(idx, raw, what))
}
