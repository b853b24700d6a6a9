use super::{invalid, Options};
use crate::{schema::BuiltinType, stmt::Value, Result};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

const DATE: &str = "%Y-%m-%d";
const TIME: &str = "%H:%M:%S";

pub(super) fn to_date(value: Value, ty: &BuiltinType) -> Result<NaiveDate> {
    match &value {
        Value::Date(v) => Ok(*v),
        Value::Timestamp(v) => Ok(v.date()),
        Value::String(s) => NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), DATE)
            .map_err(|_| invalid(&value, ty)),
        _ => Err(invalid(&value, ty)),
    }
}

pub(super) fn to_time(value: Value, ty: &BuiltinType) -> Result<NaiveTime> {
    match &value {
        Value::Time(v) => Ok(v.with_nanosecond(0).unwrap_or(*v)),
        Value::Timestamp(v) => Ok(v.time().with_nanosecond(0).unwrap_or(v.time())),
        Value::String(s) => NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .map(|v| v.with_nanosecond(0).unwrap_or(v))
            .map_err(|_| invalid(&value, ty)),
        _ => Err(invalid(&value, ty)),
    }
}

pub(super) fn to_timestamp(value: Value, ty: &BuiltinType) -> Result<NaiveDateTime> {
    match &value {
        Value::Timestamp(v) => Ok(*v),
        Value::Date(v) => Ok(v.and_time(NaiveTime::MIN)),
        Value::String(s) => parse_timestamp(s).ok_or_else(|| invalid(&value, ty)),
        _ => Err(invalid(&value, ty)),
    }
}

/// Accepts RFC 3339 (any offset, normalized to UTC), ISO 8601 without offset
/// using `T` or a space as separator, and plain dates.
pub(super) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();

    if let Ok(v) = DateTime::parse_from_rfc3339(s) {
        return Some(v.naive_utc());
    }

    let naive = s.strip_suffix('Z').unwrap_or(s);

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(v) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(v);
        }
    }

    NaiveDate::parse_from_str(naive, DATE)
        .ok()
        .map(|v| v.and_time(NaiveTime::MIN))
}

/// Drops fractional-second digits beyond `digits`.
pub(crate) fn truncate(ts: NaiveDateTime, digits: u8) -> NaiveDateTime {
    let nanos = ts.nanosecond() % 1_000_000_000;
    let unit = 10u32.pow(9 - digits.min(9) as u32);
    ts.with_nanosecond(nanos - nanos % unit).unwrap_or(ts)
}

/// Fixed seven-digit fraction so stored text sorts chronologically.
fn format_fixed(ts: &NaiveDateTime, separator: char, zulu: bool) -> String {
    let fraction = (ts.nanosecond() % 1_000_000_000) / 100;
    format!(
        "{}{separator}{}.{fraction:07}{}",
        ts.format(DATE),
        ts.format(TIME),
        if zulu { "Z" } else { "" }
    )
}

fn precision(ty: &BuiltinType, options: &Options) -> u8 {
    match ty {
        BuiltinType::Timestamp {
            precision: Some(p),
        } => *p,
        BuiltinType::DateTime => 0,
        _ => options.timestamp_precision,
    }
}

// Encoders

pub(super) fn date_native(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_date(value, ty).map(Value::Date)
}

pub(super) fn date_as_text(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_date(value, ty).map(|v| Value::String(v.format(DATE).to_string()))
}

pub(super) fn time_native(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_time(value, ty).map(Value::Time)
}

pub(super) fn time_as_text(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_time(value, ty).map(|v| Value::String(v.format(TIME).to_string()))
}

pub(super) fn datetime_native(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_timestamp(value, ty).map(|v| Value::Timestamp(truncate(v, 0)))
}

pub(super) fn datetime_as_iso(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_timestamp(value, ty).map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%SZ").to_string()))
}

pub(super) fn datetime_as_text(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_timestamp(value, ty).map(|v| Value::String(v.format("%Y-%m-%d %H:%M:%S").to_string()))
}

pub(super) fn timestamp_native(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_timestamp(value, ty).map(|v| Value::Timestamp(truncate(v, 7)))
}

pub(super) fn timestamp_as_iso(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_timestamp(value, ty).map(|v| Value::String(format_fixed(&v, 'T', true)))
}

pub(super) fn timestamp_as_text(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_timestamp(value, ty).map(|v| Value::String(format_fixed(&v, ' ', false)))
}

// Decoders

pub(super) fn date_from_any(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_date(value, ty).map(Value::Date)
}

pub(super) fn time_from_any(value: Value, ty: &BuiltinType, _: &Options) -> Result<Value> {
    to_time(value, ty).map(Value::Time)
}

/// Timestamps and date-times are normalized to the configured number of
/// fractional digits on read.
pub(super) fn timestamp_from_any(value: Value, ty: &BuiltinType, options: &Options) -> Result<Value> {
    to_timestamp(value, ty).map(|v| Value::Timestamp(truncate(v, precision(ty, options))))
}
