//! Carbon 文本行协议编码
//!
//! 每个指标点一行：`<metric> <value> <epoch_seconds>\n`。

use crate::error::EmitError;
use domain::{MetricPoint, ReadingValue};

/// 将指标点编码为一行协议文本。
///
/// 布尔值编码为 `1` / `0`；名称或文本值为空、含空白字符时拒绝编码，
/// 否则会破坏按行、按空格分隔的帧结构。
pub fn format_line(point: &MetricPoint) -> Result<String, EmitError> {
    if !is_token(&point.name) {
        return Err(EmitError::InvalidLine(format!(
            "metric name {:?}",
            point.name
        )));
    }
    let value = format_value(&point.value)?;
    Ok(format!("{} {} {}\n", point.name, value, point.timestamp))
}

/// 读数 -> 协议值文本。
pub fn format_value(value: &ReadingValue) -> Result<String, EmitError> {
    match value {
        ReadingValue::Bool(v) => Ok(i64::from(*v).to_string()),
        ReadingValue::Int(v) => Ok(v.to_string()),
        ReadingValue::Float(v) if v.is_finite() => Ok(v.to_string()),
        ReadingValue::Float(v) => Err(EmitError::InvalidLine(format!("non-finite value {v}"))),
        ReadingValue::Text(v) if is_token(v) => Ok(v.clone()),
        ReadingValue::Text(v) => Err(EmitError::InvalidLine(format!("text value {v:?}"))),
    }
}

/// 毫秒时间戳四舍五入到整秒。
pub fn rounded_epoch_seconds(ts_ms: i64) -> i64 {
    (ts_ms + 500).div_euclid(1000)
}

fn is_token(text: &str) -> bool {
    !text.is_empty() && !text.chars().any(char::is_whitespace)
}
