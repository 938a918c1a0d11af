//! 原始设备记录 -> 参数读数。

mod state;

pub use state::DeviceState;

use domain::{RawDeviceRecord, ReadingValue};
use relay_telemetry::record_unknown_state;
use serde_json::Value;
use tracing::warn;

/// 需要状态编码的特殊参数名。
pub const DEVICE_STATE_PARAMETER: &str = "devicestate";

/// 从设备记录中取出指定参数的读数；取不到时返回 None（不是错误）。
///
/// - `devicestate`：读取同名直接字段并按状态表编码为数值。
/// - 其他参数：优先取同名直接字段，其次取 `parameters` 中第一个同名条目的 `value`。
pub fn normalize(record: &RawDeviceRecord, parameter: &str) -> Option<ReadingValue> {
    if parameter == DEVICE_STATE_PARAMETER {
        return device_state(record).map(|state| ReadingValue::Float(state.encode()));
    }

    if let Some(value) = record.field(parameter) {
        return ReadingValue::from_json(value);
    }

    record
        .parameter_entries()
        .find(|(name, _)| *name == parameter)
        .and_then(|(_, value)| ReadingValue::from_json(value))
}

/// 解析记录中的设备状态；字段缺失或为 null 时返回 None。
pub fn device_state(record: &RawDeviceRecord) -> Option<DeviceState> {
    let state = match record.field(DEVICE_STATE_PARAMETER)? {
        Value::Null => return None,
        Value::String(raw) => DeviceState::parse(raw),
        other => DeviceState::Unrecognized(other.to_string()),
    };
    if let DeviceState::Unrecognized(raw) = &state {
        record_unknown_state();
        warn!(target: "relay.normalize", state = %raw, "unknown_device_state");
    }
    Some(state)
}
