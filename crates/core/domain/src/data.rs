use crate::DeviceId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// 设备列表中的单个条目（其余字段忽略）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    #[serde(rename = "serialnumber")]
    pub serial_number: DeviceId,
}

/// 一次设备详情查询返回的原始记录。
///
/// 结构由远端 API 决定：可能包含直接的标量字段（如 `devicestate`），
/// 也可能包含 `parameters` 数组，元素形如 `{"name": ..., "value": ...}`。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawDeviceRecord(Map<String, Value>);

impl RawDeviceRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// 从任意 JSON 值构造；非对象返回 None。
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// 直接字段查找。
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// 遍历 `parameters` 数组中的 (name, value)。
    ///
    /// 缺少 `name` 字符串的条目被跳过；缺少 `value` 的条目视为 `null`。
    pub fn parameter_entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0
            .get("parameters")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|entry| {
                let name = entry.get("name")?.as_str()?;
                Some((name, entry.get("value").unwrap_or(&Value::Null)))
            })
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// 规范化后的参数读数。
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl ReadingValue {
    /// JSON 标量 -> 读数；`null`、数组、对象没有读数。
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(Self::Bool(*v)),
            Value::Number(number) => match number.as_i64() {
                Some(v) => Some(Self::Int(v)),
                None => number.as_f64().map(Self::Float),
            },
            Value::String(v) => Some(Self::Text(v.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl fmt::Display for ReadingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// 待下发的单个指标点（周期内瞬时构造，不持久化）。
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub name: String,
    pub value: ReadingValue,
    /// Unix 秒。
    pub timestamp: i64,
}
