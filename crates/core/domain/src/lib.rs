pub mod data;

pub use data::{DeviceSummary, MetricPoint, RawDeviceRecord, ReadingValue};

use serde::{Deserialize, Serialize};
use std::fmt;

/// 设备标识：区分受监控机组的不透明字符串（序列号）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// 单次轮询的采集结果：设备 -> 原始记录，按设备枚举顺序保存。
///
/// 仅在整次尝试成功时填充；全部尝试失败时为空。
#[derive(Debug, Clone, Default)]
pub struct AcquisitionResult {
    entries: Vec<(DeviceId, RawDeviceRecord)>,
}

impl AcquisitionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入设备记录；同一设备重复出现时覆盖旧值并保留首次出现的位置。
    pub fn insert(&mut self, device: DeviceId, record: RawDeviceRecord) {
        match self.entries.iter_mut().find(|(id, _)| *id == device) {
            Some(entry) => entry.1 = record,
            None => self.entries.push((device, record)),
        }
    }

    pub fn get(&self, device: &DeviceId) -> Option<&RawDeviceRecord> {
        self.entries
            .iter()
            .find(|(id, _)| id == device)
            .map(|(_, record)| record)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DeviceId, &RawDeviceRecord)> {
        self.entries.iter().map(|(id, record)| (id, record))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
