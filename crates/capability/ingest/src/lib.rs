//! 遥测数据采集：API 抽象、重试采集循环与 Oncue HTTP 客户端。

mod acquire;
mod clock;
mod oncue;

pub use acquire::{
    AcquireConfig, Acquirer, AcquisitionOutcome, FailureLog, FailureSink, RetryPolicy,
    TracingFailureSink,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use oncue::{OncueHttpApi, OncueHttpConfig};

use async_trait::async_trait;
use domain::{DeviceId, DeviceSummary, RawDeviceRecord};

/// 采集错误。
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("auth error: {0}")]
    Auth(String),
    #[error("api error: {0}")]
    Api(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("empty device details: {0}")]
    EmptyDetails(String),
}

/// 遥测 API 入口：每次采集尝试打开一个独立会话。
#[async_trait]
pub trait TelemetryApi: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn TelemetrySession>, IngestError>;
}

/// 单次采集尝试内的 API 会话。
#[async_trait]
pub trait TelemetrySession: Send + Sync {
    async fn login(&mut self, user: &str, password: &str) -> Result<(), IngestError>;

    async fn list_devices(&self) -> Result<Vec<DeviceSummary>, IngestError>;

    /// 查询设备详情，仅请求 `parameter_ids` 指定的参数；返回至少一条记录。
    async fn device_details(
        &self,
        device: &DeviceId,
        parameter_ids: &[u32],
    ) -> Result<Vec<RawDeviceRecord>, IngestError>;

    /// 释放会话；无论尝试成败都会被调用一次。
    async fn close(&mut self);
}
