use crate::clock::Clock;
use crate::{IngestError, TelemetryApi, TelemetrySession};
use domain::AcquisitionResult;
use relay_telemetry::{record_acquisition_attempt, record_acquisition_failure};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 整次尝试级别的重试策略：固定间隔，不做指数退避。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// 采集参数。
#[derive(Debug, Clone)]
pub struct AcquireConfig {
    pub login: String,
    pub password: String,
    pub parameter_ids: Vec<u32>,
    pub retry: RetryPolicy,
    /// 单次 API 调用的上限时长。
    pub request_timeout: Duration,
}

/// 跨尝试的失败文本聚合：与上一条失败相同的文本只记一次。
#[derive(Debug, Default, Clone)]
pub struct FailureLog {
    text: String,
    last: Option<String>,
    count: u32,
}

impl FailureLog {
    pub fn push(&mut self, failure: impl Into<String>) {
        let failure = failure.into();
        self.count += 1;
        if self.last.as_deref() == Some(failure.as_str()) {
            return;
        }
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(&failure);
        self.last = Some(failure);
    }

    /// 失败尝试次数（含重复文本）。
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn text(&self) -> Option<&str> {
        if self.text.is_empty() {
            None
        } else {
            Some(&self.text)
        }
    }
}

/// 聚合失败文本的接收者；每次 `acquire` 至多调用一次，且仅在存在失败时。
pub trait FailureSink: Send + Sync {
    fn on_failures(&self, attempts: u32, failures: &str);
}

/// 默认接收者：以 debug 级别写日志。
#[derive(Debug, Default)]
pub struct TracingFailureSink;

impl FailureSink for TracingFailureSink {
    fn on_failures(&self, attempts: u32, failures: &str) {
        debug!(target: "relay.ingest", attempts, failures = %failures, "acquisition_failures");
    }
}

/// 一次 `acquire` 的完整结果。
#[derive(Debug, Clone)]
pub struct AcquisitionOutcome {
    pub result: AcquisitionResult,
    pub attempts: u32,
    pub failures: FailureLog,
}

/// 采集循环：登录 → 枚举设备 → 逐台查询详情，任一步失败则整次尝试作废重来。
#[derive(Clone)]
pub struct Acquirer {
    api: Arc<dyn TelemetryApi>,
    config: AcquireConfig,
    clock: Arc<dyn Clock>,
    failure_sink: Arc<dyn FailureSink>,
}

impl Acquirer {
    pub fn new(api: Arc<dyn TelemetryApi>, config: AcquireConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            config,
            clock,
            failure_sink: Arc::new(TracingFailureSink),
        }
    }

    pub fn with_failure_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.failure_sink = sink;
        self
    }

    pub fn config(&self) -> &AcquireConfig {
        &self.config
    }

    /// 采集全部设备数据；全部尝试失败时返回空结果。
    pub async fn acquire(&self) -> AcquisitionResult {
        self.acquire_detailed().await.result
    }

    pub async fn acquire_detailed(&self) -> AcquisitionOutcome {
        let max_attempts = self.config.retry.max_attempts();
        let mut failures = FailureLog::default();
        let mut result = AcquisitionResult::new();
        let mut attempts = 0;

        while attempts < max_attempts {
            attempts += 1;
            record_acquisition_attempt();
            match self.run_attempt().await {
                Ok(data) => {
                    info!(
                        target: "relay.ingest",
                        attempt = attempts,
                        devices = data.len(),
                        "acquisition_succeeded"
                    );
                    result = data;
                    break;
                }
                Err(err) => {
                    record_acquisition_failure();
                    warn!(
                        target: "relay.ingest",
                        attempt = attempts,
                        max_attempts,
                        error = %err,
                        "acquisition_attempt_failed"
                    );
                    failures.push(err.to_string());
                    if attempts < max_attempts {
                        self.clock.sleep(self.config.retry.backoff).await;
                    }
                }
            }
        }

        if let Some(text) = failures.text() {
            self.failure_sink.on_failures(failures.count(), text);
        }
        AcquisitionOutcome {
            result,
            attempts,
            failures,
        }
    }

    async fn run_attempt(&self) -> Result<AcquisitionResult, IngestError> {
        let mut session = self.bounded("open_session", self.api.open_session()).await?;
        let outcome = self.collect(session.as_mut()).await;
        if self.bounded("close", async {
            session.close().await;
            Ok(())
        })
        .await
        .is_err()
        {
            warn!(target: "relay.ingest", "session_close_timeout");
        }
        outcome
    }

    async fn collect(
        &self,
        session: &mut dyn TelemetrySession,
    ) -> Result<AcquisitionResult, IngestError> {
        self.bounded(
            "login",
            session.login(&self.config.login, &self.config.password),
        )
        .await?;
        let devices = self.bounded("list_devices", session.list_devices()).await?;

        let mut result = AcquisitionResult::new();
        for device in devices {
            let records = self
                .bounded(
                    "device_details",
                    session.device_details(&device.serial_number, &self.config.parameter_ids),
                )
                .await?;
            let record = records
                .into_iter()
                .next()
                .ok_or_else(|| IngestError::EmptyDetails(device.serial_number.to_string()))?;
            result.insert(device.serial_number, record);
        }
        Ok(result)
    }

    async fn bounded<T, F>(&self, call: &str, future: F) -> Result<T, IngestError>
    where
        F: Future<Output = Result<T, IngestError>>,
    {
        tokio::time::timeout(self.config.request_timeout, future)
            .await
            .map_err(|_| {
                IngestError::Timeout(format!(
                    "{call} exceeded {}ms",
                    self.config.request_timeout.as_millis()
                ))
            })?
    }
}
