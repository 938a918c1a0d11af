use async_trait::async_trait;
use domain::{AcquisitionResult, DeviceId, MetricPoint};
use relay_ingest::{Acquirer, Clock};
use relay_normalize::normalize;
use relay_protocol::{MetricSink, rounded_epoch_seconds};
use relay_telemetry::{
    new_cycle_id, record_cycle_failed, record_cycle_started, record_emit_failure,
    record_point_emitted, record_point_skipped,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, info, info_span, warn};

/// 指标名前缀。
pub const METRIC_PREFIX: &str = "gen";

/// 对齐等待时的时钟轮询粒度。
pub const ALIGNMENT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// 周期处理错误（硬失败，周期内不产生任何下发）。
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid offset: {0} (expected 0-59)")]
    InvalidOffset(u32),
    #[error("no data available this cycle")]
    NoData,
}

/// 单个周期的处理结果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// 本周期所有指标共用的 Unix 秒时间戳
    pub timestamp: i64,
    pub devices: usize,
    pub emitted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// 设备数据来源抽象。
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn acquire(&self) -> AcquisitionResult;
}

#[async_trait]
impl DataSource for Acquirer {
    async fn acquire(&self) -> AcquisitionResult {
        Acquirer::acquire(self).await
    }
}

/// 轮询周期编排：对齐时间戳 → 采集 → 逐设备逐参数规范化 → 下发。
#[derive(Clone)]
pub struct Orchestrator {
    source: Arc<dyn DataSource>,
    sink: Arc<dyn MetricSink>,
    clock: Arc<dyn Clock>,
    parameters: Vec<String>,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn DataSource>,
        sink: Arc<dyn MetricSink>,
        clock: Arc<dyn Clock>,
        parameters: Vec<String>,
    ) -> Self {
        Self {
            source,
            sink,
            clock,
            parameters,
        }
    }

    /// 执行一次轮询；`offset` 为本分钟内对齐到的秒（0-59）。
    pub async fn run_once(&self, offset: u32) -> Result<CycleReport, PipelineError> {
        if offset > 59 {
            record_cycle_failed();
            return Err(PipelineError::InvalidOffset(offset));
        }
        let cycle_id = new_cycle_id();
        let span = info_span!("cycle", cycle_id = %cycle_id, offset);
        self.run_cycle(offset).instrument(span).await
    }

    async fn run_cycle(&self, offset: u32) -> Result<CycleReport, PipelineError> {
        record_cycle_started();
        let ts_ms = aligned_timestamp_ms(self.clock.now_epoch_ms(), offset);
        while self.clock.now_epoch_ms() < ts_ms {
            self.clock.sleep(ALIGNMENT_POLL_INTERVAL).await;
        }
        let timestamp = rounded_epoch_seconds(ts_ms);

        let data = self.source.acquire().await;
        if data.is_empty() {
            record_cycle_failed();
            warn!(target: "relay.pipeline", timestamp, "cycle_no_data");
            return Err(PipelineError::NoData);
        }

        let mut report = CycleReport {
            timestamp,
            devices: data.len(),
            ..CycleReport::default()
        };
        for (device, record) in data.iter() {
            for parameter in &self.parameters {
                let Some(value) = normalize(record, parameter) else {
                    record_point_skipped();
                    report.skipped += 1;
                    debug!(
                        target: "relay.pipeline",
                        device = %device,
                        parameter = %parameter,
                        "parameter_absent"
                    );
                    continue;
                };
                let point = MetricPoint {
                    name: metric_name(parameter, device),
                    value,
                    timestamp,
                };
                match self.sink.emit(&point).await {
                    Ok(()) => {
                        record_point_emitted();
                        report.emitted += 1;
                    }
                    Err(err) => {
                        record_emit_failure();
                        report.failed += 1;
                        warn!(
                            target: "relay.pipeline",
                            metric = %point.name,
                            value = %point.value,
                            error = %err,
                            "metric_emit_failed"
                        );
                    }
                }
            }
        }

        info!(
            target: "relay.pipeline",
            timestamp = report.timestamp,
            devices = report.devices,
            emitted = report.emitted,
            skipped = report.skipped,
            failed = report.failed,
            "cycle_completed"
        );
        Ok(report)
    }
}

/// 将 `now_ms` 的分内秒替换为 `offset`，保留毫秒部分。
pub fn aligned_timestamp_ms(now_ms: i64, offset: u32) -> i64 {
    let minute_start = now_ms - now_ms.rem_euclid(60_000);
    let millis = now_ms.rem_euclid(1_000);
    minute_start + i64::from(offset) * 1_000 + millis
}

/// 参数名中的空格、点号、斜杠替换为下划线，其余字符不变。
pub fn sanitize_parameter(parameter: &str) -> String {
    parameter.replace([' ', '.', '/'], "_")
}

/// `gen.<参数>.<设备>`
pub fn metric_name(parameter: &str, device: &DeviceId) -> String {
    format!("{}.{}.{}", METRIC_PREFIX, sanitize_parameter(parameter), device)
}
