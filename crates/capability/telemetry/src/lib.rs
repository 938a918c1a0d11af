//! 追踪初始化、周期 ID 与进程级计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cycles_started: u64,
    pub cycles_failed: u64,
    pub acquisition_attempts: u64,
    pub acquisition_failures: u64,
    pub points_emitted: u64,
    pub points_skipped: u64,
    pub emit_failures: u64,
    pub unknown_states: u64,
}

/// 进程级计数器。
pub struct TelemetryMetrics {
    cycles_started: AtomicU64,
    cycles_failed: AtomicU64,
    acquisition_attempts: AtomicU64,
    acquisition_failures: AtomicU64,
    points_emitted: AtomicU64,
    points_skipped: AtomicU64,
    emit_failures: AtomicU64,
    unknown_states: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            cycles_started: AtomicU64::new(0),
            cycles_failed: AtomicU64::new(0),
            acquisition_attempts: AtomicU64::new(0),
            acquisition_failures: AtomicU64::new(0),
            points_emitted: AtomicU64::new(0),
            points_skipped: AtomicU64::new(0),
            emit_failures: AtomicU64::new(0),
            unknown_states: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_started: self.cycles_started.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            acquisition_attempts: self.acquisition_attempts.load(Ordering::Relaxed),
            acquisition_failures: self.acquisition_failures.load(Ordering::Relaxed),
            points_emitted: self.points_emitted.load(Ordering::Relaxed),
            points_skipped: self.points_skipped.load(Ordering::Relaxed),
            emit_failures: self.emit_failures.load(Ordering::Relaxed),
            unknown_states: self.unknown_states.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 cycle_id，关联单次轮询内的日志。
pub fn new_cycle_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录轮询周期开始次数。
pub fn record_cycle_started() {
    metrics().cycles_started.fetch_add(1, Ordering::Relaxed);
}

/// 记录轮询周期硬失败次数（无数据 / 参数非法）。
pub fn record_cycle_failed() {
    metrics().cycles_failed.fetch_add(1, Ordering::Relaxed);
}

/// 记录采集尝试次数。
pub fn record_acquisition_attempt() {
    metrics().acquisition_attempts.fetch_add(1, Ordering::Relaxed);
}

/// 记录采集尝试失败次数。
pub fn record_acquisition_failure() {
    metrics().acquisition_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录指标下发成功次数。
pub fn record_point_emitted() {
    metrics().points_emitted.fetch_add(1, Ordering::Relaxed);
}

/// 记录因取值缺失而跳过的参数次数。
pub fn record_point_skipped() {
    metrics().points_skipped.fetch_add(1, Ordering::Relaxed);
}

/// 记录指标下发失败次数。
pub fn record_emit_failure() {
    metrics().emit_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录未识别的设备状态次数。
pub fn record_unknown_state() {
    metrics().unknown_states.fetch_add(1, Ordering::Relaxed);
}
