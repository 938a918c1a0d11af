use async_trait::async_trait;
use domain::{AcquisitionResult, DeviceId, MetricPoint, RawDeviceRecord, ReadingValue};
use relay_ingest::ManualClock;
use relay_pipeline::{DataSource, Orchestrator, PipelineError};
use relay_protocol::{CarbonConfig, CarbonTcpSink, EmitError, MetricSink, format_line};
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

/// 整分钟 + 10.3 秒
const NOW_MS: i64 = 1_699_999_980_000 + 10_300;

#[derive(Default)]
struct FixedSource {
    result: AcquisitionResult,
    calls: AtomicU32,
}

#[async_trait]
impl DataSource for FixedSource {
    async fn acquire(&self) -> AcquisitionResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

#[derive(Default)]
struct RecordingSink {
    points: Mutex<Vec<MetricPoint>>,
    fail_names: Vec<String>,
}

#[async_trait]
impl MetricSink for RecordingSink {
    async fn emit(&self, point: &MetricPoint) -> Result<(), EmitError> {
        if self.fail_names.contains(&point.name) {
            return Err(EmitError::Connection("refused".to_string()));
        }
        self.points.lock().unwrap().push(point.clone());
        Ok(())
    }
}

fn source(devices: &[(&str, serde_json::Value)]) -> Arc<FixedSource> {
    let mut result = AcquisitionResult::new();
    for (id, record) in devices {
        result.insert(
            DeviceId::new(*id),
            RawDeviceRecord::from_value(record.clone()).unwrap(),
        );
    }
    Arc::new(FixedSource {
        result,
        ..FixedSource::default()
    })
}

fn parameters(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[tokio::test]
async fn emits_state_and_parameter_with_shared_timestamp() {
    let source = source(&[(
        "ABC123",
        json!({"devicestate": "Running", "parameters": [{"name": "EngineSpeed", "value": 1800}]}),
    )]);
    let sink = Arc::new(RecordingSink::default());
    let clock = Arc::new(ManualClock::new(NOW_MS));
    let orchestrator = Orchestrator::new(
        source,
        sink.clone(),
        clock.clone(),
        parameters(&["devicestate", "EngineSpeed"]),
    );

    let report = orchestrator.run_once(0).await.expect("cycle");

    assert_eq!(report.timestamp, 1_699_999_980);
    assert_eq!(report.emitted, 2);
    assert!(clock.sleeps().is_empty());

    let lines: Vec<String> = sink
        .points
        .lock()
        .unwrap()
        .iter()
        .map(|point| format_line(point).unwrap())
        .collect();
    assert_eq!(
        lines,
        vec![
            "gen.devicestate.ABC123 1 1699999980\n".to_string(),
            "gen.EngineSpeed.ABC123 1800 1699999980\n".to_string(),
        ]
    );
}

#[tokio::test]
async fn waits_for_future_offset() {
    let source = source(&[("ABC123", json!({"devicestate": "Standby"}))]);
    let sink = Arc::new(RecordingSink::default());
    let clock = Arc::new(ManualClock::new(NOW_MS));
    let orchestrator = Orchestrator::new(
        source,
        sink.clone(),
        clock.clone(),
        parameters(&["devicestate"]),
    );

    let report = orchestrator.run_once(30).await.expect("cycle");

    // 10.3s -> 30.3s，以 0.5s 粒度轮询
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(500); 40]);
    assert_eq!(report.timestamp, 1_700_000_010);
    let points = sink.points.lock().unwrap();
    assert_eq!(points[0].value, ReadingValue::Float(0.0));
    assert_eq!(points[0].timestamp, 1_700_000_010);
}

#[tokio::test]
async fn absent_parameters_are_skipped() {
    let source = source(&[(
        "ABC123",
        json!({"devicestate": "Off", "parameters": [{"name": "EngineSpeed", "value": 0}]}),
    )]);
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::new(
        source,
        sink.clone(),
        Arc::new(ManualClock::new(NOW_MS)),
        parameters(&["devicestate", "EngineOilPressure", "EngineSpeed"]),
    );

    let report = orchestrator.run_once(0).await.expect("cycle");

    assert_eq!(report.emitted, 2);
    assert_eq!(report.skipped, 1);
    let names: Vec<String> = sink
        .points
        .lock()
        .unwrap()
        .iter()
        .map(|point| point.name.clone())
        .collect();
    assert_eq!(names, vec!["gen.devicestate.ABC123", "gen.EngineSpeed.ABC123"]);
}

#[tokio::test]
async fn devices_then_parameters_in_order() {
    let source = source(&[
        ("B-2", json!({"devicestate": "Running", "EngineSpeed": 1800})),
        ("A-1", json!({"devicestate": "Stopping", "EngineSpeed": 900})),
    ]);
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::new(
        source,
        sink.clone(),
        Arc::new(ManualClock::new(NOW_MS)),
        parameters(&["EngineSpeed", "devicestate"]),
    );

    orchestrator.run_once(0).await.expect("cycle");

    let names: Vec<String> = sink
        .points
        .lock()
        .unwrap()
        .iter()
        .map(|point| point.name.clone())
        .collect();
    assert_eq!(
        names,
        vec![
            "gen.EngineSpeed.B-2",
            "gen.devicestate.B-2",
            "gen.EngineSpeed.A-1",
            "gen.devicestate.A-1",
        ]
    );
}

#[tokio::test]
async fn empty_acquisition_is_a_hard_failure() {
    let source = Arc::new(FixedSource::default());
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::new(
        source.clone(),
        sink.clone(),
        Arc::new(ManualClock::new(NOW_MS)),
        parameters(&["devicestate"]),
    );

    let err = orchestrator.run_once(0).await.expect_err("no data");

    assert!(matches!(err, PipelineError::NoData));
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert!(sink.points.lock().unwrap().is_empty());
}

#[tokio::test]
async fn emission_failure_does_not_abort_cycle() {
    let source = source(&[(
        "ABC123",
        json!({"devicestate": "Running", "BatteryVoltage": 13.2, "EngineSpeed": 1800}),
    )]);
    let sink = Arc::new(RecordingSink {
        fail_names: vec!["gen.devicestate.ABC123".to_string()],
        ..RecordingSink::default()
    });
    let orchestrator = Orchestrator::new(
        source,
        sink.clone(),
        Arc::new(ManualClock::new(NOW_MS)),
        parameters(&["devicestate", "BatteryVoltage", "EngineSpeed"]),
    );

    let report = orchestrator.run_once(0).await.expect("cycle");

    assert_eq!(report.failed, 1);
    assert_eq!(report.emitted, 2);
    assert_eq!(sink.points.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_offset_is_rejected_before_acquiring() {
    let source = source(&[("ABC123", json!({"devicestate": "Running"}))]);
    let orchestrator = Orchestrator::new(
        source.clone(),
        Arc::new(RecordingSink::default()),
        Arc::new(ManualClock::new(NOW_MS)),
        parameters(&["devicestate"]),
    );

    let err = orchestrator.run_once(60).await.expect_err("offset");

    assert_eq!(err.to_string(), "invalid offset: 60 (expected 0-59)");
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sanitized_names_reach_carbon_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let collector = tokio::spawn(async move {
        let mut lines = Vec::new();
        for _ in 0..2 {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut line = String::new();
            socket.read_to_string(&mut line).await.expect("read");
            lines.push(line);
        }
        lines
    });

    let source = source(&[(
        "ABC123",
        json!({
            "devicestate": "Running",
            "parameters": [{"name": "Generator Frequency/Hz", "value": 60}]
        }),
    )]);
    let sink = Arc::new(CarbonTcpSink::new(CarbonConfig {
        host: "127.0.0.1".to_string(),
        port,
        connect_timeout_ms: 2000,
    }));
    let orchestrator = Orchestrator::new(
        source,
        sink,
        Arc::new(ManualClock::new(NOW_MS)),
        parameters(&["devicestate", "Generator Frequency/Hz"]),
    );

    let report = orchestrator.run_once(0).await.expect("cycle");
    assert_eq!(report.emitted, 2);

    let lines = collector.await.expect("collector");
    assert_eq!(
        lines,
        vec![
            "gen.devicestate.ABC123 1 1699999980\n".to_string(),
            "gen.Generator_Frequency_Hz.ABC123 60 1699999980\n".to_string(),
        ]
    );
}
