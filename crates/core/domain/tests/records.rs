use domain::{AcquisitionResult, DeviceId, DeviceSummary, RawDeviceRecord, ReadingValue};
use serde_json::json;

fn record(value: serde_json::Value) -> RawDeviceRecord {
    RawDeviceRecord::from_value(value).expect("object")
}

#[test]
fn device_summary_reads_serialnumber() {
    let devices: Vec<DeviceSummary> = serde_json::from_value(json!([
        {"serialnumber": "ABC123", "name": "Genset", "online": true},
        {"serialnumber": "XYZ789"}
    ]))
    .expect("devices");

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].serial_number, DeviceId::new("ABC123"));
    assert_eq!(devices[1].serial_number.as_str(), "XYZ789");
}

#[test]
fn parameter_entries_skip_malformed_items() {
    let record = record(json!({
        "parameters": [
            {"name": "EngineSpeed", "value": 1800},
            {"value": 12},
            {"name": 7, "value": 1},
            {"name": "BatteryVoltage"}
        ]
    }));

    let entries: Vec<_> = record.parameter_entries().collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], ("EngineSpeed", &json!(1800)));
    assert_eq!(entries[1], ("BatteryVoltage", &serde_json::Value::Null));
}

#[test]
fn parameter_entries_empty_without_array() {
    assert_eq!(record(json!({"devicestate": "Running"})).parameter_entries().count(), 0);
    assert_eq!(record(json!({"parameters": "oops"})).parameter_entries().count(), 0);
}

#[test]
fn reading_value_from_json_scalars() {
    assert_eq!(ReadingValue::from_json(&json!(1800)), Some(ReadingValue::Int(1800)));
    assert_eq!(ReadingValue::from_json(&json!(12.5)), Some(ReadingValue::Float(12.5)));
    assert_eq!(ReadingValue::from_json(&json!(true)), Some(ReadingValue::Bool(true)));
    assert_eq!(
        ReadingValue::from_json(&json!("13.2")),
        Some(ReadingValue::Text("13.2".to_string()))
    );
    assert_eq!(ReadingValue::from_json(&json!(null)), None);
    assert_eq!(ReadingValue::from_json(&json!([1, 2])), None);
}

#[test]
fn acquisition_result_keeps_enumeration_order() {
    let mut result = AcquisitionResult::new();
    result.insert(DeviceId::new("B"), record(json!({"n": 1})));
    result.insert(DeviceId::new("A"), record(json!({"n": 2})));
    result.insert(DeviceId::new("B"), record(json!({"n": 3})));

    let order: Vec<_> = result.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(order, vec!["B", "A"]);
    assert_eq!(result.len(), 2);
    assert_eq!(
        result.get(&DeviceId::new("B")).and_then(|r| r.field("n")),
        Some(&json!(3))
    );
}
