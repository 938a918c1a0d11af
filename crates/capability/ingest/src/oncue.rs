//! Oncue 遥测 REST API 客户端
//!
//! 每次采集尝试构造独立的 HTTP 客户端；登录拿到的 session key 以查询参数随后续请求携带。

use crate::{IngestError, TelemetryApi, TelemetrySession};
use async_trait::async_trait;
use domain::{DeviceId, DeviceSummary, RawDeviceRecord};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const LOGIN_PATH: &str = "users/connect";
const DEVICE_LIST_PATH: &str = "devices/devicelist";
const DEVICE_DETAILS_PATH: &str = "devices/devicedetails";

/// Oncue API 客户端配置
#[derive(Debug, Clone)]
pub struct OncueHttpConfig {
    /// API 根地址，如 `https://api.kohler.com/krm/v1`
    pub base_url: String,
    /// 单个 HTTP 请求超时
    pub request_timeout: Duration,
}

/// 基于 reqwest 的 Oncue API 实现。
#[derive(Debug, Clone)]
pub struct OncueHttpApi {
    config: OncueHttpConfig,
}

impl OncueHttpApi {
    pub fn new(config: OncueHttpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TelemetryApi for OncueHttpApi {
    async fn open_session(&self) -> Result<Box<dyn TelemetrySession>, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(self.config.request_timeout)
            .build()
            .map_err(|err| IngestError::Api(format!("failed to create http client: {err}")))?;
        Ok(Box::new(OncueSession {
            client: Some(client),
            base_url: self.config.base_url.trim_end_matches('/').to_string(),
            session_key: None,
        }))
    }
}

struct OncueSession {
    client: Option<reqwest::Client>,
    base_url: String,
    session_key: Option<String>,
}

impl OncueSession {
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, IngestError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| IngestError::Api("session closed".to_string()))?;
        let url = format!("{}/{}", self.base_url, path);
        let response = client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|err| IngestError::Api(format!("{path}: {err}")))?
            .error_for_status()
            .map_err(|err| IngestError::Api(format!("{path}: {err}")))?;
        response
            .json::<Value>()
            .await
            .map_err(|err| IngestError::Decode(format!("{path}: {err}")))
    }

    fn session_key(&self) -> Result<String, IngestError> {
        self.session_key
            .clone()
            .ok_or_else(|| IngestError::Auth("not logged in".to_string()))
    }
}

#[async_trait]
impl TelemetrySession for OncueSession {
    async fn login(&mut self, user: &str, password: &str) -> Result<(), IngestError> {
        let body = self
            .get_json(
                LOGIN_PATH,
                &[
                    ("username", user.to_string()),
                    ("password", password.to_string()),
                ],
            )
            .await?;
        self.session_key = Some(parse_login(&body)?);
        debug!(target: "relay.ingest", "oncue_login_ok");
        Ok(())
    }

    async fn list_devices(&self) -> Result<Vec<DeviceSummary>, IngestError> {
        let body = self
            .get_json(DEVICE_LIST_PATH, &[("sessionkey", self.session_key()?)])
            .await?;
        serde_json::from_value(body)
            .map_err(|err| IngestError::Decode(format!("{DEVICE_LIST_PATH}: {err}")))
    }

    async fn device_details(
        &self,
        device: &DeviceId,
        parameter_ids: &[u32],
    ) -> Result<Vec<RawDeviceRecord>, IngestError> {
        let parameters = parameter_ids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let body = self
            .get_json(
                DEVICE_DETAILS_PATH,
                &[
                    ("sessionkey", self.session_key()?),
                    ("serialnumber", device.to_string()),
                    ("parameters", parameters),
                ],
            )
            .await?;
        parse_details(body)
    }

    async fn close(&mut self) {
        self.session_key = None;
        self.client = None;
    }
}

/// 登录响应 -> session key；响应带非 200 的 `code` 视为认证失败。
fn parse_login(body: &Value) -> Result<String, IngestError> {
    if let Some(code) = body.get("code").and_then(Value::as_i64) {
        if code != 200 {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("login rejected");
            return Err(IngestError::Auth(format!("{code}: {message}")));
        }
    }
    body.get("sessionkey")
        .and_then(Value::as_str)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .ok_or_else(|| IngestError::Auth("missing sessionkey".to_string()))
}

/// 详情响应可能是记录数组，也可能是单个记录对象。
fn parse_details(body: Value) -> Result<Vec<RawDeviceRecord>, IngestError> {
    let items = match body {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        other => {
            return Err(IngestError::Decode(format!(
                "{DEVICE_DETAILS_PATH}: unexpected body {other}"
            )));
        }
    };
    items
        .into_iter()
        .map(|item| {
            RawDeviceRecord::from_value(item).ok_or_else(|| {
                IngestError::Decode(format!("{DEVICE_DETAILS_PATH}: record is not an object"))
            })
        })
        .collect()
}
