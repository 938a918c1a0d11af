//! 应用运行配置加载。

use serde::Deserialize;
use std::env;
use std::path::Path;

/// 默认下发的参数名（按下发顺序）。
pub const DEFAULT_PARAMETERS: [&str; 12] = [
    "devicestate",
    "EngineSpeed",
    "EngineOilPressure",
    "BatteryVoltage",
    "LubeOilTemperature",
    "GensetControllerTemperature",
    "GeneratorTrueTotalPower",
    "GeneratorTruePercentOfRatedPower",
    "GeneratorVoltageAverageLineToLine",
    "GeneratorFrequency",
    "GensetControllerTotalOperationTime",
    "EngineTotalRunTime",
];

/// 默认向 API 请求的参数编号。
pub const DEFAULT_PARAMETER_IDS: [u32; 50] = [
    4, 5, 6, 7, 11, 18, 20, 26, 33, 34, 36, 37, 38, 39, 40, 41, 42, 43, 44, 45, 46, 47, 48, 49,
    50, 51, 52, 53, 54, 55, 56, 57, 58, 59, 60, 65, 66, 67, 68, 69, 114, 115, 116, 118, 119, 123,
    124, 125, 128, 129,
];

pub const DEFAULT_API_BASE_URL: &str = "https://api.kohler.com/krm/v1";
pub const DEFAULT_CARBON_PORT: u16 = 2003;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("config file io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config file parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// 应用运行配置（进程生命周期内不可变）。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub login: String,
    pub password: String,
    pub carbon_server: String,
    pub carbon_port: u16,
    pub parameters: Vec<String>,
    pub parameter_ids: Vec<u32>,
    /// 每次运行依次执行的秒偏移（0-59）。
    pub offsets: Vec<u32>,
    pub api_base_url: String,
    pub request_timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

/// 旧版 `config.json` 文档。
#[derive(Debug, Deserialize)]
struct FileConfig {
    login: String,
    password: String,
    carbon_server: String,
    #[serde(default = "default_carbon_port")]
    carbon_port: u16,
    parameters: Option<Vec<String>>,
    parameter_ids: Option<Vec<u32>>,
    offsets: Option<Vec<u32>>,
    api_base_url: Option<String>,
}

fn default_carbon_port() -> u16 {
    DEFAULT_CARBON_PORT
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置（环境变量读取的可测试形式）。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let login = read("ONCUE_LOGIN").ok_or_else(|| ConfigError::Missing("ONCUE_LOGIN".into()))?;
        let password =
            read("ONCUE_PASSWORD").ok_or_else(|| ConfigError::Missing("ONCUE_PASSWORD".into()))?;
        let carbon_server =
            read("CARBON_SERVER").ok_or_else(|| ConfigError::Missing("CARBON_SERVER".into()))?;
        let carbon_port = parse_with_default(read("CARBON_PORT"), "CARBON_PORT", DEFAULT_CARBON_PORT)?;
        let parameters = match read("ONCUE_PARAMETERS") {
            Some(value) => split_list(&value).map(str::to_string).collect(),
            None => default_parameters(),
        };
        let parameter_ids = match read("ONCUE_PARAMETER_IDS") {
            Some(value) => parse_list("ONCUE_PARAMETER_IDS", &value)?,
            None => DEFAULT_PARAMETER_IDS.to_vec(),
        };
        let offsets = match read("ONCUE_OFFSETS") {
            Some(value) => parse_list("ONCUE_OFFSETS", &value)?,
            None => vec![0],
        };
        let api_base_url =
            read("ONCUE_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let request_timeout_seconds = parse_with_default(
            read("ONCUE_REQUEST_TIMEOUT_SECONDS"),
            "ONCUE_REQUEST_TIMEOUT_SECONDS",
            30,
        )?;
        let connect_timeout_seconds = parse_with_default(
            read("CARBON_CONNECT_TIMEOUT_SECONDS"),
            "CARBON_CONNECT_TIMEOUT_SECONDS",
            5,
        )?;
        let max_retries = parse_with_default(read("ONCUE_MAX_RETRIES"), "ONCUE_MAX_RETRIES", 5)?;
        let retry_backoff_ms =
            parse_with_default(read("ONCUE_RETRY_BACKOFF_MS"), "ONCUE_RETRY_BACKOFF_MS", 1000)?;

        Self {
            login,
            password,
            carbon_server,
            carbon_port,
            parameters,
            parameter_ids,
            offsets,
            api_base_url,
            request_timeout_seconds,
            connect_timeout_seconds,
            max_retries,
            retry_backoff_ms,
        }
        .validated()
    }

    /// 解析 `config.json` 文档；未给出的列表使用默认值。
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = serde_json::from_str(json)?;
        Self {
            login: file.login,
            password: file.password,
            carbon_server: file.carbon_server,
            carbon_port: file.carbon_port,
            parameters: file.parameters.unwrap_or_else(default_parameters),
            parameter_ids: file
                .parameter_ids
                .unwrap_or_else(|| DEFAULT_PARAMETER_IDS.to_vec()),
            offsets: file.offsets.unwrap_or_else(|| vec![0]),
            api_base_url: file
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            request_timeout_seconds: 30,
            connect_timeout_seconds: 5,
            max_retries: 5,
            retry_backoff_ms: 1000,
        }
        .validated()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.carbon_server.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "carbon_server".to_string(),
                self.carbon_server,
            ));
        }
        if let Some(offset) = self.offsets.iter().find(|offset| **offset > 59) {
            return Err(ConfigError::Invalid("offsets".to_string(), offset.to_string()));
        }
        Ok(self)
    }
}

fn default_parameters() -> Vec<String> {
    DEFAULT_PARAMETERS.iter().map(|name| name.to_string()).collect()
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn parse_list<T: std::str::FromStr>(key: &str, value: &str) -> Result<Vec<T>, ConfigError> {
    split_list(value)
        .map(|item| {
            item.parse::<T>()
                .map_err(|_| ConfigError::Invalid(key.to_string(), item.to_string()))
        })
        .collect()
}

fn parse_with_default<T: std::str::FromStr>(
    value: Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    let value = match value {
        Some(value) => value,
        None => return Ok(default),
    };
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}
