//! 单次轮询入口：加载配置，按配置的秒偏移依次执行轮询周期后退出。
//!
//! 由外部调度器（cron / systemd timer）每分钟调用一次。

use relay_config::AppConfig;
use relay_ingest::{
    AcquireConfig, Acquirer, OncueHttpApi, OncueHttpConfig, RetryPolicy, SystemClock,
};
use relay_pipeline::Orchestrator;
use relay_protocol::{CarbonConfig, CarbonTcpSink};
use relay_telemetry::{init_tracing, metrics};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在）
    dotenvy::dotenv().ok();
    let config = load_config()?;
    // 初始化结构化日志
    init_tracing();

    let orchestrator = build_orchestrator(&config);
    for offset in &config.offsets {
        // 单个周期失败只记录，下一个调度点再试
        match orchestrator.run_once(*offset).await {
            Ok(report) => info!(
                target: "relay.app",
                offset,
                emitted = report.emitted,
                skipped = report.skipped,
                failed = report.failed,
                "poll_finished"
            ),
            Err(err) => warn!(target: "relay.app", offset, error = %err, "poll_failed"),
        }
    }

    let snapshot = metrics().snapshot();
    info!(target: "relay.app", ?snapshot, "relay_exit");
    Ok(())
}

/// `ONCUE_CONFIG_FILE` 指向 config.json 时优先使用，否则读环境变量。
fn load_config() -> Result<AppConfig, relay_config::ConfigError> {
    match std::env::var("ONCUE_CONFIG_FILE") {
        Ok(path) if !path.is_empty() => AppConfig::from_json_file(path),
        _ => AppConfig::from_env(),
    }
}

fn build_orchestrator(config: &AppConfig) -> Orchestrator {
    let clock = Arc::new(SystemClock);
    let request_timeout = Duration::from_secs(config.request_timeout_seconds);

    let api = OncueHttpApi::new(OncueHttpConfig {
        base_url: config.api_base_url.clone(),
        request_timeout,
    });
    let acquirer = Acquirer::new(Arc::new(api), acquire_config(config), clock.clone());
    let sink = CarbonTcpSink::new(CarbonConfig {
        host: config.carbon_server.clone(),
        port: config.carbon_port,
        connect_timeout_ms: config.connect_timeout_seconds.saturating_mul(1000),
    });
    info!(
        target: "relay.app",
        carbon = %format!("{}:{}", config.carbon_server, config.carbon_port),
        parameters = config.parameters.len(),
        parameter_ids = config.parameter_ids.len(),
        "relay_configured"
    );

    Orchestrator::new(
        Arc::new(acquirer),
        Arc::new(sink),
        clock,
        config.parameters.clone(),
    )
}

fn acquire_config(config: &AppConfig) -> AcquireConfig {
    AcquireConfig {
        login: config.login.clone(),
        password: config.password.clone(),
        parameter_ids: config.parameter_ids.clone(),
        retry: RetryPolicy {
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        },
        request_timeout: Duration::from_secs(config.request_timeout_seconds),
    }
}

#[cfg(test)]
mod tests {
    use super::acquire_config;
    use relay_config::AppConfig;
    use std::time::Duration;

    #[test]
    fn acquire_config_uses_retry_settings() {
        let config = AppConfig::from_json_str(
            r#"{"login": "u", "password": "p", "carbon_server": "graphite"}"#,
        )
        .expect("config");
        let acquire = acquire_config(&config);
        assert_eq!(acquire.retry.max_retries, 5);
        assert_eq!(acquire.retry.backoff, Duration::from_secs(1));
        assert_eq!(acquire.request_timeout, Duration::from_secs(30));
        assert_eq!(acquire.parameter_ids.len(), 50);
    }
}
