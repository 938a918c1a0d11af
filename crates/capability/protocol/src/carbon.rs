//! Carbon TCP 下发
//!
//! 每个指标点新建一条连接，写完即关闭，不读取后端应答。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let sink = CarbonTcpSink::new(CarbonConfig {
//!     host: "graphite.local".to_string(),
//!     port: 2003,
//!     connect_timeout_ms: 5000,
//! });
//! sink.emit(&point).await?;
//! ```

use crate::error::EmitError;
use crate::line::format_line;
use async_trait::async_trait;
use domain::MetricPoint;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

/// 指标下发目标抽象。
#[async_trait]
pub trait MetricSink: Send + Sync {
    async fn emit(&self, point: &MetricPoint) -> Result<(), EmitError>;
}

/// Carbon 后端配置
#[derive(Debug, Clone)]
pub struct CarbonConfig {
    /// 后端主机地址
    pub host: String,
    /// 后端端口（plaintext 协议默认 2003）
    pub port: u16,
    /// 建连超时（毫秒），同时约束写入耗时
    pub connect_timeout_ms: u64,
}

/// Carbon plaintext 协议下发器
#[derive(Debug, Clone)]
pub struct CarbonTcpSink {
    config: CarbonConfig,
}

impl CarbonTcpSink {
    pub fn new(config: CarbonConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CarbonConfig {
        &self.config
    }

    async fn send_line(&self, line: &str) -> Result<(), EmitError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let mut stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| EmitError::Connection(format!("{addr}: {e}")))?;
        stream.write_all(line.as_bytes()).await?;
        stream.flush().await?;
        // 主动半关闭，让后端尽快看到 EOF
        let _ = stream.shutdown().await;
        Ok(())
    }
}

#[async_trait]
impl MetricSink for CarbonTcpSink {
    async fn emit(&self, point: &MetricPoint) -> Result<(), EmitError> {
        let line = format_line(point)?;
        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        tokio::time::timeout(timeout, self.send_line(&line))
            .await
            .map_err(|_| {
                EmitError::Timeout(format!(
                    "{}:{} after {}ms",
                    self.config.host, self.config.port, self.config.connect_timeout_ms
                ))
            })??;
        debug!(target: "relay.protocol", line = %line.trim_end(), "metric_line_sent");
        Ok(())
    }
}
