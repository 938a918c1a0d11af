//! # 指标下发能力模块
//!
//! 将规范化后的指标点以 Carbon plaintext 协议写入时序后端：
//!
//! ```text
//! MetricPoint { name, value, timestamp }
//!       │
//!       ▼
//! format_line  →  "gen.EngineSpeed.ABC123 1800 1700000000\n"
//!       │
//!       ▼
//! CarbonTcpSink（每点一条 TCP 连接，不等待应答）
//! ```
//!
//! 单个指标的连接或写入失败只影响该指标，由调用方决定是否继续。

mod carbon;
mod error;
mod line;

pub use carbon::{CarbonConfig, CarbonTcpSink, MetricSink};
pub use error::EmitError;
pub use line::{format_line, format_value, rounded_epoch_seconds};
