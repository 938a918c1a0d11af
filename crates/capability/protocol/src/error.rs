//! 下发错误类型定义

/// 指标下发错误（仅影响单个指标点）
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// 连接错误
    #[error("connection error: {0}")]
    Connection(String),

    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 超时错误
    #[error("timeout: {0}")]
    Timeout(String),

    /// 无法构造合法的协议行
    #[error("invalid line: {0}")]
    InvalidLine(String),
}
