//! 设备运行状态的数值编码。

/// 设备运行状态（封闭枚举，未识别的原始值保留在 `Unrecognized` 中）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceState {
    Stopping,
    CrankOn,
    /// 控制器在状态切换间隙上报的 `-` / `--`。
    Transition,
    /// "Performing Unloaded Full Speed Exercise"
    Exercising,
    Running,
    Standby,
    Off,
    Unrecognized(String),
}

impl DeviceState {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Stopping" => Self::Stopping,
            "Crank On" => Self::CrankOn,
            "-" | "--" => Self::Transition,
            "Performing Unloaded Full Speed Exercise" => Self::Exercising,
            "Running" => Self::Running,
            "Standby" => Self::Standby,
            "Off" => Self::Off,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// 状态 -> 指标值：过渡态 0.5，运行 1，待机 0，关机 -1；未识别按运行处理。
    pub fn encode(&self) -> f64 {
        match self {
            Self::Stopping | Self::CrankOn | Self::Transition => 0.5,
            Self::Exercising | Self::Running => 1.0,
            Self::Standby => 0.0,
            Self::Off => -1.0,
            Self::Unrecognized(_) => 1.0,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}
