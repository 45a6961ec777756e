use thiserror::Error;

use crate::kind::ProtocolKind;

/// Rejected session configuration. Raised before any packet is sent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("window size must be at least 1, got {0}")]
    InvalidWindowSize(u32),

    #[error("window size {requested} exceeds the maximum of {max}")]
    WindowTooLarge { requested: u32, max: u32 },

    #[error("{kind} uses a fixed window of 1, got {requested}")]
    WindowNotConfigurable { kind: ProtocolKind, requested: u32 },

    #[error("loss rate must be within [0, 1], got {0}")]
    InvalidLossRate(f64),

    #[error("latency range is inverted: min {min} ms > max {max} ms")]
    InvalidLatencyRange { min: u64, max: u64 },

    #[error("tick and timeout must be positive (tick {tick_ms} ms, timeout {timeout_ms} ms)")]
    InvalidTick { tick_ms: u64, timeout_ms: u64 },

    #[error("unknown protocol '{0}'. Try 'simple', 'stop-and-wait', 'go-back-n' or 'selective-repeat'")]
    UnknownProtocol(String),
}
