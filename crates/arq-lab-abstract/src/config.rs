use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::kind::ProtocolKind;

/// Timeout quantum of the reference program.
pub const DEFAULT_TICK_MS: u64 = 1000;

/// Window used for Go-Back-N / Selective Repeat when none is given.
pub const DEFAULT_WINDOW_SIZE: u32 = 4;

/// Largest window Go-Back-N / Selective Repeat accept.
pub const MAX_WINDOW_SIZE: u32 = 1024;

/// Fault model of the simulated medium. The default is the lossless,
/// zero-latency loopback: every packet is acknowledgeable on the next poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub loss_rate: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub seed: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            loss_rate: 0.0,
            min_latency_ms: 0,
            max_latency_ms: 0,
            seed: 0,
        }
    }
}

impl ChannelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.loss_rate) {
            return Err(ConfigError::InvalidLossRate(self.loss_rate));
        }
        if self.min_latency_ms > self.max_latency_ms {
            return Err(ConfigError::InvalidLatencyRange {
                min: self.min_latency_ms,
                max: self.max_latency_ms,
            });
        }
        Ok(())
    }
}

/// How a tick passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    /// Simulated time jumps forward instantly.
    #[default]
    Virtual,
    /// The calling thread sleeps for every tick.
    RealTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub protocol: ProtocolKind,
    /// Ignored (must be 1 or absent) for Simple Protocol and Stop-and-Wait.
    pub window_size: Option<u32>,
    pub tick_ms: u64,
    /// Window timer length. Defaults to one tick.
    pub timeout_ms: Option<u64>,
    pub pacing: Pacing,
    pub channel: ChannelConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolKind::StopAndWait,
            window_size: None,
            tick_ms: DEFAULT_TICK_MS,
            timeout_ms: None,
            pacing: Pacing::Virtual,
            channel: ChannelConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn new(protocol: ProtocolKind, window_size: Option<u32>) -> Self {
        Self {
            protocol,
            window_size,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match (self.protocol.has_configurable_window(), self.window_size) {
            (_, Some(0)) => return Err(ConfigError::InvalidWindowSize(0)),
            (true, Some(requested)) if requested > MAX_WINDOW_SIZE => {
                return Err(ConfigError::WindowTooLarge {
                    requested,
                    max: MAX_WINDOW_SIZE,
                });
            }
            (false, Some(requested)) if requested > 1 => {
                return Err(ConfigError::WindowNotConfigurable {
                    kind: self.protocol,
                    requested,
                });
            }
            _ => {}
        }
        if self.tick_ms == 0 || self.effective_timeout_ms() == 0 {
            return Err(ConfigError::InvalidTick {
                tick_ms: self.tick_ms,
                timeout_ms: self.effective_timeout_ms(),
            });
        }
        self.channel.validate()
    }

    pub fn effective_window(&self) -> u32 {
        if self.protocol.has_configurable_window() {
            self.window_size.unwrap_or(DEFAULT_WINDOW_SIZE)
        } else {
            1
        }
    }

    pub fn effective_timeout_ms(&self) -> u64 {
        self.timeout_ms.unwrap_or(self.tick_ms)
    }
}
