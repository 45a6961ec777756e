pub mod config;
pub mod error;
pub mod kind;
pub mod packet;
pub mod scenario;

pub use config::{ChannelConfig, DEFAULT_TICK_MS, DEFAULT_WINDOW_SIZE, MAX_WINDOW_SIZE, Pacing, SessionConfig};
pub use error::ConfigError;
pub use kind::ProtocolKind;
pub use packet::{Ack, Packet};

pub use scenario::{ConfigOverride, TestAction, TestAssertion, TestScenario};
