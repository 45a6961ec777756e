use serde::Deserialize;

use crate::config::{Pacing, SessionConfig};
use crate::kind::ProtocolKind;

/// A scripted run loaded from TOML: open a session, replay `actions`, then
/// check `assertions` against the final state and the event timeline.
#[derive(Deserialize, Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub protocol: ProtocolKind,
    pub window_size: Option<u32>,
    #[serde(default)]
    pub config: ConfigOverride,
    #[serde(default)]
    pub actions: Vec<TestAction>,
    #[serde(default)]
    pub assertions: Vec<TestAssertion>,
}

impl TestScenario {
    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::new(self.protocol, self.window_size);
        self.config.apply_to(&mut config);
        config
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ConfigOverride {
    pub loss_rate: Option<f64>,
    pub min_latency_ms: Option<u64>,
    pub max_latency_ms: Option<u64>,
    pub seed: Option<u64>,
    pub tick_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub pacing: Option<Pacing>,
}

impl ConfigOverride {
    pub fn apply_to(&self, config: &mut SessionConfig) {
        if let Some(v) = self.loss_rate {
            config.channel.loss_rate = v;
        }
        if let Some(v) = self.min_latency_ms {
            config.channel.min_latency_ms = v;
        }
        if let Some(v) = self.max_latency_ms {
            config.channel.max_latency_ms = v;
        }
        if let Some(v) = self.seed {
            config.channel.seed = v;
        }
        if let Some(v) = self.tick_ms {
            config.tick_ms = v;
        }
        if let Some(v) = self.timeout_ms {
            config.timeout_ms = Some(v);
        }
        if let Some(v) = self.pacing {
            config.pacing = v;
        }
    }
}

fn one() -> u32 {
    1
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAction {
    /// Application hands a message to the session
    Send { text: String },
    /// Advance simulated time by `count` ticks
    Tick {
        #[serde(default = "one")]
        count: u32,
    },
    /// Lose the next transmission of `seq`
    DropNextPacket { seq: u32 },
    /// Discard the next ack for `seq` instead of delivering it
    DropNextAck { seq: u32 },
    /// Tick until nothing is queued or in flight
    RunUntilIdle { max_ticks: u64 },
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAssertion {
    /// Lower window edge at the end of the run
    BaseIs { base: u32 },
    /// Exact set of sequence numbers still in flight
    InFlightIs { seqs: Vec<u32> },
    /// Exact set of Selective Repeat credits waiting for contiguity
    AckedOutOfOrderIs { seqs: Vec<u32> },
    /// Order of first transmissions
    SentSequenceIs { seqs: Vec<u32> },
    /// Every retransmitted sequence number, in order
    RetransmittedIs { seqs: Vec<u32> },
    /// At least `count` timeouts happened
    TimeoutsAtLeast { count: u32 },
    /// Total transmissions, retransmissions included
    PacketsSentBetween { min: u32, max: Option<u32> },
    /// Nothing queued or in flight
    Idle,
}
