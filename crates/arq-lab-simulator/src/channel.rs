//! Simulated medium between the sender and its implicit receiver.
//!
//! The sender only ever sees two capabilities: putting a packet on the wire
//! ([`Transmitter`]) and asking whether the acknowledgement for a sequence
//! number has come back ([`Receiver`]). Acks are consumed by the poll that
//! observes them, so each one is delivered at most once.

use std::collections::{BTreeMap, BTreeSet};

use arq_lab_abstract::{Ack, ChannelConfig, Packet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

pub trait Transmitter {
    fn transmit(&mut self, packet: &Packet, now_ms: u64);
}

pub trait Receiver {
    /// The ack for `seq`, if it has arrived by `now_ms`. The ack is removed
    /// from the medium.
    fn poll_ack(&mut self, seq: u32, now_ms: u64) -> Option<Ack>;

    /// Forget any ack for `seq` still in the medium, arrived or not. Called
    /// when the sender learned of the ack another way.
    fn discard_ack(&mut self, seq: u32);
}

pub trait Channel: Transmitter + Receiver + Send {
    fn stats(&self) -> ChannelStats;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    pub transmitted: u32,
    pub lost: u32,
    pub acks_delivered: u32,
    pub acks_dropped: u32,
}

/// Self-acknowledging loopback. Every packet that survives the fault model
/// leaves one pending ack in the medium, pollable once its latency elapsed.
pub struct LoopbackChannel {
    config: ChannelConfig,
    rng: StdRng,
    /// Pending acks: seq -> time at which the ack becomes pollable
    medium: BTreeMap<u32, u64>,
    drop_packet_once: Vec<u32>,
    drop_ack_once: Vec<u32>,
    stats: ChannelStats,
}

impl Default for LoopbackChannel {
    fn default() -> Self {
        Self::new(ChannelConfig::default())
    }
}

impl LoopbackChannel {
    pub fn new(config: ChannelConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            medium: BTreeMap::new(),
            drop_packet_once: Vec::new(),
            drop_ack_once: Vec::new(),
            stats: ChannelStats::default(),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Lose the next transmission of `seq`.
    pub fn drop_next_packet(&mut self, seq: u32) {
        self.drop_packet_once.push(seq);
    }

    /// Consume and discard the next ack for `seq` instead of delivering it.
    pub fn drop_next_ack(&mut self, seq: u32) {
        self.drop_ack_once.push(seq);
    }

    /// Sequence numbers with an ack still sitting in the medium.
    pub fn pending_acks(&self) -> Vec<u32> {
        self.medium.keys().copied().collect()
    }

    fn latency(&mut self) -> u64 {
        let (min, max) = (self.config.min_latency_ms, self.config.max_latency_ms);
        if min >= max {
            min
        } else {
            self.rng.random_range(min..=max)
        }
    }
}

impl Transmitter for LoopbackChannel {
    fn transmit(&mut self, packet: &Packet, now_ms: u64) {
        self.stats.transmitted += 1;

        if let Some(pos) = self.drop_packet_once.iter().position(|s| *s == packet.seq) {
            self.drop_packet_once.remove(pos);
            self.stats.lost += 1;
            debug!("Deterministically dropping packet seq={}", packet.seq);
            return;
        }

        if self.config.loss_rate > 0.0 && self.rng.random::<f64>() < self.config.loss_rate {
            self.stats.lost += 1;
            debug!("Packet seq={} lost in channel", packet.seq);
            return;
        }

        let ready_at = now_ms + self.latency();
        // A retransmission never delays an ack that is already on its way.
        self.medium
            .entry(packet.seq)
            .and_modify(|at| *at = (*at).min(ready_at))
            .or_insert(ready_at);
        debug!("Packet seq={} in medium, ack pollable at {} ms", packet.seq, ready_at);
    }
}

impl Receiver for LoopbackChannel {
    fn poll_ack(&mut self, seq: u32, now_ms: u64) -> Option<Ack> {
        match self.medium.get(&seq) {
            Some(&ready_at) if ready_at <= now_ms => {
                self.medium.remove(&seq);
            }
            _ => return None,
        }

        if let Some(pos) = self.drop_ack_once.iter().position(|s| *s == seq) {
            self.drop_ack_once.remove(pos);
            self.stats.acks_dropped += 1;
            debug!("Deterministically dropping ack seq={}", seq);
            return None;
        }

        self.stats.acks_delivered += 1;
        Some(Ack { seq })
    }

    fn discard_ack(&mut self, seq: u32) {
        if self.medium.remove(&seq).is_some() {
            debug!("Discarding pending ack seq={}", seq);
        }
    }
}

impl Channel for LoopbackChannel {
    fn stats(&self) -> ChannelStats {
        self.stats
    }
}

/// A medium that never acknowledges on its own. Acks appear only when the
/// driver releases them, which lets a caller script the exact ack order.
#[derive(Debug, Default)]
pub struct ManualChannel {
    transmissions: Vec<Packet>,
    released: BTreeSet<u32>,
    stats: ChannelStats,
}

impl ManualChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the ack for `seq` visible to the next poll.
    pub fn release_ack(&mut self, seq: u32) {
        self.released.insert(seq);
    }

    /// Every packet put on the wire so far, retransmissions included.
    pub fn transmissions(&self) -> &[Packet] {
        &self.transmissions
    }
}

impl Transmitter for ManualChannel {
    fn transmit(&mut self, packet: &Packet, _now_ms: u64) {
        self.stats.transmitted += 1;
        self.transmissions.push(packet.clone());
    }
}

impl Receiver for ManualChannel {
    fn poll_ack(&mut self, seq: u32, _now_ms: u64) -> Option<Ack> {
        if !self.released.remove(&seq) {
            return None;
        }
        self.stats.acks_delivered += 1;
        Some(Ack { seq })
    }

    fn discard_ack(&mut self, seq: u32) {
        self.released.remove(&seq);
    }
}

impl Channel for ManualChannel {
    fn stats(&self) -> ChannelStats {
        self.stats
    }
}
