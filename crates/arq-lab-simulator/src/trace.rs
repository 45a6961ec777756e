use arq_lab_abstract::SessionConfig;
use serde::Serialize;

use crate::channel::ChannelStats;
use crate::event::SessionEvent;
use crate::window::WindowSnapshot;

#[derive(Debug, Clone, Serialize)]
pub struct TraceEntry {
    pub time_ms: u64,
    pub event: SessionEvent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// First transmissions only
    pub packets_sent: u32,
    pub retransmissions: u32,
    pub timeouts: u32,
    pub acks_received: u32,
    pub acks_discarded: u32,
}

impl SessionStats {
    pub fn transmissions(&self) -> u32 {
        self.packets_sent + self.retransmissions
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub config: SessionConfig,
    pub duration_ms: u64,
    pub stats: SessionStats,
    pub channel: ChannelStats,
    pub window: WindowSnapshot,
    pub timeline: Vec<TraceEntry>,
}

impl SessionReport {
    /// Sequence numbers in the order they were first sent.
    pub fn sent_sequence(&self) -> Vec<u32> {
        self.timeline
            .iter()
            .filter_map(|entry| match &entry.event {
                SessionEvent::PacketSent { seq, .. } => Some(*seq),
                _ => None,
            })
            .collect()
    }

    /// Every retransmitted sequence number, flattened in timeout order.
    pub fn retransmitted(&self) -> Vec<u32> {
        self.timeline
            .iter()
            .filter_map(|entry| match &entry.event {
                SessionEvent::TimeoutResend { seqs } => Some(seqs.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}
