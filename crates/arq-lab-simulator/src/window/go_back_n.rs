//! Go-Back-N send-side window.
//!
//! # Protocol contract
//!
//! - At most `window_size` packets are in flight; they always form the
//!   contiguous range `[base, next_seq)`.
//! - Only the ack for `base` is credited. It removes that packet and slides
//!   the window by exactly one.
//! - Acks for any other in-flight packet are dropped, not buffered. The
//!   packet stays in flight and must earn a fresh ack after retransmission.
//! - On timeout every outstanding packet is resent with its original
//!   sequence number (go back to `base`).
//!
//! ```text
//!   base              next_seq
//!     │                   │
//! ────┼───────────────────┼──────────────▶ seq space
//!     │ <── in flight ──▶ │ <── sendable (up to base + N)
//! ```

use std::collections::BTreeMap;

use arq_lab_abstract::{Packet, ProtocolKind};
use tracing::debug;

use super::{AckOutcome, WindowController, WindowSnapshot};

#[derive(Debug)]
pub struct GoBackN {
    /// Oldest unacked sequence number (left window edge).
    base: u32,
    /// Sequence number for the next new packet.
    next_seq: u32,
    window_size: u32,
    in_flight: BTreeMap<u32, Packet>,
}

impl GoBackN {
    /// # Panics
    ///
    /// Panics if `window_size` is zero; configuration validation rejects
    /// that before a controller is built.
    pub fn new(window_size: u32) -> Self {
        assert!(window_size >= 1, "window_size must be at least 1");
        Self {
            base: 0,
            next_seq: 0,
            window_size,
            in_flight: BTreeMap::new(),
        }
    }
}

impl WindowController for GoBackN {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::GoBackN
    }

    fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            kind: ProtocolKind::GoBackN,
            base: self.base,
            next_seq: self.next_seq,
            window_size: self.window_size,
            in_flight: self.outstanding(),
            acked_out_of_order: Vec::new(),
        }
    }

    fn has_room(&self) -> bool {
        self.next_seq.wrapping_sub(self.base) < self.window_size
    }

    fn accept(&mut self, payload: String) -> Option<Packet> {
        if !self.has_room() {
            return None;
        }
        let packet = Packet::new(self.next_seq, payload);
        self.in_flight.insert(packet.seq, packet.clone());
        self.next_seq = self.next_seq.wrapping_add(1);
        Some(packet)
    }

    // Counted from `base` so the order survives sequence number wrap-around.
    fn outstanding(&self) -> Vec<u32> {
        let len = self.next_seq.wrapping_sub(self.base);
        (0..len).map(|offset| self.base.wrapping_add(offset)).collect()
    }

    fn on_ack(&mut self, seq: u32) -> AckOutcome {
        if seq == self.base && self.in_flight.remove(&seq).is_some() {
            self.base = self.base.wrapping_add(1);
            return AckOutcome::Advanced { base: self.base };
        }
        if self.in_flight.contains_key(&seq) {
            debug!("Go-Back-N: dropping out-of-order ack {} (base {})", seq, self.base);
            AckOutcome::Discarded
        } else {
            AckOutcome::Stale
        }
    }

    fn on_timeout(&self) -> Vec<Packet> {
        self.outstanding()
            .iter()
            .filter_map(|seq| self.in_flight.get(seq).cloned())
            .collect()
    }
}
