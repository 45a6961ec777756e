//! One packet in flight at a time: Simple Protocol and Stop-and-Wait.
//!
//! Both send, wait for the ack, and resend the same packet on every timeout.
//! They only differ in the sequence space: Simple Protocol counts up forever,
//! Stop-and-Wait alternates between 0 and 1.

use arq_lab_abstract::{Packet, ProtocolKind};
use tracing::debug;

use super::{AckOutcome, WindowController, WindowSnapshot};

#[derive(Debug)]
pub struct OneSlot {
    kind: ProtocolKind,
    /// Sequence number of the packet in flight, or of the next one
    seq: u32,
    in_flight: Option<Packet>,
}

impl OneSlot {
    pub fn simple() -> Self {
        Self::new(ProtocolKind::Simple)
    }

    pub fn stop_and_wait() -> Self {
        Self::new(ProtocolKind::StopAndWait)
    }

    fn new(kind: ProtocolKind) -> Self {
        Self {
            kind,
            seq: 0,
            in_flight: None,
        }
    }

    fn successor(&self, seq: u32) -> u32 {
        match self.kind.sequence_modulus() {
            Some(modulus) => (seq + 1) % modulus,
            None => seq.wrapping_add(1),
        }
    }
}

impl WindowController for OneSlot {
    fn kind(&self) -> ProtocolKind {
        self.kind
    }

    fn snapshot(&self) -> WindowSnapshot {
        let next_seq = if self.in_flight.is_some() {
            self.successor(self.seq)
        } else {
            self.seq
        };
        WindowSnapshot {
            kind: self.kind,
            base: self.seq,
            next_seq,
            window_size: 1,
            in_flight: self.outstanding(),
            acked_out_of_order: Vec::new(),
        }
    }

    fn has_room(&self) -> bool {
        self.in_flight.is_none()
    }

    fn accept(&mut self, payload: String) -> Option<Packet> {
        if self.in_flight.is_some() {
            return None;
        }
        let packet = Packet::new(self.seq, payload);
        self.in_flight = Some(packet.clone());
        Some(packet)
    }

    fn outstanding(&self) -> Vec<u32> {
        self.in_flight.iter().map(|p| p.seq).collect()
    }

    fn on_ack(&mut self, seq: u32) -> AckOutcome {
        match &self.in_flight {
            Some(packet) if packet.seq == seq => {
                self.in_flight = None;
                self.seq = self.successor(seq);
                AckOutcome::Advanced { base: self.seq }
            }
            _ => {
                debug!("{}: ack {} matches nothing in flight", self.kind, seq);
                AckOutcome::Stale
            }
        }
    }

    fn on_timeout(&self) -> Vec<Packet> {
        self.in_flight.iter().cloned().collect()
    }
}
