//! Selective Repeat send-side window.
//!
//! Every ack is credited individually. An ack that is not for `base` is
//! remembered in `received` until the gap below it closes; the ack for `base`
//! then slides the window across the whole run of credited sequence numbers.
//! On timeout only the packet at `base` is resent.

use std::collections::{BTreeMap, BTreeSet};

use arq_lab_abstract::{Packet, ProtocolKind};

use super::{AckOutcome, WindowController, WindowSnapshot};

#[derive(Debug)]
pub struct SelectiveRepeat {
    base: u32,
    next_seq: u32,
    window_size: u32,
    in_flight: BTreeMap<u32, Packet>,
    /// Acked above `base`, not yet contiguous with it.
    received: BTreeSet<u32>,
}

impl SelectiveRepeat {
    /// # Panics
    ///
    /// Panics if `window_size` is zero.
    pub fn new(window_size: u32) -> Self {
        assert!(window_size >= 1, "window_size must be at least 1");
        Self {
            base: 0,
            next_seq: 0,
            window_size,
            in_flight: BTreeMap::new(),
            received: BTreeSet::new(),
        }
    }
}

impl WindowController for SelectiveRepeat {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::SelectiveRepeat
    }

    fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            kind: ProtocolKind::SelectiveRepeat,
            base: self.base,
            next_seq: self.next_seq,
            window_size: self.window_size,
            in_flight: self.outstanding(),
            acked_out_of_order: self.received.iter().copied().collect(),
        }
    }

    // Credited-but-buffered packets still occupy their slot.
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

    fn outstanding(&self) -> Vec<u32> {
        let len = self.next_seq.wrapping_sub(self.base);
        (0..len)
            .map(|offset| self.base.wrapping_add(offset))
            .filter(|seq| self.in_flight.contains_key(seq))
            .collect()
    }

    fn on_ack(&mut self, seq: u32) -> AckOutcome {
        if self.in_flight.remove(&seq).is_none() {
            return AckOutcome::Stale;
        }
        self.received.insert(seq);
        if seq != self.base {
            return AckOutcome::Buffered;
        }
        while self.received.remove(&self.base) {
            self.base = self.base.wrapping_add(1);
        }
        AckOutcome::Advanced { base: self.base }
    }

    fn on_timeout(&self) -> Vec<Packet> {
        self.in_flight.get(&self.base).cloned().into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(window: u32) -> SelectiveRepeat {
        let mut sr = SelectiveRepeat::new(window);
        while sr.accept(format!("Packet {}", sr.next_seq)).is_some() {}
        sr
    }

    #[test]
    fn out_of_order_ack_is_buffered() {
        let mut sr = filled(4);
        assert_eq!(sr.on_ack(2), AckOutcome::Buffered);
        assert_eq!(sr.base, 0);
        assert_eq!(sr.outstanding(), vec![0, 1, 3]);
        assert_eq!(sr.snapshot().acked_out_of_order, vec![2]);
    }

    #[test]
    fn base_ack_consumes_buffered_run() {
        let mut sr = filled(4);
        sr.on_ack(2);
        assert_eq!(sr.on_ack(0), AckOutcome::Advanced { base: 1 });
        assert_eq!(sr.on_ack(1), AckOutcome::Advanced { base: 3 });
        assert!(sr.received.is_empty());
        assert_eq!(sr.outstanding(), vec![3]);
    }

    #[test]
    fn buffered_credit_keeps_slot_occupied() {
        let mut sr = filled(3);
        sr.on_ack(1);
        assert!(!sr.has_room());
        assert!(sr.accept("more".into()).is_none());
    }

    #[test]
    fn timeout_resends_only_base() {
        let mut sr = filled(3);
        sr.on_ack(1);
        let resend = sr.on_timeout();
        assert_eq!(resend.len(), 1);
        assert_eq!(resend[0].seq, 0);
    }

    #[test]
    fn credited_packet_acks_are_stale() {
        let mut sr = filled(3);
        assert_eq!(sr.on_ack(1), AckOutcome::Buffered);
        assert_eq!(sr.on_ack(1), AckOutcome::Stale);
        assert_eq!(sr.on_ack(7), AckOutcome::Stale);
        assert_eq!(sr.snapshot().acked_out_of_order, vec![1]);
    }

    #[test]
    fn idle_window_times_out_nothing() {
        let sr = SelectiveRepeat::new(2);
        assert!(sr.on_timeout().is_empty());
    }

    #[test]
    fn sequence_numbers_wrap_around() {
        let mut sr = SelectiveRepeat::new(3);
        sr.base = u32::MAX;
        sr.next_seq = u32::MAX;
        while sr.accept(String::new()).is_some() {}
        assert_eq!(sr.outstanding(), vec![u32::MAX, 0, 1]);

        assert_eq!(sr.on_ack(0), AckOutcome::Buffered);
        assert_eq!(sr.on_ack(u32::MAX), AckOutcome::Advanced { base: 1 });
        assert_eq!(sr.outstanding(), vec![1]);
        assert!(sr.has_room());
    }
}
