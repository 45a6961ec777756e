//! Sender window state machines, one per flow-control discipline.
//!
//! A controller only decides: which sequence number a new message gets, what
//! an ack does to the window, and what to resend on timeout. Moving packets
//! through the channel and keeping time is the session's job.

pub mod go_back_n;
pub mod selective_repeat;
pub mod single;

use arq_lab_abstract::{Packet, ProtocolKind, SessionConfig};
use serde::Serialize;

pub use go_back_n::GoBackN;
pub use selective_repeat::SelectiveRepeat;
pub use single::OneSlot;

/// What crediting one ack did to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// `base` moved; carries the new lower window edge
    Advanced { base: u32 },
    /// Credited out of order, waiting for `base` (Selective Repeat)
    Buffered,
    /// In flight but not at `base`, so ignored (Go-Back-N)
    Discarded,
    /// Nothing in flight under that sequence number
    Stale,
}

impl AckOutcome {
    /// Whether the ack was credited to a packet.
    pub fn is_progress(&self) -> bool {
        matches!(self, AckOutcome::Advanced { .. } | AckOutcome::Buffered)
    }
}

/// Read-only view of a controller's window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowSnapshot {
    pub kind: ProtocolKind,
    pub base: u32,
    pub next_seq: u32,
    pub window_size: u32,
    pub in_flight: Vec<u32>,
    pub acked_out_of_order: Vec<u32>,
}

pub trait WindowController: Send {
    fn kind(&self) -> ProtocolKind;

    fn snapshot(&self) -> WindowSnapshot;

    /// `true` when a new message may enter the window.
    fn has_room(&self) -> bool;

    /// Assign the next sequence number to `payload` and record it as in
    /// flight. `None` when the window is full.
    fn accept(&mut self, payload: String) -> Option<Packet>;

    /// Sequence numbers to poll for acks, in scan order (ascending from `base`).
    fn outstanding(&self) -> Vec<u32>;

    fn on_ack(&mut self, seq: u32) -> AckOutcome;

    /// Packets to retransmit after the window timer expired.
    fn on_timeout(&self) -> Vec<Packet>;

    fn is_idle(&self) -> bool {
        self.outstanding().is_empty()
    }
}

/// Build the controller matching `config.protocol`.
pub fn controller_for(config: &SessionConfig) -> Box<dyn WindowController> {
    match config.protocol {
        ProtocolKind::Simple => Box::new(OneSlot::simple()),
        ProtocolKind::StopAndWait => Box::new(OneSlot::stop_and_wait()),
        ProtocolKind::GoBackN => Box::new(GoBackN::new(config.effective_window())),
        ProtocolKind::SelectiveRepeat => {
            Box::new(SelectiveRepeat::new(config.effective_window()))
        }
    }
}
