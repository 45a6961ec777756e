use std::fmt;

use serde::Serialize;

/// Something the driver may want to report. Produced by
/// [`crate::Session::send_message`] and [`crate::Session::tick`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// First transmission of a packet
    PacketSent { seq: u32, payload: String },
    /// Ack credited to an in-flight packet
    AckReceived { seq: u32 },
    /// Ack for a packet that is not at `base` under Go-Back-N
    AckDiscarded { seq: u32 },
    /// Lower window edge moved
    WindowAdvanced { base: u32 },
    /// Window timer expired; these packets went out again
    TimeoutResend { seqs: Vec<u32> },
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::PacketSent { seq, payload } => write!(
                f,
                "Sending packet with sequence number {seq}... (message: {payload:?})"
            ),
            SessionEvent::AckReceived { seq } => write!(
                f,
                "Acknowledgement received for packet with sequence number {seq}."
            ),
            SessionEvent::AckDiscarded { seq } => write!(
                f,
                "Out-of-order acknowledgement for sequence number {seq} discarded."
            ),
            SessionEvent::WindowAdvanced { base } => write!(f, "Window base is now {base}."),
            SessionEvent::TimeoutResend { seqs } => match seqs.as_slice() {
                [seq] => write!(
                    f,
                    "Timeout occurred. Resending packet with sequence number {seq}..."
                ),
                _ => write!(f, "Timeout occurred. Resending packets {seqs:?}..."),
            },
        }
    }
}
