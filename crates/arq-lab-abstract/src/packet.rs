use serde::{Deserialize, Serialize};

/// A data packet handed to the channel.
///
/// Packets are never mutated after creation; a retransmission sends a clone
/// carrying the same sequence number and payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Packet {
    /// Sequence number (alternating bit for Stop-and-Wait, monotonic otherwise)
    pub seq: u32,
    pub payload: String,
}

impl Packet {
    pub fn new(seq: u32, payload: impl Into<String>) -> Self {
        Self {
            seq,
            payload: payload.into(),
        }
    }

    /// The payload the reference program generates when the user does not
    /// type one (Simple Protocol, Go-Back-N and Selective Repeat rounds).
    pub fn numbered(seq: u32) -> Self {
        Self::new(seq, format!("Packet {seq}"))
    }
}

// Two copies of a packet are the same packet as far as the window is concerned.
impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Packet {}

/// Acknowledgement for a single sequence number. Carries no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ack {
    pub seq: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_payload() {
        assert_eq!(Packet::new(3, "a"), Packet::new(3, "b"));
        assert_ne!(Packet::new(3, "a"), Packet::new(4, "a"));
    }

    #[test]
    fn numbered_payload_matches_reference_text() {
        let p = Packet::numbered(7);
        assert_eq!(p.payload, "Packet 7");
        assert_eq!(p.seq, 7);
    }
}
