use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The four flow-control disciplines the simulator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolKind {
    #[serde(alias = "simple-protocol")]
    Simple,
    #[serde(alias = "saw")]
    StopAndWait,
    #[serde(alias = "gbn")]
    GoBackN,
    #[serde(alias = "sr")]
    SelectiveRepeat,
}

impl ProtocolKind {
    pub const ALL: [ProtocolKind; 4] = [
        ProtocolKind::StopAndWait,
        ProtocolKind::GoBackN,
        ProtocolKind::SelectiveRepeat,
        ProtocolKind::Simple,
    ];

    /// Human readable name, as printed by the menu.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProtocolKind::Simple => "Simple Protocol",
            ProtocolKind::StopAndWait => "Stop-and-Wait",
            ProtocolKind::GoBackN => "Go-Back-N",
            ProtocolKind::SelectiveRepeat => "Selective Repeat",
        }
    }

    /// Whether the user picks the window size (Go-Back-N, Selective Repeat)
    /// or it is fixed at one slot.
    pub fn has_configurable_window(&self) -> bool {
        matches!(self, ProtocolKind::GoBackN | ProtocolKind::SelectiveRepeat)
    }

    /// Size of the sequence number space, `None` when unbounded.
    pub fn sequence_modulus(&self) -> Option<u32> {
        match self {
            ProtocolKind::StopAndWait => Some(2),
            _ => None,
        }
    }

    /// Menu position (1-4). 5 is the exit entry and has no protocol.
    pub fn menu_number(&self) -> u32 {
        match self {
            ProtocolKind::StopAndWait => 1,
            ProtocolKind::GoBackN => 2,
            ProtocolKind::SelectiveRepeat => 3,
            ProtocolKind::Simple => 4,
        }
    }

    pub fn from_menu_number(choice: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.menu_number() == choice)
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProtocolKind {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "simple" | "simple-protocol" => Ok(ProtocolKind::Simple),
            "stop-and-wait" | "saw" => Ok(ProtocolKind::StopAndWait),
            "go-back-n" | "gbn" => Ok(ProtocolKind::GoBackN),
            "selective-repeat" | "sr" => Ok(ProtocolKind::SelectiveRepeat),
            _ => Err(ConfigError::UnknownProtocol(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("gbn".parse::<ProtocolKind>().unwrap(), ProtocolKind::GoBackN);
        assert_eq!(
            " Selective-Repeat ".parse::<ProtocolKind>().unwrap(),
            ProtocolKind::SelectiveRepeat
        );
        assert_eq!("saw".parse::<ProtocolKind>().unwrap(), ProtocolKind::StopAndWait);
        assert!(matches!(
            "tcp".parse::<ProtocolKind>(),
            Err(ConfigError::UnknownProtocol(name)) if name == "tcp"
        ));
    }

    #[test]
    fn menu_numbers_round_trip() {
        for kind in ProtocolKind::ALL {
            assert_eq!(ProtocolKind::from_menu_number(kind.menu_number()), Some(kind));
        }
        assert_eq!(ProtocolKind::from_menu_number(5), None);
        assert_eq!(ProtocolKind::from_menu_number(0), None);
    }
}
