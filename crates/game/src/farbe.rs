//! Spielerfarben
//!
//! Die Farbe ist die In-Game-Identitaet eines Spielers innerhalb einer
//! Runde. Der Capture-Client liefert sie als Index, die Bedienoberflaeche
//! als Namen.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Eine der zwoelf Spielerfarben
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Farbe {
    Red,
    Blue,
    Green,
    Pink,
    Orange,
    Yellow,
    Black,
    White,
    Purple,
    Brown,
    Cyan,
    Lime,
}

impl Farbe {
    /// Alle Farben in Index-Reihenfolge des Spiels
    pub const ALLE: [Farbe; 12] = [
        Farbe::Red,
        Farbe::Blue,
        Farbe::Green,
        Farbe::Pink,
        Farbe::Orange,
        Farbe::Yellow,
        Farbe::Black,
        Farbe::White,
        Farbe::Purple,
        Farbe::Brown,
        Farbe::Cyan,
        Farbe::Lime,
    ];

    /// Farbe aus dem Index des Capture-Protokolls
    pub fn aus_index(index: u8) -> Option<Self> {
        Self::ALLE.get(usize::from(index)).copied()
    }

    /// Index im Capture-Protokoll
    pub fn index(self) -> u8 {
        // ALLE ist vollstaendig, die Suche findet jede Farbe
        Self::ALLE.iter().position(|f| *f == self).unwrap_or(0) as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Pink => "pink",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Black => "black",
            Self::White => "white",
            Self::Purple => "purple",
            Self::Brown => "brown",
            Self::Cyan => "cyan",
            Self::Lime => "lime",
        }
    }
}

impl std::fmt::Display for Farbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Unbekannter Farbname
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unbekannte Farbe: {0}")]
pub struct FarbeParseFehler(pub String);

impl FromStr for Farbe {
    type Err = FarbeParseFehler;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALLE
            .iter()
            .copied()
            .find(|f| f.name() == name)
            .ok_or_else(|| FarbeParseFehler(s.to_string()))
    }
}
