//! Spielphasen
//!
//! Die Phase wird extern getrieben (Capture-Client des Spiels) und hier
//! nur konsumiert. Sie steuert sowohl die Verzoegerungstabelle als auch
//! die Voice-Regelmatrix.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Grobe globale Spielphase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Warteraum vor und nach einer Runde
    #[default]
    Lobby,
    /// Laufende Runde (Aufgaben)
    ActiveRound,
    /// Diskussion / Abstimmung
    Discussion,
}

impl Phase {
    /// Alle Phasen in Tabellenreihenfolge
    pub const ALLE: [Phase; 3] = [Phase::Lobby, Phase::ActiveRound, Phase::Discussion];

    /// Anzahl der Phasen
    pub const ANZAHL: usize = Self::ALLE.len();

    /// Dichter Index fuer Tabellen-Lookups
    pub fn index(self) -> usize {
        match self {
            Self::Lobby => 0,
            Self::ActiveRound => 1,
            Self::Discussion => 2,
        }
    }

    /// Serialisierter Name der Phase
    pub fn name(self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::ActiveRound => "active_round",
            Self::Discussion => "discussion",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Unbekannter Phasenname
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unbekannte Phase: {0}")]
pub struct PhaseParseFehler(pub String);

impl FromStr for Phase {
    type Err = PhaseParseFehler;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lobby" => Ok(Self::Lobby),
            // "tasks" ist der Name im Capture-Protokoll des Spiels
            "active_round" | "tasks" => Ok(Self::ActiveRound),
            "discussion" | "discuss" => Ok(Self::Discussion),
            _ => Err(PhaseParseFehler(s.to_string())),
        }
    }
}
