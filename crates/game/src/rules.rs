//! Voice-Regelmatrix
//!
//! Reine Funktion `(lebt, verfolgt_und_verknuepft, phase) -> (stumm, taub)`.
//! Das Regelwerk ist Daten: pro Phase ein Zielzustand fuer lebende und fuer
//! tote Spieler. Die Server-Konfiguration kann jede Phase ueberschreiben,
//! ohne dass die Abgleich-Engine angefasst werden muss.

use crate::phase::Phase;
use serde::{Deserialize, Serialize};

/// Gewuenschter Voice-Zustand eines Teilnehmers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceZiel {
    /// Mikrofon serverseitig stummgeschaltet
    pub stumm: bool,
    /// Ausgabe serverseitig taubgeschaltet
    pub taub: bool,
}

impl VoiceZiel {
    /// Weder stumm noch taub
    pub const FREI: VoiceZiel = VoiceZiel {
        stumm: false,
        taub: false,
    };

    pub const fn neu(stumm: bool, taub: bool) -> Self {
        Self { stumm, taub }
    }
}

impl std::fmt::Display for VoiceZiel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stumm={} taub={}", self.stumm, self.taub)
    }
}

/// Regel einer Phase fuer lebende und tote Spieler
///
/// In der Konfiguration muessen beide Haelften angegeben werden, eine
/// fehlende Haelfte ist ein Fehler und faellt nicht auf "frei" zurueck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhasenRegel {
    pub lebend: VoiceZiel,
    pub tot: VoiceZiel,
}

impl PhasenRegel {
    pub const fn neu(lebend: VoiceZiel, tot: VoiceZiel) -> Self {
        Self { lebend, tot }
    }
}

/// Vollstaendige Regelmatrix, eine Regel pro Phase
///
/// Nicht konfigurierte Phasen behalten die Standardregel, die Funktion
/// ist damit fuer alle Eingaben definiert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceRegeln {
    pub lobby: PhasenRegel,
    pub active_round: PhasenRegel,
    pub discussion: PhasenRegel,
}

impl VoiceRegeln {
    /// Regelwerk, das niemanden stumm- oder taubschaltet
    pub fn frei() -> Self {
        Self {
            lobby: PhasenRegel::default(),
            active_round: PhasenRegel::default(),
            discussion: PhasenRegel::default(),
        }
    }

    /// Standard-Regelwerk
    ///
    /// | Phase       | lebend        | tot           |
    /// |-------------|---------------|---------------|
    /// | Lobby       | frei          | frei          |
    /// | ActiveRound | stumm         | frei          |
    /// | Discussion  | frei          | stumm         |
    pub fn standard() -> Self {
        let stumm = VoiceZiel::neu(true, false);
        Self {
            lobby: PhasenRegel::neu(VoiceZiel::FREI, VoiceZiel::FREI),
            active_round: PhasenRegel::neu(stumm, VoiceZiel::FREI),
            discussion: PhasenRegel::neu(VoiceZiel::FREI, stumm),
        }
    }

    /// Ersetzt die Regel einer Phase (Builder)
    pub fn mit_regel(mut self, phase: Phase, regel: PhasenRegel) -> Self {
        *self.regel_mut(phase) = regel;
        self
    }

    /// Regel fuer eine Phase
    pub fn regel(&self, phase: Phase) -> &PhasenRegel {
        match phase {
            Phase::Lobby => &self.lobby,
            Phase::ActiveRound => &self.active_round,
            Phase::Discussion => &self.discussion,
        }
    }

    fn regel_mut(&mut self, phase: Phase) -> &mut PhasenRegel {
        match phase {
            Phase::Lobby => &mut self.lobby,
            Phase::ActiveRound => &mut self.active_round,
            Phase::Discussion => &mut self.discussion,
        }
    }

    /// Entscheidet den gewuenschten Voice-Zustand
    ///
    /// Nicht verknuepfte oder nicht verfolgte Teilnehmer werden nie
    /// stumm- oder taubgeschaltet.
    pub fn entscheiden(&self, lebt: bool, verfolgt_und_verknuepft: bool, phase: Phase) -> VoiceZiel {
        if !verfolgt_und_verknuepft {
            return VoiceZiel::FREI;
        }
        let regel = self.regel(phase);
        if lebt {
            regel.lebend
        } else {
            regel.tot
        }
    }
}

impl Default for VoiceRegeln {
    fn default() -> Self {
        Self::standard()
    }
}
