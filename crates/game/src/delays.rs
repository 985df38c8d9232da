//! Verzoegerungstabelle fuer Phasenwechsel
//!
//! Bildet (Ausgangsphase, Zielphase) auf eine Wartezeit in Sekunden ab,
//! bevor Voice-Aenderungen nach dem Wechsel angewendet werden. So hoeren
//! Spieler z.B. nach einer Diskussion nicht mitten im Satz auf zu reden.
//!
//! Die Tabelle ist nach dem Aufbau unveraenderlich (`Copy`) und kann ohne
//! Lock von beliebig vielen Tasks gelesen werden.

use crate::phase::Phase;
use std::time::Duration;

/// Wartezeit in Sekunden pro Phasenwechsel, nicht gesetzte Eintraege sind 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayTable {
    sekunden: [[u32; Phase::ANZAHL]; Phase::ANZAHL],
}

impl DelayTable {
    /// Tabelle ohne jede Verzoegerung
    pub fn leer() -> Self {
        Self {
            sekunden: [[0; Phase::ANZAHL]; Phase::ANZAHL],
        }
    }

    /// Standardtabelle
    ///
    /// | von \ nach  | Lobby | ActiveRound | Discussion |
    /// |-------------|-------|-------------|------------|
    /// | Lobby       | 0     | 7           | 0          |
    /// | ActiveRound | 1     | 0           | 0          |
    /// | Discussion  | 6     | 7           | 0          |
    pub fn standard() -> Self {
        Self::leer()
            .mit_eintrag(Phase::Lobby, Phase::ActiveRound, 7)
            .mit_eintrag(Phase::ActiveRound, Phase::Lobby, 1)
            .mit_eintrag(Phase::Discussion, Phase::Lobby, 6)
            .mit_eintrag(Phase::Discussion, Phase::ActiveRound, 7)
    }

    /// Setzt einen einzelnen Eintrag (Builder)
    pub fn mit_eintrag(mut self, von: Phase, nach: Phase, sekunden: u32) -> Self {
        self.sekunden[von.index()][nach.index()] = sekunden;
        self
    }

    /// Wartezeit in Sekunden fuer einen Phasenwechsel
    pub fn verzoegerung_sek(&self, von: Phase, nach: Phase) -> u32 {
        self.sekunden[von.index()][nach.index()]
    }

    /// Wartezeit fuer einen Phasenwechsel
    pub fn verzoegerung(&self, von: Phase, nach: Phase) -> Duration {
        Duration::from_secs(u64::from(self.verzoegerung_sek(von, nach)))
    }
}

impl Default for DelayTable {
    fn default() -> Self {
        Self::standard()
    }
}
