//! Spieldaten der laufenden Runde
//!
//! Aktuelle Phase und alle bekannten Spieler (nach Farbe). Wird ueber
//! die Steuerungs-API des Servers befuellt und von der Abgleich-Engine nur
//! gelesen. Clone teilt den inneren Zustand.

use crate::farbe::Farbe;
use crate::phase::Phase;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Ein Spieler der laufenden Runde
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spieler {
    pub farbe: Farbe,
    /// In-Game-Name
    pub name: String,
    pub lebt: bool,
}

impl Spieler {
    pub fn neu(farbe: Farbe, name: impl Into<String>) -> Self {
        Self {
            farbe,
            name: name.into(),
            lebt: true,
        }
    }
}

/// Phase und Spieler der laufenden Runde
#[derive(Clone, Default)]
pub struct SpielDaten {
    inner: Arc<SpielDatenInner>,
}

#[derive(Default)]
struct SpielDatenInner {
    phase: RwLock<Phase>,
    spieler: RwLock<HashMap<Farbe, Spieler>>,
}

impl SpielDaten {
    /// Leere Spieldaten in der Lobby
    pub fn neu() -> Self {
        Self::default()
    }

    /// Aktuelle Phase
    pub fn phase(&self) -> Phase {
        *self.inner.phase.read()
    }

    /// Setzt die Phase und gibt die vorherige zurueck
    pub fn phase_setzen(&self, neue_phase: Phase) -> Phase {
        let mut phase = self.inner.phase.write();
        let alte_phase = *phase;
        *phase = neue_phase;
        if alte_phase != neue_phase {
            tracing::debug!(von = %alte_phase, nach = %neue_phase, "Phase gewechselt");
        }
        alte_phase
    }

    /// Fuegt einen Spieler hinzu oder aktualisiert Name/Lebensstatus
    pub fn spieler_aktualisieren(&self, spieler: Spieler) {
        self.inner.spieler.write().insert(spieler.farbe, spieler);
    }

    /// Setzt den Lebensstatus eines Spielers, `false` wenn die Farbe unbekannt ist
    pub fn lebensstatus_setzen(&self, farbe: Farbe, lebt: bool) -> bool {
        match self.inner.spieler.write().get_mut(&farbe) {
            Some(spieler) => {
                spieler.lebt = lebt;
                true
            }
            None => false,
        }
    }

    /// Spieler einer Farbe
    pub fn spieler(&self, farbe: Farbe) -> Option<Spieler> {
        self.inner.spieler.read().get(&farbe).cloned()
    }

    /// Alle Spieler, sortiert nach Farbe
    pub fn alle_spieler(&self) -> Vec<Spieler> {
        let mut alle: Vec<Spieler> = self.inner.spieler.read().values().cloned().collect();
        alle.sort_by_key(|s| s.farbe);
        alle
    }

    /// Entfernt alle Spieler, die Phase bleibt
    pub fn spieler_leeren(&self) {
        self.inner.spieler.write().clear();
    }

    /// Neues Spiel: keine Spieler, Phase Lobby
    pub fn zuruecksetzen(&self) {
        self.spieler_leeren();
        self.phase_setzen(Phase::Lobby);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_setzen_gibt_alte_phase() {
        let spiel = SpielDaten::neu();
        assert_eq!(spiel.phase(), Phase::Lobby);
        assert_eq!(spiel.phase_setzen(Phase::ActiveRound), Phase::Lobby);
        assert_eq!(spiel.phase(), Phase::ActiveRound);
    }

    #[test]
    fn spieler_aktualisieren_und_lesen() {
        let spiel = SpielDaten::neu();
        spiel.spieler_aktualisieren(Spieler::neu(Farbe::Red, "Alice"));
        assert!(spiel.lebensstatus_setzen(Farbe::Red, false));
        assert!(!spiel.lebensstatus_setzen(Farbe::Blue, false));

        let alice = spiel.spieler(Farbe::Red).unwrap();
        assert_eq!(alice.name, "Alice");
        assert!(!alice.lebt);
    }

    #[test]
    fn alle_spieler_sortiert() {
        let spiel = SpielDaten::neu();
        spiel.spieler_aktualisieren(Spieler::neu(Farbe::Lime, "Zed"));
        spiel.spieler_aktualisieren(Spieler::neu(Farbe::Red, "Amy"));
        let farben: Vec<Farbe> = spiel.alle_spieler().iter().map(|s| s.farbe).collect();
        assert_eq!(farben, vec![Farbe::Red, Farbe::Lime]);
    }

    #[test]
    fn zuruecksetzen_leert_und_geht_in_lobby() {
        let spiel = SpielDaten::neu();
        spiel.spieler_aktualisieren(Spieler::neu(Farbe::Blue, "Bob"));
        spiel.phase_setzen(Phase::Discussion);

        spiel.zuruecksetzen();

        assert!(spiel.alle_spieler().is_empty());
        assert_eq!(spiel.phase(), Phase::Lobby);
    }

    #[test]
    fn clone_teilt_inneren_state() {
        let a = SpielDaten::neu();
        let b = a.clone();
        a.phase_setzen(Phase::Discussion);
        assert_eq!(b.phase(), Phase::Discussion);
    }
}
