//! Geteilter Abgleich-Kontext
//!
//! Buendelt alles, was die Engine zum Entscheiden braucht: Nutzer-Store,
//! Tracking, Spieldaten sowie die unveraenderliche Verzoegerungstabelle und
//! Regelmatrix. Es gibt keine prozessweiten Singletons, der Kontext wird
//! explizit an die Engine uebergeben. Clone teilt den inneren Zustand.

use crate::store::UserStore;
use crate::tracking::TrackingSet;
use crewmute_game::{DelayTable, SpielDaten, VoiceRegeln};
use std::sync::Arc;

/// Kontext einer Abgleich-Sitzung (ein Voice-Raum)
#[derive(Clone)]
pub struct SyncKontext {
    pub nutzer: UserStore,
    pub tracking: TrackingSet,
    pub spiel: SpielDaten,
    pub verzoegerungen: DelayTable,
    pub regeln: Arc<VoiceRegeln>,
    /// Nicknames auf In-Game-Namen setzen
    pub nicknames_anwenden: bool,
}

impl SyncKontext {
    /// Leerer Kontext mit Standardtabelle und Standardregeln
    pub fn neu() -> Self {
        Self {
            nutzer: UserStore::neu(),
            tracking: TrackingSet::neu(),
            spiel: SpielDaten::neu(),
            verzoegerungen: DelayTable::standard(),
            regeln: Arc::new(VoiceRegeln::standard()),
            nicknames_anwenden: false,
        }
    }

    pub fn mit_verzoegerungen(mut self, verzoegerungen: DelayTable) -> Self {
        self.verzoegerungen = verzoegerungen;
        self
    }

    pub fn mit_regeln(mut self, regeln: VoiceRegeln) -> Self {
        self.regeln = Arc::new(regeln);
        self
    }

    pub fn mit_nicknames(mut self, anwenden: bool) -> Self {
        self.nicknames_anwenden = anwenden;
        self
    }
}

impl Default for SyncKontext {
    fn default() -> Self {
        Self::neu()
    }
}
