//! Fehlertypen fuer den Voice-Abgleich

use crewmute_core::CrewmuteError;
use crewmute_game::Farbe;
use thiserror::Error;

/// Fehlertyp fuer den Voice-Abgleich
#[derive(Debug, Error)]
pub enum SyncError {
    /// Snapshot-Quelle lieferte nichts, der Durchlauf wird uebersprungen
    #[error("Voice-Snapshot nicht verfuegbar: {0}")]
    SnapshotNichtVerfuegbar(#[source] CrewmuteError),

    /// Farbe ist in der laufenden Runde nicht vergeben
    #[error("Kein Spieler mit Farbe {0} in der laufenden Runde")]
    SpielerUnbekannt(Farbe),

    /// Fehler aus einem Backend
    #[error(transparent)]
    Backend(#[from] CrewmuteError),

    /// Interner Fehler
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl SyncError {
    /// Erstellt einen internen Fehler
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der naechste Durchlauf erfolgreich sein koennte
    pub fn ist_wiederholbar(&self) -> bool {
        match self {
            Self::SnapshotNichtVerfuegbar(_) => true,
            Self::Backend(e) => e.ist_wiederholbar(),
            _ => false,
        }
    }
}

/// Result-Typ fuer den Voice-Abgleich
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_fehler_ist_wiederholbar() {
        let e = SyncError::SnapshotNichtVerfuegbar(CrewmuteError::BackendNichtErreichbar(
            "gateway weg".into(),
        ));
        assert!(e.ist_wiederholbar());
        assert!(e.to_string().contains("gateway weg"));
    }

    #[test]
    fn spieler_unbekannt_anzeige() {
        let e = SyncError::SpielerUnbekannt(Farbe::Cyan);
        assert_eq!(e.to_string(), "Kein Spieler mit Farbe cyan in der laufenden Runde");
        assert!(!e.ist_wiederholbar());
    }
}
