//! Fehlertypen fuer crewmute
//!
//! Zentraler Fehler-Enum fuer crate-uebergreifende Fehlerzustaende.
//! Untermodule koennen eigene Fehler definieren und via `#[from]` konvertieren.

use thiserror::Error;

/// Globaler Result-Alias fuer crewmute
pub type Result<T> = std::result::Result<T, CrewmuteError>;

/// Alle crate-uebergreifenden Fehler im crewmute-System
#[derive(Debug, Error)]
pub enum CrewmuteError {
    // --- Backend ---
    #[error("Backend nicht erreichbar: {0}")]
    BackendNichtErreichbar(String),

    #[error("Befehl abgelehnt: {0}")]
    BefehlAbgelehnt(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl CrewmuteError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler beim naechsten Durchlauf
    /// verschwinden koennte
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(self, Self::BackendNichtErreichbar(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = CrewmuteError::BefehlAbgelehnt("fehlende Berechtigung".into());
        assert_eq!(e.to_string(), "Befehl abgelehnt: fehlende Berechtigung");
    }

    #[test]
    fn wiederholbar_erkennung() {
        assert!(CrewmuteError::BackendNichtErreichbar("test".into()).ist_wiederholbar());
        assert!(!CrewmuteError::BefehlAbgelehnt("test".into()).ist_wiederholbar());
        assert!(!CrewmuteError::intern("test").ist_wiederholbar());
    }

    #[test]
    fn intern_konstruktor() {
        let e = CrewmuteError::intern("kaputt");
        assert!(matches!(e, CrewmuteError::Intern(ref m) if m == "kaputt"));
    }
}
