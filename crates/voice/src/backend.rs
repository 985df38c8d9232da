//! Backend-Schnittstellen zur Voice-Plattform
//!
//! Die Abgleich-Engine spricht nie direkt mit der Plattform, sondern nur
//! ueber diese Traits:
//! - [`VoiceSnapshotQuelle`] – aktueller Voice-Zustand aller Teilnehmer
//! - [`IdentitaetsAufloeser`] – Benutzername/Nickname zu einer ID
//! - [`VoiceKommando`] – Stumm/Taub/Nickname eines Teilnehmers setzen
//! - [`StatusAnzeige`] – Statusanzeige nach einem Dispatch neu rendern
//!
//! Alle Methoden sind async und liefern `Send`-Futures, damit sie aus
//! gespawnten tokio-Tasks aufgerufen werden koennen.

use async_trait::async_trait;
use crewmute_core::{ChannelId, UserId};
use crewmute_game::{Phase, VoiceZiel};

// ---------------------------------------------------------------------------
// Daten
// ---------------------------------------------------------------------------

/// Beobachteter Voice-Zustand eines Teilnehmers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceEintrag {
    pub user_id: UserId,
    /// Aktueller Kanal, `None` wenn der Teilnehmer Voice verlassen hat
    pub channel_id: Option<ChannelId>,
    pub stumm: bool,
    pub taub: bool,
    /// Beobachteter Nickname, falls die Plattform ihn mitliefert
    pub nick: Option<String>,
}

impl VoiceEintrag {
    pub fn neu(user_id: UserId, channel_id: Option<ChannelId>, stumm: bool, taub: bool) -> Self {
        Self {
            user_id,
            channel_id,
            stumm,
            taub,
            nick: None,
        }
    }

    /// Beobachteter Zustand als Ziel-Paar fuer den Vergleich
    pub fn ist_zustand(&self) -> VoiceZiel {
        VoiceZiel::neu(self.stumm, self.taub)
    }
}

/// Momentaufnahme aller Teilnehmer eines Voice-Raums
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceSnapshot {
    pub eintraege: Vec<VoiceEintrag>,
}

impl VoiceSnapshot {
    pub fn neu(eintraege: Vec<VoiceEintrag>) -> Self {
        Self { eintraege }
    }
}

/// Aufgeloeste Identitaet eines Teilnehmers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identitaet {
    pub nutzername: String,
    pub nick: Option<String>,
}

/// Befehl an die Plattform, mit den zum Planungszeitpunkt erfassten Werten
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceBefehl {
    pub user_id: UserId,
    pub stumm: bool,
    pub taub: bool,
    /// Neuer Nickname, `None` laesst ihn unveraendert
    pub nick: Option<String>,
}

impl VoiceBefehl {
    pub fn ziel(&self) -> VoiceZiel {
        VoiceZiel::neu(self.stumm, self.taub)
    }
}

/// Zusammenfassung fuer die Statusanzeige
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusZusammenfassung {
    pub phase: Phase,
    pub bekannte_nutzer: usize,
    pub verknuepfte_nutzer: usize,
    pub ausstehende_updates: usize,
    pub verfolgte_kanaele: usize,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Liefert den aktuellen Voice-Zustand aller Teilnehmer
#[async_trait]
pub trait VoiceSnapshotQuelle: Send + Sync + 'static {
    async fn snapshot(&self) -> crewmute_core::Result<VoiceSnapshot>;
}

/// Loest eine Benutzer-ID in eine Identitaet auf, `None` = unbekannt
#[async_trait]
pub trait IdentitaetsAufloeser: Send + Sync + 'static {
    async fn aufloesen(&self, user_id: &UserId) -> Option<Identitaet>;
}

/// Setzt den Voice-Zustand eines Teilnehmers auf der Plattform
///
/// Muss idempotent sein; das Ergebnis wird erst ueber einen spaeteren
/// Snapshot bzw. ein Voice-Event sichtbar.
#[async_trait]
pub trait VoiceKommando: Send + Sync + 'static {
    async fn voice_state_setzen(&self, befehl: &VoiceBefehl) -> crewmute_core::Result<()>;
}

/// Rendert eine Statusanzeige nach einer Dispatch-Runde neu
#[async_trait]
pub trait StatusAnzeige: Send + Sync + 'static {
    async fn aktualisieren(&self, zusammenfassung: StatusZusammenfassung) -> crewmute_core::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eintrag_ist_zustand() {
        let eintrag = VoiceEintrag::neu(UserId::neu("2"), Some(ChannelId::neu("9")), true, false);
        assert_eq!(eintrag.ist_zustand(), VoiceZiel::neu(true, false));
        assert!(eintrag.nick.is_none());
    }

    #[test]
    fn befehl_ziel() {
        let befehl = VoiceBefehl {
            user_id: UserId::neu("1"),
            stumm: false,
            taub: true,
            nick: None,
        };
        assert_eq!(befehl.ziel(), VoiceZiel::neu(false, true));
    }
}
