//! Nutzer-Record – gecachter Zustand eines beobachteten Teilnehmers
//!
//! Pro Teilnehmer:
//! - Verknuepfung mit einem Spieler der Runde (Farbe + In-Game-Name)
//! - Lebensstatus (nur bei Verknuepfung aussagekraeftig)
//! - Zuletzt bekannter bzw. angewandter Nickname
//! - Update-Zustand: abgeglichen oder auf Bestaetigung wartend
//!
//! Der Update-Zustand ist eine kleine Zustandsmaschine:
//!
//! ```text
//! Abgeglichen --ausstehend_markieren--> Ausstehend
//! Ausstehend  --bestaetigen/zuruecksetzen--> Abgeglichen
//! ```
//!
//! Beide Uebergaenge passieren ausschliesslich unter dem Schreib-Lock des
//! [`UserStore`](crate::store::UserStore).

use chrono::{DateTime, Utc};
use crewmute_core::UserId;
use crewmute_game::{Farbe, VoiceZiel};

// ---------------------------------------------------------------------------
// UpdateZustand
// ---------------------------------------------------------------------------

/// Ob fuer einen Teilnehmer ein Voice-Befehl unbestaetigt unterwegs ist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateZustand {
    /// Kein Befehl offen
    #[default]
    Abgeglichen,
    /// Genau ein Befehl wurde geplant und ist noch nicht beobachtet worden
    Ausstehend {
        /// Zielzustand zum Zeitpunkt der Planung
        ziel: VoiceZiel,
        /// Zeitpunkt der Planung
        seit: DateTime<Utc>,
    },
}

impl UpdateZustand {
    pub fn ist_ausstehend(&self) -> bool {
        matches!(self, Self::Ausstehend { .. })
    }
}

// ---------------------------------------------------------------------------
// Verknuepfung
// ---------------------------------------------------------------------------

/// Zuordnung eines Teilnehmers zu einem Spieler der Runde
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verknuepfung {
    pub farbe: Farbe,
    /// In-Game-Name zum Zeitpunkt der Verknuepfung
    pub spielername: String,
}

// ---------------------------------------------------------------------------
// NutzerRecord
// ---------------------------------------------------------------------------

/// Gecachter Zustand eines Teilnehmers
#[derive(Debug, Clone)]
pub struct NutzerRecord {
    pub user_id: UserId,
    /// Benutzername auf der Plattform, `None` bei Minimal-Records
    pub nutzername: Option<String>,
    /// Zuletzt beobachteter Nickname
    pub nick: Option<String>,
    /// Nickname des offenen Befehls, bis dieser bestaetigt oder verworfen wird
    pub angewandter_nick: Option<String>,
    pub verknuepfung: Option<Verknuepfung>,
    /// Lebensstatus des verknuepften Spielers
    pub lebt: bool,
    pub update: UpdateZustand,
    pub zuletzt_gesehen: DateTime<Utc>,
}

impl NutzerRecord {
    /// Minimal-Record, wenn keine Identitaet aufgeloest werden konnte
    pub fn minimal(user_id: UserId) -> Self {
        Self {
            user_id,
            nutzername: None,
            nick: None,
            angewandter_nick: None,
            verknuepfung: None,
            lebt: true,
            update: UpdateZustand::Abgeglichen,
            zuletzt_gesehen: Utc::now(),
        }
    }

    /// Record mit aufgeloester Identitaet
    pub fn mit_identitaet(user_id: UserId, nutzername: String, nick: Option<String>) -> Self {
        Self {
            nutzername: Some(nutzername),
            nick,
            ..Self::minimal(user_id)
        }
    }

    pub fn ist_verknuepft(&self) -> bool {
        self.verknuepfung.is_some()
    }

    pub fn pending_update(&self) -> bool {
        self.update.ist_ausstehend()
    }

    /// Name fuer Logs: Nickname, Benutzername oder ID
    pub fn anzeigename(&self) -> String {
        self.nick
            .clone()
            .or_else(|| self.nutzername.clone())
            .unwrap_or_else(|| self.user_id.as_str().to_string())
    }

    /// Markiert einen Befehl als unterwegs
    ///
    /// Gibt `false` zurueck wenn bereits ein Befehl offen ist, der Aufrufer
    /// darf dann nicht dispatchen.
    pub fn ausstehend_markieren(&mut self, ziel: VoiceZiel) -> bool {
        if self.pending_update() {
            return false;
        }
        self.update = UpdateZustand::Ausstehend {
            ziel,
            seit: Utc::now(),
        };
        true
    }

    /// Beobachteter Zustand entspricht dem gewuenschten: offenen Befehl abschliessen
    ///
    /// Gibt `true` zurueck wenn tatsaechlich ein Befehl offen war. Meldet
    /// die Plattform keinen Nickname (`beobachteter_nick == None`), gilt der
    /// mitgesendete Nickname als angewandt.
    pub fn bestaetigen(&mut self, beobachteter_nick: Option<&str>) -> bool {
        if !self.pending_update() {
            return false;
        }
        self.update = UpdateZustand::Abgeglichen;
        let gesendet = self.angewandter_nick.take();
        if beobachteter_nick.is_none() && gesendet.is_some() {
            self.nick = gesendet;
        }
        true
    }

    /// Offenen Befehl verwerfen, ohne dass er beobachtet wurde
    ///
    /// Der mitgesendete Nickname gilt danach nicht als angewandt.
    pub fn zuruecksetzen(&mut self) -> bool {
        let war_ausstehend = self.pending_update();
        self.update = UpdateZustand::Abgeglichen;
        self.angewandter_nick = None;
        war_ausstehend
    }

    /// Wie lange der offene Befehl schon unterwegs ist
    pub fn ausstehend_seit(&self, jetzt: DateTime<Utc>) -> Option<chrono::Duration> {
        match self.update {
            UpdateZustand::Ausstehend { seit, .. } => Some(jetzt - seit),
            UpdateZustand::Abgeglichen => None,
        }
    }

    /// Verknuepfung setzen, ein unterwegs gesendeter Nickname verfaellt
    pub fn verknuepfen(&mut self, verknuepfung: Verknuepfung, lebt: bool) {
        if self.verknuepfung.as_ref() != Some(&verknuepfung) {
            self.angewandter_nick = None;
        }
        self.verknuepfung = Some(verknuepfung);
        self.lebt = lebt;
    }

    /// Verknuepfung entfernen, offener Befehl bleibt bestehen
    pub fn verknuepfung_loesen(&mut self) -> bool {
        self.angewandter_nick = None;
        self.verknuepfung.take().is_some()
    }
}
