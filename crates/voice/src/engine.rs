//! Abgleich-Engine – Voice-Zustaende an den Spielzustand angleichen
//!
//! Zwei Einstiegspunkte:
//! - Vollabgleich ueber einen Snapshot aller Teilnehmer
//!   ([`AbgleichEngine::abgleichen_mit`], [`AbgleichEngine::abgleichen`])
//! - Einzel-Event eines Teilnehmers ([`AbgleichEngine::voice_state_geaendert`])
//!
//! Beide laufen zuerst einen Bestaetigungsdurchlauf: offene Befehle, deren
//! Ergebnis im Snapshot sichtbar ist, werden abgeschlossen. Danach wird pro
//! Teilnehmer entschieden, ob ein Befehl noetig ist.
//!
//! Pruefen und Setzen des Update-Zustands passiert fuer jeden Teilnehmer in
//! genau einem Schreib-Lock-Abschnitt des Stores. Dadurch ist pro Teilnehmer
//! hoechstens ein Befehl unterwegs, auch wenn Vollabgleich und Events
//! parallel laufen.
//!
//! Lock-Reihenfolge: Store → Spieldaten → Tracking.

use crate::backend::{
    IdentitaetsAufloeser, StatusAnzeige, StatusZusammenfassung, VoiceBefehl, VoiceEintrag,
    VoiceKommando, VoiceSnapshot, VoiceSnapshotQuelle,
};
use crate::error::{SyncError, SyncResult};
use crate::kontext::SyncKontext;
use crate::record::{NutzerRecord, Verknuepfung};
use crate::scheduler::{DispatchErgebnis, DispatchHandle, DispatchScheduler};
use crate::statistik::SyncStatistik;
use chrono::Utc;
use crewmute_core::UserId;
use crewmute_game::{Farbe, Phase, VoiceZiel};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// AbgleichBericht
// ---------------------------------------------------------------------------

/// Ergebnis eines Abgleich-Durchlaufs
#[derive(Debug)]
pub struct AbgleichBericht {
    /// Korrelations-ID fuer Logs
    pub durchlauf_id: Uuid,
    /// Verzoegerung, mit der alle Befehle dieses Durchlaufs geplant wurden
    pub verzoegerung: Duration,
    /// Geplante Befehle
    pub dispatches: Vec<DispatchHandle>,
    /// Teilnehmer, bei denen bereits ein Befehl unterwegs war
    pub unterdrueckt: Vec<UserId>,
    /// Teilnehmer, deren offener Befehl bestaetigt wurde
    pub bestaetigt: Vec<UserId>,
    /// Teilnehmer ohne noetige Aenderung
    pub unveraendert: usize,
}

impl AbgleichBericht {
    fn neu(verzoegerung: Duration) -> Self {
        Self {
            durchlauf_id: Uuid::new_v4(),
            verzoegerung,
            dispatches: Vec::new(),
            unterdrueckt: Vec::new(),
            bestaetigt: Vec::new(),
            unveraendert: 0,
        }
    }

    /// IDs aller Teilnehmer, fuer die ein Befehl geplant wurde
    pub fn dispatchte_nutzer(&self) -> Vec<UserId> {
        self.dispatches.iter().map(|h| h.user_id.clone()).collect()
    }

    pub fn hat_dispatches(&self) -> bool {
        !self.dispatches.is_empty()
    }

    /// Wartet auf alle geplanten Befehle
    pub async fn abwarten(self) -> Vec<(UserId, DispatchErgebnis)> {
        let mut ergebnisse = Vec::with_capacity(self.dispatches.len());
        for handle in self.dispatches {
            let user_id = handle.user_id.clone();
            ergebnisse.push((user_id, handle.abwarten().await));
        }
        ergebnisse
    }
}

// ---------------------------------------------------------------------------
// Entscheidung
// ---------------------------------------------------------------------------

/// Ergebnis der Entscheidung fuer einen Teilnehmer
#[derive(Debug)]
enum Entscheidung {
    /// Record wurde als ausstehend markiert, Befehl muss geplant werden
    Dispatch(VoiceBefehl),
    /// Aenderung noetig, aber bereits ein Befehl unterwegs
    Unterdrueckt,
    /// Beobachteter Zustand entspricht dem Ziel
    Unveraendert { ziel: VoiceZiel, name: String },
    /// Teilnehmer ist in keinem Voice-Kanal, Befehle liefen ins Leere
    NichtVerbunden,
    /// Kein Record (z.B. parallel zurueckgesetzt)
    KeinRecord,
}

// ---------------------------------------------------------------------------
// AbgleichEngine
// ---------------------------------------------------------------------------

/// Abgleich-Engine eines Voice-Raums
///
/// Clone teilt Kontext, Backends und Statistik.
#[derive(Clone)]
pub struct AbgleichEngine {
    kontext: SyncKontext,
    quelle: Arc<dyn VoiceSnapshotQuelle>,
    aufloeser: Arc<dyn IdentitaetsAufloeser>,
    scheduler: DispatchScheduler,
    anzeige: Option<Arc<dyn StatusAnzeige>>,
    statistik: SyncStatistik,
}

impl AbgleichEngine {
    /// Erstellt eine Engine ohne Statusanzeige
    pub fn neu(
        kontext: SyncKontext,
        quelle: Arc<dyn VoiceSnapshotQuelle>,
        aufloeser: Arc<dyn IdentitaetsAufloeser>,
        kommando: Arc<dyn VoiceKommando>,
    ) -> Self {
        let statistik = SyncStatistik::neu();
        Self {
            kontext,
            quelle,
            aufloeser,
            scheduler: DispatchScheduler::neu(kommando, statistik.clone()),
            anzeige: None,
            statistik,
        }
    }

    /// Statusanzeige, die nach jedem Durchlauf mit Dispatches aktualisiert wird
    pub fn mit_anzeige(mut self, anzeige: Arc<dyn StatusAnzeige>) -> Self {
        self.anzeige = Some(anzeige);
        self
    }

    pub fn kontext(&self) -> &SyncKontext {
        &self.kontext
    }

    pub fn statistik(&self) -> &SyncStatistik {
        &self.statistik
    }

    // -----------------------------------------------------------------------
    // Vollabgleich
    // -----------------------------------------------------------------------

    /// Holt einen Snapshot und gleicht alle Teilnehmer ab
    pub async fn abgleichen(&self, verzoegerung_sek: u32) -> SyncResult<AbgleichBericht> {
        let snapshot = self.snapshot_holen().await?;
        Ok(self.abgleichen_mit(&snapshot, verzoegerung_sek).await)
    }

    /// Gleicht alle Teilnehmer des Snapshots ab
    ///
    /// Die Verzoegerung gilt einheitlich fuer alle Befehle dieses Durchlaufs.
    pub async fn abgleichen_mit(&self, snapshot: &VoiceSnapshot, verzoegerung_sek: u32) -> AbgleichBericht {
        let verzoegerung = Duration::from_secs(u64::from(verzoegerung_sek));
        let mut bericht = AbgleichBericht::neu(verzoegerung);
        let span = tracing::debug_span!("abgleich", durchlauf = %bericht.durchlauf_id);

        async {
            self.statistik.durchlauf();
            self.records_anlegen(snapshot.eintraege.iter().map(|e| &e.user_id))
                .await;

            bericht.bestaetigt = self.eintraege_bestaetigen(&snapshot.eintraege);
            for eintrag in &snapshot.eintraege {
                self.eintrag_entscheiden(eintrag, verzoegerung, &mut bericht);
            }

            if bericht.hat_dispatches() {
                self.anzeige_aktualisieren();
            }

            tracing::debug!(
                teilnehmer = snapshot.eintraege.len(),
                dispatches = bericht.dispatches.len(),
                unterdrueckt = bericht.unterdrueckt.len(),
                bestaetigt = bericht.bestaetigt.len(),
                unveraendert = bericht.unveraendert,
                verzoegerung_sek,
                "Vollabgleich abgeschlossen"
            );
        }
        .instrument(span)
        .await;

        bericht
    }

    // -----------------------------------------------------------------------
    // Bestaetigung
    // -----------------------------------------------------------------------

    /// Schliesst offene Befehle ab, deren Ergebnis der Snapshot zeigt
    ///
    /// Gibt die bestaetigten Teilnehmer zurueck. Unbekannte Teilnehmer
    /// werden dabei angelegt.
    pub async fn bestaetigen(&self, snapshot: &VoiceSnapshot) -> Vec<UserId> {
        self.records_anlegen(snapshot.eintraege.iter().map(|e| &e.user_id))
            .await;
        self.eintraege_bestaetigen(&snapshot.eintraege)
    }

    fn eintraege_bestaetigen(&self, eintraege: &[VoiceEintrag]) -> Vec<UserId> {
        eintraege
            .iter()
            .filter(|e| self.eintrag_bestaetigen(e))
            .map(|e| e.user_id.clone())
            .collect()
    }

    /// Bestaetigt einen einzelnen Eintrag, `true` wenn ein Befehl abgeschlossen wurde
    fn eintrag_bestaetigen(&self, eintrag: &VoiceEintrag) -> bool {
        let phase = self.kontext.spiel.phase();
        let verfolgt = self.kontext.tracking.ist_verfolgt(eintrag.channel_id.as_ref());

        let bestaetigt = self
            .kontext
            .nutzer
            .mit_record_mut(&eintrag.user_id, |record| {
                if !record.pending_update() {
                    return false;
                }
                let ziel = self.ziel_berechnen(record, verfolgt, phase);
                ziel == eintrag.ist_zustand() && record.bestaetigen(eintrag.nick.as_deref())
            })
            .unwrap_or(false);

        if bestaetigt {
            self.statistik.bestaetigung();
            tracing::debug!(
                user_id = %eintrag.user_id,
                stumm = eintrag.stumm,
                taub = eintrag.taub,
                "Voice-Befehl bestaetigt"
            );
        }
        bestaetigt
    }

    // -----------------------------------------------------------------------
    // Einzel-Event
    // -----------------------------------------------------------------------

    /// Verarbeitet die Voice-Aenderung eines einzelnen Teilnehmers
    ///
    /// Bestaetigt zuerst ueber den aktuellen Gesamt-Snapshot (falls
    /// verfuegbar), dann ueber den Event-Eintrag selbst und entscheidet
    /// schliesslich fuer diesen Teilnehmer ohne Verzoegerung.
    pub async fn voice_state_geaendert(&self, eintrag: VoiceEintrag) -> AbgleichBericht {
        let mut bericht = AbgleichBericht::neu(Duration::ZERO);
        let span = tracing::debug_span!(
            "voice_event",
            durchlauf = %bericht.durchlauf_id,
            user_id = %eintrag.user_id
        );

        async {
            match self.quelle.snapshot().await {
                Ok(snapshot) => {
                    bericht.bestaetigt = self.bestaetigen(&snapshot).await;
                }
                Err(e) => {
                    self.statistik.snapshot_fehler();
                    tracing::warn!(
                        fehler = %e,
                        "Snapshot nicht verfuegbar, bestaetige nur den Event-Eintrag"
                    );
                }
            }

            self.records_anlegen(std::iter::once(&eintrag.user_id)).await;
            if self.eintrag_bestaetigen(&eintrag) && !bericht.bestaetigt.contains(&eintrag.user_id) {
                bericht.bestaetigt.push(eintrag.user_id.clone());
            }

            self.eintrag_entscheiden(&eintrag, Duration::ZERO, &mut bericht);
            if bericht.hat_dispatches() {
                self.anzeige_aktualisieren();
            }
        }
        .instrument(span)
        .await;

        bericht
    }

    // -----------------------------------------------------------------------
    // Spielsteuerung
    // -----------------------------------------------------------------------

    /// Wechselt die Phase und gleicht mit der Uebergangsverzoegerung ab
    pub async fn phase_wechseln(&self, neue_phase: Phase) -> SyncResult<AbgleichBericht> {
        let alte_phase = self.kontext.spiel.phase_setzen(neue_phase);
        let verzoegerung_sek = self.kontext.verzoegerungen.verzoegerung_sek(alte_phase, neue_phase);

        tracing::info!(
            von = %alte_phase,
            nach = %neue_phase,
            verzoegerung_sek,
            "Phasenwechsel"
        );

        self.abgleichen(verzoegerung_sek).await
    }

    /// Verknuepft einen Teilnehmer mit dem Spieler der angegebenen Farbe
    pub async fn spieler_verknuepfen(&self, user_id: &UserId, farbe: Farbe) -> SyncResult<()> {
        let spieler = self
            .kontext
            .spiel
            .spieler(farbe)
            .ok_or(SyncError::SpielerUnbekannt(farbe))?;

        self.records_anlegen(std::iter::once(user_id)).await;
        let verknuepft = self.kontext.nutzer.mit_record_mut(user_id, |record| {
            record.verknuepfen(
                Verknuepfung {
                    farbe,
                    spielername: spieler.name.clone(),
                },
                spieler.lebt,
            );
        });

        match verknuepft {
            Some(()) => {
                tracing::info!(user_id = %user_id, farbe = %farbe, spieler = %spieler.name, "Nutzer verknuepft");
                Ok(())
            }
            None => Err(SyncError::intern(format!(
                "Record fuer {user_id} waehrend der Verknuepfung entfernt"
            ))),
        }
    }

    /// Loest die Verknuepfung eines Teilnehmers
    pub fn verknuepfung_loesen(&self, user_id: &UserId) -> bool {
        let geloest = self
            .kontext
            .nutzer
            .mit_record_mut(user_id, NutzerRecord::verknuepfung_loesen)
            .unwrap_or(false);
        if geloest {
            tracing::info!(user_id = %user_id, "Verknuepfung geloest");
        }
        geloest
    }

    /// Neues Spiel: alle Records, Tracking und Spielerdaten verwerfen
    pub fn neues_spiel(&self) {
        let records = self.kontext.nutzer.leeren();
        self.kontext.tracking.zuruecksetzen();
        self.kontext.spiel.zuruecksetzen();
        tracing::info!(records, "Neues Spiel, Abgleich-Zustand zurueckgesetzt");
    }

    /// Verwirft den offenen Befehl eines Teilnehmers
    pub fn pending_zuruecksetzen(&self, user_id: &UserId) -> bool {
        let zurueckgesetzt = self
            .kontext
            .nutzer
            .mit_record_mut(user_id, NutzerRecord::zuruecksetzen)
            .unwrap_or(false);
        if zurueckgesetzt {
            tracing::info!(user_id = %user_id, "Offener Voice-Befehl verworfen");
        }
        zurueckgesetzt
    }

    /// Teilnehmer, deren Befehl laenger als `aelter_als` offen ist
    pub fn haengende_updates(&self, aelter_als: chrono::Duration) -> Vec<UserId> {
        let mut haengend = self.kontext.nutzer.haengende(aelter_als, Utc::now());
        haengend.sort();
        haengend
    }

    pub fn status_zusammenfassung(&self) -> StatusZusammenfassung {
        let records = self.kontext.nutzer.alle();
        StatusZusammenfassung {
            phase: self.kontext.spiel.phase(),
            bekannte_nutzer: records.len(),
            verknuepfte_nutzer: records.iter().filter(|r| r.ist_verknuepft()).count(),
            ausstehende_updates: records.iter().filter(|r| r.pending_update()).count(),
            verfolgte_kanaele: self.kontext.tracking.anzahl(),
        }
    }

    // -----------------------------------------------------------------------
    // Intern
    // -----------------------------------------------------------------------

    async fn snapshot_holen(&self) -> SyncResult<VoiceSnapshot> {
        self.quelle.snapshot().await.map_err(|e| {
            self.statistik.snapshot_fehler();
            tracing::warn!(fehler = %e, "Voice-Snapshot nicht verfuegbar");
            SyncError::SnapshotNichtVerfuegbar(e)
        })
    }

    /// Legt Records fuer bisher unbekannte Teilnehmer an
    ///
    /// Der Aufloeser wird ausserhalb jedes Locks aufgerufen.
    async fn records_anlegen<'a>(&self, ids: impl IntoIterator<Item = &'a UserId>) {
        for user_id in self.kontext.nutzer.fehlende(ids) {
            let record = match self.aufloeser.aufloesen(&user_id).await {
                Some(identitaet) => {
                    NutzerRecord::mit_identitaet(user_id, identitaet.nutzername, identitaet.nick)
                }
                None => {
                    tracing::debug!(user_id = %user_id, "Identitaet unbekannt, lege Minimal-Record an");
                    NutzerRecord::minimal(user_id)
                }
            };
            self.kontext.nutzer.einfuegen_falls_fehlt(record);
        }
    }

    /// Zielzustand eines Records, frischt den Lebensstatus aus den Spieldaten auf
    fn ziel_berechnen(&self, record: &mut NutzerRecord, verfolgt: bool, phase: Phase) -> VoiceZiel {
        if let Some(verknuepfung) = &record.verknuepfung {
            if let Some(spieler) = self.kontext.spiel.spieler(verknuepfung.farbe) {
                record.lebt = spieler.lebt;
            }
        }
        let verfolgt_und_verknuepft = verfolgt && record.ist_verknuepft();
        self.kontext
            .regeln
            .entscheiden(record.lebt, verfolgt_und_verknuepft, phase)
    }

    /// Gewuenschter Nickname, `None` wenn Nicknames nicht gesetzt werden
    fn gewuenschter_nick(&self, record: &NutzerRecord) -> Option<String> {
        if !self.kontext.nicknames_anwenden {
            return None;
        }
        let verknuepfung = record.verknuepfung.as_ref()?;
        let name = self
            .kontext
            .spiel
            .spieler(verknuepfung.farbe)
            .map(|s| s.name)
            .unwrap_or_else(|| verknuepfung.spielername.clone());
        Some(name)
    }

    /// Entscheidung fuer einen Teilnehmer, komplett unter dem Schreib-Lock
    fn entscheiden(&self, eintrag: &VoiceEintrag) -> Entscheidung {
        let phase = self.kontext.spiel.phase();
        let verfolgt = self.kontext.tracking.ist_verfolgt(eintrag.channel_id.as_ref());

        self.kontext
            .nutzer
            .mit_record_mut(&eintrag.user_id, |record| {
                record.zuletzt_gesehen = Utc::now();
                if eintrag.nick.is_some() {
                    record.nick = eintrag.nick.clone();
                }
                if eintrag.channel_id.is_none() {
                    return Entscheidung::NichtVerbunden;
                }

                let ziel = self.ziel_berechnen(record, verfolgt, phase);
                let nick = self.gewuenschter_nick(record);
                // Ein offener Befehl unterdrueckt Wiederholungen, verglichen wird nur der beobachtete Nick
                let nick_faellig = nick.is_some() && nick != record.nick;

                if ziel == eintrag.ist_zustand() && !nick_faellig {
                    return Entscheidung::Unveraendert {
                        ziel,
                        name: record.anzeigename(),
                    };
                }
                if !record.ausstehend_markieren(ziel) {
                    return Entscheidung::Unterdrueckt;
                }
                if nick.is_some() {
                    record.angewandter_nick = nick.clone();
                }

                Entscheidung::Dispatch(VoiceBefehl {
                    user_id: record.user_id.clone(),
                    stumm: ziel.stumm,
                    taub: ziel.taub,
                    nick,
                })
            })
            .unwrap_or(Entscheidung::KeinRecord)
    }

    fn eintrag_entscheiden(&self, eintrag: &VoiceEintrag, verzoegerung: Duration, bericht: &mut AbgleichBericht) {
        match self.entscheiden(eintrag) {
            Entscheidung::Dispatch(befehl) => {
                self.statistik.dispatch();
                tracing::info!(
                    user_id = %befehl.user_id,
                    stumm = befehl.stumm,
                    taub = befehl.taub,
                    nick = ?befehl.nick,
                    verzoegerung_ms = verzoegerung.as_millis() as u64,
                    "Voice-Zustand weicht ab, plane Befehl"
                );
                bericht.dispatches.push(self.scheduler.planen(befehl, verzoegerung));
            }
            Entscheidung::Unterdrueckt => {
                self.statistik.duplikat_unterdrueckt();
                tracing::debug!(
                    user_id = %eintrag.user_id,
                    "Befehl bereits unterwegs, kein weiterer Dispatch"
                );
                bericht.unterdrueckt.push(eintrag.user_id.clone());
            }
            Entscheidung::Unveraendert { ziel, name } => {
                tracing::debug!(
                    user_id = %eintrag.user_id,
                    name = %name,
                    ziel = %ziel,
                    "Voice-Zustand bereits korrekt"
                );
                bericht.unveraendert += 1;
            }
            Entscheidung::NichtVerbunden => {
                tracing::debug!(user_id = %eintrag.user_id, "Nicht in Voice, nur Bestaetigung");
            }
            Entscheidung::KeinRecord => {
                tracing::debug!(user_id = %eintrag.user_id, "Kein Record mehr vorhanden, uebersprungen");
            }
        }
    }

    /// Statusanzeige im Hintergrund aktualisieren
    fn anzeige_aktualisieren(&self) {
        let Some(anzeige) = self.anzeige.clone() else {
            return;
        };
        let zusammenfassung = self.status_zusammenfassung();
        tokio::spawn(async move {
            if let Err(e) = anzeige.aktualisieren(zusammenfassung).await {
                tracing::warn!(fehler = %e, "Statusanzeige konnte nicht aktualisiert werden");
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
