//! In-Memory-Backend eines Voice-Raums
//!
//! [`LokaleGilde`] haelt Mitglieder und Voice-Zustaende im Speicher und
//! verhaelt sich nach aussen wie die Plattform: Befehle werden (optional
//! mit Latenz) angewandt und als Voice-Event ueber einen Broadcast-Kanal
//! gemeldet. Fuer Betrieb ohne Plattform-Anbindung und fuer Tests.
//!
//! [`LogAnzeige`] ist die Statusanzeige, die nur loggt.

use crate::backend::{
    Identitaet, IdentitaetsAufloeser, StatusAnzeige, StatusZusammenfassung, VoiceBefehl,
    VoiceEintrag, VoiceKommando, VoiceSnapshot, VoiceSnapshotQuelle,
};
use async_trait::async_trait;
use crewmute_core::{CrewmuteError, GuildId, UserId};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Kapazitaet des Event-Kanals
const EVENT_KAPAZITAET: usize = 256;

/// Ein bei der Plattform eingegangener Befehl
#[derive(Debug, Clone)]
pub struct EmpfangenerBefehl {
    pub zeitpunkt: Instant,
    pub befehl: VoiceBefehl,
    /// `false` wenn der Befehl abgelehnt wurde
    pub angenommen: bool,
}

// ---------------------------------------------------------------------------
// LokaleGilde
// ---------------------------------------------------------------------------

/// In-Memory-Voice-Raum, Clone teilt den Zustand
#[derive(Clone)]
pub struct LokaleGilde {
    inner: Arc<LokaleGildeInner>,
}

struct LokaleGildeInner {
    guild_id: GuildId,
    mitglieder: DashMap<UserId, Identitaet>,
    voice: DashMap<UserId, VoiceEintrag>,
    latenz: Mutex<Duration>,
    befehle_ablehnen: AtomicBool,
    snapshot_ausfall: AtomicBool,
    befehle: Mutex<Vec<EmpfangenerBefehl>>,
    event_tx: broadcast::Sender<VoiceEintrag>,
}

impl LokaleGilde {
    pub fn neu(guild_id: GuildId) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_KAPAZITAET);
        Self {
            inner: Arc::new(LokaleGildeInner {
                guild_id,
                mitglieder: DashMap::new(),
                voice: DashMap::new(),
                latenz: Mutex::new(Duration::ZERO),
                befehle_ablehnen: AtomicBool::new(false),
                snapshot_ausfall: AtomicBool::new(false),
                befehle: Mutex::new(Vec::new()),
                event_tx,
            }),
        }
    }

    pub fn guild_id(&self) -> &GuildId {
        &self.inner.guild_id
    }

    /// Zeit zwischen Annahme und Anwendung eines Befehls
    pub fn latenz_setzen(&self, latenz: Duration) {
        *self.inner.latenz.lock() = latenz;
    }

    /// Alle folgenden Befehle ablehnen (bzw. wieder annehmen)
    pub fn befehle_ablehnen(&self, ablehnen: bool) {
        self.inner.befehle_ablehnen.store(ablehnen, Ordering::Relaxed);
    }

    /// Snapshots schlagen fehl solange gesetzt
    pub fn snapshot_ausfall(&self, ausfall: bool) {
        self.inner.snapshot_ausfall.store(ausfall, Ordering::Relaxed);
    }

    pub fn mitglied_hinzufuegen(&self, user_id: UserId, nutzername: impl Into<String>, nick: Option<String>) {
        self.inner.mitglieder.insert(
            user_id,
            Identitaet {
                nutzername: nutzername.into(),
                nick,
            },
        );
    }

    /// Setzt den Voice-Zustand eines Teilnehmers und meldet ihn als Event
    ///
    /// Entspricht einer Aktion des Teilnehmers selbst (Beitreten, Wechseln,
    /// Selbst-Stummschalten).
    pub fn eintrag_setzen(&self, eintrag: VoiceEintrag) {
        self.inner.voice.insert(eintrag.user_id.clone(), eintrag.clone());
        // Ohne Abonnenten geht das Event verloren
        let _ = self.inner.event_tx.send(eintrag);
    }

    /// Teilnehmer verlaesst Voice
    pub fn verlassen(&self, user_id: &UserId) -> bool {
        match self.inner.voice.remove(user_id) {
            Some((_, mut eintrag)) => {
                eintrag.channel_id = None;
                let _ = self.inner.event_tx.send(eintrag);
                true
            }
            None => false,
        }
    }

    pub fn voice_zustand(&self, user_id: &UserId) -> Option<VoiceEintrag> {
        self.inner.voice.get(user_id).map(|e| e.value().clone())
    }

    /// Voice-Events abonnieren
    pub fn ereignisse_abonnieren(&self) -> broadcast::Receiver<VoiceEintrag> {
        self.inner.event_tx.subscribe()
    }

    /// Alle bisher eingegangenen Befehle
    pub fn befehle(&self) -> Vec<EmpfangenerBefehl> {
        self.inner.befehle.lock().clone()
    }

    /// Anzahl eingegangener Befehle fuer einen Teilnehmer
    pub fn befehle_fuer(&self, user_id: &UserId) -> usize {
        self.inner
            .befehle
            .lock()
            .iter()
            .filter(|b| &b.befehl.user_id == user_id)
            .count()
    }

    fn anwenden(inner: &LokaleGildeInner, befehl: &VoiceBefehl) {
        let eintrag = {
            let Some(mut eintrag) = inner.voice.get_mut(&befehl.user_id) else {
                tracing::debug!(user_id = %befehl.user_id, "Teilnehmer hat Voice vor Anwendung verlassen");
                return;
            };
            eintrag.stumm = befehl.stumm;
            eintrag.taub = befehl.taub;
            if befehl.nick.is_some() {
                eintrag.nick = befehl.nick.clone();
            }
            eintrag.value().clone()
        };
        let _ = inner.event_tx.send(eintrag);
    }
}

#[async_trait]
impl VoiceSnapshotQuelle for LokaleGilde {
    async fn snapshot(&self) -> crewmute_core::Result<VoiceSnapshot> {
        if self.inner.snapshot_ausfall.load(Ordering::Relaxed) {
            return Err(CrewmuteError::BackendNichtErreichbar(format!(
                "Gilde {} antwortet nicht",
                self.inner.guild_id
            )));
        }
        let mut eintraege: Vec<VoiceEintrag> = self.inner.voice.iter().map(|e| e.value().clone()).collect();
        eintraege.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(VoiceSnapshot::neu(eintraege))
    }
}

#[async_trait]
impl IdentitaetsAufloeser for LokaleGilde {
    async fn aufloesen(&self, user_id: &UserId) -> Option<Identitaet> {
        self.inner.mitglieder.get(user_id).map(|m| m.value().clone())
    }
}

#[async_trait]
impl VoiceKommando for LokaleGilde {
    async fn voice_state_setzen(&self, befehl: &VoiceBefehl) -> crewmute_core::Result<()> {
        let ablehnen = self.inner.befehle_ablehnen.load(Ordering::Relaxed);
        let verbunden = self.inner.voice.contains_key(&befehl.user_id);
        let angenommen = !ablehnen && verbunden;

        self.inner.befehle.lock().push(EmpfangenerBefehl {
            zeitpunkt: Instant::now(),
            befehl: befehl.clone(),
            angenommen,
        });

        if ablehnen {
            return Err(CrewmuteError::BefehlAbgelehnt("Rate-Limit erreicht".into()));
        }
        if !verbunden {
            return Err(CrewmuteError::BefehlAbgelehnt(format!(
                "{} ist nicht mit Voice verbunden",
                befehl.user_id
            )));
        }

        let latenz = *self.inner.latenz.lock();
        if latenz.is_zero() {
            Self::anwenden(&self.inner, befehl);
        } else {
            let inner = Arc::clone(&self.inner);
            let befehl = befehl.clone();
            tokio::spawn(async move {
                tokio::time::sleep(latenz).await;
                Self::anwenden(&inner, &befehl);
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LogAnzeige
// ---------------------------------------------------------------------------

/// Statusanzeige, die die Zusammenfassung nur loggt
#[derive(Debug, Clone, Default)]
pub struct LogAnzeige;

#[async_trait]
impl StatusAnzeige for LogAnzeige {
    async fn aktualisieren(&self, zusammenfassung: StatusZusammenfassung) -> crewmute_core::Result<()> {
        tracing::info!(
            phase = %zusammenfassung.phase,
            bekannt = zusammenfassung.bekannte_nutzer,
            verknuepft = zusammenfassung.verknuepfte_nutzer,
            ausstehend = zusammenfassung.ausstehende_updates,
            kanaele = zusammenfassung.verfolgte_kanaele,
            "Status"
        );
        Ok(())
    }
}
