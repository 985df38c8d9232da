//! Dispatch-Scheduler – verzoegertes Absenden von Voice-Befehlen
//!
//! Pro Befehl ein tokio-Task: erst `verzoegerung` schlafen, dann genau
//! einen Remote-Aufruf mit den beim Planen erfassten Werten absetzen.
//!
//! Es gibt weder Abbruch noch Wiederholung. Schlaegt der Remote-Aufruf
//! fehl, wird das geloggt und gezaehlt; der offene Update-Zustand des
//! Teilnehmers bleibt bestehen, bis ein spaeterer Snapshot den Zielzustand
//! zeigt oder ein Reset ihn verwirft.

use crate::backend::{VoiceBefehl, VoiceKommando};
use crate::statistik::SyncStatistik;
use crewmute_core::UserId;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Ergebnis eines abgesetzten Befehls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchErgebnis {
    /// Plattform hat den Befehl angenommen
    Angewandt,
    /// Remote-Aufruf fehlgeschlagen, Teilnehmer bleibt ausstehend
    Fehlgeschlagen(String),
}

/// Handle auf einen geplanten Befehl
///
/// Kann verworfen werden, der Task laeuft trotzdem zu Ende.
#[derive(Debug)]
pub struct DispatchHandle {
    pub user_id: UserId,
    pub verzoegerung: Duration,
    handle: JoinHandle<DispatchErgebnis>,
}

impl DispatchHandle {
    /// Wartet auf den Remote-Aufruf
    pub async fn abwarten(self) -> DispatchErgebnis {
        match self.handle.await {
            Ok(ergebnis) => ergebnis,
            Err(e) => DispatchErgebnis::Fehlgeschlagen(format!("Dispatch-Task beendet: {e}")),
        }
    }
}

/// Plant Voice-Befehle mit Verzoegerung
#[derive(Clone)]
pub struct DispatchScheduler {
    kommando: Arc<dyn VoiceKommando>,
    statistik: SyncStatistik,
}

impl DispatchScheduler {
    pub fn neu(kommando: Arc<dyn VoiceKommando>, statistik: SyncStatistik) -> Self {
        Self { kommando, statistik }
    }

    /// Plant einen Befehl und kehrt sofort zurueck
    ///
    /// Muss innerhalb einer tokio-Runtime aufgerufen werden.
    pub fn planen(&self, befehl: VoiceBefehl, verzoegerung: Duration) -> DispatchHandle {
        let user_id = befehl.user_id.clone();
        let kommando = Arc::clone(&self.kommando);
        let statistik = self.statistik.clone();

        tracing::debug!(
            user_id = %user_id,
            ziel = %befehl.ziel(),
            verzoegerung_ms = verzoegerung.as_millis() as u64,
            "Voice-Befehl geplant"
        );

        let handle = tokio::spawn(async move {
            if !verzoegerung.is_zero() {
                tokio::time::sleep(verzoegerung).await;
            }
            match kommando.voice_state_setzen(&befehl).await {
                Ok(()) => {
                    tracing::info!(
                        user_id = %befehl.user_id,
                        stumm = befehl.stumm,
                        taub = befehl.taub,
                        nick = ?befehl.nick,
                        "Voice-Befehl abgesetzt"
                    );
                    DispatchErgebnis::Angewandt
                }
                Err(e) => {
                    statistik.remote_fehler();
                    tracing::warn!(
                        user_id = %befehl.user_id,
                        fehler = %e,
                        wiederholbar = e.ist_wiederholbar(),
                        "Voice-Befehl fehlgeschlagen, Nutzer bleibt ausstehend"
                    );
                    DispatchErgebnis::Fehlgeschlagen(e.to_string())
                }
            }
        });

        DispatchHandle {
            user_id,
            verzoegerung,
            handle,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crewmute_core::CrewmuteError;
    use parking_lot::Mutex;
    use tokio::time::Instant;

    /// Zeichnet Aufrufe mit Zeitpunkt auf
    #[derive(Default)]
    struct Aufzeichner {
        aufrufe: Mutex<Vec<(Instant, VoiceBefehl)>>,
        fehlschlagen: bool,
    }

    #[async_trait]
    impl VoiceKommando for Aufzeichner {
        async fn voice_state_setzen(&self, befehl: &VoiceBefehl) -> crewmute_core::Result<()> {
            self.aufrufe.lock().push((Instant::now(), befehl.clone()));
            if self.fehlschlagen {
                Err(CrewmuteError::BefehlAbgelehnt("429".into()))
            } else {
                Ok(())
            }
        }
    }

    fn befehl(id: &str) -> VoiceBefehl {
        VoiceBefehl {
            user_id: UserId::neu(id),
            stumm: true,
            taub: false,
            nick: Some("Red".into()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn befehl_erst_nach_verzoegerung() {
        let aufzeichner = Arc::new(Aufzeichner::default());
        let scheduler = DispatchScheduler::neu(aufzeichner.clone(), SyncStatistik::neu());

        let start = Instant::now();
        let handle = scheduler.planen(befehl("1"), Duration::from_secs(6));
        assert_eq!(handle.abwarten().await, DispatchErgebnis::Angewandt);

        let aufrufe = aufzeichner.aufrufe.lock();
        assert_eq!(aufrufe.len(), 1);
        assert!(aufrufe[0].0 - start >= Duration::from_secs(6));
        // Erfasste Werte werden unveraendert gesendet
        assert_eq!(aufrufe[0].1, befehl("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn vor_ablauf_kein_aufruf() {
        let aufzeichner = Arc::new(Aufzeichner::default());
        let scheduler = DispatchScheduler::neu(aufzeichner.clone(), SyncStatistik::neu());

        let handle = scheduler.planen(befehl("1"), Duration::from_secs(7));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(aufzeichner.aufrufe.lock().is_empty());

        handle.abwarten().await;
        assert_eq!(aufzeichner.aufrufe.lock().len(), 1);
    }

    #[tokio::test]
    async fn fehler_wird_gezaehlt() {
        let aufzeichner = Arc::new(Aufzeichner {
            fehlschlagen: true,
            ..Default::default()
        });
        let statistik = SyncStatistik::neu();
        let scheduler = DispatchScheduler::neu(aufzeichner.clone(), statistik.clone());

        let ergebnis = scheduler.planen(befehl("1"), Duration::ZERO).abwarten().await;
        assert!(matches!(ergebnis, DispatchErgebnis::Fehlgeschlagen(ref m) if m.contains("429")));
        assert_eq!(statistik.snapshot().remote_fehler, 1);
        // Keine Wiederholung
        assert_eq!(aufzeichner.aufrufe.lock().len(), 1);
    }
}
