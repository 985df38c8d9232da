//! crewmute-server – Bibliotheks-Root
//!
//! Verdrahtet Konfiguration, In-Memory-Gilde, Abgleich-Engine,
//! Observability und Steuerungs-API und stellt den oeffentlichen
//! Einstiegspunkt fuer Tests bereit.

pub mod config;
pub mod steuerung;

use anyhow::Result;
use config::ServerConfig;
use crewmute_core::{ChannelId, GuildId};
use crewmute_observability::{AbgleichWerte, CrewmuteMetrics, HealthState};
use crewmute_voice::{AbgleichEngine, LogAnzeige, LokaleGilde, SyncKontext};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
    engine: AbgleichEngine,
    gilde: LokaleGilde,
    metriken: CrewmuteMetrics,
    health: HealthState,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Result<Self> {
        let gilde = LokaleGilde::neu(GuildId::neu(config.backend.guild_id.clone()));
        gilde.latenz_setzen(Duration::from_millis(config.backend.latenz_ms));

        let kontext = SyncKontext::neu()
            .mit_verzoegerungen(config.verzoegerungstabelle())
            .mit_regeln(config.voice_regeln())
            .mit_nicknames(config.abgleich.nicknames_anwenden);
        for kanal in &config.abgleich.tracking_kanaele {
            kontext.tracking.verfolgen(ChannelId::neu(kanal.clone()));
        }

        let backend = Arc::new(gilde.clone());
        let engine = AbgleichEngine::neu(kontext, backend.clone(), backend.clone(), backend)
            .mit_anzeige(Arc::new(LogAnzeige));

        Ok(Self {
            config,
            engine,
            gilde,
            metriken: CrewmuteMetrics::neu()?,
            health: HealthState::neu(),
        })
    }

    pub fn engine(&self) -> &AbgleichEngine {
        &self.engine
    }

    pub fn gilde(&self) -> &LokaleGilde {
        &self.gilde
    }

    pub fn metriken(&self) -> &CrewmuteMetrics {
        &self.metriken
    }

    pub fn health(&self) -> &HealthState {
        &self.health
    }

    /// Ein periodischer Vollabgleich ohne Verzoegerung
    pub async fn abgleich_tick(&self) {
        let start = Instant::now();
        match self.engine.abgleichen(0).await {
            Ok(bericht) => {
                self.health.quelle_status_setzen(true);
                self.metriken
                    .pass_duration_seconds
                    .observe(start.elapsed().as_secs_f64());
                if bericht.hat_dispatches() {
                    tracing::debug!(
                        durchlauf = %bericht.durchlauf_id,
                        dispatches = bericht.dispatches.len(),
                        "Periodischer Abgleich hat Befehle geplant"
                    );
                }
            }
            Err(e) => {
                self.health.quelle_status_setzen(false);
                tracing::warn!(
                    fehler = %e,
                    wiederholbar = e.ist_wiederholbar(),
                    "Periodischer Abgleich uebersprungen"
                );
            }
        }

        let grenze = chrono::Duration::seconds(self.config.abgleich.haengend_warnung_sek as i64);
        for user_id in self.engine.haengende_updates(grenze) {
            tracing::warn!(
                user_id = %user_id,
                aelter_als_sek = self.config.abgleich.haengend_warnung_sek,
                "Voice-Befehl wurde nie bestaetigt"
            );
        }

        self.metriken_spiegeln();
    }

    /// Uebertraegt Engine-Statistik und Zusammenfassung in die Prometheus-Metriken
    pub fn metriken_spiegeln(&self) {
        let statistik = self.engine.statistik().snapshot();
        let z = self.engine.status_zusammenfassung();
        self.metriken.uebernehmen(&AbgleichWerte {
            durchlaeufe: statistik.durchlaeufe,
            snapshot_fehler: statistik.snapshot_fehler,
            dispatches: statistik.dispatches,
            duplikate_unterdrueckt: statistik.duplikate_unterdrueckt,
            bestaetigungen: statistik.bestaetigungen,
            remote_fehler: statistik.remote_fehler,
            bekannte_nutzer: z.bekannte_nutzer as u64,
            verknuepfte_nutzer: z.verknuepfte_nutzer as u64,
            ausstehende_updates: z.ausstehende_updates as u64,
        });
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Voice-Events der Gilde abonnieren
    /// 2. Periodischen Vollabgleich starten
    /// 3. Observability-Server starten (optional)
    /// 4. Steuerungs-API starten (optional)
    /// 5. Auf Ctrl-C warten
    pub async fn starten(self) -> Result<()> {
        let server = Arc::new(self);
        let mut tasks: Vec<JoinHandle<()>> = Vec::new();

        tracing::info!(
            gilde = %server.gilde.guild_id(),
            intervall_sek = server.config.abgleich.intervall_sek,
            kanaele = server.engine.kontext().tracking.anzahl(),
            nicknames = server.config.abgleich.nicknames_anwenden,
            "Server startet"
        );

        tasks.push(tokio::spawn(event_loop(Arc::clone(&server))));
        tasks.push(tokio::spawn(abgleich_loop(Arc::clone(&server))));

        if server.config.observability.aktiviert {
            let addr = server.config.observability_bind_adresse()?;
            let metriken = server.metriken.clone();
            let health = server.health.clone();
            tasks.push(tokio::spawn(async move {
                if let Err(e) =
                    crewmute_observability::observability_server_starten(addr, metriken, health).await
                {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            }));
        }

        if server.config.steuerung.aktiviert {
            let addr = server.config.steuerung_bind_adresse()?;
            let app = steuerung::v1_router(steuerung::SteuerungState {
                engine: server.engine.clone(),
                gilde: server.gilde.clone(),
            });
            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!(addr = %addr, "Steuerungs-API gestartet");
            tasks.push(tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::error!(fehler = %e, "Steuerungs-API beendet");
                }
            }));
        }

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        for task in tasks {
            task.abort();
        }
        Ok(())
    }
}

/// Periodischer Vollabgleich
async fn abgleich_loop(server: Arc<Server>) {
    let mut intervall = tokio::time::interval(Duration::from_secs(server.config.abgleich.intervall_sek));
    intervall.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        intervall.tick().await;
        server.abgleich_tick().await;
    }
}

/// Verarbeitet Voice-Events der Gilde einzeln
async fn event_loop(server: Arc<Server>) {
    let mut events = server.gilde.ereignisse_abonnieren();
    loop {
        match events.recv().await {
            Ok(eintrag) => {
                server.engine.voice_state_geaendert(eintrag).await;
            }
            Err(RecvError::Lagged(verpasst)) => {
                // Verpasste Events holt der naechste Vollabgleich nach
                tracing::warn!(verpasst, "Voice-Events verpasst, gleiche sofort voll ab");
                server.abgleich_tick().await;
            }
            Err(RecvError::Closed) => {
                tracing::info!("Voice-Event-Kanal geschlossen");
                break;
            }
        }
    }
}
