//! Prometheus-kompatible Metriken fuer crewmute
//!
//! Registrierte Metriken:
//! - `crewmute_passes_total` – Counter: Vollabgleich-Durchlaeufe
//! - `crewmute_snapshot_failures_total` – Counter: Nicht verfuegbare Snapshots
//! - `crewmute_dispatches_total` – Counter: Geplante Voice-Befehle
//! - `crewmute_duplicates_suppressed_total` – Counter: Unterdrueckte Doppel-Befehle
//! - `crewmute_confirmations_total` – Counter: Bestaetigte Befehle
//! - `crewmute_remote_failures_total` – Counter: Fehlgeschlagene Remote-Aufrufe
//! - `crewmute_known_users` – Gauge: Bekannte Teilnehmer
//! - `crewmute_linked_users` – Gauge: Verknuepfte Teilnehmer
//! - `crewmute_pending_users` – Gauge: Teilnehmer mit offenem Befehl
//! - `crewmute_pass_duration_seconds` – Histogram: Dauer eines Vollabgleichs
//!
//! Die Zaehler werden von der Abgleich-Engine gefuehrt und periodisch per
//! [`CrewmuteMetrics::uebernehmen`] gespiegelt.

use anyhow::Result;
use axum::{response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Werte aus der Abgleich-Engine, entkoppelt von deren Typen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbgleichWerte {
    pub durchlaeufe: u64,
    pub snapshot_fehler: u64,
    pub dispatches: u64,
    pub duplikate_unterdrueckt: u64,
    pub bestaetigungen: u64,
    pub remote_fehler: u64,
    pub bekannte_nutzer: u64,
    pub verknuepfte_nutzer: u64,
    pub ausstehende_updates: u64,
}

/// Alle crewmute-Prometheus-Metriken
#[derive(Clone)]
pub struct CrewmuteMetrics {
    pub registry: Arc<Registry>,

    pub passes_total: IntCounter,
    pub snapshot_failures_total: IntCounter,
    pub dispatches_total: IntCounter,
    pub duplicates_suppressed_total: IntCounter,
    pub confirmations_total: IntCounter,
    pub remote_failures_total: IntCounter,

    pub known_users: IntGauge,
    pub linked_users: IntGauge,
    pub pending_users: IntGauge,

    pub pass_duration_seconds: Histogram,
}

fn zaehler(registry: &Registry, name: &str, hilfe: &str) -> Result<IntCounter> {
    let counter = IntCounter::with_opts(Opts::new(name, hilfe))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

fn messwert(registry: &Registry, name: &str, hilfe: &str) -> Result<IntGauge> {
    let gauge = IntGauge::with_opts(Opts::new(name, hilfe))?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

/// Zaehler auf einen absoluten Stand nachziehen, nie zurueck
fn nachziehen(counter: &IntCounter, stand: u64) {
    let aktuell = counter.get();
    if stand > aktuell {
        counter.inc_by(stand - aktuell);
    }
}

impl CrewmuteMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Abgleich-Zaehler ---
        let passes_total = zaehler(&registry, "crewmute_passes_total", "Anzahl Vollabgleich-Durchlaeufe")?;
        let snapshot_failures_total = zaehler(
            &registry,
            "crewmute_snapshot_failures_total",
            "Anzahl nicht verfuegbarer Voice-Snapshots",
        )?;
        let dispatches_total = zaehler(&registry, "crewmute_dispatches_total", "Anzahl geplanter Voice-Befehle")?;
        let duplicates_suppressed_total = zaehler(
            &registry,
            "crewmute_duplicates_suppressed_total",
            "Anzahl unterdrueckter Befehle bei bereits offenem Befehl",
        )?;
        let confirmations_total = zaehler(
            &registry,
            "crewmute_confirmations_total",
            "Anzahl per Snapshot bestaetigter Befehle",
        )?;
        let remote_failures_total = zaehler(
            &registry,
            "crewmute_remote_failures_total",
            "Anzahl fehlgeschlagener Remote-Aufrufe",
        )?;

        // --- Zustand ---
        let known_users = messwert(&registry, "crewmute_known_users", "Anzahl bekannter Teilnehmer")?;
        let linked_users = messwert(&registry, "crewmute_linked_users", "Anzahl verknuepfter Teilnehmer")?;
        let pending_users = messwert(
            &registry,
            "crewmute_pending_users",
            "Anzahl Teilnehmer mit offenem Voice-Befehl",
        )?;

        let pass_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("crewmute_pass_duration_seconds", "Dauer eines Vollabgleichs in Sekunden")
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        )?;
        registry.register(Box::new(pass_duration_seconds.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))?;

        Ok(Self {
            registry: Arc::new(registry),
            passes_total,
            snapshot_failures_total,
            dispatches_total,
            duplicates_suppressed_total,
            confirmations_total,
            remote_failures_total,
            known_users,
            linked_users,
            pending_users,
            pass_duration_seconds,
        })
    }

    /// Spiegelt den aktuellen Stand der Abgleich-Engine
    pub fn uebernehmen(&self, werte: &AbgleichWerte) {
        nachziehen(&self.passes_total, werte.durchlaeufe);
        nachziehen(&self.snapshot_failures_total, werte.snapshot_fehler);
        nachziehen(&self.dispatches_total, werte.dispatches);
        nachziehen(&self.duplicates_suppressed_total, werte.duplikate_unterdrueckt);
        nachziehen(&self.confirmations_total, werte.bestaetigungen);
        nachziehen(&self.remote_failures_total, werte.remote_fehler);

        self.known_users.set(werte.bekannte_nutzer as i64);
        self.linked_users.set(werte.verknuepfte_nutzer as i64);
        self.pending_users.set(werte.ausstehende_updates as i64);
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: CrewmuteMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(
    axum::extract::State(metriken): axum::extract::State<CrewmuteMetrics>,
) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
