//! Health-Check-Endpunkt fuer crewmute
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime und ob die Snapshot-Quelle
//! beim letzten Vollabgleich erreichbar war

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub snapshot_source_reachable: bool,
}

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    start_time: Arc<Instant>,
    quelle_erreichbar: Arc<AtomicBool>,
}

impl HealthState {
    pub fn neu() -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            quelle_erreichbar: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn quelle_erreichbar(&self) -> bool {
        self.quelle_erreichbar.load(Ordering::Relaxed)
    }

    /// Vom Abgleich-Loop nach jedem Snapshot-Versuch gesetzt
    pub fn quelle_status_setzen(&self, erreichbar: bool) {
        self.quelle_erreichbar.store(erreichbar, Ordering::Relaxed);
    }

    /// Aktuelle Antwort samt HTTP-Status
    pub fn antwort(&self) -> (StatusCode, HealthResponse) {
        let erreichbar = self.quelle_erreichbar();
        let status = if erreichbar {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        // 200 auch bei degraded, die Probe soll den Prozess nicht neu starten
        (
            StatusCode::OK,
            HealthResponse {
                status,
                version: env!("CARGO_PKG_VERSION").to_string(),
                uptime_seconds: self.uptime_seconds(),
                snapshot_source_reachable: erreichbar,
            },
        )
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::neu()
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let (status, antwort) = state.antwort();
    (status, Json(antwort))
}
