//! Steuerungs-API (/v1/...)
//!
//! Nimmt Spielereignisse entgegen und gibt sie an die Abgleich-Engine
//! weiter: Phasenwechsel, Spielerdaten, Verknuepfungen, Reset. Zusaetzlich
//! laesst sich der Voice-Zustand der lokalen Gilde setzen, so wie es
//! sonst die Plattform meldet.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use crewmute_core::{ChannelId, UserId};
use crewmute_game::{Farbe, Phase, Spieler};
use crewmute_voice::{AbgleichBericht, AbgleichEngine, LokaleGilde, SyncError, VoiceEintrag};
use serde::Deserialize;
use serde_json::json;

/// Axum-State der Steuerungs-API
#[derive(Clone)]
pub struct SteuerungState {
    pub engine: AbgleichEngine,
    pub gilde: LokaleGilde,
}

/// Erstellt den /v1/-Router
pub fn v1_router(state: SteuerungState) -> Router {
    Router::new()
        .route("/v1/status", get(status))
        .route("/v1/phase", post(phase_setzen))
        .route("/v1/spieler", put(spieler_setzen))
        .route("/v1/spiel/neu", post(neues_spiel))
        .route("/v1/verknuepfungen", post(verknuepfen))
        .route("/v1/verknuepfungen/:user_id", delete(verknuepfung_loesen))
        .route("/v1/nutzer/:user_id/zuruecksetzen", post(pending_zuruecksetzen))
        .route("/v1/kanaele/:kanal_id", put(kanal_verfolgen))
        .route("/v1/kanaele/:kanal_id", delete(kanal_nicht_verfolgen))
        .route("/v1/voice", put(voice_setzen))
        .with_state(state)
}

fn fehler_antwort(e: SyncError) -> Response {
    let status = match &e {
        SyncError::SpielerUnbekannt(_) => StatusCode::NOT_FOUND,
        SyncError::SnapshotNichtVerfuegbar(_) => StatusCode::SERVICE_UNAVAILABLE,
        SyncError::Backend(_) => StatusCode::BAD_GATEWAY,
        SyncError::Intern(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

fn bericht_json(bericht: &AbgleichBericht) -> serde_json::Value {
    json!({
        "durchlauf_id": bericht.durchlauf_id,
        "verzoegerung_sek": bericht.verzoegerung.as_secs(),
        "dispatches": bericht.dispatchte_nutzer(),
        "unterdrueckt": bericht.unterdrueckt,
        "bestaetigt": bericht.bestaetigt,
        "unveraendert": bericht.unveraendert,
    })
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

pub async fn status(State(state): State<SteuerungState>) -> Response {
    let z = state.engine.status_zusammenfassung();
    let statistik = state.engine.statistik().snapshot();
    (
        StatusCode::OK,
        Json(json!({
            "phase": z.phase,
            "bekannte_nutzer": z.bekannte_nutzer,
            "verknuepfte_nutzer": z.verknuepfte_nutzer,
            "ausstehende_updates": z.ausstehende_updates,
            "verfolgte_kanaele": z.verfolgte_kanaele,
            "kanaele": state.engine.kontext().tracking.alle(),
            "spieler": state.engine.kontext().spiel.alle_spieler(),
            "dispatches": statistik.dispatches,
            "bestaetigungen": statistik.bestaetigungen,
        })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct PhaseBody {
    pub phase: Phase,
}

pub async fn phase_setzen(State(state): State<SteuerungState>, Json(body): Json<PhaseBody>) -> Response {
    match state.engine.phase_wechseln(body.phase).await {
        Ok(bericht) => (StatusCode::OK, Json(bericht_json(&bericht))).into_response(),
        Err(e) => fehler_antwort(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct SpielerBody {
    pub farbe: Farbe,
    pub name: String,
    #[serde(default = "lebt_standard")]
    pub lebt: bool,
}

fn lebt_standard() -> bool {
    true
}

pub async fn spieler_setzen(State(state): State<SteuerungState>, Json(body): Json<SpielerBody>) -> Response {
    state.engine.kontext().spiel.spieler_aktualisieren(Spieler {
        farbe: body.farbe,
        name: body.name,
        lebt: body.lebt,
    });
    StatusCode::NO_CONTENT.into_response()
}

pub async fn neues_spiel(State(state): State<SteuerungState>) -> Response {
    state.engine.neues_spiel();
    StatusCode::NO_CONTENT.into_response()
}

#[derive(Debug, Deserialize)]
pub struct VerknuepfungBody {
    pub user_id: UserId,
    pub farbe: Farbe,
}

pub async fn verknuepfen(State(state): State<SteuerungState>, Json(body): Json<VerknuepfungBody>) -> Response {
    match state.engine.spieler_verknuepfen(&body.user_id, body.farbe).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => fehler_antwort(e),
    }
}

pub async fn verknuepfung_loesen(State(state): State<SteuerungState>, Path(user_id): Path<String>) -> Response {
    if state.engine.verknuepfung_loesen(&UserId::neu(user_id)) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

pub async fn pending_zuruecksetzen(State(state): State<SteuerungState>, Path(user_id): Path<String>) -> Response {
    let zurueckgesetzt = state.engine.pending_zuruecksetzen(&UserId::neu(user_id));
    (StatusCode::OK, Json(json!({ "zurueckgesetzt": zurueckgesetzt }))).into_response()
}

pub async fn kanal_verfolgen(State(state): State<SteuerungState>, Path(kanal_id): Path<String>) -> Response {
    state.engine.kontext().tracking.verfolgen(ChannelId::neu(kanal_id));
    StatusCode::NO_CONTENT.into_response()
}

pub async fn kanal_nicht_verfolgen(State(state): State<SteuerungState>, Path(kanal_id): Path<String>) -> Response {
    if state.engine.kontext().tracking.nicht_verfolgen(&ChannelId::neu(kanal_id)) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct VoiceBody {
    pub user_id: UserId,
    /// Fehlt der Kanal, verlaesst der Teilnehmer Voice
    pub kanal_id: Option<ChannelId>,
    #[serde(default)]
    pub stumm: bool,
    #[serde(default)]
    pub taub: bool,
    pub nick: Option<String>,
}

pub async fn voice_setzen(State(state): State<SteuerungState>, Json(body): Json<VoiceBody>) -> Response {
    match body.kanal_id {
        Some(kanal_id) => {
            let mut eintrag = VoiceEintrag::neu(body.user_id, Some(kanal_id), body.stumm, body.taub);
            eintrag.nick = body.nick;
            state.gilde.eintrag_setzen(eintrag);
        }
        None => {
            state.gilde.verlassen(&body.user_id);
        }
    }
    StatusCode::NO_CONTENT.into_response()
}
