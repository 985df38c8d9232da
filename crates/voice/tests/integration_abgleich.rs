//! Integrationstests fuer den Voice-Abgleich
//!
//! Engine gegen das In-Memory-Backend: Phasenwechsel mit Verzoegerung,
//! Duplikat-Unterdrueckung, Bestaetigung, Reset und parallele Durchlaeufe.

use async_trait::async_trait;
use crewmute_core::{ChannelId, GuildId, UserId};
use crewmute_game::{Farbe, Phase, Spieler, VoiceZiel};
use crewmute_voice::backend::StatusZusammenfassung;
use crewmute_voice::{
    AbgleichEngine, DispatchErgebnis, LokaleGilde, StatusAnzeige, SyncError, SyncKontext,
    VoiceEintrag, VoiceSnapshot,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

const KANAL: &str = "500";

// ---------------------------------------------------------------------------
// Hilfsfunktionen
// ---------------------------------------------------------------------------

fn aufbauen() -> (AbgleichEngine, LokaleGilde) {
    aufbauen_mit(SyncKontext::neu())
}

fn aufbauen_mit(kontext: SyncKontext) -> (AbgleichEngine, LokaleGilde) {
    let gilde = LokaleGilde::neu(GuildId::neu("42"));
    let backend = Arc::new(gilde.clone());
    let engine = AbgleichEngine::neu(kontext, backend.clone(), backend.clone(), backend);
    engine.kontext().tracking.verfolgen(ChannelId::neu(KANAL));
    (engine, gilde)
}

fn eintrag(id: &str, stumm: bool, taub: bool) -> VoiceEintrag {
    VoiceEintrag::neu(UserId::neu(id), Some(ChannelId::neu(KANAL)), stumm, taub)
}

/// Spieler anlegen, Teilnehmer in den verfolgten Kanal setzen und verknuepfen
async fn spieler_im_kanal(engine: &AbgleichEngine, gilde: &LokaleGilde, id: &str, farbe: Farbe) -> UserId {
    let user_id = UserId::neu(id);
    engine
        .kontext()
        .spiel
        .spieler_aktualisieren(Spieler::neu(farbe, farbe.name()));
    gilde.eintrag_setzen(eintrag(id, false, false));
    engine
        .spieler_verknuepfen(&user_id, farbe)
        .await
        .expect("Farbe ist vergeben");
    user_id
}

/// Statusanzeige, die jede Zusammenfassung weiterreicht
struct KanalAnzeige {
    tx: mpsc::UnboundedSender<StatusZusammenfassung>,
}

#[async_trait]
impl StatusAnzeige for KanalAnzeige {
    async fn aktualisieren(&self, zusammenfassung: StatusZusammenfassung) -> crewmute_core::Result<()> {
        let _ = self.tx.send(zusammenfassung);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Regeln
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lobby_unverknuepft_bleibt_frei() {
    let (engine, gilde) = aufbauen();
    gilde.eintrag_setzen(eintrag("1", false, false));

    let regeln = &engine.kontext().regeln;
    assert_eq!(regeln.entscheiden(true, false, Phase::Lobby), VoiceZiel::FREI);
    assert_eq!(regeln.entscheiden(true, true, Phase::Lobby), VoiceZiel::FREI);

    let bericht = engine.abgleichen(0).await.unwrap();
    assert!(!bericht.hat_dispatches());
    assert_eq!(bericht.unveraendert, 1);

    // Auch in der Runde wird ein unverknuepfter Teilnehmer nie stummgeschaltet
    let bericht = engine.phase_wechseln(Phase::ActiveRound).await.unwrap();
    assert!(!bericht.hat_dispatches());
    assert!(gilde.befehle().is_empty());
}

#[tokio::test(start_paused = true)]
async fn runde_schaltet_lebende_stumm_und_bestaetigt() {
    let (engine, gilde) = aufbauen();
    let id = spieler_im_kanal(&engine, &gilde, "1", Farbe::Red).await;

    let start = Instant::now();
    let bericht = engine.phase_wechseln(Phase::ActiveRound).await.unwrap();
    assert_eq!(bericht.verzoegerung, Duration::from_secs(7));
    assert_eq!(bericht.dispatchte_nutzer(), vec![id.clone()]);
    assert!(engine.kontext().nutzer.record(&id).unwrap().pending_update());

    let ergebnisse = bericht.abwarten().await;
    assert_eq!(ergebnisse, vec![(id.clone(), DispatchErgebnis::Angewandt)]);

    let befehle = gilde.befehle();
    assert_eq!(befehle.len(), 1);
    assert!(befehle[0].zeitpunkt - start >= Duration::from_secs(7));
    assert_eq!(befehle[0].befehl.ziel(), VoiceZiel::neu(true, false));

    // Plattform meldet den neuen Zustand
    let gemeldet = gilde.voice_zustand(&id).unwrap();
    let bericht = engine.voice_state_geaendert(gemeldet).await;
    assert_eq!(bericht.bestaetigt, vec![id.clone()]);
    assert!(!bericht.hat_dispatches());
    assert!(!engine.kontext().nutzer.record(&id).unwrap().pending_update());
}

#[tokio::test(start_paused = true)]
async fn diskussion_zur_lobby_wartet_sechs_sekunden() {
    let (engine, gilde) = aufbauen();
    let id = spieler_im_kanal(&engine, &gilde, "1", Farbe::Blue).await;
    engine.kontext().spiel.phase_setzen(Phase::Discussion);
    engine.kontext().spiel.lebensstatus_setzen(Farbe::Blue, false);
    gilde.eintrag_setzen(eintrag("1", true, false));

    // Tote sind in der Diskussion bereits stumm
    let bericht = engine.abgleichen(0).await.unwrap();
    assert!(!bericht.hat_dispatches());

    let start = Instant::now();
    let bericht = engine.phase_wechseln(Phase::Lobby).await.unwrap();
    assert_eq!(bericht.verzoegerung, Duration::from_secs(6));
    assert_eq!(bericht.dispatchte_nutzer(), vec![id.clone()]);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(gilde.befehle().is_empty());

    bericht.abwarten().await;
    let befehle = gilde.befehle();
    assert_eq!(befehle.len(), 1);
    assert!(befehle[0].zeitpunkt - start >= Duration::from_secs(6));
    assert_eq!(befehle[0].befehl.ziel(), VoiceZiel::FREI);
}

// ---------------------------------------------------------------------------
// Duplikate und Idempotenz
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn vollabgleich_und_event_dispatchen_nur_einmal() {
    let (engine, gilde) = aufbauen();
    let id = spieler_im_kanal(&engine, &gilde, "1", Farbe::Green).await;
    engine.kontext().spiel.phase_setzen(Phase::ActiveRound);

    let snapshot = VoiceSnapshot::neu(vec![eintrag("1", false, false)]);
    let voll = engine.abgleichen_mit(&snapshot, 7).await;
    let event = engine.voice_state_geaendert(eintrag("1", false, false)).await;

    assert_eq!(voll.dispatchte_nutzer(), vec![id.clone()]);
    assert!(!event.hat_dispatches());
    assert_eq!(event.unterdrueckt, vec![id.clone()]);

    voll.abwarten().await;
    assert_eq!(gilde.befehle_fuer(&id), 1);
    assert_eq!(engine.statistik().snapshot().duplikate_unterdrueckt, 1);
}

#[tokio::test]
async fn zweiter_durchlauf_ist_idempotent() {
    let (engine, gilde) = aufbauen();
    let id = spieler_im_kanal(&engine, &gilde, "1", Farbe::Pink).await;
    engine.kontext().spiel.phase_setzen(Phase::ActiveRound);

    engine.abgleichen(0).await.unwrap().abwarten().await;
    assert_eq!(gilde.befehle_fuer(&id), 1);

    // Snapshot zeigt den Zielzustand: bestaetigen, nichts Neues senden
    let zweiter = engine.abgleichen(0).await.unwrap();
    assert_eq!(zweiter.bestaetigt, vec![id.clone()]);
    assert!(!zweiter.hat_dispatches());

    let dritter = engine.abgleichen(0).await.unwrap();
    assert!(dritter.bestaetigt.is_empty());
    assert!(!dritter.hat_dispatches());
    assert_eq!(gilde.befehle_fuer(&id), 1);
}

#[tokio::test]
async fn bestaetigung_nur_bei_zielzustand() {
    let (engine, gilde) = aufbauen();
    let id = spieler_im_kanal(&engine, &gilde, "1", Farbe::Orange).await;
    engine.kontext().spiel.phase_setzen(Phase::ActiveRound);
    gilde.latenz_setzen(Duration::from_secs(60));

    let bericht = engine.abgleichen(0).await.unwrap();
    assert!(bericht.hat_dispatches());

    let unveraendert = VoiceSnapshot::neu(vec![eintrag("1", false, false)]);
    assert!(engine.bestaetigen(&unveraendert).await.is_empty());
    assert!(engine.kontext().nutzer.record(&id).unwrap().pending_update());

    let angewandt = VoiceSnapshot::neu(vec![eintrag("1", true, false)]);
    assert_eq!(engine.bestaetigen(&angewandt).await, vec![id.clone()]);
    assert!(!engine.kontext().nutzer.record(&id).unwrap().pending_update());
}

// ---------------------------------------------------------------------------
// Reset und Fehler
// ---------------------------------------------------------------------------

#[tokio::test]
async fn neues_spiel_vergisst_alles() {
    let (engine, gilde) = aufbauen();
    let id = spieler_im_kanal(&engine, &gilde, "1", Farbe::Yellow).await;
    engine.kontext().spiel.phase_setzen(Phase::ActiveRound);
    gilde.latenz_setzen(Duration::from_secs(60));
    engine.abgleichen(0).await.unwrap().abwarten().await;
    gilde.eintrag_setzen(eintrag("1", true, false));

    engine.neues_spiel();

    let kontext = engine.kontext();
    assert_eq!(kontext.nutzer.anzahl(), 0);
    assert_eq!(kontext.tracking.anzahl(), 0);
    assert_eq!(kontext.spiel.phase(), Phase::Lobby);
    assert!(kontext.spiel.alle_spieler().is_empty());

    // Neu gesehen: unverknuepft und unverfolgt, also wieder frei
    gilde.latenz_setzen(Duration::ZERO);
    let bericht = engine.abgleichen(0).await.unwrap();
    assert_eq!(bericht.dispatchte_nutzer(), vec![id.clone()]);
    bericht.abwarten().await;

    let record = kontext.nutzer.record(&id).unwrap();
    assert!(!record.ist_verknuepft());
    assert_eq!(gilde.befehle().last().unwrap().befehl.ziel(), VoiceZiel::FREI);
}

#[tokio::test]
async fn fehlgeschlagener_befehl_bleibt_ausstehend() {
    let (engine, gilde) = aufbauen();
    let id = spieler_im_kanal(&engine, &gilde, "1", Farbe::Black).await;
    engine.kontext().spiel.phase_setzen(Phase::ActiveRound);
    gilde.befehle_ablehnen(true);

    let ergebnisse = engine.abgleichen(0).await.unwrap().abwarten().await;
    assert!(matches!(ergebnisse[0].1, DispatchErgebnis::Fehlgeschlagen(_)));
    assert_eq!(engine.statistik().snapshot().remote_fehler, 1);

    // Kein automatischer neuer Versuch
    let bericht = engine.abgleichen(0).await.unwrap();
    assert_eq!(bericht.unterdrueckt, vec![id.clone()]);
    assert_eq!(gilde.befehle_fuer(&id), 1);

    // Explizites Zuruecksetzen gibt den Teilnehmer wieder frei
    gilde.befehle_ablehnen(false);
    assert!(engine.pending_zuruecksetzen(&id));
    let ergebnisse = engine.abgleichen(0).await.unwrap().abwarten().await;
    assert_eq!(ergebnisse, vec![(id.clone(), DispatchErgebnis::Angewandt)]);
    assert!(gilde.voice_zustand(&id).unwrap().stumm);
}

#[tokio::test]
async fn snapshot_ausfall() {
    let (engine, gilde) = aufbauen();
    spieler_im_kanal(&engine, &gilde, "1", Farbe::White).await;
    engine.kontext().spiel.phase_setzen(Phase::ActiveRound);
    gilde.snapshot_ausfall(true);

    let fehler = engine.abgleichen(0).await.unwrap_err();
    assert!(matches!(fehler, SyncError::SnapshotNichtVerfuegbar(_)));
    assert!(fehler.ist_wiederholbar());

    // Einzel-Event entscheidet trotzdem
    let bericht = engine.voice_state_geaendert(eintrag("1", false, false)).await;
    assert!(bericht.hat_dispatches());
    assert_eq!(engine.statistik().snapshot().snapshot_fehler, 2);
}

#[tokio::test]
async fn ausserhalb_verfolgter_kanaele_frei() {
    let (engine, gilde) = aufbauen();
    let id = spieler_im_kanal(&engine, &gilde, "1", Farbe::Purple).await;
    engine.kontext().spiel.phase_setzen(Phase::ActiveRound);

    // Ausserhalb eines verfolgten Kanals gilt nie eine Stummschaltung
    let ausserhalb = VoiceEintrag::neu(id.clone(), Some(ChannelId::neu("999")), true, false);
    let bericht = engine.voice_state_geaendert(ausserhalb).await;
    assert_eq!(bericht.dispatchte_nutzer(), vec![id]);
    let ergebnisse = bericht.abwarten().await;
    assert_eq!(ergebnisse.len(), 1);
    assert_eq!(gilde.befehle()[0].befehl.ziel(), VoiceZiel::FREI);
}

#[tokio::test]
async fn statusanzeige_nach_dispatch() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (engine, gilde) = aufbauen();
    let engine = engine.mit_anzeige(Arc::new(KanalAnzeige { tx }));
    spieler_im_kanal(&engine, &gilde, "1", Farbe::Brown).await;

    let bericht = engine.phase_wechseln(Phase::ActiveRound).await.unwrap();
    assert!(bericht.hat_dispatches());

    let zusammenfassung = rx.recv().await.unwrap();
    assert_eq!(zusammenfassung.phase, Phase::ActiveRound);
    assert_eq!(zusammenfassung.verknuepfte_nutzer, 1);
    assert_eq!(zusammenfassung.ausstehende_updates, 1);
}

// ---------------------------------------------------------------------------
// Nebenlaeufigkeit
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallele_durchlaeufe_hoechstens_ein_befehl_pro_nutzer() {
    const NUTZER: usize = 40;
    let (engine, gilde) = aufbauen();

    let mut ids = Vec::with_capacity(NUTZER);
    for i in 0..NUTZER {
        let farbe = Farbe::ALLE[i % Farbe::ALLE.len()];
        ids.push(spieler_im_kanal(&engine, &gilde, &i.to_string(), farbe).await);
    }
    engine.kontext().spiel.phase_setzen(Phase::ActiveRound);
    // Befehle werden erst spaet sichtbar, jeder Durchlauf sieht "nicht stumm"
    gilde.latenz_setzen(Duration::from_secs(30));
    let snapshot = VoiceSnapshot::neu(ids.iter().map(|id| eintrag(id.as_str(), false, false)).collect());

    let mut tasks = Vec::new();
    for i in 0..8 {
        let engine = engine.clone();
        let snapshot = snapshot.clone();
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                engine.abgleichen_mit(&snapshot, 0).await
            } else {
                engine.voice_state_geaendert(snapshot.eintraege[i].clone()).await
            }
        }));
    }

    let mut dispatches = 0;
    for task in tasks {
        let bericht = task.await.unwrap();
        dispatches += bericht.dispatches.len();
        bericht.abwarten().await;
    }

    assert_eq!(dispatches, NUTZER);
    for id in &ids {
        assert_eq!(gilde.befehle_fuer(id), 1, "Nutzer {id}");
    }
    assert_eq!(engine.statistik().snapshot().dispatches, NUTZER as u64);
}
