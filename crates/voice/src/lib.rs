//! crewmute-voice – Abgleich von Voice-Zustaenden mit dem Spielzustand
//!
//! Leitet aus Phase, Lebensstatus und Kanal-Tracking den gewuenschten
//! Stumm/Taub-Zustand jedes Teilnehmers ab und sorgt dafuer, dass pro
//! Teilnehmer hoechstens ein Aenderungsbefehl gleichzeitig unterwegs ist.
//!
//! ## Module
//! - [`record`] – Nutzer-Record mit explizitem Update-Zustand
//! - [`store`] – Nutzer-Store hinter einem Reader/Writer-Lock
//! - [`tracking`] – Menge der verfolgten Voice-Kanaele
//! - [`kontext`] – Geteilter Abgleich-Kontext (Store, Tracking, Spiel, Regeln)
//! - [`engine`] – Vollabgleich, Bestaetigung und Einzel-Events
//! - [`scheduler`] – Verzoegerter Dispatch der Voice-Befehle
//! - [`backend`] – Schnittstellen zur Plattform (Snapshots, Befehle, Identitaet)
//! - [`lokal`] – In-Memory-Backend fuer Betrieb ohne Plattform und Tests
//! - [`statistik`] – Zaehler fuer Durchlaeufe, Dispatches und Bestaetigungen

pub mod backend;
pub mod engine;
pub mod error;
pub mod kontext;
pub mod lokal;
pub mod record;
pub mod scheduler;
pub mod statistik;
pub mod store;
pub mod tracking;

pub use backend::{
    Identitaet, IdentitaetsAufloeser, StatusAnzeige, StatusZusammenfassung, VoiceBefehl,
    VoiceEintrag, VoiceKommando, VoiceSnapshot, VoiceSnapshotQuelle,
};
pub use engine::{AbgleichBericht, AbgleichEngine};
pub use error::{SyncError, SyncResult};
pub use kontext::SyncKontext;
pub use lokal::{EmpfangenerBefehl, LogAnzeige, LokaleGilde};
pub use record::{NutzerRecord, UpdateZustand, Verknuepfung};
pub use scheduler::{DispatchErgebnis, DispatchHandle, DispatchScheduler};
pub use statistik::{StatistikSnapshot, SyncStatistik};
pub use store::UserStore;
pub use tracking::TrackingSet;
