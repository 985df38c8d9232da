//! crewmute-game – Spielseitiger Zustand und Regeln
//!
//! ## Module
//! - [`phase`] – Spielphasen (Lobby, ActiveRound, Discussion)
//! - [`delays`] – Verzoegerung pro Phasenwechsel
//! - [`rules`] – Voice-Regelmatrix (lebt, verfolgt, Phase) -> (stumm, taub)
//! - [`farbe`] – Spielerfarben als In-Game-Identitaet
//! - [`spiel`] – Aktuelle Phase und Spielerdaten der laufenden Runde

pub mod delays;
pub mod farbe;
pub mod phase;
pub mod rules;
pub mod spiel;

pub use delays::DelayTable;
pub use farbe::Farbe;
pub use phase::Phase;
pub use rules::{PhasenRegel, VoiceRegeln, VoiceZiel};
pub use spiel::{SpielDaten, Spieler};
