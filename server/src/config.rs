//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use anyhow::{bail, Context};
use crewmute_game::{DelayTable, Phase, VoiceRegeln};
use crewmute_observability::logging::{log_format_gueltig, log_level_gueltig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Abgleich-Loop und Nicknames
    pub abgleich: AbgleichEinstellungen,
    /// Abweichungen von der Standard-Verzoegerungstabelle
    pub verzoegerungen: Vec<VerzoegerungEintrag>,
    /// Ersetzt die Standard-Regelmatrix, falls gesetzt
    pub regeln: Option<VoiceRegeln>,
    /// Einstellungen des In-Memory-Backends
    pub backend: BackendEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
    /// Steuerungs-API fuer Spielereignisse
    pub steuerung: SteuerungEinstellungen,
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Einstellungen des Abgleichs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AbgleichEinstellungen {
    /// Abstand der periodischen Vollabgleiche in Sekunden
    pub intervall_sek: u64,
    /// Nicknames auf In-Game-Namen setzen
    pub nicknames_anwenden: bool,
    /// Beim Start verfolgte Voice-Kanaele
    pub tracking_kanaele: Vec<String>,
    /// Ab wann ein offener Befehl als haengend gemeldet wird
    pub haengend_warnung_sek: u64,
}

impl Default for AbgleichEinstellungen {
    fn default() -> Self {
        Self {
            intervall_sek: 5,
            nicknames_anwenden: false,
            tracking_kanaele: vec![],
            haengend_warnung_sek: 30,
        }
    }
}

/// Ein Eintrag der Verzoegerungstabelle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerzoegerungEintrag {
    pub von: Phase,
    pub nach: Phase,
    pub sekunden: u32,
}

/// Einstellungen des In-Memory-Backends
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendEinstellungen {
    /// ID der simulierten Gilde
    pub guild_id: String,
    /// Zeit bis ein Befehl im Voice-Zustand sichtbar wird
    pub latenz_ms: u64,
}

impl Default for BackendEinstellungen {
    fn default() -> Self {
        Self {
            guild_id: "lokal".into(),
            latenz_ms: 0,
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    pub bind_adresse: String,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            bind_adresse: "0.0.0.0".into(),
            port: 9300,
        }
    }
}

/// Steuerungs-API (Phasenwechsel, Spieler, Verknuepfungen)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SteuerungEinstellungen {
    pub aktiviert: bool,
    pub bind_adresse: String,
    pub port: u16,
}

impl Default for SteuerungEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            bind_adresse: "127.0.0.1".into(),
            port: 8123,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .with_context(|| format!("Konfigurationsfehler in '{pfad}'")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Parst und validiert eine Konfiguration
    pub fn aus_toml(inhalt: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(inhalt)?;
        config.validieren()?;
        Ok(config)
    }

    pub fn validieren(&self) -> anyhow::Result<()> {
        if self.abgleich.intervall_sek == 0 {
            bail!("abgleich.intervall_sek muss groesser als 0 sein");
        }
        if !log_level_gueltig(&self.logging.level) {
            bail!("Unbekanntes Log-Level '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            bail!("Unbekanntes Log-Format '{}'", self.logging.format);
        }
        Ok(())
    }

    /// Standardtabelle mit den konfigurierten Abweichungen
    pub fn verzoegerungstabelle(&self) -> DelayTable {
        self.verzoegerungen
            .iter()
            .fold(DelayTable::standard(), |tabelle, e| {
                tabelle.mit_eintrag(e.von, e.nach, e.sekunden)
            })
    }

    /// Konfigurierte oder Standard-Regelmatrix
    pub fn voice_regeln(&self) -> VoiceRegeln {
        self.regeln.clone().unwrap_or_default()
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let adresse = format!("{}:{}", self.observability.bind_adresse, self.observability.port);
        adresse
            .parse()
            .with_context(|| format!("Ungueltige Observability-Adresse '{adresse}'"))
    }

    /// Gibt die Bind-Adresse fuer die Steuerungs-API zurueck
    pub fn steuerung_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let adresse = format!("{}:{}", self.steuerung.bind_adresse, self.steuerung.port);
        adresse
            .parse()
            .with_context(|| format!("Ungueltige Steuerungs-Adresse '{adresse}'"))
    }
}
