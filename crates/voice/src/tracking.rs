//! Tracking – Menge der Voice-Kanaele, die als "im Spiel" gelten
//!
//! Nur Teilnehmer in einem verfolgten Kanal werden von den Voice-Regeln
//! erfasst. Geaendert wird die Menge nur durch Konfiguration oder den
//! Reset eines neuen Spiels, gelesen wird sie in jedem Abgleich.

use crewmute_core::ChannelId;
use dashmap::DashSet;
use std::sync::Arc;

/// Verfolgte Voice-Kanaele, Clone teilt den inneren Zustand
#[derive(Clone, Default)]
pub struct TrackingSet {
    kanaele: Arc<DashSet<ChannelId>>,
}

impl TrackingSet {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Nimmt einen Kanal in die Verfolgung auf
    pub fn verfolgen(&self, kanal_id: ChannelId) -> bool {
        let neu = self.kanaele.insert(kanal_id.clone());
        if neu {
            tracing::info!(kanal_id = %kanal_id, "Kanal wird verfolgt");
        }
        neu
    }

    pub fn nicht_verfolgen(&self, kanal_id: &ChannelId) -> bool {
        self.kanaele.remove(kanal_id).is_some()
    }

    /// Prueft ob ein Kanal verfolgt wird
    ///
    /// Teilnehmer ohne Kanal (Voice verlassen) gelten nie als verfolgt.
    pub fn ist_verfolgt(&self, kanal_id: Option<&ChannelId>) -> bool {
        kanal_id.is_some_and(|k| self.kanaele.contains(k))
    }

    pub fn alle(&self) -> Vec<ChannelId> {
        let mut alle: Vec<ChannelId> = self.kanaele.iter().map(|k| k.key().clone()).collect();
        alle.sort();
        alle
    }

    pub fn anzahl(&self) -> usize {
        self.kanaele.len()
    }

    /// Beendet die Verfolgung aller Kanaele
    pub fn zuruecksetzen(&self) {
        self.kanaele.clear();
    }
}
