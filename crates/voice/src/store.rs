//! Nutzer-Store – In-Memory Records aller beobachteten Teilnehmer
//!
//! Ein einzelner Reader/Writer-Lock schuetzt die gesamte Map. Jede
//! Entscheidung, die den Update-Zustand liest und setzt, laeuft komplett
//! innerhalb von [`UserStore::mit_record_mut`], damit ist Pruefen-und-Setzen
//! atomar. Der Lock wird nie ueber einen `.await` gehalten.

use crate::record::NutzerRecord;
use chrono::{DateTime, Utc};
use crewmute_core::UserId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Geteilter Nutzer-Store, Clone teilt den inneren Zustand
#[derive(Clone, Default)]
pub struct UserStore {
    records: Arc<RwLock<HashMap<UserId, NutzerRecord>>>,
}

impl UserStore {
    /// Erstellt einen leeren Store
    pub fn neu() -> Self {
        Self::default()
    }

    /// Kopie eines Records (shared lock)
    pub fn record(&self, user_id: &UserId) -> Option<NutzerRecord> {
        self.records.read().get(user_id).cloned()
    }

    pub fn enthaelt(&self, user_id: &UserId) -> bool {
        self.records.read().contains_key(user_id)
    }

    /// Welche der uebergebenen IDs noch keinen Record haben
    pub fn fehlende<'a>(&self, ids: impl IntoIterator<Item = &'a UserId>) -> Vec<UserId> {
        let records = self.records.read();
        let mut fehlend: Vec<UserId> = ids
            .into_iter()
            .filter(|id| !records.contains_key(*id))
            .cloned()
            .collect();
        fehlend.sort();
        fehlend.dedup();
        fehlend
    }

    /// Fuegt einen Record ein, sofern fuer die ID noch keiner existiert
    ///
    /// Gibt `true` zurueck wenn eingefuegt wurde. Ein bereits vorhandener
    /// Record (z.B. von einem parallelen Durchlauf angelegt) bleibt unberuehrt.
    pub fn einfuegen_falls_fehlt(&self, record: NutzerRecord) -> bool {
        let mut records = self.records.write();
        if records.contains_key(&record.user_id) {
            return false;
        }
        tracing::debug!(user_id = %record.user_id, "Nutzer-Record angelegt");
        records.insert(record.user_id.clone(), record);
        true
    }

    /// Fuehrt `f` unter dem Schreib-Lock auf dem Record aus
    ///
    /// Gibt `None` zurueck wenn kein Record existiert.
    pub fn mit_record_mut<F, R>(&self, user_id: &UserId, f: F) -> Option<R>
    where
        F: FnOnce(&mut NutzerRecord) -> R,
    {
        let mut records = self.records.write();
        records.get_mut(user_id).map(f)
    }

    /// Kopie aller Records
    pub fn alle(&self) -> Vec<NutzerRecord> {
        self.records.read().values().cloned().collect()
    }

    /// IDs aller Teilnehmer, deren Befehl schon laenger als `aelter_als` offen ist
    pub fn haengende(&self, aelter_als: chrono::Duration, jetzt: DateTime<Utc>) -> Vec<UserId> {
        self.records
            .read()
            .values()
            .filter(|r| r.ausstehend_seit(jetzt).is_some_and(|d| d > aelter_als))
            .map(|r| r.user_id.clone())
            .collect()
    }

    pub fn anzahl(&self) -> usize {
        self.records.read().len()
    }

    /// Entfernt alle Records samt offener Befehle
    pub fn leeren(&self) -> usize {
        let mut records = self.records.write();
        let anzahl = records.len();
        records.clear();
        anzahl
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crewmute_game::VoiceZiel;

    fn uid(roh: &str) -> UserId {
        UserId::neu(roh)
    }

    #[test]
    fn einfuegen_und_abfragen() {
        let store = UserStore::neu();
        assert!(store.einfuegen_falls_fehlt(NutzerRecord::minimal(uid("1"))));
        assert!(store.enthaelt(&uid("1")));
        assert_eq!(store.anzahl(), 1);
        assert!(store.record(&uid("2")).is_none());
    }

    #[test]
    fn einfuegen_ueberschreibt_nicht() {
        let store = UserStore::neu();
        store.einfuegen_falls_fehlt(NutzerRecord::minimal(uid("1")));
        store.mit_record_mut(&uid("1"), |r| r.ausstehend_markieren(VoiceZiel::neu(true, false)));

        // Zweiter Durchlauf legt denselben Nutzer erneut an
        assert!(!store.einfuegen_falls_fehlt(NutzerRecord::minimal(uid("1"))));
        assert!(store.record(&uid("1")).unwrap().pending_update());
    }

    #[test]
    fn fehlende_ids() {
        let store = UserStore::neu();
        store.einfuegen_falls_fehlt(NutzerRecord::minimal(uid("1")));
        let ids = [uid("1"), uid("2"), uid("3")];
        assert_eq!(store.fehlende(ids.iter()), vec![uid("2"), uid("3")]);
    }

    #[test]
    fn mit_record_mut_ohne_record() {
        let store = UserStore::neu();
        assert!(store.mit_record_mut(&uid("x"), |_| ()).is_none());
    }

    #[test]
    fn haengende_nach_schwelle() {
        let store = UserStore::neu();
        for id in ["1", "2"] {
            store.einfuegen_falls_fehlt(NutzerRecord::minimal(uid(id)));
        }
        store.mit_record_mut(&uid("2"), |r| r.ausstehend_markieren(VoiceZiel::neu(true, false)));

        let jetzt = Utc::now();
        assert!(store.haengende(chrono::Duration::seconds(30), jetzt).is_empty());
        let spaeter = jetzt + chrono::Duration::seconds(31);
        assert_eq!(store.haengende(chrono::Duration::seconds(30), spaeter), vec![uid("2")]);
    }

    #[test]
    fn leeren_entfernt_alles() {
        let store = UserStore::neu();
        store.einfuegen_falls_fehlt(NutzerRecord::minimal(uid("1")));
        store.einfuegen_falls_fehlt(NutzerRecord::minimal(uid("2")));
        assert_eq!(store.leeren(), 2);
        assert_eq!(store.anzahl(), 0);
    }

    #[test]
    fn clone_teilt_inneren_state() {
        let a = UserStore::neu();
        let b = a.clone();
        a.einfuegen_falls_fehlt(NutzerRecord::minimal(uid("1")));
        assert!(b.enthaelt(&uid("1")));
    }
}
