//! Abgleich-Statistik
//!
//! Monoton steigende Zaehler, atomar und lock-frei. Der Server spiegelt sie
//! periodisch in die Prometheus-Metriken.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Zaehler der Abgleich-Engine, Clone teilt die Zaehler
#[derive(Clone, Default)]
pub struct SyncStatistik {
    inner: Arc<Zaehler>,
}

#[derive(Default)]
struct Zaehler {
    durchlaeufe: AtomicU64,
    snapshot_fehler: AtomicU64,
    dispatches: AtomicU64,
    duplikate_unterdrueckt: AtomicU64,
    bestaetigungen: AtomicU64,
    remote_fehler: AtomicU64,
}

/// Momentaufnahme aller Zaehler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatistikSnapshot {
    pub durchlaeufe: u64,
    pub snapshot_fehler: u64,
    pub dispatches: u64,
    pub duplikate_unterdrueckt: u64,
    pub bestaetigungen: u64,
    pub remote_fehler: u64,
}

impl SyncStatistik {
    pub fn neu() -> Self {
        Self::default()
    }

    pub fn durchlauf(&self) {
        self.inner.durchlaeufe.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot_fehler(&self) {
        self.inner.snapshot_fehler.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dispatch(&self) {
        self.inner.dispatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn duplikat_unterdrueckt(&self) {
        self.inner.duplikate_unterdrueckt.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bestaetigung(&self) {
        self.inner.bestaetigungen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn remote_fehler(&self) {
        self.inner.remote_fehler.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatistikSnapshot {
        let z = &self.inner;
        StatistikSnapshot {
            durchlaeufe: z.durchlaeufe.load(Ordering::Relaxed),
            snapshot_fehler: z.snapshot_fehler.load(Ordering::Relaxed),
            dispatches: z.dispatches.load(Ordering::Relaxed),
            duplikate_unterdrueckt: z.duplikate_unterdrueckt.load(Ordering::Relaxed),
            bestaetigungen: z.bestaetigungen.load(Ordering::Relaxed),
            remote_fehler: z.remote_fehler.load(Ordering::Relaxed),
        }
    }
}
