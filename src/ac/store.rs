//! The single shared AC status record.
//!
//! Reads are served from a snapshot behind a short read lock and never wait
//! on the actuator. Writes are serialized by an apply lock that is held for
//! the whole validate → apply → commit sequence, and that sequence runs to
//! completion on a blocking thread even if the caller goes away, so the
//! snapshot always matches what the unit was last driven to.

use super::{AcActuator, AcStatus, AcStatusFile, ActuatorFault, TemperatureRange};
use crate::error::{HomeError, Result};
use log::{error, info, warn};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

struct StoreInner {
    actuator: Arc<dyn AcActuator>,
    range: TemperatureRange,
    snapshot: RwLock<AcStatus>,
    apply_lock: Mutex<()>,
    persistence: Option<AcStatusFile>,
}

impl StoreInner {
    fn commit(&self, requested: AcStatus) -> Result<AcStatus> {
        let _apply = self.apply_lock.lock();

        let achieved = self.actuator.apply(&requested).map_err(|fault| {
            warn!("[AC] Apply of {} failed, keeping previous status: {}", requested, fault);
            HomeError::Actuator(fault)
        })?;

        if achieved != requested {
            info!("[AC] Unit reached {} for requested {}", achieved, requested);
        }
        if !self.range.contains(achieved.temperature) {
            warn!(
                "[AC] Unit reports {}°C outside {}, adopting it anyway",
                achieved.temperature, self.range
            );
        }

        *self.snapshot.write() = achieved;

        if let Some(file) = &self.persistence
            && let Err(e) = file.save(&achieved)
        {
            error!("[AC] Failed to save status to {:?}: {}", file.path(), e);
        }

        Ok(achieved)
    }
}

/// Shared, injectable owner of the AC status.
#[derive(Clone)]
pub struct AcStatusStore {
    inner: Arc<StoreInner>,
}

impl AcStatusStore {
    /// Create the store, seeding the snapshot from the actuator's own state.
    ///
    /// If the actuator cannot be read the store starts from
    /// [`AcStatus::default`].
    pub fn new(actuator: Arc<dyn AcActuator>, range: TemperatureRange) -> Self {
        Self::build(actuator, range, None)
    }

    /// Like [`new`](Self::new), saving every committed status to `file`.
    pub fn with_persistence(
        actuator: Arc<dyn AcActuator>,
        range: TemperatureRange,
        file: AcStatusFile,
    ) -> Self {
        Self::build(actuator, range, Some(file))
    }

    fn build(
        actuator: Arc<dyn AcActuator>,
        range: TemperatureRange,
        persistence: Option<AcStatusFile>,
    ) -> Self {
        let initial = match actuator.read() {
            Ok(status) => {
                info!("[AC] Initial status from unit: {}", status);
                status
            }
            Err(e) => {
                warn!("[AC] Could not read unit state ({}), starting from default", e);
                AcStatus::default()
            }
        };

        Self {
            inner: Arc::new(StoreInner {
                actuator,
                range,
                snapshot: RwLock::new(initial),
                apply_lock: Mutex::new(()),
                persistence,
            }),
        }
    }

    pub fn range(&self) -> TemperatureRange {
        self.inner.range
    }

    /// Current status snapshot.
    pub fn get(&self) -> AcStatus {
        *self.inner.snapshot.read()
    }

    /// Validate, apply and commit a new status.
    ///
    /// Returns the status the unit reached. Invalid input is rejected before
    /// the unit is touched; a failed apply leaves the stored status unchanged.
    pub async fn set(&self, requested: AcStatus) -> Result<AcStatus> {
        self.inner.range.check(requested.temperature)?;

        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.commit(requested))
            .await
            .unwrap_or_else(|e| {
                Err(HomeError::Actuator(ActuatorFault::new(format!(
                    "apply task failed: {e}"
                ))))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ac::{AcMode, SimulatedAcUnit};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    /// Counts applies; can fail, round to even degrees, or stall.
    #[derive(Default)]
    struct ScriptedUnit {
        applies: AtomicUsize,
        fail: AtomicBool,
        round_to_even: bool,
        delay: Option<Duration>,
        unreadable: bool,
        state: Mutex<AcStatus>,
    }

    impl AcActuator for ScriptedUnit {
        fn apply(&self, status: &AcStatus) -> std::result::Result<AcStatus, ActuatorFault> {
            self.applies.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(ActuatorFault::new("no ack from unit"));
            }
            let mut achieved = *status;
            if self.round_to_even {
                achieved.temperature -= achieved.temperature % 2;
            }
            *self.state.lock() = achieved;
            Ok(achieved)
        }

        fn read(&self) -> std::result::Result<AcStatus, ActuatorFault> {
            if self.unreadable {
                return Err(ActuatorFault::new("unit not reachable"));
            }
            Ok(*self.state.lock())
        }
    }

    fn status(powered: bool, mode: AcMode, temperature: u32) -> AcStatus {
        AcStatus {
            powered,
            mode,
            temperature,
        }
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = AcStatusStore::new(
            Arc::new(SimulatedAcUnit::new(AcStatus::default())),
            TemperatureRange::default(),
        );
        let wanted = status(true, AcMode::Cool, 22);

        let applied = assert_ok!(store.set(wanted).await);
        assert_eq!(applied, wanted);
        assert_eq!(store.get(), wanted);
    }

    #[tokio::test]
    async fn test_out_of_range_rejected_without_touching_unit() {
        let unit = Arc::new(ScriptedUnit::default());
        let store = AcStatusStore::new(unit.clone(), TemperatureRange::default());
        assert_ok!(store.set(status(true, AcMode::Warm, 25)).await);
        let before = store.get();

        for temperature in [0, 15, 31, u32::MAX] {
            let err = assert_err!(store.set(status(false, AcMode::Fan, temperature)).await);
            assert!(matches!(err, HomeError::InvalidTemperature { .. }));
            assert_eq!(store.get(), before);
        }
        assert_eq!(unit.applies.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_actuator_fault_keeps_previous_status() {
        let unit = Arc::new(ScriptedUnit::default());
        let store = AcStatusStore::new(unit.clone(), TemperatureRange::default());
        let good = status(true, AcMode::Dry, 24);
        assert_ok!(store.set(good).await);

        unit.fail.store(true, Ordering::SeqCst);
        let err = assert_err!(store.set(status(false, AcMode::Cool, 18)).await);
        assert!(matches!(err, HomeError::Actuator(_)));
        assert_eq!(store.get(), good);
    }

    #[tokio::test]
    async fn test_store_adopts_achieved_status() {
        let unit = Arc::new(ScriptedUnit {
            round_to_even: true,
            ..ScriptedUnit::default()
        });
        let store = AcStatusStore::new(unit, TemperatureRange::default());

        let applied = assert_ok!(store.set(status(true, AcMode::Cool, 23)).await);
        assert_eq!(applied.temperature, 22);
        assert_eq!(store.get(), applied);
    }

    #[tokio::test]
    async fn test_initial_status_reconciled_from_unit() {
        let seeded = status(true, AcMode::Fan, 20);
        let store = AcStatusStore::new(
            Arc::new(SimulatedAcUnit::new(seeded)),
            TemperatureRange::default(),
        );
        assert_eq!(store.get(), seeded);

        let unreadable = Arc::new(ScriptedUnit {
            unreadable: true,
            ..ScriptedUnit::default()
        });
        let store = AcStatusStore::new(unreadable, TemperatureRange::default());
        assert_eq!(store.get(), AcStatus::default());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sets_never_mix_fields() {
        let store = AcStatusStore::new(
            Arc::new(SimulatedAcUnit::new(AcStatus::default())),
            TemperatureRange::default(),
        );
        let initial = store.get();

        // Every candidate differs in all three fields from every other one
        let candidates: Vec<AcStatus> = (0..5)
            .map(|i| {
                status(
                    i % 2 == 0,
                    AcMode::from_repr(i as i32).unwrap(),
                    16 + i,
                )
            })
            .collect();
        let allowed: HashSet<(bool, AcMode, u32)> = candidates
            .iter()
            .chain(std::iter::once(&initial))
            .map(|s| (s.powered, s.mode, s.temperature))
            .collect();

        let mut tasks = Vec::new();
        for _ in 0..20 {
            for candidate in &candidates {
                let store = store.clone();
                let candidate = *candidate;
                tasks.push(tokio::spawn(async move { store.set(candidate).await }));
            }
            let seen = store.get();
            assert!(allowed.contains(&(seen.powered, seen.mode, seen.temperature)));
        }
        for task in tasks {
            assert_ok!(task.await.unwrap());
        }

        let last = store.get();
        assert!(candidates.contains(&last));
    }

    #[tokio::test]
    async fn test_get_does_not_wait_for_slow_apply() {
        let unit = Arc::new(ScriptedUnit {
            delay: Some(Duration::from_millis(300)),
            ..ScriptedUnit::default()
        });
        let store = AcStatusStore::new(unit, TemperatureRange::default());
        let before = store.get();

        let writer = store.clone();
        let pending = tokio::spawn(async move { writer.set(status(true, AcMode::Cool, 22)).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = std::time::Instant::now();
        assert_eq!(store.get(), before);
        assert!(started.elapsed() < Duration::from_millis(100));

        assert_ok!(pending.await.unwrap());
        assert_eq!(store.get(), status(true, AcMode::Cool, 22));
    }

    #[tokio::test]
    async fn test_cancelled_set_still_commits() {
        let unit = Arc::new(ScriptedUnit {
            delay: Some(Duration::from_millis(100)),
            ..ScriptedUnit::default()
        });
        let store = AcStatusStore::new(unit.clone(), TemperatureRange::default());
        let wanted = status(true, AcMode::Warm, 28);

        // Caller gives up while the unit is still being driven
        let attempt = tokio::time::timeout(Duration::from_millis(10), store.set(wanted)).await;
        assert!(attempt.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(store.get(), wanted);
        assert_eq!(unit.read().unwrap(), wanted);
    }

    #[tokio::test]
    async fn test_committed_status_is_persisted() {
        let dir = std::env::temp_dir().join(format!("mattori-home-{}", uuid::Uuid::new_v4()));
        let file = AcStatusFile::new(dir.join("ac_status.json"));
        let store = AcStatusStore::with_persistence(
            Arc::new(SimulatedAcUnit::new(AcStatus::default())),
            TemperatureRange::default(),
            file.clone(),
        );

        let wanted = status(true, AcMode::Cool, 21);
        assert_ok!(store.set(wanted).await);
        assert_eq!(file.load().unwrap().status, wanted);

        // Rejected input leaves the file alone
        assert_err!(store.set(status(false, AcMode::Auto, 99)).await);
        assert_eq!(file.load().unwrap().status, wanted);

        let _ = std::fs::remove_dir_all(dir);
    }
}
