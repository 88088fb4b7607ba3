//! The work-package registry (C5, §4.5): assigns monotonic package ids,
//! tracks pending/completed packages, and enforces single-commit semantics
//! under worker races.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use azrael_core::{ObjectId, ObjectState, Token};

use crate::error::DispatchError;

/// Re-exported so callers don't need to depend on `azrael-core` just for
/// the id type.
pub use azrael_core::PackageId;

/// One object's slice of a work package: the snapshot a worker integrates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PayloadEntry {
    pub object_id: ObjectId,
    pub state: ObjectState,
    pub central_force: azrael_core::Vec3,
    pub torque: azrael_core::Vec3,
    /// A client-requested teleport, consumed once by the worker and never
    /// re-applied (§9, "suggested position").
    pub suggested_position: Option<azrael_core::Vec3>,
}

/// A self-contained unit of physics work covering one collision island over
/// one tick (§3).
#[derive(Clone, Debug, PartialEq)]
pub struct Package {
    pub id: PackageId,
    pub token: Token,
    pub dt: f64,
    pub max_substeps: u32,
    pub payload: Vec<PayloadEntry>,
}

impl Package {
    /// The object ids covered by this package.
    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.payload.iter().map(|e| e.object_id)
    }
}

#[derive(Debug)]
enum Status {
    /// Created, not yet claimed by a worker.
    Pending,
    /// Claimed by [`PackageRegistry::fetch_next_pending`]; still counts as
    /// "pending" for [`PackageRegistry::count`], which only distinguishes
    /// pending vs. completed.
    InFlight,
    /// Result committed; retained until [`PackageRegistry::drain_completed`].
    Completed(HashMap<ObjectId, ObjectState>),
}

struct Entry {
    package: Package,
    status: Status,
}

/// Table of work packages, keyed by a monotonically increasing id (§4.5).
///
/// Guarded by a single mutex: the CAS-style "first commit wins" guarantee
/// falls out of the mutex serialising every status transition, the same
/// trade `nebula-net::tcp_server` makes for its connection map rather than
/// reaching for a lock-free structure.
pub struct PackageRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<PackageId, Entry>>,
}

impl Default for PackageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a new pending package from a pre-built payload. The payload
    /// is built by the coordinator from the current object store and
    /// command queues (§4.6); validating that every id is still known to
    /// C1 is the coordinator's responsibility since the registry deliberately
    /// holds no reference to the object store (documented in DESIGN.md).
    pub fn create(
        &self,
        payload: Vec<PayloadEntry>,
        token: Token,
        dt: f64,
        max_substeps: u32,
    ) -> Result<PackageId, DispatchError> {
        if payload.is_empty() {
            return Err(DispatchError::BadParams(
                "create requires at least one object".into(),
            ));
        }
        let id = PackageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let package = Package {
            id,
            token,
            dt,
            max_substeps,
            payload,
        };
        self.entries.lock().unwrap().insert(
            id,
            Entry {
                package,
                status: Status::Pending,
            },
        );
        Ok(id)
    }

    /// Returns and marks one pending package as in-flight, FIFO by id
    /// (§4.5: "any worker, no worker affinity").
    pub fn fetch_next_pending(&self) -> Option<Package> {
        let mut entries = self.entries.lock().unwrap();
        let mut ids: Vec<PackageId> = entries
            .iter()
            .filter(|(_, e)| matches!(e.status, Status::Pending))
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        let id = *ids.first()?;
        let entry = entries.get_mut(&id).unwrap();
        entry.status = Status::InFlight;
        Some(entry.package.clone())
    }

    /// Fetches a package's payload by id without changing its status. This
    /// is the call a worker makes after receiving an id over C8 (§4.7 step
    /// 2); it does not, by itself, claim the package for commit purposes.
    pub fn fetch_payload(&self, id: PackageId) -> Result<Package, DispatchError> {
        self.entries
            .lock()
            .unwrap()
            .get(&id)
            .map(|e| e.package.clone())
            .ok_or_else(|| DispatchError::Unknown(format!("package {}", id.0)))
    }

    /// Commits a result set for a pending/in-flight package. `token` must
    /// match the token recorded at creation (P4); a second commit on an
    /// already-completed package loses the race with `already_committed`
    /// (S6).
    pub fn commit(
        &self,
        id: PackageId,
        token: Token,
        results: HashMap<ObjectId, ObjectState>,
    ) -> Result<(), DispatchError> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| DispatchError::Unknown(format!("package {}", id.0)))?;

        match entry.status {
            Status::Completed(_) => {
                return Err(DispatchError::AlreadyCommitted(format!("package {}", id.0)));
            }
            Status::Pending | Status::InFlight => {}
        }

        if entry.package.token != token {
            return Err(DispatchError::BadToken(format!("package {}", id.0)));
        }

        entry.status = Status::Completed(results);
        Ok(())
    }

    /// Removes a still-pending/in-flight package without completing it.
    /// Used by the coordinator when its per-tick deadline elapses (§4.6
    /// step 5, §5 cancellation): once removed, a straggling worker's commit
    /// sees `unknown` rather than corrupting a future tick's reconciliation.
    pub fn abandon(&self, id: PackageId) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get(&id) {
            if !matches!(entry.status, Status::Completed(_)) {
                entries.remove(&id);
            }
        }
    }

    /// True once the given package has a committed result.
    pub fn is_completed(&self, id: PackageId) -> bool {
        matches!(
            self.entries.lock().unwrap().get(&id),
            Some(Entry {
                status: Status::Completed(_),
                ..
            })
        )
    }

    /// Returns and removes every completed package's result set.
    pub fn drain_completed(&self) -> Vec<(PackageId, HashMap<ObjectId, ObjectState>)> {
        let mut entries = self.entries.lock().unwrap();
        let ids: Vec<PackageId> = entries
            .iter()
            .filter(|(_, e)| matches!(e.status, Status::Completed(_)))
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter()
            .map(|id| {
                let entry = entries.remove(&id).unwrap();
                match entry.status {
                    Status::Completed(results) => (id, results),
                    _ => unreachable!(),
                }
            })
            .collect()
    }

    /// Returns `(pending, completed)` counts (§4.5). In-flight packages
    /// count toward `pending`.
    pub fn count(&self) -> (usize, usize) {
        let entries = self.entries.lock().unwrap();
        let mut pending = 0;
        let mut completed = 0;
        for entry in entries.values() {
            match entry.status {
                Status::Pending | Status::InFlight => pending += 1,
                Status::Completed(_) => completed += 1,
            }
        }
        (pending, completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azrael_core::{ObjectId, Quat, Vec3};

    fn oid(n: u64) -> ObjectId {
        ObjectId::new(n).unwrap()
    }

    fn sample_state() -> ObjectState {
        ObjectState {
            radius: 1.0,
            scale: 1.0,
            inverse_mass: 1.0,
            restitution: 0.5,
            orientation: Quat::identity(),
            position: Vec3::zero(),
            velocity_linear: Vec3::zero(),
            velocity_angular: Vec3::zero(),
            collision_shape: [0.0; 4],
            last_changed: 0,
        }
    }

    fn sample_payload(id: u64) -> Vec<PayloadEntry> {
        vec![PayloadEntry {
            object_id: oid(id),
            state: sample_state(),
            central_force: Vec3::zero(),
            torque: Vec3::zero(),
            suggested_position: None,
        }]
    }

    #[test]
    fn test_create_rejects_empty_payload() {
        let reg = PackageRegistry::new();
        assert!(matches!(
            reg.create(vec![], Token(1), 1.0, 10),
            Err(DispatchError::BadParams(_))
        ));
    }

    #[test]
    fn test_ids_are_monotonic() {
        let reg = PackageRegistry::new();
        let a = reg.create(sample_payload(1), Token(1), 1.0, 10).unwrap();
        let b = reg.create(sample_payload(2), Token(1), 1.0, 10).unwrap();
        assert!(b.0 > a.0);
    }

    #[test]
    fn test_fetch_next_pending_is_fifo() {
        let reg = PackageRegistry::new();
        let a = reg.create(sample_payload(1), Token(1), 1.0, 10).unwrap();
        let _b = reg.create(sample_payload(2), Token(1), 1.0, 10).unwrap();
        let fetched = reg.fetch_next_pending().unwrap();
        assert_eq!(fetched.id, a);
    }

    #[test]
    fn test_fetch_next_pending_skips_in_flight() {
        let reg = PackageRegistry::new();
        let a = reg.create(sample_payload(1), Token(1), 1.0, 10).unwrap();
        let b = reg.create(sample_payload(2), Token(1), 1.0, 10).unwrap();
        let first = reg.fetch_next_pending().unwrap();
        assert_eq!(first.id, a);
        let second = reg.fetch_next_pending().unwrap();
        assert_eq!(second.id, b);
        assert!(reg.fetch_next_pending().is_none());
    }

    #[test]
    fn test_commit_then_drain() {
        let reg = PackageRegistry::new();
        let id = reg.create(sample_payload(1), Token(5), 1.0, 10).unwrap();
        let mut results = HashMap::new();
        results.insert(oid(1), sample_state());
        reg.commit(id, Token(5), results.clone()).unwrap();
        assert_eq!(reg.count(), (0, 1));
        let drained = reg.drain_completed();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].0, id);
        assert_eq!(reg.count(), (0, 0));
    }

    #[test]
    fn test_commit_wrong_token_fails() {
        let reg = PackageRegistry::new();
        let id = reg.create(sample_payload(1), Token(5), 1.0, 10).unwrap();
        let err = reg.commit(id, Token(6), HashMap::new()).unwrap_err();
        assert!(matches!(err, DispatchError::BadToken(_)));
    }

    #[test]
    fn test_commit_unknown_package_fails() {
        let reg = PackageRegistry::new();
        let err = reg.commit(PackageId(999), Token(1), HashMap::new()).unwrap_err();
        assert!(matches!(err, DispatchError::Unknown(_)));
    }

    #[test]
    fn test_double_commit_race_second_loses() {
        // S6: two workers both attempt to commit; first wins, second gets
        // already_committed.
        let reg = PackageRegistry::new();
        let id = reg.create(sample_payload(1), Token(1), 1.0, 10).unwrap();
        assert!(reg.commit(id, Token(1), HashMap::new()).is_ok());
        let err = reg.commit(id, Token(1), HashMap::new()).unwrap_err();
        assert!(matches!(err, DispatchError::AlreadyCommitted(_)));
        // Exactly one result survives.
        assert_eq!(reg.drain_completed().len(), 1);
    }

    #[test]
    fn test_abandon_removes_pending_package() {
        let reg = PackageRegistry::new();
        let id = reg.create(sample_payload(1), Token(1), 1.0, 10).unwrap();
        reg.abandon(id);
        let err = reg.commit(id, Token(1), HashMap::new()).unwrap_err();
        assert!(matches!(err, DispatchError::Unknown(_)));
    }

    #[test]
    fn test_abandon_does_not_clobber_completed() {
        let reg = PackageRegistry::new();
        let id = reg.create(sample_payload(1), Token(1), 1.0, 10).unwrap();
        reg.commit(id, Token(1), HashMap::new()).unwrap();
        reg.abandon(id);
        // Still completed, not silently dropped.
        assert_eq!(reg.count(), (0, 1));
    }

    #[test]
    fn test_fetch_payload_does_not_change_status() {
        let reg = PackageRegistry::new();
        let id = reg.create(sample_payload(1), Token(1), 1.0, 10).unwrap();
        let fetched = reg.fetch_payload(id).unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(reg.count(), (1, 0));
    }
}
