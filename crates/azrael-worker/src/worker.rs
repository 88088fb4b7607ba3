//! The worker pull loop (C7, §4.7): pulls a package id off the dispatch
//! transport, integrates its payload, and commits the result back.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use azrael_core::{ObjectId, ObjectState};
use azrael_dispatch::{DispatchError, DispatchQueue, PackageRegistry};
use tracing::{debug, info, warn};

use crate::error::WorkerError;
use crate::integrator::Integrator;

/// One physics worker: an independent actor that repeatedly pulls a
/// package id, integrates it, and commits the result (§4.7).
///
/// Workers are plain threads over shared `Arc` handles — the coordinator
/// never shares mutable state with them directly; every interaction goes
/// through `azrael-dispatch`'s registry and transport (§5).
pub struct Worker<I: Integrator> {
    id: u32,
    registry: Arc<PackageRegistry>,
    dispatch: DispatchQueue,
    integrator: I,
    force_coupling: f64,
    /// If `Some(n)`, the worker self-terminates after `n` packages,
    /// relying on a supervisor to respawn it (§4.7, §9).
    packages_until_exit: Option<u64>,
    packages_processed: u64,
}

impl<I: Integrator> Worker<I> {
    pub fn new(
        id: u32,
        registry: Arc<PackageRegistry>,
        dispatch: DispatchQueue,
        integrator: I,
        force_coupling: f64,
        packages_until_exit: Option<u64>,
    ) -> Self {
        Self {
            id,
            registry,
            dispatch,
            integrator,
            force_coupling,
            packages_until_exit,
            packages_processed: 0,
        }
    }

    /// Runs one iteration of the pull loop: receive, fetch, integrate,
    /// commit. Blocks on the dispatch transport until a package id (or a
    /// shutdown signal) arrives.
    ///
    /// Returns `Ok(true)` if the worker should keep running, `Ok(false)` if
    /// it has hit its self-termination budget.
    pub fn run_once(&mut self) -> Result<bool, WorkerError> {
        let package_id = match self.dispatch.pull_timeout(Duration::from_millis(50)) {
            Some(id) => id,
            None => return Ok(true),
        };

        let package = match self.registry.fetch_payload(package_id) {
            Ok(p) => p,
            Err(DispatchError::Unknown(_)) => {
                // Abandoned by the coordinator before we got to it (§5
                // cancellation: no cooperative signal, discovered here).
                debug!(worker = self.id, package = package_id.0, "package already abandoned");
                return Ok(true);
            }
            Err(err) => return Err(WorkerError::Transport(err)),
        };

        let mut results: HashMap<ObjectId, ObjectState> = HashMap::with_capacity(package.payload.len());
        for entry in &package.payload {
            let outcome = self.integrator.integrate(
                entry,
                package.dt,
                package.max_substeps,
                self.force_coupling,
            );
            let mut state = match outcome {
                Ok(state) => state,
                Err(err) => {
                    // §4.7 failure behaviour: commit the input state
                    // unchanged rather than leaving the object stuck.
                    warn!(
                        worker = self.id,
                        object = %entry.object_id,
                        error = %err,
                        "integrator failed for object, committing input state unchanged"
                    );
                    entry.state
                }
            };
            // Bullet (and this stub) always zero the shape tag on output;
            // the coordinator re-applies the authoritative value from C1
            // on reconcile, but we restore it here too so a result read in
            // isolation is never misleading (original precedent: both
            // `LeonardBulletMonolithic.step` and the worker variants
            // explicitly restore `cshape` after reading back from the
            // engine).
            state.collision_shape = entry.state.collision_shape;
            results.insert(entry.object_id, state);
        }

        match self.registry.commit(package_id, package.token, results) {
            Ok(()) => {
                self.packages_processed += 1;
            }
            Err(DispatchError::BadToken(_)) | Err(DispatchError::AlreadyCommitted(_)) => {
                // Stale or redundant: drop silently (§4.7 step 6).
            }
            Err(err) => return Err(WorkerError::Transport(err)),
        }

        if let Some(budget) = self.packages_until_exit {
            if self.packages_processed >= budget {
                info!(worker = self.id, processed = self.packages_processed, "self-terminating after package budget");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Runs the pull loop until self-termination (if configured) or the
    /// dispatch transport is closed.
    pub fn run(&mut self) -> Result<(), WorkerError> {
        loop {
            match self.run_once() {
                Ok(true) => continue,
                Ok(false) => return Ok(()),
                Err(err) => return Err(err),
            }
        }
    }

    pub fn packages_processed(&self) -> u64 {
        self.packages_processed
    }
}
