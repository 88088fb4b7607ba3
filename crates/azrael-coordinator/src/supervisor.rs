//! The worker-pool supervisor (§9): "the coordinator supervises a pool of
//! worker threads/processes and restarts them on exit."
//!
//! Grounded in the same spawn-a-thread-per-worker shape as
//! `nebula-app`'s renderer/input threads, but adds a respawn loop since a
//! [`Worker`] can legitimately end its own life (hitting its package
//! budget, §4.7) or die on an integrator error it couldn't recover from;
//! either way the supervisor brings up a replacement rather than letting
//! the pool shrink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use azrael_dispatch::DispatchQueue;
use azrael_dispatch::PackageRegistry;
use azrael_worker::{StubEulerIntegrator, Worker};
use tracing::{info, warn};

/// Backoff between a worker dying and its replacement being spawned, so a
/// worker that crashes instantly on every package doesn't spin the host.
const RESPAWN_BACKOFF: Duration = Duration::from_millis(100);

/// Owns `worker_count` long-running OS threads, each running a
/// [`Worker<StubEulerIntegrator>`] pull loop, and respawns any that exit.
pub struct WorkerSupervisor {
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerSupervisor {
    /// Spawns `worker_count` supervised worker threads against the given
    /// registry and dispatch transport.
    ///
    /// `packages_until_exit` is forwarded to every worker it spawns (`None`
    /// for production use; `Some(n)` is mainly useful for exercising the
    /// respawn path in tests).
    pub fn spawn(
        worker_count: usize,
        registry: Arc<PackageRegistry>,
        dispatch: DispatchQueue,
        force_coupling: f64,
        packages_until_exit: Option<u64>,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(worker_count);

        for id in 0..worker_count {
            let handle = spawn_supervised_worker(
                id as u32,
                registry.clone(),
                dispatch.clone(),
                force_coupling,
                packages_until_exit,
                shutdown.clone(),
            );
            handles.push(handle);
        }

        Self { shutdown, handles }
    }

    /// Signals every supervised thread to stop respawning and return, then
    /// joins them. A worker blocked in `pull_timeout` notices the shutdown
    /// flag within its 50ms poll interval (§4.7).
    pub fn shutdown(mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }
}

fn spawn_supervised_worker(
    id: u32,
    registry: Arc<PackageRegistry>,
    dispatch: DispatchQueue,
    force_coupling: f64,
    packages_until_exit: Option<u64>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while !shutdown.load(Ordering::Relaxed) {
            let mut worker = Worker::new(
                id,
                registry.clone(),
                dispatch.clone(),
                StubEulerIntegrator,
                force_coupling,
                packages_until_exit,
            );

            loop {
                if shutdown.load(Ordering::Relaxed) {
                    return;
                }
                match worker.run_once() {
                    Ok(true) => continue,
                    Ok(false) => {
                        info!(worker = id, "worker exited cleanly, respawning");
                        break;
                    }
                    Err(err) => {
                        warn!(worker = id, %err, "worker crashed, respawning after backoff");
                        break;
                    }
                }
            }

            if shutdown.load(Ordering::Relaxed) {
                return;
            }
            thread::sleep(RESPAWN_BACKOFF);
        }
    })
}
