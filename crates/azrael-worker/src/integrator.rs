//! The worker-side integrator contract plus a stub explicit-Euler
//! implementation (§1, §4.7).
//!
//! The coordinator only specifies the contract a worker must fulfil; which
//! rigid-body integrator actually runs inside a worker is explicitly a
//! worker-crate concern (§1). [`StubEulerIntegrator`] is the reference
//! implementation that makes the crate runnable end-to-end without an
//! external physics engine, a direct port of the explicit Euler step in
//! `LeonardBase.step`/`LeonardBaseWorkpackages.step`
//! (`original_source/azrael/leonard.py`).

use azrael_core::{ObjectState, Quat, Vec3};
use azrael_dispatch::PayloadEntry;

/// Reported when an integrator cannot produce a result for one object.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegratorError(pub String);

impl std::fmt::Display for IntegratorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IntegratorError {}

/// A pluggable rigid-body integrator. A worker calls this once per payload
/// entry per tick.
pub trait Integrator {
    /// Advances `entry`'s state by `dt` seconds, in at most `max_substeps`
    /// equal sub-steps, scaling `central_force`/`torque` by `force_coupling`
    /// before applying them (§4.7 step 3; coupling is a worker-side policy
    /// constant, never part of the wire protocol — §9).
    fn integrate(
        &self,
        entry: &PayloadEntry,
        dt: f64,
        max_substeps: u32,
        force_coupling: f64,
    ) -> Result<ObjectState, IntegratorError>;
}

/// Semi-implicit (symplectic) Euler: `v += a*h; x += v*h` per sub-step of
/// size `h = dt / max_substeps`, where `a = force * force_coupling *
/// inverse_mass`. Orientation is advanced with the standard quaternion
/// kinematic equation `dq/dt = 0.5 * omega_quat * q`, then renormalized.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubEulerIntegrator;

impl Integrator for StubEulerIntegrator {
    fn integrate(
        &self,
        entry: &PayloadEntry,
        dt: f64,
        max_substeps: u32,
        force_coupling: f64,
    ) -> Result<ObjectState, IntegratorError> {
        if max_substeps == 0 {
            return Err(IntegratorError("max_substeps must be positive".into()));
        }
        let mut state = entry.state;
        if let Some(suggested) = entry.suggested_position {
            state.position = suggested;
        }

        let substeps = max_substeps as f64;
        let h = dt / substeps;
        let linear_accel = entry.central_force * (force_coupling * state.inverse_mass);
        let angular_accel = entry.torque * (force_coupling * state.inverse_mass);

        for _ in 0..max_substeps {
            state.velocity_linear += linear_accel * h;
            state.position += state.velocity_linear * h;
            state.velocity_angular += angular_accel * h;
            state.orientation = integrate_orientation(state.orientation, state.velocity_angular, h);
        }

        Ok(state)
    }
}

/// Advances a unit quaternion by one step of the kinematic equation
/// `dq/dt = 0.5 * omega_quat * q`, renormalizing to correct for the
/// first-order integration's drift away from unit length.
fn integrate_orientation(q: Quat, omega: Vec3, h: f64) -> Quat {
    if omega.is_zero() {
        return q;
    }
    let omega_quat = Quat::new(omega.x, omega.y, omega.z, 0.0);
    let dq = quat_mul(omega_quat, q);
    let next = Quat::new(
        q.x + 0.5 * h * dq.x,
        q.y + 0.5 * h * dq.y,
        q.z + 0.5 * h * dq.z,
        q.w + 0.5 * h * dq.w,
    );
    normalize(next)
}

fn quat_mul(a: Quat, b: Quat) -> Quat {
    Quat::new(
        a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
        a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
        a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
        a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
    )
}

fn normalize(q: Quat) -> Quat {
    let len = (q.x * q.x + q.y * q.y + q.z * q.z + q.w * q.w).sqrt();
    if len < 1e-12 {
        return Quat::identity();
    }
    Quat::new(q.x / len, q.y / len, q.z / len, q.w / len)
}
