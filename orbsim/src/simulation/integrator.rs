//! Fixed-step symplectic integrators for the N-body system
//!
//! Provides velocity Verlet (kick-drift-kick, one force evaluation per step
//! thanks to a cached end-of-step acceleration) and a drift-kick-drift
//! leapfrog, both driven by an `AccelSet`. Whatever an integrator carries
//! between steps lives in [`IntegratorState`], which is archived with every
//! checkpoint so a resumed run continues bit for bit.

use serde::{Deserialize, Serialize};

use crate::error::IntegratorError;
use crate::simulation::forces::AccelSet;
use crate::simulation::states::{NVec3, System};

/// Which integrator advances the system
/// integrator: "verlet"` or `integrator: "leapfrog"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegratorKind {
    #[serde(rename = "verlet")] // velocity Verlet, symplectic, fixed step
    Verlet,

    #[serde(rename = "leapfrog")] // drift-kick-drift leapfrog, symplectic, stateless
    Leapfrog,
}

/// Integrator-owned state carried between steps.
/// Stored and restored by the archive without interpretation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegratorState {
    /// Accelerations at the current positions (Verlet only)
    pub cached_accel: Option<Vec<NVec3>>,
}

/// Advance `sys` by one step of `dt` with the selected integrator
pub fn step(
    kind: IntegratorKind,
    sys: &mut System,
    forces: &AccelSet,
    dt: f64,
    state: &mut IntegratorState,
) -> Result<(), IntegratorError> {
    match kind {
        IntegratorKind::Verlet => verlet_integrator(sys, forces, dt, state),
        IntegratorKind::Leapfrog => {
            // switching integrators mid-run is not allowed, but a stale
            // cache must never leak into a later verlet step
            state.cached_accel = None;
            leapfrog_integrator(sys, forces, dt);
            Ok(())
        }
    }
}

/// Advance the system by one step using velocity–Verlet.
/// Reuses the accelerations cached by the previous step as a_n and caches
/// a_n+1 for the next one.
pub fn verlet_integrator(
    sys: &mut System,
    forces: &AccelSet,
    dt: f64,
    state: &mut IntegratorState,
) -> Result<(), IntegratorError> {
    let n = sys.bodies.len();
    if n == 0 { // no bodies, return
        return Ok(());
    }
    let half_dt = 0.5 * dt; // half step dt/2

    // a_n from x_n at time t_n, from the cache when present
    let a_old = match state.cached_accel.take() {
        Some(a) if a.len() == n => a,
        Some(a) => {
            return Err(IntegratorError::StateMismatch { cached: a.len(), particles: n });
        }
        None => {
            let mut a = vec![NVec3::zeros(); n];
            forces.accumulate_accels(sys.t, &*sys, &mut a);
            a
        }
    };

    // Kick: v_n+1/2 = v_n + (1/2 * dt) * a_n
    for (b, a) in sys.bodies.iter_mut().zip(a_old.iter()) {
        b.v += half_dt * *a;
    }

    // Drift: x_n+1 = x_n + dt v_n+1/2
    for b in sys.bodies.iter_mut() {
        b.x += dt * b.v;
    }

    // advance time: t_n+1 = t_n + dt
    sys.t += dt;

    // a_n+1 from x_n+1 at time t_n+1, buffer reused
    let mut a_new = a_old;
    forces.accumulate_accels(sys.t, &*sys, &mut a_new);

    // Second kick: v_n+1 = v_half + (dt/2) * a_n+1
    for (b, a) in sys.bodies.iter_mut().zip(a_new.iter()) {
        b.v += half_dt * *a;
    }

    state.cached_accel = Some(a_new);
    Ok(())
}

/// Advance the system by one step using drift-kick-drift leapfrog.
/// Uses one force evaluation per step.
pub fn leapfrog_integrator(sys: &mut System, forces: &AccelSet, dt: f64) {
    let n = sys.bodies.len();
    if n == 0 { // No bodies, return
        return;
    }
    let half_dt = 0.5 * dt; // half step dt/2

    // Drift: x_half = x_n + (dt/2) * v_n
    for b in sys.bodies.iter_mut() {
        b.x += half_dt * b.v;
    }

    let t_mid = sys.t + half_dt;

    // Kick: v_n+1 = v_n + dt * a_mid
    let mut a_mid = vec![NVec3::zeros(); n];
    forces.accumulate_accels(t_mid, &*sys, &mut a_mid);
    for (b, a) in sys.bodies.iter_mut().zip(a_mid.iter()) {
        b.v += dt * *a;
    }

    // Second drift: x_n+1 = x_half + dt/2 * v_n+1
    for b in sys.bodies.iter_mut() {
        b.x += half_dt * b.v;
    }

    // t_n+1 = t_n + dt
    sys.t += dt;
}

/// Fail on non-finite coordinates, or on a body beyond `max_distance`
/// from the origin
pub fn check_state(sys: &System, max_distance: Option<f64>) -> Result<(), IntegratorError> {
    for (index, b) in sys.bodies.iter().enumerate() {
        let finite = b.x.iter().chain(b.v.iter()).all(|c| c.is_finite());
        if !finite {
            return Err(IntegratorError::NonFinite { index, t: sys.t });
        }
        if let Some(max_distance) = max_distance {
            let distance = b.x.norm();
            if distance > max_distance {
                return Err(IntegratorError::Ejection {
                    index,
                    distance,
                    max_distance,
                    t: sys.t,
                });
            }
        }
    }
    Ok(())
}
