//! Fixed-step integration loop
//!
//! [`run`] owns the simulation for the whole loop, steps it until
//! `end_time` and hands it to a [`Heartbeat`] after every step. It never
//! checkpoints on its own: whatever happens after the last checkpoint is
//! lost when the process ends.

use tracing::info;

use crate::error::Result;
use crate::simulation::engine::Simulation;
use crate::simulation::forces::AccelSet;

/// Per-step hook. Implemented for closures.
pub trait Heartbeat {
    fn beat(&mut self, sim: &Simulation) -> Result<()>;
}

impl<F> Heartbeat for F
where
    F: FnMut(&Simulation) -> Result<()>,
{
    fn beat(&mut self, sim: &Simulation) -> Result<()> {
        self(sim)
    }
}

/// What a call to [`run`] did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub steps: u64, // steps taken by this call
    pub t_final: f64,
}

/// Step `sim` until `sim.t() >= end_time`, calling `heartbeat` after each step.
/// Integrator and heartbeat errors stop the loop immediately.
pub fn run(
    sim: &mut Simulation,
    forces: &AccelSet,
    end_time: f64,
    max_distance: Option<f64>,
    heartbeat: &mut impl Heartbeat,
) -> Result<RunSummary> {
    let t_start = sim.t();
    info!(
        t_start,
        end_time,
        dt = sim.dt(),
        integrator = ?sim.integrator(),
        particles = sim.particle_count(),
        "starting integration"
    );

    let mut steps = 0u64;
    while sim.t() < end_time {
        sim.step(forces, max_distance)?;
        steps += 1;
        heartbeat.beat(sim)?;
    }

    info!(steps, t_final = sim.t(), "integration finished");
    Ok(RunSummary {
        steps,
        t_final: sim.t(),
    })
}
