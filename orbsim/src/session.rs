//! One resume decision over both archives
//!
//! The primary archive decides whether this is a resumed run. If it is,
//! the effects archive next to it must exist as well; a missing one is an
//! error rather than a silent re-initialisation. If it is not, an unusable
//! primary file is moved aside, a fresh state is constructed and the effects
//! archive is loaded or created.

use tracing::{info, warn};

use crate::archive::{self, ArchiveWriter};
use crate::error::{Error, Result};
use crate::simulation::driver::{self, RunSummary};
use crate::simulation::effects::EffectSet;
use crate::simulation::engine::Simulation;
use crate::simulation::heartbeat::CheckpointHeartbeat;
use crate::simulation::params::RunConfig;
use crate::simulation::scenario::{construct_fresh, ConstructionSpec};

/// State and effects ready to integrate
#[derive(Debug, Clone)]
pub struct Session {
    pub simulation: Simulation,
    pub effects: EffectSet,
    pub resumed: bool,
}

/// Resume from `run.archive_path` or start fresh.
///
/// `build_spec` and `default_effects` are only called on a fresh start.
pub fn resume_or_start(
    run: &RunConfig,
    build_spec: impl FnOnce() -> Result<ConstructionSpec>,
    default_effects: impl FnOnce() -> EffectSet,
) -> Result<Session> {
    run.validate()?;
    let effects_path = run.effects_path();

    if let Some(simulation) = archive::try_resume(&run.archive_path) {
        let effects = archive::load_effects(&effects_path).map_err(|source| Error::EffectsMissing {
            primary: run.archive_path.clone(),
            effects: effects_path.clone(),
            source,
        })?;
        info!(path = %effects_path.display(), "found effects archive");
        warn_on_drift(run, &simulation);
        return Ok(Session {
            simulation,
            effects,
            resumed: true,
        });
    }

    // a file the loader rejected would also be rejected by the writer at
    // the first checkpoint
    archive::set_aside_unusable(&run.archive_path)?;
    let spec = build_spec()?;
    let simulation = construct_fresh(&spec, run)?;
    let effects = archive::load_or_init_effects(&effects_path, default_effects)?;
    Ok(Session {
        simulation,
        effects,
        resumed: false,
    })
}

/// Archived run constants win over the configuration; say so when they differ
fn warn_on_drift(run: &RunConfig, sim: &Simulation) {
    if sim.dt() != run.dt {
        warn!(archived = sim.dt(), configured = run.dt, "dt differs from configuration, using archived value");
    }
    if sim.G() != run.G {
        warn!(archived = sim.G(), configured = run.G, "G differs from configuration, using archived value");
    }
    if sim.integrator() != run.integrator {
        warn!(archived = ?sim.integrator(), configured = ?run.integrator, "integrator differs from configuration, using archived value");
    }
    if sim.checkpoint_interval() != run.checkpoint_interval {
        warn!(
            archived = sim.checkpoint_interval(),
            configured = run.checkpoint_interval,
            "checkpoint interval differs from configuration, using archived value"
        );
    }
}

impl Session {
    /// Integrate to `run.end_time`, checkpointing into `run.archive_path`
    pub fn run(&mut self, run: &RunConfig) -> Result<RunSummary> {
        let forces = self.effects.build_forces(self.simulation.G())?;
        let writer = ArchiveWriter::new(run.archive_path.clone());
        let mut heartbeat = CheckpointHeartbeat::new(
            writer,
            &self.simulation,
            self.simulation.checkpoint_interval(),
            run.report_interval,
            run.end_time,
        );
        driver::run(
            &mut self.simulation,
            &forces,
            run.end_time,
            run.max_distance,
            &mut heartbeat,
        )
    }
}
