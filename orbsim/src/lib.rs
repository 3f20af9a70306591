#![allow(non_snake_case)] // `G` is the gravitational constant throughout

pub mod error;
pub mod simulation;
pub mod archive;
pub mod configuration;
pub mod session;

pub use error::{
    ArchiveReadError, ArchiveWriteError, ConfigError, ConstructionError, EffectError, Error,
    IntegratorError, Result,
};

pub use simulation::states::{NVec3, Particle, System};
pub use simulation::engine::Simulation;
pub use simulation::params::RunConfig;
pub use simulation::forces::{AccelSet, Acceleration, GrPotential, NewtonianGravity};
pub use simulation::integrator::{IntegratorKind, IntegratorState};
pub use simulation::orbit::{orbit_to_particle, OrbitalElements};
pub use simulation::scenario::{construct_fresh, solar_system, ConstructionSpec, Perturbation, SemiMajorOffset};
pub use simulation::effects::{gr_potential_defaults, Effect, EffectSet, Param, ParamValue};
pub use simulation::driver::{run, Heartbeat, RunSummary};
pub use simulation::heartbeat::{CheckpointHeartbeat, IntervalSchedule, ProgressReporter};

pub use archive::{
    corrupt_path_for, effects_path_for, load_effects, load_or_init_effects, read_all, read_latest,
    set_aside_unusable, try_resume, ArchiveWriter,
};

pub use configuration::config::{RunConfigFile, RunSection, SystemConfig, EffectConfig, BodyConfig, ElementsConfig};

pub use session::{resume_or_start, Session};
