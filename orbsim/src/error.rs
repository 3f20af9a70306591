//! Error types for orbsim.
//!
//! Each stage of a run has its own `thiserror` enum so callers can tell a
//! bad input (fatal before integration), a missing archive (normal cold
//! start), a failed checkpoint write (fatal for the run) and a numerical
//! breakdown apart. [`Error`] wraps them all for the driver and session.

use std::path::PathBuf;

use thiserror::Error;

/// Invalid physical input handed to the state constructor.
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("at least one particle is required")]
    NoParticles,

    #[error("central mass must be positive, got {mass}")]
    NonPositiveCentralMass { mass: f64 },

    #[error("body {index}: mass ratio must be positive, got {mass_ratio}")]
    NonPositiveMassRatio { index: usize, mass_ratio: f64 },

    #[error("body {index}: semi-major axis must be positive, got {a}")]
    NonPositiveSemiMajorAxis { index: usize, a: f64 },

    #[error("body {index}: eccentricity {e} is outside [0, 1)")]
    UnboundEccentricity { index: usize, e: f64 },

    #[error("body {index}: mass must be non-negative, got {mass}")]
    NegativeMass { index: usize, mass: f64 },

    #[error("body {index}: {field} has {len} components, expected 3")]
    MalformedVector { index: usize, field: &'static str, len: usize },

    #[error("body {index}: non-finite value in {field}")]
    NonFinite { index: usize, field: &'static str },

    #[error("perturbation targets body {body}, but only {count} bodies exist")]
    PerturbationOutOfRange { body: usize, count: usize },

    #[error("total system mass is zero")]
    ZeroTotalMass,
}

/// Reasons an archive could not be read. Callers of
/// [`crate::archive::try_resume`] treat every variant as "no archive".
#[derive(Debug, Error)]
pub enum ArchiveReadError {
    #[error("archive {path:?} does not exist")]
    Missing { path: PathBuf },

    #[error("archive {path:?} is empty")]
    Empty { path: PathBuf },

    #[error("archive {path:?} has a bad header: {reason}")]
    BadHeader { path: PathBuf, reason: String },

    #[error("archive {path:?} holds no complete entry")]
    NoCompleteEntry { path: PathBuf },

    #[error("archive {path:?}: cannot decode entry: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("archive {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A checkpoint or effect archive could not be written.
#[derive(Debug, Error)]
pub enum ArchiveWriteError {
    #[error("cannot write archive {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("existing file {path:?} is not an archive: {reason}")]
    NotAnArchive { path: PathBuf, reason: String },

    #[error("cannot encode archive entry: {0}")]
    Encode(String),
}

/// Fatal numerical failure surfaced by the integrator.
#[derive(Debug, Error)]
pub enum IntegratorError {
    #[error("particle {index} has non-finite coordinates at t={t}")]
    NonFinite { index: usize, t: f64 },

    #[error("particle {index} ejected: distance {distance} exceeds {max_distance} at t={t}")]
    Ejection {
        index: usize,
        distance: f64,
        max_distance: f64,
        t: f64,
    },

    #[error("integrator state holds {cached} cached accelerations for {particles} particles")]
    StateMismatch { cached: usize, particles: usize },
}

/// Effect definitions that cannot be turned into force terms.
#[derive(Debug, Error)]
pub enum EffectError {
    #[error("unknown effect {name:?}")]
    UnknownEffect { name: String },

    #[error("effect {effect:?} is missing parameter {param:?}")]
    MissingParam { effect: String, param: String },

    #[error("effect {effect:?}: parameter {param:?} has the wrong type")]
    WrongParamType { effect: String, param: String },

    #[error("effect {effect:?}: parameter {param:?} must be positive, got {value}")]
    NonPositiveParam { effect: String, param: String, value: f64 },
}

/// Invalid run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be positive and finite, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f64 },

    #[error("angle {field} of body {index} is not finite")]
    BadAngle { index: usize, field: &'static str },
}

/// Umbrella error for the session and driver.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    ArchiveRead(#[from] ArchiveReadError),

    #[error(transparent)]
    ArchiveWrite(#[from] ArchiveWriteError),

    #[error(transparent)]
    Integrator(#[from] IntegratorError),

    #[error(transparent)]
    Effect(#[from] EffectError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("simulation archive {primary:?} exists but its effects archive {effects:?} is missing or unreadable")]
    EffectsMissing {
        primary: PathBuf,
        effects: PathBuf,
        #[source]
        source: ArchiveReadError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
