//! Configuration types for loading runs from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! run. A run file consists of:
//!
//! - [`RunSection`]     – archive path, step, end time, cadences, integrator
//! - [`SystemConfig`]   – how to build the initial state on a fresh start
//! - [`EffectConfig`]   – default effects written to a new effects archive
//! - [`RunConfigFile`]  – top-level wrapper
//!
//! # YAML format
//! ```yaml
//! run:
//!   archive: runs/two_body.bin
//!   end_time: 100.0
//!   dt: 0.01
//!   checkpoint_interval: 10.0
//!   report_interval: 10.0   # optional, defaults to checkpoint_interval
//!   integrator: "verlet"    # or "leapfrog"
//!   G: 1.0                  # optional, defaults to 1
//!   max_distance: 1000.0    # optional ejection radius
//!
//! system:
//!   kind: elements          # or "ephemeris" / "solar_system"
//!   central_mass: 1.0
//!   bodies:
//!     - { mass_ratio: 1.0e-6, a: 1.0, e: 0.1 }   # angles in degrees, default 0
//!
//! effects:                  # optional, defaults to gr_potential with c = 10065.32
//!   - name: gr_potential
//!     params: { c: 10065.32 }
//! ```
//!
//! Only the `run` section matters on a resume; `system` and `effects` are
//! read when no archive exists yet.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::info;

use crate::error::{ConfigError, ConstructionError, Error};
use crate::simulation::effects::{gr_potential_defaults, Effect, EffectSet, ParamValue};
use crate::simulation::integrator::IntegratorKind;
use crate::simulation::orbit::OrbitalElements;
use crate::simulation::params::RunConfig;
use crate::simulation::scenario::{self, ConstructionSpec, Perturbation, SemiMajorOffset};
use crate::simulation::states::{NVec3, Particle};

fn one() -> f64 {
    1.0
}

/// Run-scoped constants
#[derive(Deserialize, Debug, Clone)]
pub struct RunSection {
    pub archive: PathBuf, // primary archive path, effects archive sits next to it
    pub end_time: f64, // target simulation time
    pub dt: f64, // fixed step size
    pub checkpoint_interval: f64, // sim time between checkpoints
    pub report_interval: Option<f64>, // sim time between progress reports
    pub integrator: IntegratorKind,
    #[serde(default = "one")]
    pub G: f64, // gravitational constant
    pub max_distance: Option<f64>, // ejection radius
}

/// One orbiting body, angles in degrees
#[derive(Deserialize, Debug, Clone)]
pub struct ElementsConfig {
    pub mass_ratio: f64,
    pub a: f64,
    pub e: f64,
    #[serde(default)]
    pub inc: f64,
    #[serde(default)]
    pub node: f64,
    #[serde(default)]
    pub peri: f64,
    #[serde(default)]
    pub anomaly: f64,
}

/// Configuration for a single body's Cartesian initial state
#[derive(Deserialize, Debug, Clone)]
pub struct BodyConfig {
    pub x: Vec<f64>, // position
    pub v: Vec<f64>, // velocity
    pub m: f64, // mass
}

/// Eccentricity scale and semi-major offset
#[derive(Deserialize, Debug, Clone, Default)]
pub struct PerturbationConfig {
    pub kappa: Option<f64>, // fixed eccentricity scale
    #[serde(default)]
    pub sample_kappa: bool, // draw kappa instead, ignored when `kappa` is set
    pub seed: Option<u64>, // seed for the draw
    pub semi_major_offset: Option<SemiMajorOffset>,
}

/// Initial state on a fresh start
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SystemConfig {
    SolarSystem {
        #[serde(default)]
        perturbation: PerturbationConfig,
    },
    Elements {
        central_mass: f64,
        bodies: Vec<ElementsConfig>,
        #[serde(default)]
        perturbation: PerturbationConfig,
    },
    Ephemeris {
        bodies: Vec<BodyConfig>,
    },
}

/// Effect parameter as written in YAML: integers stay integers
#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(untagged)]
pub enum ParamConfig {
    Int(i64),
    Double(f64),
}

#[derive(Deserialize, Debug, Clone)]
pub struct EffectConfig {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamConfig>,
}

/// Top-level run configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone)]
pub struct RunConfigFile {
    pub run: RunSection,
    pub system: SystemConfig,
    pub effects: Option<Vec<EffectConfig>>, // none = gr_potential defaults
}

impl RunConfigFile {
    /// Immutable run configuration, validated
    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        let r = &self.run;
        let cfg = RunConfig {
            archive_path: r.archive.clone(),
            end_time: r.end_time,
            dt: r.dt,
            checkpoint_interval: r.checkpoint_interval,
            report_interval: r.report_interval.unwrap_or(r.checkpoint_interval),
            integrator: r.integrator,
            G: r.G,
            max_distance: r.max_distance,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Construction input with angles converted to radians
    pub fn construction_spec(&self) -> Result<ConstructionSpec, Error> {
        match &self.system {
            SystemConfig::SolarSystem { perturbation } => {
                Ok(scenario::solar_system(&perturbation.resolve())?)
            }
            SystemConfig::Elements { central_mass, bodies, perturbation } => {
                let mut elements = bodies
                    .iter()
                    .enumerate()
                    .map(|(i, b)| b.to_elements(i + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                let perturbation = perturbation.resolve();
                perturbation.apply(&mut elements)?;
                Ok(ConstructionSpec::Elements {
                    central_mass: *central_mass,
                    bodies: elements,
                    perturbation: Some(perturbation),
                })
            }
            SystemConfig::Ephemeris { bodies } => {
                let particles = bodies
                    .iter()
                    .enumerate()
                    .map(|(i, b)| b.to_particle(i))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ConstructionSpec::Ephemeris { bodies: particles })
            }
        }
    }

    /// Effects written to a new effects archive
    pub fn effect_set(&self) -> EffectSet {
        let Some(effects) = &self.effects else {
            return gr_potential_defaults();
        };
        let mut set = EffectSet::new();
        for e in effects {
            let mut effect = Effect::new(e.name.clone());
            for (name, value) in &e.params {
                let value = match *value {
                    ParamConfig::Int(i) => ParamValue::Int(i),
                    ParamConfig::Double(d) => ParamValue::Double(d),
                };
                effect = effect.with_param(name.clone(), value);
            }
            set = set.with(effect);
        }
        set
    }
}

impl PerturbationConfig {
    /// Fix kappa, drawing it if asked to
    pub fn resolve(&self) -> Perturbation {
        let eccentricity_scale = match (self.kappa, self.sample_kappa) {
            (Some(k), _) => k,
            (None, true) => {
                let k = Perturbation::sample_kappa(self.seed);
                info!(kappa = k, seed = ?self.seed, "sampled eccentricity scale");
                k
            }
            (None, false) => 1.0,
        };
        Perturbation {
            eccentricity_scale,
            semi_major_offset: self.semi_major_offset,
        }
    }
}

impl ElementsConfig {
    fn to_elements(&self, index: usize) -> Result<OrbitalElements, ConfigError> {
        let rad = |field: &'static str, deg: f64| {
            if deg.is_finite() {
                Ok(deg.to_radians())
            } else {
                Err(ConfigError::BadAngle { index, field })
            }
        };
        Ok(OrbitalElements {
            mass_ratio: self.mass_ratio,
            a: self.a,
            e: self.e,
            inc: rad("inc", self.inc)?,
            node: rad("node", self.node)?,
            peri: rad("peri", self.peri)?,
            anomaly: rad("anomaly", self.anomaly)?,
        })
    }
}

impl BodyConfig {
    fn to_particle(&self, index: usize) -> Result<Particle, ConstructionError> {
        let vec3 = |field: &'static str, v: &[f64]| match v {
            [x, y, z] => Ok(NVec3::new(*x, *y, *z)),
            _ => Err(ConstructionError::MalformedVector { index, field, len: v.len() }),
        };
        Ok(Particle {
            x: vec3("x", &self.x)?,
            v: vec3("v", &self.v)?,
            m: self.m,
        })
    }
}
