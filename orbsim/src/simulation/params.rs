//! Run-scoped parameters
//!
//! `RunConfig` holds everything that stays fixed for a whole run:
//! - archive path and checkpoint / report cadence,
//! - step size, end time and integrator,
//! - gravitational constant `G` and optional ejection radius
//!
//! It is built once (from YAML in the binary) and passed by reference;
//! nothing mutates it after the run starts.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::simulation::integrator::IntegratorKind;

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub archive_path: PathBuf, // primary simulation archive
    pub end_time: f64, // target simulation time
    pub dt: f64, // fixed step size
    pub checkpoint_interval: f64, // sim time between checkpoints
    pub report_interval: f64, // sim time between progress reports
    pub integrator: IntegratorKind,
    pub G: f64, // gravitational constant
    pub max_distance: Option<f64>, // ejection radius, none = unchecked
}

impl RunConfig {
    /// Check that every cadence and step is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("dt", self.dt)?;
        positive("checkpoint_interval", self.checkpoint_interval)?;
        positive("report_interval", self.report_interval)?;
        positive("G", self.G)?;
        if let Some(r) = self.max_distance {
            positive("max_distance", r)?;
        }
        if !self.end_time.is_finite() {
            return Err(ConfigError::NotFinite { field: "end_time", value: self.end_time });
        }
        Ok(())
    }

    /// Where the effect archive for this run lives
    pub fn effects_path(&self) -> PathBuf {
        crate::archive::effects_path_for(&self.archive_path)
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}
