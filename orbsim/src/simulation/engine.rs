//! The resumable simulation state
//!
//! `Simulation` is exactly what a checkpoint stores: particles and time,
//! the run-fixed `G`, `dt` and integrator, the integrator's own carried
//! state, the step count and the perturbation the run was built with. Fields are private so `G`, `dt`, the
//! integrator and the particle count cannot change once a run starts.

use serde::{Deserialize, Serialize};

use crate::error::IntegratorError;
use crate::simulation::forces::AccelSet;
use crate::simulation::integrator::{self, IntegratorKind, IntegratorState};
use crate::simulation::params::RunConfig;
use crate::simulation::scenario::Perturbation;
use crate::simulation::states::System;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    system: System,
    G: f64,
    dt: f64,
    integrator: IntegratorKind,
    integrator_state: IntegratorState,
    steps: u64, // steps taken since t = 0
    checkpoint_interval: f64,
    perturbation: Option<Perturbation>, // applied at construction, sampled kappa included
}

impl Simulation {
    /// New simulation at the system's current time, zero steps taken
    pub fn fresh(system: System, run: &RunConfig) -> Self {
        Self {
            system,
            G: run.G,
            dt: run.dt,
            integrator: run.integrator,
            integrator_state: IntegratorState::default(),
            steps: 0,
            checkpoint_interval: run.checkpoint_interval,
            perturbation: None,
        }
    }

    /// Record the perturbation the initial state was built with
    pub fn with_perturbation(mut self, perturbation: Option<Perturbation>) -> Self {
        self.perturbation = perturbation;
        self
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    pub fn t(&self) -> f64 {
        self.system.t
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn G(&self) -> f64 {
        self.G
    }

    pub fn integrator(&self) -> IntegratorKind {
        self.integrator
    }

    pub fn integrator_state(&self) -> &IntegratorState {
        &self.integrator_state
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn checkpoint_interval(&self) -> f64 {
        self.checkpoint_interval
    }

    pub fn perturbation(&self) -> Option<&Perturbation> {
        self.perturbation.as_ref()
    }

    pub fn particle_count(&self) -> usize {
        self.system.bodies.len()
    }

    /// Advance one fixed step and sanity-check the result
    pub fn step(&mut self, forces: &AccelSet, max_distance: Option<f64>) -> Result<(), IntegratorError> {
        integrator::step(
            self.integrator,
            &mut self.system,
            forces,
            self.dt,
            &mut self.integrator_state,
        )?;
        self.steps += 1;
        integrator::check_state(&self.system, max_distance)
    }
}
