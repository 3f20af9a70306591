//! Core state types for the N-body simulation.
//!
//! - `Particle` holds mass, position and velocity as `NVec3`
//! - `System` holds the ordered particle list and the current time `t`
//!
//! Index 0 of a `System` is the central body by convention.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

pub type NVec3 = Vector3<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub x: NVec3, // position
    pub v: NVec3, // velocity
    pub m: f64, // mass
}

impl Particle {
    pub fn new(x: NVec3, v: NVec3, m: f64) -> Self {
        Self { x, v, m }
    }

    /// Particle at rest at the origin
    pub fn at_rest(m: f64) -> Self {
        Self {
            x: NVec3::zeros(),
            v: NVec3::zeros(),
            m,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct System {
    pub bodies: Vec<Particle>, // central body first
    pub t: f64, // time
}

impl System {
    pub fn total_mass(&self) -> f64 {
        self.bodies.iter().map(|b| b.m).sum()
    }

    /// Mass-weighted mean position and velocity.
    /// Returns `None` when the total mass is zero.
    pub fn center_of_mass(&self) -> Option<(NVec3, NVec3)> {
        let m_tot = self.total_mass();
        if m_tot <= 0.0 {
            return None;
        }
        let mut x = NVec3::zeros();
        let mut v = NVec3::zeros();
        for b in &self.bodies {
            x += b.m * b.x;
            v += b.m * b.v;
        }
        Some((x / m_tot, v / m_tot))
    }

    /// Shift every particle into the centre-of-mass frame
    /// Returns `false` (and leaves the system untouched) if there is no mass
    pub fn move_to_com(&mut self) -> bool {
        let Some((x_com, v_com)) = self.center_of_mass() else {
            return false;
        };
        for b in self.bodies.iter_mut() {
            b.x -= x_com;
            b.v -= v_com;
        }
        true
    }
}
