//! Osculating orbital elements to Cartesian phase space
//!
//! Standard two-body conversion: the new particle is placed on the orbit
//! described by its elements around `primary`, using `G * (M + m)` as the
//! gravitational parameter. All angles are in radians.

use serde::{Deserialize, Serialize};

use crate::error::ConstructionError;
use crate::simulation::states::{NVec3, Particle};

/// One body's osculating orbit relative to the central body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    pub mass_ratio: f64, // body mass / central mass
    pub a: f64, // semi-major axis
    pub e: f64, // eccentricity
    pub inc: f64, // inclination
    pub node: f64, // longitude of ascending node
    pub peri: f64, // argument of pericenter
    pub anomaly: f64, // true anomaly
}

impl OrbitalElements {
    /// Planar orbit (inclination and node zero)
    pub fn planar(mass_ratio: f64, a: f64, e: f64, peri: f64, anomaly: f64) -> Self {
        Self {
            mass_ratio,
            a,
            e,
            inc: 0.0,
            node: 0.0,
            peri,
            anomaly,
        }
    }

    /// Check the elements describe a massive body on a bound orbit.
    /// `index` is only used in the error.
    pub fn validate(&self, index: usize) -> Result<(), ConstructionError> {
        let finite = [
            self.mass_ratio, self.a, self.e, self.inc, self.node, self.peri, self.anomaly,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(ConstructionError::NonFinite { index, field: "orbital elements" });
        }
        if self.mass_ratio <= 0.0 {
            return Err(ConstructionError::NonPositiveMassRatio {
                index,
                mass_ratio: self.mass_ratio,
            });
        }
        if self.a <= 0.0 {
            return Err(ConstructionError::NonPositiveSemiMajorAxis { index, a: self.a });
        }
        if !(0.0..1.0).contains(&self.e) {
            return Err(ConstructionError::UnboundEccentricity { index, e: self.e });
        }
        Ok(())
    }
}

/// Convert orbital elements to a particle orbiting `primary`.
/// Elements are assumed validated.
pub fn orbit_to_particle(G: f64, primary: &Particle, el: &OrbitalElements) -> Particle {
    let m = el.mass_ratio * primary.m;
    let e = el.e;

    // r = a (1 - e^2) / (1 + e cos f)
    let (sf, cf) = el.anomaly.sin_cos();
    let r = el.a * (1.0 - e * e) / (1.0 + e * cf);

    // speed scale sqrt(mu / p) with semi-latus rectum p = a (1 - e^2)
    let v0 = (G * (primary.m + m) / el.a / (1.0 - e * e)).sqrt();

    let (s_node, c_node) = el.node.sin_cos();
    let (s_peri, c_peri) = el.peri.sin_cos();
    let (s_inc, c_inc) = el.inc.sin_cos();

    // cos/sin of the argument of latitude (peri + f)
    let cu = c_peri * cf - s_peri * sf;
    let su = s_peri * cf + c_peri * sf;

    let x = NVec3::new(
        r * (c_node * cu - s_node * su * c_inc),
        r * (s_node * cu + c_node * su * c_inc),
        r * su * s_inc,
    );

    let v = NVec3::new(
        v0 * ((e + cf) * (-c_inc * c_peri * s_node - c_node * s_peri)
            - sf * (c_peri * c_node - c_inc * s_peri * s_node)),
        v0 * ((e + cf) * (c_inc * c_peri * c_node - s_node * s_peri)
            - sf * (c_peri * s_node + c_inc * s_peri * c_node)),
        v0 * ((e + cf) * c_peri * s_inc - sf * s_inc * s_peri),
    );

    Particle {
        x: primary.x + x,
        v: primary.v + v,
        m,
    }
}
