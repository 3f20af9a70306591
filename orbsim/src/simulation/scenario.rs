//! Build fresh simulation states
//!
//! A [`ConstructionSpec`] is either a central mass plus a list of
//! orbital elements, or a literal Cartesian ephemeris table. Both variants
//! go through [`construct_fresh`], which assembles the particles (central
//! body first), moves them into the centre-of-mass frame and wraps them in
//! a [`Simulation`] at `t = 0`.
//!
//! The built-in solar-system catalogue and its [`Perturbation`] knobs
//! live here as well.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConstructionError;
use crate::simulation::engine::Simulation;
use crate::simulation::orbit::{orbit_to_particle, OrbitalElements};
use crate::simulation::params::RunConfig;
use crate::simulation::states::{Particle, System};

/// Centimetres to astronomical units
pub const CM_TO_AU: f64 = 6.68459e-14;

/// Range the eccentricity scale is drawn from when not given explicitly
pub const KAPPA_RANGE: (f64, f64) = (0.75, 1.20);

/// Initial-state description, dispatched once by [`construct_fresh`]
#[derive(Debug, Clone, PartialEq)]
pub enum ConstructionSpec {
    /// Bodies on osculating orbits around a central mass (angles in radians)
    Elements {
        central_mass: f64,
        bodies: Vec<OrbitalElements>,
        /// Already applied to `bodies`; kept so the archive records it
        perturbation: Option<Perturbation>,
    },
    /// Literal positions, velocities and masses, used as given
    Ephemeris { bodies: Vec<Particle> },
}

/// Offset added to one body's semi-major axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SemiMajorOffset {
    pub body: usize, // index into the orbiting bodies (0 = first planet)
    pub delta: f64,
}

/// Scale/offset applied to a catalogue before conversion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Perturbation {
    pub eccentricity_scale: f64, // kappa, multiplies e and inc of every body
    pub semi_major_offset: Option<SemiMajorOffset>,
}

impl Default for Perturbation {
    fn default() -> Self {
        Self {
            eccentricity_scale: 1.0,
            semi_major_offset: None,
        }
    }
}

impl Perturbation {
    /// Draw kappa uniformly from [`KAPPA_RANGE`]. A seed makes it reproducible.
    pub fn sample_kappa(seed: Option<u64>) -> f64 {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let (lo, hi) = KAPPA_RANGE;
        lo + rng.gen::<f64>() * (hi - lo)
    }

    /// Apply to a list of elements
    pub fn apply(&self, bodies: &mut [OrbitalElements]) -> Result<(), ConstructionError> {
        for el in bodies.iter_mut() {
            el.e *= self.eccentricity_scale;
            el.inc *= self.eccentricity_scale;
        }
        if let Some(off) = self.semi_major_offset {
            let count = bodies.len();
            let el = bodies
                .get_mut(off.body)
                .ok_or(ConstructionError::PerturbationOutOfRange { body: off.body, count })?;
            el.a += off.delta;
        }
        Ok(())
    }
}

/// Build a fresh simulation from `spec` using the run's G, dt and integrator.
pub fn construct_fresh(spec: &ConstructionSpec, run: &RunConfig) -> Result<Simulation, ConstructionError> {
    let (bodies, perturbation) = match spec {
        ConstructionSpec::Elements { central_mass, bodies, perturbation } => {
            (from_elements(run.G, *central_mass, bodies)?, *perturbation)
        }
        ConstructionSpec::Ephemeris { bodies } => (from_ephemeris(bodies)?, None),
    };

    let mut system = System { bodies, t: 0.0 };
    // the archive path assumes this frame as well
    if !system.move_to_com() {
        return Err(ConstructionError::ZeroTotalMass);
    }
    info!(particles = system.bodies.len(), "constructed fresh system in centre-of-mass frame");

    Ok(Simulation::fresh(system, run).with_perturbation(perturbation))
}

fn from_elements(
    G: f64,
    central_mass: f64,
    bodies: &[OrbitalElements],
) -> Result<Vec<Particle>, ConstructionError> {
    if !central_mass.is_finite() || central_mass <= 0.0 {
        return Err(ConstructionError::NonPositiveCentralMass { mass: central_mass });
    }
    let central = Particle::at_rest(central_mass);

    let mut out = Vec::with_capacity(bodies.len() + 1);
    out.push(central);
    for (i, el) in bodies.iter().enumerate() {
        // index 0 is the central body
        el.validate(i + 1)?;
        let p = orbit_to_particle(G, &central, el);
        debug!(index = i + 1, m = p.m, r = p.x.norm(), "added body from orbital elements");
        out.push(p);
    }
    Ok(out)
}

fn from_ephemeris(bodies: &[Particle]) -> Result<Vec<Particle>, ConstructionError> {
    if bodies.is_empty() {
        return Err(ConstructionError::NoParticles);
    }
    for (index, b) in bodies.iter().enumerate() {
        if !b.m.is_finite() {
            return Err(ConstructionError::NonFinite { index, field: "m" });
        }
        if b.m < 0.0 {
            return Err(ConstructionError::NegativeMass { index, mass: b.m });
        }
        if !b.x.iter().all(|c| c.is_finite()) {
            return Err(ConstructionError::NonFinite { index, field: "x" });
        }
        if !b.v.iter().all(|c| c.is_finite()) {
            return Err(ConstructionError::NonFinite { index, field: "v" });
        }
    }
    Ok(bodies.to_vec())
}

// =========================================================================================
// Solar-system catalogue
// =========================================================================================

/// Planar osculating elements of Mercury..Pluto around a unit-mass Sun
/// (mass ratio, a [AU], e, argument of pericenter [deg], true anomaly [deg])
const SOLAR_SYSTEM: [(f64, f64, f64, f64, f64); 9] = [
    (1.0 / 6023600.0, 3.870982252717257E-01, 2.056302512089075E-01, 2.912428058698772E+01, 1.751155303115542E+02),
    (1.0 / 408523.72, 7.233268496749391E-01, 6.755697267164094E-03, 5.518541455452200E+01, 4.990452231866427E+01),
    (3.003297890315729e-06, 1.000371833989169E+00, 1.704239716781501E-02, 2.977668064579176E+02, 3.581260865454548E+02),
    (1.0 / 3098708.0, 1.523678184302188E+00, 9.331460653723893E-02, 2.865373577554387E+02, 2.302024685336155E+01),
    (0.0009545325625181037, 5.205108604506466E+00, 4.892306471604416E-02, 2.751196839758603E+02, 2.063463646284857E+01),
    (0.00028579654259598984, 9.581451990386764E+00, 5.559928883801366E-02, 3.359006493683225E+02, 3.160917714975463E+02),
    (4.365520702584404e-05, 1.922994520785785E+01, 4.439340361752947E-02, 9.661124460893427E+01, 1.458440916327605E+02),
    (5.149999195391201e-05, 3.009697072395906E+01, 1.114818186443456E-02, 2.668275286227091E+02, 2.653252378278363E+02),
    (6.572648128479933e-09, 3.950092123894740E+01, 2.478618527514649E-01, 1.151532923291780E+02, 2.385746094416748E+01),
];

/// Offset of 3.8 cm * k on Mercury's semi-major axis
pub fn mercury_offset(k: f64) -> SemiMajorOffset {
    SemiMajorOffset {
        body: 0,
        delta: 3.8 * k * CM_TO_AU,
    }
}

/// Sun plus nine bodies with `perturbation` applied, angles in radians
pub fn solar_system(perturbation: &Perturbation) -> Result<ConstructionSpec, ConstructionError> {
    let deg = PI / 180.0;
    let mut bodies: Vec<OrbitalElements> = SOLAR_SYSTEM
        .iter()
        .map(|&(q, a, e, peri, f)| OrbitalElements::planar(q, a, e, peri * deg, f * deg))
        .collect();
    perturbation.apply(&mut bodies)?;

    Ok(ConstructionSpec::Elements {
        central_mass: 1.0,
        bodies,
        perturbation: Some(*perturbation),
    })
}
