//! Force / acceleration contributors for the n-body engine
//!
//! Direct Newtonian gravity plus the post-Newtonian potential correction
//! enabled through the effect archive

use crate::simulation::states::{NVec3, System};

/// Collection of acceleration terms (gravity, effects)
/// Each term implements [`Acceleration`] and their contributions are summed
/// into a single acceleration vector per body
pub struct AccelSet {
    terms: Vec<Box<dyn Acceleration + Send + Sync>>,
}

impl Default for AccelSet {
    fn default() -> Self {
        Self::new()
    }
}

impl AccelSet {
    /// Create an empty acceleration set
    pub fn new() -> Self {
        Self {
            terms: Vec::new(),
        }
    }

    /// Add an acceleration term
    pub fn with(mut self, term: impl Acceleration + Send + Sync + 'static) -> Self {
        self.terms.push(Box::new(term));
        self
    }

    /// Add a boxed term
    pub fn push(&mut self, term: Box<dyn Acceleration + Send + Sync>) {
        self.terms.push(term);
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Compute total accelerations at time `t` for all bodies in `sys`
    /// - `out[i]` will be set to the sum of contributions from all terms
    pub fn accumulate_accels(&self, t: f64, sys: &System, out: &mut [NVec3]) {
        // Zero buffer
        for a in out.iter_mut() {
            *a = NVec3::zeros();
        }
        // Iterate over all acceleration contributors
        for term in &self.terms {
            term.acceleration(t, sys, out);
        }
    }
}

/// Acceleration source operating on [`System`]
/// Implementations add their contribution into `out[i]` for each body
pub trait Acceleration {
    fn acceleration(&self, t: f64, sys: &System, out: &mut [NVec3]);
}

/// Newtonian gravity, direct n^2 pair sum, no softening
pub struct NewtonianGravity {
    pub G: f64, // gravitational constant
}

impl Acceleration for NewtonianGravity {
    fn acceleration(&self, _t: f64, sys: &System, out: &mut [NVec3]) {
        let n = sys.bodies.len();
        if n == 0 { // No bodies, return
            return;
        }

        // Loop over each unordered pair (i, j) with i < j
        for i in 0..n {
            let xi = sys.bodies[i].x;
            let mi = sys.bodies[i].m;

            for j in (i + 1)..n {
                let xj = sys.bodies[j].x;
                let mj = sys.bodies[j].m;

                // r points from i to j: i is pulled along +r, j along -r
                let r = xj - xi;
                let r2 = r.dot(&r);

                // G / |r|^3
                let inv_r = r2.sqrt().recip();
                let coef = self.G * inv_r * inv_r * inv_r;

                // equal and opposite
                out[i] += coef * mj * r;
                out[j] -= coef * mi * r;
            }
        }
    }
}

/// Post-Newtonian correction from the potential
/// `phi = -3 (G M)^2 / (c^2 r^2)` of the central body (index 0)
///
/// Each orbiting body i feels `a_i = -6 (G M)^2 / (c^2 r^4) * r`, where `r`
/// points from the central body to i; the central body receives the
/// momentum-conserving back-reaction `-(m_i / M) a_i`
pub struct GrPotential {
    pub G: f64, // gravitational constant
    pub c: f64, // speed of light in simulation units
}

impl Acceleration for GrPotential {
    fn acceleration(&self, _t: f64, sys: &System, out: &mut [NVec3]) {
        let Some(source) = sys.bodies.first() else {
            return;
        };
        if source.m <= 0.0 {
            return;
        }
        let mu = self.G * source.m;
        let prefac = 6.0 * mu * mu / (self.c * self.c);

        let mut back = NVec3::zeros();
        for (i, b) in sys.bodies.iter().enumerate().skip(1) {
            let r = b.x - source.x;
            let r2 = r.dot(&r);
            let a = -prefac / (r2 * r2) * r;
            out[i] += a;
            back -= (b.m / source.m) * a;
        }
        out[0] += back;
    }
}
