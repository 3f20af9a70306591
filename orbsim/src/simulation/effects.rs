//! Auxiliary physics effects
//!
//! An [`EffectSet`] is a small list of named effects, each with typed
//! scalar parameters. It is persisted once per run in the effects archive
//! and turned into extra [`AccelSet`] terms with [`EffectSet::build_forces`].

use serde::{Deserialize, Serialize};

use crate::error::EffectError;
use crate::simulation::forces::{AccelSet, GrPotential, NewtonianGravity};

/// Name of the post-Newtonian potential effect
pub const GR_POTENTIAL: &str = "gr_potential";

/// Speed of light in AU per (yr / 2pi), the G = 1 unit system
pub const C_AU_YR2PI: f64 = 10065.32;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamValue {
    Double(f64),
    Int(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: ParamValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
}

impl Effect {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.params.push(Param { name: name.into(), value });
        self
    }

    pub fn param(&self, name: &str) -> Option<ParamValue> {
        self.params.iter().find(|p| p.name == name).map(|p| p.value)
    }

    fn double(&self, name: &str) -> Result<f64, EffectError> {
        match self.param(name) {
            Some(ParamValue::Double(v)) => Ok(v),
            Some(ParamValue::Int(_)) => Err(EffectError::WrongParamType {
                effect: self.name.clone(),
                param: name.to_string(),
            }),
            None => Err(EffectError::MissingParam {
                effect: self.name.clone(),
                param: name.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectSet {
    pub effects: Vec<Effect>,
}

impl EffectSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Effect> {
        self.effects.iter().find(|e| e.name == name)
    }

    /// Newtonian gravity plus one term per effect
    pub fn build_forces(&self, G: f64) -> Result<AccelSet, EffectError> {
        let mut forces = AccelSet::new().with(NewtonianGravity { G });
        for effect in &self.effects {
            match effect.name.as_str() {
                GR_POTENTIAL => {
                    let c = effect.double("c")?;
                    if !c.is_finite() || c <= 0.0 {
                        return Err(EffectError::NonPositiveParam {
                            effect: effect.name.clone(),
                            param: "c".to_string(),
                            value: c,
                        });
                    }
                    forces.push(Box::new(GrPotential { G, c }));
                }
                other => {
                    return Err(EffectError::UnknownEffect { name: other.to_string() });
                }
            }
        }
        Ok(forces)
    }
}

/// One `gr_potential` effect with `c` at its physical value
pub fn gr_potential_defaults() -> EffectSet {
    EffectSet::new().with(Effect::new(GR_POTENTIAL).with_param("c", ParamValue::Double(C_AU_YR2PI)))
}
