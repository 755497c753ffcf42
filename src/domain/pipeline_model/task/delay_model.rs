use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::api::simulation_dto::system_dto::DelayModelDto;
use crate::domain::simulator::simulator::Tick;
use crate::error::{ConversionError, Error, Result};

pub const DEFAULT_DELAY_SEED: u64 = 20;

/// How often and how hard delays hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DelayDegree {
    #[default]
    Low,
    Mid,
    High,
}

impl DelayDegree {
    /// Multiplier applied to the configured probability.
    fn probability_factor(&self) -> f64 {
        match self {
            DelayDegree::Low => 2.0,
            DelayDegree::Mid => 3.0,
            DelayDegree::High => 4.0,
        }
    }

    /// Standard deviation of the perturbation, relative to the nominal runtime.
    fn spread(&self) -> f64 {
        match self {
            DelayDegree::Low => 0.05,
            DelayDegree::Mid => 0.25,
            DelayDegree::High => 0.5,
        }
    }
}

impl FromStr for DelayDegree {
    type Err = ConversionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(DelayDegree::Low),
            "mid" | "medium" => Ok(DelayDegree::Mid),
            "high" => Ok(DelayDegree::High),
            _ => Err(ConversionError::UnknownDelayDegree(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayDistribution {
    Normal,
    /// Used for distribution names we do not support: every triggered delay is one tick.
    Fixed,
}

impl DelayDistribution {
    /// Maps a configured distribution name, falling back to [`DelayDistribution::Fixed`].
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "normal" => DelayDistribution::Normal,
            other => {
                log::warn!("Delay distribution '{}' is not supported, falling back to a fixed one-tick delay.", other);
                DelayDistribution::Fixed
            }
        }
    }
}

/// Stochastic perturbation of task runtimes.
///
/// Every call to [`DelayModel::generate_delay`] reseeds a fresh generator from
/// `seed`, so a model always gives the same answer for the same runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayModel {
    probability: f64,
    distribution: DelayDistribution,
    degree: DelayDegree,
    seed: u64,
}

impl DelayModel {
    pub fn new(probability: f64, distribution: DelayDistribution, degree: DelayDegree, seed: u64) -> Result<Self> {
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(Error::InvalidDelayModel(format!("probability {} is outside [0, 1]", probability)));
        }
        Ok(DelayModel { probability, distribution, degree, seed })
    }

    pub fn with_distribution_name(probability: f64, distribution: &str, degree: DelayDegree, seed: u64) -> Result<Self> {
        Self::new(probability, DelayDistribution::from_name(distribution), degree, seed)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn degree(&self) -> DelayDegree {
        self.degree
    }

    pub fn distribution(&self) -> DelayDistribution {
        self.distribution
    }

    /// Copy of this model for one workflow node, so nodes draw independently.
    pub fn for_node(&self, node: usize) -> DelayModel {
        DelayModel { seed: self.seed.wrapping_add(node as u64), ..self.clone() }
    }

    fn effective_probability(&self) -> f64 {
        (self.probability * self.degree.probability_factor()).clamp(0.0, 1.0)
    }

    /// Returns the runtime to simulate for a task with the given nominal runtime.
    ///
    /// A triggered delay always adds at least one tick.
    pub fn generate_delay(&self, nominal_runtime: Tick) -> Tick {
        let probability = self.effective_probability();
        if probability <= 0.0 {
            return nominal_runtime;
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let roll: f64 = rng.random();
        if roll >= probability {
            return nominal_runtime;
        }

        let delay = match self.distribution {
            DelayDistribution::Normal => {
                let sigma = nominal_runtime as f64 * self.degree.spread();
                match Normal::new(0.0, sigma) {
                    Ok(normal) => normal.sample(&mut rng).abs().round() as Tick,
                    Err(e) => {
                        log::warn!("Cannot sample a normal delay with sigma {}: {}. Using one tick.", sigma, e);
                        1
                    }
                }
            }
            DelayDistribution::Fixed => 1,
        };

        nominal_runtime + delay.max(1)
    }
}

impl TryFrom<DelayModelDto> for DelayModel {
    type Error = Error;

    fn try_from(dto: DelayModelDto) -> Result<DelayModel> {
        let degree = match &dto.degree {
            Some(degree) => DelayDegree::from_str(degree)?,
            None => DelayDegree::default(),
        };
        DelayModel::with_distribution_name(dto.probability, &dto.distribution, degree, dto.seed.unwrap_or(DEFAULT_DELAY_SEED))
    }
}
