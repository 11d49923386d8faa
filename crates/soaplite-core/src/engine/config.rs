use crate::core::supercell::CUTOFF_MARGIN;
use thiserror::Error;

pub const DEFAULT_CUTOFF: f64 = 5.0;
pub const DEFAULT_N_MAX: usize = 5;
pub const DEFAULT_L_MAX: usize = 5;

pub const MAX_L: usize = 9;
pub const MIN_N_MAX: usize = 2;
pub const MAX_N_MAX: usize = 13;
pub const MIN_HARD_CUTOFF: f64 = 2.0;
pub const MAX_HARD_CUTOFF: f64 = 20.0;

/// Slack on the hard cutoff bounds so that the endpoints themselves are accepted.
const HARD_CUTOFF_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("l_max = {0} is out of range; the angular degree must be between 0 and 9")]
    AngularDegree(usize),
    #[error("n_max = {0} is out of range; the radial basis size must be between 2 and 13")]
    BasisSize(usize),
    #[error("Hard cutoff {hard_cutoff} (cutoff {cutoff} + 5) must lie between 2 and 20")]
    HardCutoff { cutoff: f64, hard_cutoff: f64 },
}

/// Parameters of a SOAP descriptor computation.
///
/// `species` fixes the species list (and therefore the column layout) across structures;
/// `None` uses whatever species each structure contains.
#[derive(Debug, Clone, PartialEq)]
pub struct SoapConfig {
    pub cutoff: f64,
    pub n_max: usize,
    pub l_max: usize,
    pub cross_species: bool,
    pub species: Option<Vec<u32>>,
}

impl Default for SoapConfig {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CUTOFF,
            n_max: DEFAULT_N_MAX,
            l_max: DEFAULT_L_MAX,
            cross_species: true,
            species: None,
        }
    }
}

impl SoapConfig {
    /// Cutoff radius plus the fixed safety margin.
    pub fn hard_cutoff(&self) -> f64 {
        self.cutoff + CUTOFF_MARGIN
    }

    /// Checks the numeric ranges supported by the native modules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.l_max > MAX_L {
            return Err(ConfigError::AngularDegree(self.l_max));
        }
        if !(MIN_N_MAX..=MAX_N_MAX).contains(&self.n_max) {
            return Err(ConfigError::BasisSize(self.n_max));
        }
        let hard_cutoff = self.hard_cutoff();
        let in_range = hard_cutoff > MIN_HARD_CUTOFF - HARD_CUTOFF_TOLERANCE
            && hard_cutoff < MAX_HARD_CUTOFF + HARD_CUTOFF_TOLERANCE;
        if !in_range {
            return Err(ConfigError::HardCutoff {
                cutoff: self.cutoff,
                hard_cutoff,
            });
        }
        Ok(())
    }

    pub fn species(&self) -> Option<&[u32]> {
        self.species.as_deref()
    }
}

#[derive(Default)]
pub struct SoapConfigBuilder {
    cutoff: Option<f64>,
    n_max: Option<usize>,
    l_max: Option<usize>,
    cross_species: Option<bool>,
    species: Option<Vec<u32>>,
}

impl SoapConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }
    pub fn n_max(mut self, n_max: usize) -> Self {
        self.n_max = Some(n_max);
        self
    }
    pub fn l_max(mut self, l_max: usize) -> Self {
        self.l_max = Some(l_max);
        self
    }
    pub fn cross_species(mut self, enabled: bool) -> Self {
        self.cross_species = Some(enabled);
        self
    }
    pub fn species(mut self, species: Vec<u32>) -> Self {
        self.species = Some(species);
        self
    }

    /// Builds the configuration, filling unset fields with the defaults and validating ranges.
    pub fn build(self) -> Result<SoapConfig, ConfigError> {
        let defaults = SoapConfig::default();
        let config = SoapConfig {
            cutoff: self.cutoff.unwrap_or(defaults.cutoff),
            n_max: self.n_max.unwrap_or(defaults.n_max),
            l_max: self.l_max.unwrap_or(defaults.l_max),
            cross_species: self.cross_species.unwrap_or(defaults.cross_species),
            species: self.species.filter(|s| !s.is_empty()),
        };
        config.validate()?;
        Ok(config)
    }
}
