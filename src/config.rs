//! Run configuration, loadable from a JSON file. Every field is optional.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Boid, Bounds, ConfigError, Parameters, ScoutAssignment, UpdateMode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub population: usize,
    pub width: f32,
    pub height: f32,
    pub steps: usize,
    /// Seeds the initial scatter. `None` draws from the thread RNG.
    pub seed: Option<u64>,
    pub update_mode: UpdateMode,
    pub scouts: ScoutAssignment,
    pub parameters: Parameters,
    /// Fixed starting flock. When set it replaces the random scatter and `population`.
    pub boids: Option<Vec<Boid>>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let bounds = Bounds::default();
        SimulationConfig {
            population: 50,
            width: bounds.width,
            height: bounds.height,
            steps: 100,
            seed: None,
            update_mode: UpdateMode::default(),
            scouts: ScoutAssignment::default(),
            parameters: Parameters::default(),
            boids: None,
        }
    }
}

impl SimulationConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.width, self.height)
    }

    pub fn population(&self) -> usize {
        match &self.boids {
            Some(boids) => boids.len(),
            None => self.population,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let population = self.population();
        if population == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.scouts.total() > population {
            return Err(ConfigError::TooManyScouts {
                scouts: self.scouts.total(),
                population,
            });
        }
        self.parameters.validate()?;
        self.bounds().validate(self.parameters.margin)
    }
}
