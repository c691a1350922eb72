pub mod boid;
pub mod config;
pub mod error;
pub mod flock;
pub mod render;
pub mod simulation;

use serde::{Deserialize, Serialize};

pub use boid::{Boid, Neighbourhood, ScoutGroup};
pub use config::SimulationConfig;
pub use error::{ConfigError, RenderError};
pub use flock::{Flock, NoScouts, ScoutAssignment, ScoutClassifier, Snapshot, UpdateMode};
pub use simulation::Simulation;

/// Tunable flocking rules shared by every boid in a flock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub visual_range: f32,
    /// Already squared; compared directly against squared distances.
    pub protected_range_squared: f32,
    pub centering_factor: f32,
    pub matching_factor: f32,
    pub avoid_factor: f32,
    pub turn_factor: f32,
    /// Distance from each edge at which turning kicks in.
    pub margin: f32,
    pub max_bias: f32,
    pub bias_increment: f32,
    pub min_speed: f32,
    pub max_speed: f32,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            visual_range: 20.0,
            protected_range_squared: 15.0,
            centering_factor: 0.05,
            matching_factor: 0.1,
            avoid_factor: 0.2,
            turn_factor: 1.0,
            margin: 0.0,
            max_bias: 0.1,
            bias_increment: 0.01,
            min_speed: 0.1,
            max_speed: 1.0,
        }
    }
}

impl Parameters {
    pub fn visual_range_squared(&self) -> f32 {
        self.visual_range * self.visual_range
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("visual_range", self.visual_range),
            ("protected_range_squared", self.protected_range_squared),
            ("centering_factor", self.centering_factor),
            ("matching_factor", self.matching_factor),
            ("avoid_factor", self.avoid_factor),
            ("turn_factor", self.turn_factor),
            ("margin", self.margin),
            ("bias_increment", self.bias_increment),
            ("min_speed", self.min_speed),
            ("max_speed", self.max_speed),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidParameter { name, value });
            }
        }
        if self.min_speed > self.max_speed {
            return Err(ConfigError::SpeedRange {
                min_speed: self.min_speed,
                max_speed: self.max_speed,
            });
        }
        if !(0.0..=1.0).contains(&self.max_bias) {
            return Err(ConfigError::MaxBias(self.max_bias));
        }
        // Scout bias floors at bias_increment and must still be able to reach max_bias
        if self.bias_increment > self.max_bias || (self.bias_increment == 0.0 && self.max_bias > 0.0) {
            return Err(ConfigError::BiasIncrement {
                bias_increment: self.bias_increment,
                max_bias: self.max_bias,
            });
        }
        Ok(())
    }
}

/// The simulated plane, spanning `[0, width] x [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds {
            width: 100.0,
            height: 100.0,
        }
    }
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Bounds { width, height }
    }

    /// Checks the plane itself and that `margin` leaves some interior to fly in.
    pub fn validate(&self, margin: f32) -> Result<(), ConfigError> {
        let valid = |side: f32| side.is_finite() && side > 0.0;
        if !valid(self.width) || !valid(self.height) {
            return Err(ConfigError::InvalidBounds {
                width: self.width,
                height: self.height,
            });
        }
        if margin * 2.0 >= self.width.min(self.height) {
            return Err(ConfigError::MarginTooWide {
                margin,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}
