use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::boid::{Boid, Neighbourhood, ScoutGroup};
use crate::{Bounds, ConfigError, Parameters};

/// Decides which scout group a boid belongs to from its index in the flock.
pub trait ScoutClassifier {
    fn classify(&self, index: usize) -> ScoutGroup;
}

impl<F> ScoutClassifier for F
where
    F: Fn(usize) -> ScoutGroup,
{
    fn classify(&self, index: usize) -> ScoutGroup {
        self(index)
    }
}

/// Every boid is an ordinary flock member.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScouts;

impl ScoutClassifier for NoScouts {
    fn classify(&self, _index: usize) -> ScoutGroup {
        ScoutGroup::None
    }
}

/// The first `group1` boids scout towards +x, the following `group2` towards -x.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutAssignment {
    pub group1: usize,
    pub group2: usize,
}

impl ScoutAssignment {
    pub fn total(&self) -> usize {
        self.group1 + self.group2
    }
}

impl ScoutClassifier for ScoutAssignment {
    fn classify(&self, index: usize) -> ScoutGroup {
        if index < self.group1 {
            ScoutGroup::Group1
        } else if index < self.total() {
            ScoutGroup::Group2
        } else {
            ScoutGroup::None
        }
    }
}

/// How a step orders reads against writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Every boid reacts to the flock as it was before the step. Runs in parallel.
    #[default]
    Synchronous,
    /// One in-place pass: boid `i` already sees the moved boids `0..i`.
    Sequential,
}

/// Read-only copy of the flock handed to renderers after a step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub step: u64,
    pub positions: Vec<(f32, f32)>,
    pub groups: Vec<ScoutGroup>,
}

fn check_setup(population: usize, bounds: &Bounds, params: &Parameters) -> Result<(), ConfigError> {
    if population == 0 {
        return Err(ConfigError::EmptyPopulation);
    }
    params.validate()?;
    bounds.validate(params.margin)
}

#[derive(Debug, Clone)]
pub struct Flock {
    boids: Vec<Boid>,
    scout_groups: Vec<ScoutGroup>,
    bounds: Bounds,
    params: Parameters,
    mode: UpdateMode,
    step_count: u64,
}

impl Flock {
    /// Scatters `population` boids uniformly over the plane with velocities in `[-1, 1)`.
    pub fn random<R: Rng>(
        population: usize,
        bounds: Bounds,
        params: Parameters,
        classifier: &impl ScoutClassifier,
        mode: UpdateMode,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        // Must run before sampling: empty or NaN ranges panic
        check_setup(population, &bounds, &params)?;
        let boids = (0..population)
            .map(|_| {
                Boid::new(
                    rng.random_range(0.0..bounds.width),
                    rng.random_range(0.0..bounds.height),
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                )
            })
            .collect();
        Self::from_boids(boids, bounds, params, classifier, mode)
    }

    pub fn from_boids(
        boids: Vec<Boid>,
        bounds: Bounds,
        params: Parameters,
        classifier: &impl ScoutClassifier,
        mode: UpdateMode,
    ) -> Result<Self, ConfigError> {
        check_setup(boids.len(), &bounds, &params)?;

        let scout_groups: Vec<ScoutGroup> =
            (0..boids.len()).map(|index| classifier.classify(index)).collect();
        debug!(
            population = boids.len(),
            scouts = scout_groups.iter().filter(|g| **g != ScoutGroup::None).count(),
            ?mode,
            "flock created"
        );

        Ok(Flock {
            boids,
            scout_groups,
            bounds,
            params,
            mode,
            step_count: 0,
        })
    }

    pub fn step(&mut self) {
        match self.mode {
            UpdateMode::Synchronous => self.step_synchronous(),
            UpdateMode::Sequential => self.step_sequential(),
        }
        self.step_count += 1;
        trace!(step = self.step_count, "flock stepped");
    }

    fn step_synchronous(&mut self) {
        let boids = &self.boids;
        let scout_groups = &self.scout_groups;
        let params = &self.params;
        let bounds = &self.bounds;

        // Gather every update against the frozen flock, then swap it in
        let next: Vec<Boid> = boids
            .par_iter()
            .enumerate()
            .map(|(index, boid)| {
                let neighbourhood = Neighbourhood::survey(boid, boids, params);
                let mut next = *boid;
                next.update_velocity(&neighbourhood, params, bounds, scout_groups[index]);
                next.integrate_position();
                next
            })
            .collect();

        self.boids = next;
    }

    fn step_sequential(&mut self) {
        for index in 0..self.boids.len() {
            let neighbourhood = Neighbourhood::survey(&self.boids[index], &self.boids, &self.params);
            let boid = &mut self.boids[index];
            boid.update_velocity(
                &neighbourhood,
                &self.params,
                &self.bounds,
                self.scout_groups[index],
            );
            boid.integrate_position();
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            step: self.step_count,
            positions: self
                .boids
                .iter()
                .map(|boid| (boid.position.x, boid.position.y))
                .collect(),
            groups: self.scout_groups.clone(),
        }
    }

    pub fn boids(&self) -> &[Boid] {
        &self.boids
    }

    pub fn scout_groups(&self) -> &[ScoutGroup] {
        &self.scout_groups
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn update_mode(&self) -> UpdateMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.boids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boids.is_empty()
    }
}
