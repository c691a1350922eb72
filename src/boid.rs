use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Bounds, Parameters};

/// Which scout subgroup a boid belongs to, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoutGroup {
    #[default]
    None,
    /// Drawn towards +x.
    Group1,
    /// Drawn towards -x.
    Group2,
}

impl ScoutGroup {
    /// The x heading this group is biased towards.
    pub fn home_direction(self) -> Option<f32> {
        match self {
            ScoutGroup::None => None,
            ScoutGroup::Group1 => Some(1.0),
            ScoutGroup::Group2 => Some(-1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boid {
    pub position: Vector2<f32>,
    pub velocity: Vector2<f32>,
    #[serde(default)]
    pub bias: f32,
}

/// What a boid sees of the others during one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbourhood {
    /// Mean position of visible neighbours, or the boid's own position when there are none.
    pub avg_position: Vector2<f32>,
    /// Mean velocity of visible neighbours, or the boid's own velocity when there are none.
    pub avg_velocity: Vector2<f32>,
    /// Summed offsets away from every boid inside the protected range.
    pub close: Vector2<f32>,
    pub neighbours: usize,
}

impl Neighbourhood {
    /// Scans every boid in `flock`, `boid` itself included. The self term lands in the
    /// protected range with a zero offset so it never changes `close`.
    pub fn survey(boid: &Boid, flock: &[Boid], params: &Parameters) -> Self {
        let visual_range_squared = params.visual_range_squared();

        let mut position_sum = Vector2::zeros();
        let mut velocity_sum = Vector2::zeros();
        let mut close = Vector2::zeros();
        let mut neighbours: usize = 0;

        for other in flock {
            let offset = boid.position - other.position;
            // Box gate first, then the real distance
            if offset.x.abs() < params.visual_range && offset.y.abs() < params.visual_range {
                let squared_distance = offset.norm_squared();
                if squared_distance < params.protected_range_squared {
                    close += offset;
                } else if squared_distance < visual_range_squared {
                    position_sum += other.position;
                    velocity_sum += other.velocity;
                    neighbours += 1;
                }
            }
        }

        if neighbours > 0 {
            let count = neighbours as f32;
            Neighbourhood {
                avg_position: position_sum / count,
                avg_velocity: velocity_sum / count,
                close,
                neighbours,
            }
        } else {
            Neighbourhood {
                avg_position: boid.position,
                avg_velocity: boid.velocity,
                close,
                neighbours,
            }
        }
    }
}

impl Boid {
    pub fn new(x: f32, y: f32, vx: f32, vy: f32) -> Self {
        Boid {
            position: Vector2::new(x, y),
            velocity: Vector2::new(vx, vy),
            bias: 0.0,
        }
    }

    pub fn with_bias(mut self, bias: f32) -> Self {
        self.bias = bias;
        self
    }

    pub fn speed(&self) -> f32 {
        self.velocity.norm()
    }

    pub fn integrate_position(&mut self) {
        self.position += self.velocity;
    }

    /// Applies cohesion, alignment, separation, edge turning, scout bias and
    /// speed limits, in that order. Each stage sees the velocity left by the
    /// previous one.
    pub fn update_velocity(
        &mut self,
        neighbourhood: &Neighbourhood,
        params: &Parameters,
        bounds: &Bounds,
        group: ScoutGroup,
    ) {
        self.velocity += (neighbourhood.avg_position - self.position) * params.centering_factor
            + (neighbourhood.avg_velocity - self.velocity) * params.matching_factor;

        self.velocity += neighbourhood.close * params.avoid_factor;

        self.turn_from_edges(bounds, params.margin, params.turn_factor);

        if let Some(home) = group.home_direction() {
            self.adjust_bias(home, params.max_bias, params.bias_increment);
            self.velocity.x = (1.0 - self.bias) * self.velocity.x + self.bias * home;
        }

        self.enforce_speed_limits(params.min_speed, params.max_speed);
    }

    pub fn outside_top_margin(&self, bounds: &Bounds, margin: f32) -> bool {
        self.position.y >= bounds.height - margin
    }

    pub fn outside_right_margin(&self, bounds: &Bounds, margin: f32) -> bool {
        self.position.x >= bounds.width - margin
    }

    pub fn outside_left_margin(&self, margin: f32) -> bool {
        self.position.x <= margin
    }

    pub fn outside_bottom_margin(&self, margin: f32) -> bool {
        self.position.y <= margin
    }

    // Corners get both nudges.
    fn turn_from_edges(&mut self, bounds: &Bounds, margin: f32, turn_factor: f32) {
        if self.outside_top_margin(bounds, margin) {
            self.velocity.y -= turn_factor;
        }
        if self.outside_right_margin(bounds, margin) {
            self.velocity.x -= turn_factor;
        }
        if self.outside_left_margin(margin) {
            self.velocity.x += turn_factor;
        }
        if self.outside_bottom_margin(margin) {
            self.velocity.y += turn_factor;
        }
    }

    fn adjust_bias(&mut self, home: f32, max_bias: f32, bias_increment: f32) {
        if self.velocity.x * home > 0.0 {
            self.bias = max_bias.min(self.bias + bias_increment);
        } else {
            self.bias = bias_increment.max(self.bias - bias_increment);
        }
    }

    fn enforce_speed_limits(&mut self, min_speed: f32, max_speed: f32) {
        let speed = self.speed();
        if speed == 0.0 {
            // No heading to rescale along, so the boid stays put this step
            debug!(x = self.position.x, y = self.position.y, "zero speed, leaving velocity unscaled");
            return;
        }
        if speed < min_speed {
            self.velocity = self.velocity / speed * min_speed;
        } else if speed > max_speed {
            self.velocity = self.velocity / speed * max_speed;
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn still(boid: &Boid) -> Neighbourhood {
        Neighbourhood {
            avg_position: boid.position,
            avg_velocity: boid.velocity,
            close: Vector2::zeros(),
            neighbours: 0,
        }
    }

    #[test]
    fn integrate_adds_velocity() {
        let mut boid = Boid::new(1.0, 2.0, 0.5, -0.25);
        boid.integrate_position();
        assert_eq!(boid.position, Vector2::new(1.5, 1.75));
    }

    #[test]
    fn isolated_boid_keeps_velocity() {
        let boid = Boid::new(50.0, 50.0, 0.3, 0.4);
        let flock = [boid];
        let seen = Neighbourhood::survey(&boid, &flock, &Parameters::default());
        assert_eq!(seen.neighbours, 0);
        assert_eq!(seen.avg_position, boid.position);
        assert_eq!(seen.avg_velocity, boid.velocity);
        assert_eq!(seen.close, Vector2::zeros());

        let mut moved = boid;
        moved.update_velocity(&seen, &Parameters::default(), &Bounds::default(), ScoutGroup::None);
        assert_eq!(moved.velocity, boid.velocity);
    }

    #[test]
    fn protected_range_takes_precedence() {
        let boid = Boid::new(10.0, 10.0, 0.0, 0.0);
        let near = Boid::new(12.0, 11.0, 1.0, 0.0);
        let flock = [boid, near];
        let seen = Neighbourhood::survey(&boid, &flock, &Parameters::default());
        assert_eq!(seen.neighbours, 0);
        assert_eq!(seen.close, Vector2::new(-2.0, -1.0));
    }

    #[test]
    fn box_gate_excludes_diagonal_outside_range() {
        let params = Parameters::default();
        let boid = Boid::new(50.0, 50.0, 0.0, 0.0);
        // inside the box but beyond the circular visual range
        let corner = Boid::new(65.0, 65.0, 0.0, 0.0);
        // outside the box along one axis
        let far = Boid::new(70.0, 50.0, 0.0, 0.0);
        let flock = [boid, corner, far];
        let seen = Neighbourhood::survey(&boid, &flock, &params);
        assert_eq!(seen.neighbours, 0);
    }

    #[test]
    fn neighbours_are_averaged() {
        let boid = Boid::new(50.0, 50.0, 0.0, 0.0);
        let a = Boid::new(55.0, 50.0, 1.0, 0.0);
        let b = Boid::new(45.0, 60.0, 0.0, 1.0);
        let flock = [boid, a, b];
        let seen = Neighbourhood::survey(&boid, &flock, &Parameters::default());
        assert_eq!(seen.neighbours, 2);
        assert_relative_eq!(seen.avg_position, Vector2::new(50.0, 55.0));
        assert_relative_eq!(seen.avg_velocity, Vector2::new(0.5, 0.5));
    }

    #[test]
    fn left_edge_pushes_right_by_turn_factor() {
        let params = Parameters::default();
        let mut boid = Boid::new(0.0, 50.0, 0.0, 0.0);
        let seen = still(&boid);
        boid.update_velocity(&seen, &params, &Bounds::default(), ScoutGroup::None);
        assert_relative_eq!(boid.velocity.x, params.turn_factor);
        assert_eq!(boid.velocity.y, 0.0);
    }

    fn turned(x: f32, y: f32, vx: f32, vy: f32) -> Vector2<f32> {
        let params = Parameters {
            margin: 10.0,
            max_speed: 5.0,
            ..Parameters::default()
        };
        let mut boid = Boid::new(x, y, vx, vy);
        let seen = still(&boid);
        boid.update_velocity(&seen, &params, &Bounds::default(), ScoutGroup::None);
        boid.velocity
    }

    #[test]
    fn wide_margin_turns_only_past_the_margin() {
        // left
        assert_eq!(turned(9.9, 50.0, 0.0, 0.5), Vector2::new(1.0, 0.5));
        assert_eq!(turned(10.1, 50.0, 0.0, 0.5), Vector2::new(0.0, 0.5));
        // right
        assert_eq!(turned(90.1, 50.0, 0.0, 0.5), Vector2::new(-1.0, 0.5));
        assert_eq!(turned(89.9, 50.0, 0.0, 0.5), Vector2::new(0.0, 0.5));
        // top
        assert_eq!(turned(50.0, 90.1, 0.5, 0.0), Vector2::new(0.5, -1.0));
        assert_eq!(turned(50.0, 89.9, 0.5, 0.0), Vector2::new(0.5, 0.0));
        // bottom
        assert_eq!(turned(50.0, 9.9, 0.5, 0.0), Vector2::new(0.5, 1.0));
        assert_eq!(turned(50.0, 10.1, 0.5, 0.0), Vector2::new(0.5, 0.0));
    }

    #[test]
    fn margin_edges_are_inclusive() {
        let bounds = Bounds::default();
        let on_left = Boid::new(10.0, 50.0, 0.0, 0.0);
        assert!(on_left.outside_left_margin(10.0));
        let on_top = Boid::new(50.0, 90.0, 0.0, 0.0);
        assert!(on_top.outside_top_margin(&bounds, 10.0));
        assert!(!on_top.outside_right_margin(&bounds, 10.0));
        assert!(!on_top.outside_bottom_margin(10.0));
    }

    #[test]
    fn corner_turns_on_both_axes() {
        let params = Parameters::default();
        let mut boid = Boid::new(100.0, 100.0, 0.0, 0.0);
        let seen = still(&boid);
        boid.update_velocity(&seen, &params, &Bounds::default(), ScoutGroup::None);
        assert!(boid.velocity.x < 0.0);
        assert!(boid.velocity.y < 0.0);
        assert_relative_eq!(boid.speed(), params.max_speed, epsilon = 1e-6);
    }

    #[test]
    fn speed_is_clamped_to_limits() {
        let params = Parameters::default();
        let bounds = Bounds::default();

        let mut fast = Boid::new(50.0, 50.0, 3.0, 4.0);
        let seen = still(&fast);
        fast.update_velocity(&seen, &params, &bounds, ScoutGroup::None);
        assert_relative_eq!(fast.speed(), params.max_speed, epsilon = 1e-6);
        assert_relative_eq!(fast.velocity.x / fast.velocity.y, 0.75, epsilon = 1e-6);

        let mut slow = Boid::new(50.0, 50.0, 0.0, -0.01);
        let seen = still(&slow);
        slow.update_velocity(&seen, &params, &bounds, ScoutGroup::None);
        assert_relative_eq!(slow.speed(), params.min_speed, epsilon = 1e-6);
        assert!(slow.velocity.y < 0.0);
    }

    #[test]
    fn zero_speed_stays_zero() {
        let mut boid = Boid::new(50.0, 50.0, 0.0, 0.0);
        let seen = still(&boid);
        boid.update_velocity(&seen, &Parameters::default(), &Bounds::default(), ScoutGroup::None);
        assert_eq!(boid.velocity, Vector2::zeros());
        assert!(boid.position.x.is_finite());
    }

    #[test]
    fn scout_bias_grows_with_home_heading() {
        let params = Parameters::default();
        let mut boid = Boid::new(50.0, 50.0, 0.5, 0.0);
        let seen = still(&boid);
        boid.update_velocity(&seen, &params, &Bounds::default(), ScoutGroup::Group1);
        assert_relative_eq!(boid.bias, params.bias_increment);
        // (1 - 0.01) * 0.5 + 0.01
        assert_relative_eq!(boid.velocity.x, 0.505, epsilon = 1e-6);
    }

    #[test]
    fn scout_bias_shrinks_to_floor_against_home() {
        let params = Parameters::default();
        let mut boid = Boid::new(50.0, 50.0, 0.5, 0.0).with_bias(0.05);
        for _ in 0..10 {
            let seen = still(&boid);
            boid.update_velocity(&seen, &params, &Bounds::default(), ScoutGroup::Group2);
        }
        assert_relative_eq!(boid.bias, params.bias_increment);
    }

    #[test]
    fn non_scout_bias_untouched() {
        let mut boid = Boid::new(50.0, 50.0, 0.5, 0.0).with_bias(0.07);
        let seen = still(&boid);
        boid.update_velocity(&seen, &Parameters::default(), &Bounds::default(), ScoutGroup::None);
        assert_eq!(boid.bias, 0.07);
    }
}
