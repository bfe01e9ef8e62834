//! Actor Movement
//!
//! An actor is a 2D point that can seek a goal. It is either idle (no goal)
//! or seeking (goal set); reaching the goal clears it.

use serde::{Deserialize, Serialize};

use crate::status::Status;

/// Speed used by [`Actor::run`], in units per second.
pub const DEFAULT_WALK_SPEED: f32 = 40.0;

/// Arrival tolerance used by [`Actor::run`].
pub const DEFAULT_WALK_EPSILON: f32 = 3.0;

/// Lowest speed an actor slows to while easing into its target.
pub const MIN_APPROACH_SPEED: f32 = 5.0;

/// Easing starts within this many epsilons of the target.
const EASING_RADIUS_EPSILONS: f32 = 3.0;

/// Position in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A movable point with facing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Actor {
    position: Point,
    goal: Option<Point>,
    /// True when facing the negative x direction
    flipped: bool,
}

impl Actor {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            position: Point::new(x, y),
            goal: None,
            flipped: false,
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub fn goal(&self) -> Option<Point> {
        self.goal
    }

    pub fn set_goal(&mut self, goal: Point) {
        self.goal = Some(goal);
    }

    pub fn clear_goal(&mut self) {
        self.goal = None;
    }

    pub fn flipped(&self) -> bool {
        self.flipped
    }

    pub fn set_flipped(&mut self, flipped: bool) {
        self.flipped = flipped;
    }

    /// Turns to face a horizontal position. Facing is unchanged when `x`
    /// is directly above or below the actor.
    pub fn face_toward(&mut self, x: f32) {
        if x < self.position.x {
            self.flipped = true;
        } else if x > self.position.x {
            self.flipped = false;
        }
    }

    /// Moves one step toward `target`.
    ///
    /// Returns [`Status::Success`] without moving when already at the target
    /// or within `epsilon` of it on both axes. Inside `3 * epsilon` the speed
    /// scales down with the remaining distance, never below
    /// [`MIN_APPROACH_SPEED`]. A step never carries the actor past the target.
    pub fn move_to_point(&mut self, target: Point, speed: f32, epsilon: f32, dt: f32) -> Status {
        let dx = target.x - self.position.x;
        let dy = target.y - self.position.y;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance == 0.0 {
            return Status::Success;
        }
        if dx.abs() <= epsilon && dy.abs() <= epsilon {
            return Status::Success;
        }

        let easing_radius = EASING_RADIUS_EPSILONS * epsilon;
        let eased = if distance < easing_radius {
            speed * distance / easing_radius
        } else {
            speed
        };
        let step = (eased.max(MIN_APPROACH_SPEED) * dt).min(distance);

        self.position.x += dx / distance * step;
        self.position.y += dy / distance * step;
        if dx < 0.0 {
            self.flipped = true;
        } else if dx > 0.0 {
            self.flipped = false;
        }
        Status::Running
    }

    /// Advances toward the goal at walking pace.
    ///
    /// [`Status::Failure`] means there is no goal.
    pub fn run(&mut self, dt: f32) -> Status {
        self.run_with(dt, DEFAULT_WALK_SPEED, DEFAULT_WALK_EPSILON)
    }

    pub fn run_with(&mut self, dt: f32, speed: f32, epsilon: f32) -> Status {
        let Some(goal) = self.goal else {
            return Status::Failure;
        };
        match self.move_to_point(goal, speed, epsilon, dt) {
            Status::Success => {
                self.goal = None;
                Status::Success
            }
            _ => Status::Running,
        }
    }
}
