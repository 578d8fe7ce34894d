//! Field geometry and spatial predicates for the VSS referee.
//!
//! The field frame has its origin at the field center, +x toward one
//! goal and +y upward, matching the vision feed's convention. Goal
//! dimensions are data (see [`FieldDimensions`]), not constants, since
//! the field geometry tables are an external concern (spec §1).

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// A possibly-invalid 2D position in the field frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub valid: bool,
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self {
            valid: true,
            x,
            y,
        }
    }

    pub const fn invalid() -> Self {
        Self {
            valid: false,
            x: 0.0,
            y: 0.0,
        }
    }

    pub fn is_invalid(&self) -> bool {
        !self.valid
    }

    pub fn point(&self) -> Point2<f32> {
        Point2::new(self.x, self.y)
    }

    /// Mirrors this position across x = 0, as happens when a half swaps sides.
    pub fn mirrored(&self) -> Self {
        Self {
            valid: self.valid,
            x: -self.x,
            y: self.y,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::invalid()
    }
}

/// A 2D velocity in the field frame, in meters per second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    pub const fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }

    pub const fn zero() -> Self {
        Self { vx: 0.0, vy: 0.0 }
    }

    pub fn abs(&self) -> f32 {
        Vector2::new(self.vx, self.vy).norm()
    }
}

/// One of the four outer field regions, used to locate a `FREE_BALL` mark.
///
/// Quadrants are assigned by the sign of the field-frame coordinates:
/// Q1 is +x/+y, Q2 is -x/+y, Q3 is -x/-y, Q4 is +x/-y.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Quadrant {
    Q1,
    Q2,
    Q3,
    Q4,
    NoQuadrant,
}

/// Which half of the field (by the sign of x) a team's own goal sits on.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// +1.0 when the team plays toward +x (its goal is on the left), -1.0 otherwise.
    ///
    /// This mirrors the original's `factor` convention in the placement
    /// templates: a team defending the left goal kicks toward +x.
    pub fn sign(self) -> f32 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }

    pub fn mirrored(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Field and goal-area measurements, data rather than constants since
/// the geometry tables themselves are an external concern (spec §1).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDimensions {
    pub field_length: f32,
    pub field_width: f32,
    /// Depth of the goal area rectangle, measured from the goal line inward.
    pub goal_area_depth: f32,
    /// Full width (y-extent) of the goal area rectangle.
    pub goal_area_width: f32,
    /// Full width (y-extent) of the goal mouth opening.
    pub goal_width: f32,
    /// Radius used to place kickoff strikers/supporters around the center mark.
    pub center_radius: f32,
}

impl FieldDimensions {
    pub fn half_length(&self) -> f32 {
        self.field_length / 2.0
    }

    pub fn half_width(&self) -> f32 {
        self.field_width / 2.0
    }

    /// The x coordinate of the goal line a side defends.
    fn goal_line_x(&self, side: Side) -> f32 {
        match side {
            Side::Left => -self.half_length(),
            Side::Right => self.half_length(),
        }
    }
}

pub fn distance(a: Position, b: Position) -> f32 {
    (a.point() - b.point()).norm()
}

/// Whether `position` lies inside the goal area rectangle a team defending
/// `side` owns.
pub fn is_inside_goal_area(side: Side, position: Position, field: &FieldDimensions) -> bool {
    if position.is_invalid() {
        return false;
    }

    let goal_line_x = field.goal_line_x(side);
    let inner_x = goal_line_x + side.sign() * -1.0 * field.goal_area_depth;
    // inner_x is the x coordinate of the side of the rectangle facing the field center.
    let (x_min, x_max) = match side {
        Side::Left => (goal_line_x, inner_x),
        Side::Right => (inner_x, goal_line_x),
    };

    let half_area_width = field.goal_area_width / 2.0;

    position.x >= x_min
        && position.x <= x_max
        && position.y >= -half_area_width
        && position.y <= half_area_width
}

/// Whether `position` lies inside the goal mouth itself (beyond the goal
/// line, within the goal's width) for the team defending `side`.
pub fn is_ball_inside_goal(side: Side, position: Position, field: &FieldDimensions) -> bool {
    if position.is_invalid() {
        return false;
    }

    let half_goal_width = field.goal_width / 2.0;
    let beyond_goal_line = match side {
        Side::Left => position.x < field.goal_line_x(Side::Left),
        Side::Right => position.x > field.goal_line_x(Side::Right),
    };

    beyond_goal_line && position.y.abs() <= half_goal_width
}

/// Locates `position` in one of the four outer quadrants.
pub fn quadrant_of(position: Position) -> Quadrant {
    if position.is_invalid() {
        return Quadrant::NoQuadrant;
    }

    match (position.x >= 0.0, position.y >= 0.0) {
        (true, true) => Quadrant::Q1,
        (false, true) => Quadrant::Q2,
        (false, false) => Quadrant::Q3,
        (true, false) => Quadrant::Q4,
    }
}
