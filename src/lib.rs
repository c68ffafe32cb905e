use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use derive_more::Display;
use derive_new::new;
use serde::{Deserialize, Serialize};

mod landmarks;
mod load;
mod walker;

pub use landmarks::LandmarkSet;
pub use load::{FloorPlans, FLOORS_SIZE};
pub use walker::{
    Route, RouteWalker, StepOutcome, StepParams, Walk, WalkConfig, WalkPhase, WalkerState,
};

#[derive(Debug, Display, PartialEq)]
pub enum RouteError {
    #[display(fmt = "Empty landmark set")]
    EmptyLandmarkSet,
    #[display(fmt = "Invalid config: {}", _0)]
    InvalidConfig(&'static str),
}

impl std::error::Error for RouteError {}

#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize, new)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Compass command for a single walk step. Image coordinates: y grows downward,
/// so `Top` means decreasing y.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[display(fmt = "RIGHT")]
    Right,
    #[display(fmt = "LEFT")]
    Left,
    #[display(fmt = "TOP")]
    Top,
    #[display(fmt = "BOTTOM")]
    Bottom,
}

impl Direction {
    /**
     * True if `to` stays within `epsilon` of the corridor line through `from`
     * and lies strictly ahead of it in this direction.
     */
    pub fn aligned(&self, from: &Point, to: &Point, epsilon: f64) -> bool {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        match self {
            Direction::Right => dy.abs() < epsilon && dx > 0.0,
            Direction::Left => dy.abs() < epsilon && dx < 0.0,
            Direction::Top => dx.abs() < epsilon && dy < 0.0,
            Direction::Bottom => dx.abs() < epsilon && dy > 0.0,
        }
    }
}

#[derive(Debug, Display, PartialEq)]
#[display(fmt = "Unknown direction: {}", _0)]
pub struct ParseDirectionError(String);

impl std::error::Error for ParseDirectionError {}

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RIGHT" => Ok(Direction::Right),
            "LEFT" => Ok(Direction::Left),
            "TOP" => Ok(Direction::Top),
            "BOTTOM" => Ok(Direction::Bottom),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize, new)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

/// Landmark extractor output for one floor image: pixel dimensions plus region
/// centroids in scan order.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize, new)]
pub struct FloorPlan {
    pub rows: u32,
    pub cols: u32,
    pub landmarks: Vec<Point>,
}

impl FloorPlan {
    pub fn default_max_radius(&self) -> f64 {
        (self.rows / 2) as f64
    }
}
