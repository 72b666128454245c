//! Tool position tracking shared by the stateful filters and the optimizer.

use crate::config::float_cmp;
use crate::error::{GcodeError, Result};
use crate::model::{Axis, Command, Motion};

/// Last known absolute tool position. Axes never mentioned stay unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl Position {
    /// Position with every axis known.
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }

    /// Take over every coordinate present on a command.
    pub fn update(&mut self, command: &Command) {
        if let Some(x) = command.get(Axis::X) {
            self.x = Some(x);
        }
        if let Some(y) = command.get(Axis::Y) {
            self.y = Some(y);
        }
        if let Some(z) = command.get(Axis::Z) {
            self.z = Some(z);
        }
    }

    /// X/Y point, when both are known.
    pub fn xy(&self) -> Option<(f64, f64)> {
        Some((self.x?, self.y?))
    }
}

/// One executed motion command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Move {
    /// Effective motion mode (explicit or modal).
    pub motion: Motion,
    /// Position before the move.
    pub from: Position,
    /// Position after the move.
    pub to: Position,
    /// Feed rate in effect.
    pub feed: Option<f64>,
}

impl Move {
    /// X/Y displacement length, unknown axes counted as zero.
    pub fn lateral_distance(&self) -> f64 {
        let dx = self.to.x.unwrap_or(0.0) - self.from.x.unwrap_or(0.0);
        let dy = self.to.y.unwrap_or(0.0) - self.from.y.unwrap_or(0.0);
        dx.hypot(dy)
    }
}

/// Modal machine state: position, motion mode and feed rate.
///
/// A command carrying X, Y or Z is a move when its word is a motion word or
/// when it is a modal continuation (empty word) after a motion word.
#[derive(Debug, Clone, Default)]
pub struct Machine {
    position: Position,
    motion: Option<Motion>,
    feed: Option<f64>,
}

impl Machine {
    /// Machine with an unknown start position.
    pub fn new() -> Self {
        Self::default()
    }

    /// Machine starting at a known position.
    pub fn starting_at(position: Position) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Current position.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Feed rate in effect.
    pub fn feed(&self) -> Option<f64> {
        self.feed
    }

    /// Execute one command, returning the move it makes (if any).
    pub fn step(&mut self, command: &Command) -> Option<Move> {
        if let Some(motion) = command.motion() {
            self.motion = Some(motion);
        }
        if let Some(feed) = command.get(Axis::F) {
            self.feed = Some(feed);
        }

        let from = self.position;
        self.position.update(command);

        let modal = command.word.is_empty() || command.motion().is_some();
        if !command.has_position() || !modal {
            return None;
        }

        Some(Move {
            motion: self.motion?,
            from,
            to: self.position,
            feed: self.feed,
        })
    }
}

/// Centre of a radius-format arc.
///
/// A positive radius selects the shorter arc, a negative one the longer arc.
/// Endpoints further apart than the diameter put the centre on the chord
/// midpoint.
pub fn center_from_radius(
    start: (f64, f64),
    end: (f64, f64),
    radius: f64,
    motion: Motion,
) -> Result<(f64, f64)> {
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let d = dx.hypot(dy);
    if float_cmp::approx_zero(radius) || float_cmp::approx_zero(d) {
        return Err(GcodeError::DegenerateArc {
            x1: start.0,
            y1: start.1,
            x2: end.0,
            y2: end.1,
        });
    }

    let mx = (start.0 + end.0) / 2.0;
    let my = (start.1 + end.1) / 2.0;
    let h = (radius * radius - (d / 2.0) * (d / 2.0)).max(0.0).sqrt();

    // Left-hand perpendicular of the chord direction.
    let (px, py) = (-dy / d, dx / d);

    // Short clockwise arcs turn about a centre on the right of the chord.
    let mut side = if motion == Motion::ArcCw { -1.0 } else { 1.0 };
    if radius < 0.0 {
        side = -side;
    }

    Ok((mx + side * h * px, my + side * h * py))
}
