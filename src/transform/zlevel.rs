//! Cut depth and safe height rewriting.

use super::{Emit, Filter};
use crate::model::{Axis, Command};

/// Rewrite Z values: every Z below zero becomes the cut depth, every Z above
/// zero the safe height. Z exactly zero and unset targets are left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ZLevel {
    pub cut: Option<f64>,
    pub safe: Option<f64>,
}

impl ZLevel {
    pub fn new(cut: Option<f64>, safe: Option<f64>) -> Self {
        Self { cut, safe }
    }
}

impl Filter for ZLevel {
    fn apply(&mut self, mut command: Command) -> Emit {
        if let Some(z) = command.get(Axis::Z) {
            let target = if z < 0.0 {
                self.cut
            } else if z > 0.0 {
                self.safe
            } else {
                None
            };
            if let Some(target) = target {
                command.set(Axis::Z, target);
            }
        }
        Emit::One(command)
    }
}
