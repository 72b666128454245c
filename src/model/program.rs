//! Program container: ordered commands, unit mode and running bounds.

use serde::Serialize;
use tracing::debug;

use super::{Axis, Command};
use crate::config::{Units, WORD_MM};
use crate::transform::Filter;

/// Comment attached to an inch marker once it has been rewritten.
pub const CONVERTED_COMMENT: &str = "(converted from inch to mm)";

/// Observed range of one axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AxisRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl AxisRange {
    /// Widen the range to include a value.
    pub fn include(&mut self, value: f64) {
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.include_max(value);
    }

    /// Widen only the upper end of the range.
    pub fn include_max(&mut self, value: f64) {
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// Distance between min and max.
    pub fn size(&self) -> Option<f64> {
        Some(self.max? - self.min?)
    }

    /// Centre of the range.
    pub fn midpoint(&self) -> Option<f64> {
        Some((self.min? + self.max?) / 2.0)
    }
}

/// Axis-aligned bounding box over X, Y and Z.
///
/// The lower Z bound is the cutting depth: only values below the work
/// surface (Z < 0) lower it, so a program that never plunges has no minimum Z.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Bounds {
    pub x: AxisRange,
    pub y: AxisRange,
    pub z: AxisRange,
}

impl Bounds {
    /// Widen the box with the coordinates present on a command.
    pub fn include(&mut self, command: &Command) {
        if let Some(v) = command.get(Axis::X) {
            self.x.include(v);
        }
        if let Some(v) = command.get(Axis::Y) {
            self.y.include(v);
        }
        if let Some(v) = command.get(Axis::Z) {
            if v < 0.0 {
                self.z.include(v);
            } else {
                self.z.include_max(v);
            }
        }
    }

    /// `(min_x, max_x, min_y, max_y, min_z, max_z)`.
    #[allow(clippy::type_complexity)]
    pub fn as_tuple(
        &self,
    ) -> (
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
        Option<f64>,
    ) {
        (
            self.x.min, self.x.max, self.y.min, self.y.max, self.z.min, self.z.max,
        )
    }

    /// Area of the X/Y footprint.
    pub fn area(&self) -> Option<f64> {
        Some(self.x.size()? * self.y.size()?)
    }
}

/// An ordered sequence of commands, normalised to millimetres.
///
/// Transforms never mutate a program; [`Program::clone_with`] builds a new
/// one and recomputes its bounds from the surviving commands.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Program {
    /// Unit mode declared by the source (first unit marker seen).
    units: Units,
    /// Unit mode currently applied to appended commands.
    #[serde(skip)]
    active: Units,
    /// Running bounds over the stored commands.
    bounds: Bounds,
    /// Stored commands, always in millimetres.
    commands: Vec<Command>,
}

impl Program {
    /// Create an empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty program for commands that are already in millimetres,
    /// reporting `units` as the declared source mode.
    pub fn normalized(units: Units) -> Self {
        Self {
            units,
            active: Units::Millimetre,
            ..Default::default()
        }
    }

    /// Build a program by appending each command in turn.
    pub fn from_commands(commands: impl IntoIterator<Item = Command>) -> Self {
        let mut program = Self::new();
        for command in commands {
            program.append(command);
        }
        program
    }

    /// Append a command, converting inch values and updating the bounds.
    pub fn append(&mut self, mut command: Command) {
        if let Some(mode) = Units::from_word(&command.word) {
            self.select_units(mode);
            if mode == Units::Inch {
                command.word = WORD_MM.to_string();
                command.comment = Some(CONVERTED_COMMENT.to_string());
            }
        }

        let factor = self.active.to_mm_factor();
        if factor != 1.0 {
            for axis in Axis::LENGTHS {
                if let Some(value) = command.get(axis) {
                    command.set(axis, value * factor);
                }
            }
        }

        self.push(command);
    }

    /// Switch the unit mode applied to subsequently appended commands.
    ///
    /// The first mode selected is also recorded as the declared unit mode.
    pub fn select_units(&mut self, mode: Units) {
        if self.units == Units::Unspecified {
            self.units = mode;
        }
        if self.active != mode {
            debug!("Unit mode now {}", mode);
        }
        self.active = mode;
    }

    /// Append every command of another (already normalised) program.
    pub fn extend(&mut self, other: &Program) {
        if self.units == Units::Unspecified {
            self.units = other.units;
        }
        for command in &other.commands {
            self.push(command.clone());
        }
    }

    fn push(&mut self, command: Command) {
        self.bounds.include(&command);
        self.commands.push(command);
    }

    /// Run every command through a filter (usually a
    /// [`FilterChain`](crate::transform::FilterChain)) and collect the
    /// survivors into a new program. `self` is left untouched.
    pub fn clone_with<F: Filter + ?Sized>(&self, filter: &mut F) -> Program {
        let mut result = Program::normalized(self.units);
        filter.reset();
        for command in &self.commands {
            for output in filter.apply(command.clone()).into_vec() {
                result.append(output);
            }
        }
        result
    }

    /// Unit mode declared by the source.
    pub fn units(&self) -> Units {
        self.units
    }

    /// Bounding box of the stored commands.
    ///
    /// X and Y cover every value seen. Z is asymmetric: its minimum only
    /// tracks values below zero, so it stays `None` until something plunges.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Stored commands.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Iterate over stored commands.
    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    /// Number of stored commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if the program holds no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
