//! Geometric filters: translation, rotation, axis swap and mirroring.

use tracing::warn;

use super::{Emit, Filter, Position};
use crate::model::{Axis, Command, Program};

/// Shift X, Y and Z by fixed offsets. I/J/K are relative and stay as is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Translate {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Translate {
    pub fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    /// Translation moving the program's lower-left X/Y corner to the origin.
    pub fn to_origin(program: &Program) -> Self {
        let bounds = program.bounds();
        Self::new(
            -bounds.x.min.unwrap_or(0.0),
            -bounds.y.min.unwrap_or(0.0),
            0.0,
        )
    }

    /// The translation undoing this one.
    pub fn inverse(&self) -> Self {
        Self::new(-self.dx, -self.dy, -self.dz)
    }
}

impl Filter for Translate {
    fn apply(&mut self, mut command: Command) -> Emit {
        for (axis, offset) in [(Axis::X, self.dx), (Axis::Y, self.dy), (Axis::Z, self.dz)] {
            if let Some(v) = command.get(axis) {
                command.set(axis, v + offset);
            }
        }
        Emit::One(command)
    }
}

/// Rotate the X/Y plane about the origin, counter-clockwise in degrees.
///
/// A move naming only one of X and Y is completed from the last known
/// position before rotating, since the unnamed axis changes too. Arc offsets
/// I/J are rotated as a vector.
#[derive(Debug, Clone)]
pub struct Rotate {
    degrees: f64,
    cos: f64,
    sin: f64,
    position: Position,
}

impl Rotate {
    pub fn new(degrees: f64) -> Self {
        let radians = degrees.to_radians();
        Self {
            degrees,
            cos: radians.cos(),
            sin: radians.sin(),
            position: Position::default(),
        }
    }

    /// Rotation angle in degrees.
    pub fn degrees(&self) -> f64 {
        self.degrees
    }

    fn rotate(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.cos - y * self.sin, x * self.sin + y * self.cos)
    }
}

impl Filter for Rotate {
    fn apply(&mut self, mut command: Command) -> Emit {
        let source = (command.get(Axis::X), command.get(Axis::Y));

        if source != (None, None) {
            match (source.0.or(self.position.x), source.1.or(self.position.y)) {
                (Some(x), Some(y)) => {
                    let (rx, ry) = self.rotate(x, y);
                    command.set(Axis::X, rx);
                    command.set(Axis::Y, ry);
                }
                _ => warn!("Cannot rotate '{}': start position unknown", command),
            }
        }

        if command.has(Axis::I) || command.has(Axis::J) {
            let i = command.get(Axis::I).unwrap_or(0.0);
            let j = command.get(Axis::J).unwrap_or(0.0);
            let (ri, rj) = self.rotate(i, j);
            command.set(Axis::I, ri);
            command.set(Axis::J, rj);
        }

        // Tracked in source coordinates.
        if let Some(x) = source.0 {
            self.position.x = Some(x);
        }
        if let Some(y) = source.1 {
            self.position.y = Some(y);
        }

        Emit::One(command)
    }

    fn reset(&mut self) {
        self.position = Position::default();
    }
}

/// Exchange X with Y and I with J.
///
/// Swapping axes is a reflection, so arc winding is reversed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwapXY;

impl Filter for SwapXY {
    fn apply(&mut self, mut command: Command) -> Emit {
        command.swap(Axis::X, Axis::Y);
        command.swap(Axis::I, Axis::J);
        if let Some(motion) = command.motion().filter(|m| m.is_arc()) {
            command.word = motion.reversed().word().to_string();
        }
        Emit::One(command)
    }
}

/// Mirror about a vertical line `x = a` and/or a horizontal line `y = b`.
///
/// Arc offsets are recomputed from the mirrored centre and start point. When
/// exactly one axis is mirrored the arc winding is reversed.
#[derive(Debug, Clone)]
pub struct Flip {
    x_axis: Option<f64>,
    y_axis: Option<f64>,
    position: Position,
}

impl Flip {
    /// `x_axis` mirrors X about that value, `y_axis` mirrors Y.
    pub fn new(x_axis: Option<f64>, y_axis: Option<f64>) -> Self {
        Self {
            x_axis,
            y_axis,
            position: Position::default(),
        }
    }

    /// Mirror about the centre of the program's bounding box.
    pub fn about_center(program: &Program, flip_x: bool, flip_y: bool) -> Self {
        let bounds = program.bounds();
        Self::new(
            if flip_x { bounds.x.midpoint() } else { None },
            if flip_y { bounds.y.midpoint() } else { None },
        )
    }

    fn reverses_winding(&self) -> bool {
        self.x_axis.is_some() != self.y_axis.is_some()
    }
}

/// Mirror a coordinate and its arc offset about `axis`.
///
/// Arc centre is `start + offset`; an unknown start is taken as 0.
fn mirror(command: &mut Command, coord: Axis, offset: Axis, axis: f64, start: Option<f64>) {
    if let Some(v) = command.get(coord) {
        command.set(coord, 2.0 * axis - v);
    }
    if let Some(o) = command.get(offset) {
        let start = start.unwrap_or(0.0);
        let center = 2.0 * axis - (start + o);
        command.set(offset, center - (2.0 * axis - start));
    }
}

impl Filter for Flip {
    fn apply(&mut self, mut command: Command) -> Emit {
        let start = self.position;
        self.position.update(&command);

        if let Some(a) = self.x_axis {
            mirror(&mut command, Axis::X, Axis::I, a, start.x);
        }
        if let Some(b) = self.y_axis {
            mirror(&mut command, Axis::Y, Axis::J, b, start.y);
        }

        if self.reverses_winding() {
            if let Some(motion) = command.motion().filter(|m| m.is_arc()) {
                command.word = motion.reversed().word().to_string();
            }
        }

        Emit::One(command)
    }

    fn reset(&mut self) {
        self.position = Position::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::float_cmp::approx_eq;
    use crate::parser::{parse_line, parse_program};
    use crate::transform::FilterChain;

    fn run(filter: impl Filter + 'static, text: &str) -> Program {
        parse_program(text).clone_with(&mut FilterChain::new().with(filter))
    }

    fn assert_same(a: &Program, b: &Program) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!(x.matches(y), "{} != {}", x, y);
        }
    }

    const SQUARE: &str = "G21\nG00 X1 Y1\nG01 Z-1\nG01 X4 Y1\nG02 X4 Y3 I0 J1\nG01 X1 Y3\nG00 Z3\n";

    // ==================== Translate tests ====================

    #[test]
    fn test_translate_inverse() {
        let source = parse_program(SQUARE);
        let t = Translate::new(2.5, -1.0, 0.5);
        let moved = source.clone_with(&mut FilterChain::new().with(t));
        let back = moved.clone_with(&mut FilterChain::new().with(t.inverse()));

        assert_same(&source, &back);
        assert_eq!(moved.bounds().x.min, Some(3.5));
        assert_eq!(moved.commands()[4].get(Axis::I), Some(0.0));
    }

    #[test]
    fn test_translate_to_origin() {
        let source = parse_program(SQUARE);
        let moved = source.clone_with(&mut FilterChain::new().with(Translate::to_origin(&source)));
        assert_eq!(moved.bounds().x.min, Some(0.0));
        assert_eq!(moved.bounds().y.min, Some(0.0));
        assert_eq!(moved.bounds().x.max, Some(3.0));
    }

    // ==================== Rotate tests ====================

    #[test]
    fn test_rotate_quarter_turn() {
        let mut rotate = Rotate::new(90.0);
        let out = rotate.apply(parse_line("G02 X1 Y0 I0.5 J0").unwrap()).into_vec();
        let cmd = &out[0];
        assert!(approx_eq(cmd.get(Axis::X).unwrap(), 0.0));
        assert!(approx_eq(cmd.get(Axis::Y).unwrap(), 1.0));
        assert!(approx_eq(cmd.get(Axis::I).unwrap(), 0.0));
        assert!(approx_eq(cmd.get(Axis::J).unwrap(), 0.5));
        assert_eq!(cmd.word, "G02");
    }

    #[test]
    fn test_rotate_completes_missing_axis() {
        let rotated = run(Rotate::new(90.0), "G00 X2 Y0\nG01 X3\nG01 Z-1\n");
        let cmd = &rotated.commands()[1];
        assert!(approx_eq(cmd.get(Axis::X).unwrap(), 0.0));
        assert!(approx_eq(cmd.get(Axis::Y).unwrap(), 3.0));
        assert!(!rotated.commands()[2].has(Axis::X));
    }

    #[test]
    fn test_rotate_unknown_position_left_alone() {
        let rotated = run(Rotate::new(45.0), "G01 X3\n");
        assert_eq!(rotated.commands()[0].get(Axis::X), Some(3.0));
        assert!(!rotated.commands()[0].has(Axis::Y));
    }

    #[test]
    fn test_rotate_full_turn() {
        let source = parse_program(SQUARE);
        let turned = source.clone_with(
            &mut FilterChain::new()
                .with(Rotate::new(120.0))
                .with(Rotate::new(240.0)),
        );
        assert_same(&source, &turned);
    }

    // ==================== Swap tests ====================

    #[test]
    fn test_swap_xy() {
        let mut swap = SwapXY;
        let out = swap.apply(parse_line("G02 X1 I2 J3").unwrap()).into_vec();
        assert_eq!(out[0].to_string(), "G03 Y1.0000 I3.0000 J2.0000");
    }

    #[test]
    fn test_swap_twice_is_identity() {
        let source = parse_program(SQUARE);
        let twice = source.clone_with(&mut FilterChain::new().with(SwapXY).with(SwapXY));
        assert_same(&source, &twice);
    }

    // ==================== Flip tests ====================

    #[test]
    fn test_flip_coordinate() {
        let mut flip = Flip::new(Some(5.0), None);
        let out = flip.apply(parse_line("G01 X2 Y7").unwrap()).into_vec();
        assert_eq!(out[0].get(Axis::X), Some(8.0));
        assert_eq!(out[0].get(Axis::Y), Some(7.0));
    }

    #[test]
    fn test_flip_arc_winding() {
        let mut flip = Flip::new(Some(5.0), None);
        let out = flip.apply(parse_line("G02 X8 Y0 I1 J0").unwrap()).into_vec();
        assert_eq!(out[0].to_string(), "G03 X2.0000 Y0.0000 I-1.0000 J0.0000");
    }

    #[test]
    fn test_flip_both_axes_keeps_winding() {
        let flipped = run(Flip::new(Some(0.0), Some(0.0)), "G00 X1 Y0\nG02 X0 Y-1 I-1 J0\n");
        let arc = &flipped.commands()[1];
        assert_eq!(arc.word, "G02");
        assert_eq!(arc.get(Axis::I), Some(1.0));
        assert_eq!(arc.get(Axis::J), Some(0.0));
        assert_eq!(arc.get(Axis::Y), Some(1.0));
    }

    #[test]
    fn test_flip_twice_is_identity() {
        let source = parse_program(SQUARE);
        let flip = Flip::about_center(&source, true, true);
        let twice = source.clone_with(&mut FilterChain::new().with(flip.clone()).with(flip));
        assert_same(&source, &twice);

        let mirror_x = Flip::about_center(&source, true, false);
        let once = source.clone_with(&mut FilterChain::new().with(mirror_x.clone()));
        assert_eq!(once.commands()[4].word, "G03");
        assert_eq!(once.bounds().x, source.bounds().x);
        let back = once.clone_with(&mut FilterChain::new().with(mirror_x));
        assert_same(&source, &back);
    }
}
