//! Arc centre correction.

use serde::Serialize;
use tracing::{debug, warn};

use super::{Emit, Filter, Position};
use crate::config::float_cmp;
use crate::error::{GcodeError, Result};
use crate::model::{Axis, Command, Motion};

/// Counters collected by an [`ArcCorrector`] over one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArcStats {
    /// Arcs whose I/J were rewritten.
    pub adjusted: usize,
    /// Full circles and arcs that were already consistent.
    pub preserved: usize,
    /// Arcs that could not be corrected and were passed through.
    pub skipped: usize,
}

impl ArcStats {
    pub fn total(&self) -> usize {
        self.adjusted + self.preserved + self.skipped
    }
}

/// Moves the centre of every G02/G03 arc so that it is equidistant from the
/// start and end points.
///
/// The radius is taken from the start point to the declared centre. Of the
/// two centres with that radius through both endpoints, the one closer to
/// the declared centre is kept; this tie-break is best-effort for badly
/// malformed input. Full circles are left alone. Modal continuation lines
/// after a G02/G03 are corrected like the arc word itself.
#[derive(Debug, Clone, Default)]
pub struct ArcCorrector {
    position: Position,
    motion: Option<Motion>,
    stats: ArcStats,
}

enum Outcome {
    Adjusted,
    Preserved,
}

impl ArcCorrector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters for the current pass.
    pub fn stats(&self) -> ArcStats {
        self.stats
    }

    fn is_arc_move(&self, command: &Command) -> bool {
        if command.is_arc() {
            return true;
        }
        command.word.is_empty()
            && (command.has(Axis::X) || command.has(Axis::Y))
            && self.motion.is_some_and(Motion::is_arc)
    }

    fn correct(&self, command: &mut Command) -> Result<Outcome> {
        let start = self.position.xy().ok_or(GcodeError::UnknownStartPoint)?;

        if !command.has(Axis::I) && !command.has(Axis::J) {
            return match command.get(Axis::R) {
                Some(radius) => Err(GcodeError::RadiusFormatArc { radius }),
                None => Err(GcodeError::DegenerateArc {
                    x1: start.0,
                    y1: start.1,
                    x2: command.get(Axis::X).unwrap_or(start.0),
                    y2: command.get(Axis::Y).unwrap_or(start.1),
                }),
            };
        }

        let end = (
            command.get(Axis::X).unwrap_or(start.0),
            command.get(Axis::Y).unwrap_or(start.1),
        );
        if float_cmp::same_point(start, end) {
            return Ok(Outcome::Preserved);
        }

        let nominal = (
            start.0 + command.get(Axis::I).unwrap_or(0.0),
            start.1 + command.get(Axis::J).unwrap_or(0.0),
        );
        let radius = distance(start, nominal);
        if float_cmp::approx_eq(distance(end, nominal), radius) {
            return Ok(Outcome::Preserved);
        }

        let center = corrected_center(start, end, nominal)?;
        debug!(
            "Arc to ({:.4}, {:.4}): centre ({:.4}, {:.4}) moved to ({:.4}, {:.4})",
            end.0, end.1, nominal.0, nominal.1, center.0, center.1
        );

        command.set(Axis::X, end.0);
        command.set(Axis::Y, end.1);
        command.set(Axis::I, center.0 - start.0);
        command.set(Axis::J, center.1 - start.1);
        Ok(Outcome::Adjusted)
    }
}

impl Filter for ArcCorrector {
    fn apply(&mut self, mut command: Command) -> Emit {
        if let Some(motion) = command.motion() {
            self.motion = Some(motion);
        }
        if self.is_arc_move(&command) {
            match self.correct(&mut command) {
                Ok(Outcome::Adjusted) => self.stats.adjusted += 1,
                Ok(Outcome::Preserved) => self.stats.preserved += 1,
                Err(err) => {
                    warn!("Arc '{}' left unmodified: {}", command, err);
                    self.stats.skipped += 1;
                }
            }
        }
        self.position.update(&command);
        Emit::One(command)
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (b.0 - a.0).hypot(b.1 - a.1)
}

/// Centre equidistant from `start` and `end`, at the radius implied by
/// `nominal`, on whichever side of the chord lies closer to `nominal`.
pub fn corrected_center(
    start: (f64, f64),
    end: (f64, f64),
    nominal: (f64, f64),
) -> Result<(f64, f64)> {
    let radius = distance(start, nominal);
    let half_chord = distance(start, end) / 2.0;

    if float_cmp::approx_zero(radius) || float_cmp::approx_zero(half_chord) {
        return Err(GcodeError::DegenerateArc {
            x1: start.0,
            y1: start.1,
            x2: end.0,
            y2: end.1,
        });
    }

    let offset = (radius * radius - half_chord * half_chord).abs().sqrt();
    let mid = ((start.0 + end.0) / 2.0, (start.1 + end.1) / 2.0);

    // Unit vector perpendicular to the chord.
    let (px, py) = (
        -(end.1 - start.1) / (2.0 * half_chord),
        (end.0 - start.0) / (2.0 * half_chord),
    );

    let first = (mid.0 + offset * px, mid.1 + offset * py);
    let second = (mid.0 - offset * px, mid.1 - offset * py);

    if distance(second, nominal) < distance(first, nominal) {
        Ok(second)
    } else {
        Ok(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use crate::transform::FilterChain;

    fn correct(text: &str) -> (Vec<Command>, ArcStats) {
        let mut corrector = ArcCorrector::new();
        let mut out = Vec::new();
        for command in parse_program(text).iter() {
            out.extend(corrector.apply(command.clone()).into_vec());
        }
        (out, corrector.stats())
    }

    #[test]
    fn test_consistent_arc_unchanged() {
        let (out, stats) = correct("G00 X0 Y0\nG02 X10 Y0 I5 J0\n");
        assert_eq!(out[1].to_string(), "G02 X10.0000 Y0.0000 I5.0000 J0.0000");
        assert_eq!(stats.preserved, 1);
        assert_eq!(stats.adjusted, 0);
    }

    #[test]
    fn test_inconsistent_arc_corrected() {
        // Centre (5, 0.5) is 5.025 from the start but 5.009 from the end.
        let (out, stats) = correct("G00 X0 Y0\nG01 Z-1\nG02 X10 Y0.2 I5 J0.5\n");
        let arc = &out[2];
        let (i, j) = (arc.get(Axis::I).unwrap(), arc.get(Axis::J).unwrap());
        let center = (i, j);
        let r_start = distance((0.0, 0.0), center);
        let r_end = distance((10.0, 0.2), center);
        assert!((r_start - r_end).abs() < 1e-9);
        assert!(distance(center, (5.0, 0.5)) < 0.2);
        assert_eq!(stats.adjusted, 1);
    }

    #[test]
    fn test_modal_arc_corrected() {
        let (out, stats) = correct("G00 X0 Y0\nG02 X10 Y0 I5 J0\nX20 Y0.2 I5 J0.5\n");
        assert_eq!(stats.preserved, 1);
        assert_eq!(stats.adjusted, 1);

        let arc = &out[2];
        assert_eq!(arc.word, "");
        let center = (
            10.0 + arc.get(Axis::I).unwrap(),
            arc.get(Axis::J).unwrap(),
        );
        let r_start = distance((10.0, 0.0), center);
        let r_end = distance((20.0, 0.2), center);
        assert!((r_start - r_end).abs() < 1e-9);
    }

    #[test]
    fn test_modal_line_after_rapid_untouched() {
        let (out, stats) = correct("G02 X10 Y0 I5 J0\nG00 X0 Y0\nX20 Y0.2 I5 J0.5\n");
        assert_eq!(out[2].get(Axis::J), Some(0.5));
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.total(), 1);
    }

    #[test]
    fn test_picks_center_near_nominal() {
        let start = (0.0, 0.0);
        let end = (2.0, 0.0);
        let above = corrected_center(start, end, (1.0, 1.2)).unwrap();
        assert!(above.1 > 0.0);
        let below = corrected_center(start, end, (1.0, -1.2)).unwrap();
        assert!(below.1 < 0.0);
        assert!(float_cmp::approx_eq(above.0, 1.0));
    }

    #[test]
    fn test_full_circle_preserved() {
        let (out, stats) = correct("G00 X1 Y1\nG03 X1 Y1 I2 J0\n");
        assert_eq!(out[1].get(Axis::I), Some(2.0));
        assert_eq!(stats.preserved, 1);
    }

    #[test]
    fn test_unknown_start_skipped() {
        let (out, stats) = correct("G02 X4 Y0 I1 J0.3\n");
        assert_eq!(out[0].get(Axis::J), Some(0.3));
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_radius_format_skipped() {
        let (out, stats) = correct("G00 X0 Y0\nG02 X4 Y0 R2\n");
        assert_eq!(out[1].get(Axis::R), Some(2.0));
        assert!(!out[1].has(Axis::I));
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.total(), 1);
    }

    #[test]
    fn test_zero_radius_skipped() {
        let (_, stats) = correct("G00 X0 Y0\nG02 X4 Y0 I0 J0\n");
        assert_eq!(stats.skipped, 1);
        assert!(corrected_center((0.0, 0.0), (4.0, 0.0), (0.0, 0.0)).is_err());
    }

    #[test]
    fn test_reset_between_passes() {
        let program = parse_program("G00 X0 Y0\nG02 X10 Y0.2 I5 J0.5\n");
        let mut chain = FilterChain::new().with(ArcCorrector::new());
        let first = program.clone_with(&mut chain);
        let second = program.clone_with(&mut chain);
        assert_eq!(first.commands(), second.commands());
    }
}
