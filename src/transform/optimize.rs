//! Greedy toolpath re-sequencing.
//!
//! A program is split into the commands before the first plunge (prefix),
//! the cutting primitives, and the commands after the last retract (suffix).
//! The primitives are then re-ordered by nearest-neighbour search, each one
//! traversed in whichever direction starts closer to the tool, and emitted
//! with fresh retract / rapid / plunge moves between them.

use serde::Serialize;
use tracing::{debug, warn};

use super::{center_from_radius, Machine, Move, Position};
use crate::config::{float_cmp, DEFAULT_SAFE_HEIGHT, WORD_LINEAR, WORD_RAPID};
use crate::model::{Axis, Command, Motion, Program};

/// Geometry of one cutting primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Plunge without lateral motion (drill or touch).
    Point((f64, f64)),
    /// Straight cut.
    Line { start: (f64, f64), end: (f64, f64) },
    /// Circular cut about an absolute centre.
    Arc {
        start: (f64, f64),
        end: (f64, f64),
        center: (f64, f64),
        motion: Motion,
    },
}

/// A cutting move with the depth and feeds it was made at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primitive {
    pub shape: Shape,
    pub depth: f64,
    /// Feed in effect for the cut itself.
    pub feed: Option<f64>,
    /// Feed of the last downward Z move before the cut.
    pub plunge_feed: Option<f64>,
}

impl Primitive {
    pub fn start(&self) -> (f64, f64) {
        match self.shape {
            Shape::Point(at) => at,
            Shape::Line { start, .. } | Shape::Arc { start, .. } => start,
        }
    }

    pub fn end(&self) -> (f64, f64) {
        match self.shape {
            Shape::Point(at) => at,
            Shape::Line { end, .. } | Shape::Arc { end, .. } => end,
        }
    }

    /// The same cut traversed the other way. Arcs also change winding.
    pub fn reversed(&self) -> Self {
        let shape = match self.shape {
            Shape::Point(at) => Shape::Point(at),
            Shape::Line { start, end } => Shape::Line {
                start: end,
                end: start,
            },
            Shape::Arc {
                start,
                end,
                center,
                motion,
            } => Shape::Arc {
                start: end,
                end: start,
                center,
                motion: motion.reversed(),
            },
        };
        Self { shape, ..*self }
    }
}

/// A program taken apart for re-sequencing.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Commands before the first plunge.
    pub prefix: Vec<Command>,
    /// Cutting primitives in original order.
    pub primitives: Vec<Primitive>,
    /// Commands after the last retract.
    pub suffix: Vec<Command>,
    /// Tool position when the prefix ends.
    pub start: (f64, f64),
    /// Lowest Z seen.
    pub min_z: Option<f64>,
    /// Highest Z seen.
    pub max_z: Option<f64>,
    /// Non-motion commands between the first plunge and the last retract.
    pub dropped: usize,
}

/// Summary of one optimizer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OptimizeReport {
    pub primitives: usize,
    pub cut_depth: Option<f64>,
    pub safe_height: f64,
    pub travel_before: f64,
    pub travel_after: f64,
    pub dropped: usize,
}

fn xy(position: Position) -> (f64, f64) {
    (position.x.unwrap_or(0.0), position.y.unwrap_or(0.0))
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (b.0 - a.0).hypot(b.1 - a.1)
}

fn shape_of(mv: &Move, command: &Command) -> Option<Shape> {
    let (start, end) = (xy(mv.from), xy(mv.to));

    if !mv.motion.is_arc() {
        return (!float_cmp::same_point(start, end)).then_some(Shape::Line { start, end });
    }

    let center = if command.has(Axis::I) || command.has(Axis::J) {
        (
            start.0 + command.get(Axis::I).unwrap_or(0.0),
            start.1 + command.get(Axis::J).unwrap_or(0.0),
        )
    } else if let Some(radius) = command.get(Axis::R) {
        match center_from_radius(start, end, radius, mv.motion) {
            Ok(center) => center,
            Err(err) => {
                warn!("Arc '{}' dropped: {}", command, err);
                return None;
            }
        }
    } else {
        warn!("Arc '{}' has no centre, cut as a line", command);
        return (!float_cmp::same_point(start, end)).then_some(Shape::Line { start, end });
    };

    Some(Shape::Arc {
        start,
        end,
        center,
        motion: mv.motion,
    })
}

/// Split a program into prefix, primitives and suffix.
///
/// The tool starts at the origin with Z = 0. A move going from Z >= 0 to
/// Z < 0 is a plunge, the reverse a retract. Every lateral move made below
/// the surface becomes a primitive; a plunge followed by a retract without
/// lateral motion becomes a [`Shape::Point`].
pub fn extract(program: &Program) -> Extraction {
    let mut machine = Machine::starting_at(Position::at(0.0, 0.0, 0.0));
    let mut extraction = Extraction::default();
    let mut started = false;
    let mut cut_since_plunge = false;
    let mut plunge_feed = None;
    let mut pending: Vec<Command> = Vec::new();
    let mut pending_notes = 0;

    for command in program {
        if let Some(z) = command.get(Axis::Z) {
            extraction.min_z = Some(extraction.min_z.map_or(z, |m| m.min(z)));
            extraction.max_z = Some(extraction.max_z.map_or(z, |m| m.max(z)));
        }

        let Some(mv) = machine.step(command) else {
            if !started {
                extraction.prefix.push(command.clone());
            } else if machine.position().z.unwrap_or(0.0) < 0.0 {
                extraction.dropped += 1;
            } else {
                pending.push(command.clone());
                pending_notes += 1;
            }
            continue;
        };

        let was_engaged = mv.from.z.unwrap_or(0.0) < 0.0;
        let engaged = mv.to.z.unwrap_or(0.0) < 0.0;
        if engaged && mv.to.z.unwrap_or(0.0) < mv.from.z.unwrap_or(0.0) {
            plunge_feed = mv.feed;
        }

        if !started && !engaged {
            extraction.prefix.push(command.clone());
            continue;
        }

        if !was_engaged && engaged {
            if !started {
                started = true;
                extraction.start = xy(mv.from);
            }
            extraction.dropped += pending_notes;
            pending.clear();
            pending_notes = 0;
            cut_since_plunge = false;
        }

        if engaged {
            if let Some(shape) = shape_of(&mv, command) {
                extraction.primitives.push(Primitive {
                    shape,
                    depth: mv.to.z.unwrap_or(0.0),
                    feed: mv.feed,
                    plunge_feed,
                });
                cut_since_plunge = true;
            }
        } else if was_engaged {
            if !cut_since_plunge {
                extraction.primitives.push(Primitive {
                    shape: Shape::Point(xy(mv.from)),
                    depth: mv.from.z.unwrap_or(0.0),
                    feed: mv.feed,
                    plunge_feed,
                });
            }
        } else {
            pending.push(command.clone());
        }
    }

    let last = machine.position();
    if started && last.z.unwrap_or(0.0) < 0.0 && !cut_since_plunge {
        extraction.primitives.push(Primitive {
            shape: Shape::Point(xy(last)),
            depth: last.z.unwrap_or(0.0),
            feed: machine.feed(),
            plunge_feed,
        });
    }
    extraction.suffix = pending;

    extraction
}

/// Order primitives by nearest endpoint, starting from `start`.
///
/// Distances are compared strictly, so on a tie the primitive earliest in
/// the input wins, and its start point wins over its end point.
pub fn sequence(primitives: &[Primitive], start: (f64, f64)) -> Vec<Primitive> {
    let mut remaining = primitives.to_vec();
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut current = start;

    while !remaining.is_empty() {
        let mut best_idx = 0;
        let mut reverse = false;
        let mut best_dist = f64::INFINITY;

        for (i, primitive) in remaining.iter().enumerate() {
            let to_start = distance(current, primitive.start());
            if to_start < best_dist {
                best_dist = to_start;
                best_idx = i;
                reverse = false;
            }
            let to_end = distance(current, primitive.end());
            if to_end < best_dist {
                best_dist = to_end;
                best_idx = i;
                reverse = true;
            }
        }

        let next = remaining.remove(best_idx);
        let next = if reverse { next.reversed() } else { next };
        current = next.end();
        ordered.push(next);
    }

    ordered
}

/// Writes the re-sequenced program.
struct Emitter {
    out: Program,
    position: (f64, f64),
    engaged: Option<f64>,
    feed: Option<f64>,
    safe: f64,
}

impl Emitter {
    fn push(&mut self, command: Command) {
        self.out.append(command);
    }

    fn with_feed(&mut self, mut command: Command, feed: Option<f64>) -> Command {
        if let Some(f) = feed {
            if self.feed.is_none_or(|current| !float_cmp::approx_eq(current, f)) {
                command.set(Axis::F, f);
                self.feed = Some(f);
            }
        }
        command
    }

    fn retract(&mut self) {
        if self.engaged.take().is_some() {
            self.push(Command::new(WORD_RAPID).with(Axis::Z, self.safe));
        }
    }

    fn plunge(&mut self, depth: f64, feed: Option<f64>) {
        let command = self.with_feed(Command::new(WORD_LINEAR).with(Axis::Z, depth), feed);
        self.push(command);
        self.engaged = Some(depth);
    }

    fn cut(&mut self, primitive: &Primitive) {
        let entry = primitive.start();
        let moved = !float_cmp::same_point(self.position, entry);

        if moved || self.engaged.is_none() {
            self.retract();
            if moved {
                self.push(
                    Command::new(WORD_RAPID)
                        .with(Axis::X, entry.0)
                        .with(Axis::Y, entry.1),
                );
            }
            self.plunge(primitive.depth, primitive.plunge_feed.or(primitive.feed));
        } else if self
            .engaged
            .is_some_and(|z| !float_cmp::approx_eq(z, primitive.depth))
        {
            self.plunge(primitive.depth, primitive.plunge_feed.or(primitive.feed));
        }

        match primitive.shape {
            Shape::Point(_) => self.retract(),
            Shape::Line { end, .. } => {
                let command = Command::new(WORD_LINEAR)
                    .with(Axis::X, end.0)
                    .with(Axis::Y, end.1);
                let command = self.with_feed(command, primitive.feed);
                self.push(command);
            }
            Shape::Arc {
                start,
                end,
                center,
                motion,
            } => {
                let command = Command::new(motion.word())
                    .with(Axis::X, end.0)
                    .with(Axis::Y, end.1)
                    .with(Axis::I, center.0 - start.0)
                    .with(Axis::J, center.1 - start.1);
                let command = self.with_feed(command, primitive.feed);
                self.push(command);
            }
        }

        self.position = primitive.end();
    }
}

/// Re-sequence a program to reduce travel between cuts.
pub fn optimize(program: &Program) -> Program {
    optimize_with_report(program).0
}

/// Re-sequence a program and report what was done.
///
/// The safe height is the highest Z in the source, or the default when the
/// source never rises above the surface.
pub fn optimize_with_report(program: &Program) -> (Program, OptimizeReport) {
    let extraction = extract(program);
    let safe = extraction
        .max_z
        .filter(|z| *z > 0.0)
        .unwrap_or(DEFAULT_SAFE_HEIGHT);

    let mut emitter = Emitter {
        out: Program::normalized(program.units()),
        position: extraction.start,
        engaged: None,
        feed: None,
        safe,
    };

    for command in &extraction.prefix {
        emitter.push(command.clone());
    }
    for primitive in sequence(&extraction.primitives, extraction.start) {
        emitter.cut(&primitive);
    }
    emitter.retract();
    for command in &extraction.suffix {
        emitter.push(command.clone());
    }

    let out = emitter.out;
    let report = OptimizeReport {
        primitives: extraction.primitives.len(),
        cut_depth: extraction.min_z.filter(|z| *z < 0.0),
        safe_height: safe,
        travel_before: air_travel(program),
        travel_after: air_travel(&out),
        dropped: extraction.dropped,
    };

    debug!(
        "Re-sequenced {} primitive(s): travel {:.4} -> {:.4}",
        report.primitives, report.travel_before, report.travel_after
    );

    (out, report)
}

/// Total X/Y distance moved with the tool at or above the surface.
pub fn air_travel(program: &Program) -> f64 {
    let mut machine = Machine::starting_at(Position::at(0.0, 0.0, 0.0));
    program
        .iter()
        .filter_map(|command| machine.step(command))
        .filter(|mv| mv.from.z.unwrap_or(0.0) >= 0.0 && mv.to.z.unwrap_or(0.0) >= 0.0)
        .map(|mv| mv.lateral_distance())
        .sum()
}
