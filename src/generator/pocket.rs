//! Rectangular pocket generators.
//!
//! Both generators clear a `width` x `height` rectangle whose lower-left
//! corner is at the origin, keeping the tool centre half a tool diameter
//! inside the edges. Neighbouring passes overlap by a fifth of the tool.

use tracing::{debug, warn};

use crate::config::{DEFAULT_SAFE_HEIGHT, EPS, WORD_END, WORD_LINEAR, WORD_MM, WORD_RAPID};
use crate::error::{GcodeError, Result};
use crate::model::{Axis, Command, Program};

const OVERLAP: f64 = 0.2;
const MOVE_FEED: f64 = 250.0;
const CUT_FEED: f64 = 120.0;
const INSERT_FEED: f64 = 25.4;

/// Dimensions and depths of a rectangular pocket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pocket {
    pub width: f64,
    pub height: f64,
    /// Tool diameter.
    pub tool: f64,
    /// Cutting depth, below zero.
    pub cut: f64,
    /// Travel height.
    pub safe: f64,
}

impl Pocket {
    /// Pocket cut 1mm deep with a 3mm tool.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            tool: 3.0,
            cut: -1.0,
            safe: DEFAULT_SAFE_HEIGHT,
        }
    }

    pub fn with_tool(mut self, tool: f64) -> Self {
        self.tool = tool;
        self
    }

    pub fn with_depths(mut self, cut: f64, safe: f64) -> Self {
        self.cut = cut;
        self.safe = safe;
        self
    }

    fn check(&self) -> Result<()> {
        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("tool", self.tool),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(GcodeError::InvalidDimension {
                    name: name.to_string(),
                    value,
                });
            }
        }
        if self.cut >= 0.0 {
            warn!("Cut depth {} does not go below the surface", self.cut);
        }
        Ok(())
    }

    /// Distance between neighbouring passes.
    fn step(&self) -> f64 {
        (1.0 - OVERLAP) * self.tool
    }
}

/// Program under construction, framed by spindle start and stop.
struct PocketProgram {
    program: Program,
    cut: f64,
    safe: f64,
}

impl PocketProgram {
    fn start(pocket: &Pocket) -> Self {
        let mut program = Program::new();
        for command in [
            Command::new(WORD_MM).with_comment("(Use mm)"),
            Command::new("G90").with_comment("(Set Absolute Coordinates)"),
            Command::new("G17").with_comment("(XY plane selection)"),
            Command::new(WORD_RAPID).with(Axis::Z, pocket.safe),
            Command::new(WORD_RAPID)
                .with(Axis::X, 0.0)
                .with(Axis::Y, 0.0),
            Command::new("M03").with_comment("(Start spindle)"),
            Command::new("G04")
                .with(Axis::P, 1.0)
                .with_comment("(Pause to let the spindle start)"),
        ] {
            program.append(command);
        }
        Self {
            program,
            cut: pocket.cut,
            safe: pocket.safe,
        }
    }

    fn note(&mut self, text: &str) {
        self.program
            .append(Command::default().with_comment(format!("({})", text)));
    }

    fn penetrate(&mut self, x: f64, y: f64) {
        self.program.append(
            Command::new(WORD_RAPID)
                .with(Axis::X, x)
                .with(Axis::Y, y)
                .with(Axis::F, MOVE_FEED),
        );
        self.note("Penetrate");
        self.program.append(
            Command::new(WORD_LINEAR)
                .with(Axis::Z, self.cut)
                .with(Axis::F, INSERT_FEED),
        );
        self.note("Cut");
    }

    /// Straight cut; the feed is only written when it changes.
    fn cut_to(&mut self, x: f64, y: f64, feed: Option<f64>) {
        let mut command = Command::new(WORD_LINEAR)
            .with(Axis::X, x)
            .with(Axis::Y, y);
        command.put(Axis::F, feed);
        self.program.append(command);
    }

    fn retract(&mut self) {
        self.note("Retract");
        self.program.append(
            Command::new(WORD_RAPID)
                .with(Axis::Z, self.safe)
                .with(Axis::F, MOVE_FEED),
        );
    }

    fn finish(mut self) -> Program {
        self.note("Operation complete");
        for command in [
            Command::new("M05").with_comment("(Stop spindle)"),
            Command::new(WORD_RAPID)
                .with(Axis::X, 0.0)
                .with(Axis::Y, 0.0),
            Command::new(WORD_END).with_comment("(Program End)"),
        ] {
            self.program.append(command);
        }
        self.program
    }
}

/// Clear a pocket with concentric rectangular rings, outside in.
///
/// When the remaining area is too small for another ring but not empty, a
/// single straight cut along its longer side finishes it.
pub fn area_cut(pocket: &Pocket) -> Result<Program> {
    pocket.check()?;

    let half = pocket.tool / 2.0;
    let step = pocket.step();
    let mut out = PocketProgram::start(pocket);

    let (mut width, mut height) = (pocket.width, pocket.height);
    let (mut x1, mut y1) = (half, half);
    let (mut x2, mut y2) = (pocket.width - half, pocket.height - half);
    let mut rings = 0;

    while width >= pocket.tool && height >= pocket.tool {
        out.penetrate(x1, y1);
        out.cut_to(x2, y1, Some(CUT_FEED));
        out.cut_to(x2, y2, None);
        out.cut_to(x1, y2, None);
        out.cut_to(x1, y1, None);
        out.retract();

        width -= 2.0 * step;
        height -= 2.0 * step;
        x1 += step;
        x2 -= step;
        y1 += step;
        y2 -= step;
        rings += 1;
    }

    if width > 0.0 && height > 0.0 {
        if width < pocket.tool {
            x1 = pocket.width / 2.0;
            x2 = x1;
        } else {
            y1 = pocket.height / 2.0;
            y2 = y1;
        }
        out.penetrate(x1, y1);
        out.cut_to(x2, y2, Some(CUT_FEED));
        out.retract();
    }

    debug!("Area cut {}x{}: {} ring(s)", pocket.width, pocket.height, rings);
    Ok(out.finish())
}

/// Clear a pocket from a vertical centre line outwards.
///
/// After the centre line, each row is cut from the centre to the left edge
/// and then from the centre to the right edge, bottom row first. The top row
/// is always cut at the top edge.
pub fn center_cut(pocket: &Pocket) -> Result<Program> {
    pocket.check()?;

    let half = pocket.tool / 2.0;
    let center = pocket.width / 2.0;
    let (left, right) = (half, pocket.width - half);
    let top = pocket.height - half;
    let mut out = PocketProgram::start(pocket);

    out.note("Center line");
    out.penetrate(center, top);
    out.cut_to(center, half, Some(CUT_FEED));
    out.retract();

    let mut rows = Vec::new();
    let mut current = half;
    while current < top - EPS {
        rows.push(current);
        current += pocket.step();
    }
    rows.push(top);

    for &y in &rows {
        for x in [left, right] {
            out.penetrate(center, y);
            out.cut_to(x, y, Some(CUT_FEED));
            out.retract();
        }
    }

    debug!("Centre cut {}x{}: {} row(s)", pocket.width, pocket.height, rows.len());
    Ok(out.finish())
}
