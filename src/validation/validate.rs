//! Sanity checks on parsed programs.

use std::fmt;

use crate::config::{Units, ARC_RADIUS_TOLERANCE};
use crate::model::{Axis, Program};
use crate::transform::Machine;

/// Problems found in a program.
///
/// Errors fail the check; warnings describe input the transforms can work
/// around. Messages about one command are prefixed with its 1-based number.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    /// False once any error is recorded.
    pub passed: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self {
            passed: true,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning, about one command or the whole program.
    pub fn warn(&mut self, command: Option<usize>, message: impl fmt::Display) {
        self.warnings.push(located(command, message));
    }

    /// Record an error against one command.
    pub fn fail(&mut self, command: usize, message: impl fmt::Display) {
        self.errors.push(located(Some(command), message));
        self.passed = false;
    }

    /// Passed without any warning.
    pub fn is_clean(&self) -> bool {
        self.passed && self.warnings.is_empty()
    }
}

fn located(command: Option<usize>, message: impl fmt::Display) -> String {
    match command {
        Some(num) => format!("Command {}: {}", num, message),
        None => message.to_string(),
    }
}

/// Validate a program.
///
/// Only an arc with no centre at all is an error; everything else the
/// transforms can cope with is reported as a warning.
pub fn validate_program(program: &Program) -> ValidationResult {
    let mut result = ValidationResult::new();

    if program.units() == Units::Unspecified {
        result.warn(None, "No unit marker (G20/G21); values taken as millimetres");
    }

    check_arcs(program, &mut result);

    let cuts = program.bounds().z.min.is_some_and(|z| z < 0.0);
    if !cuts {
        result.warn(None, "No move goes below Z0; nothing would be cut");
    }

    result
}

/// Check every arc for a usable, consistent centre.
pub fn validate_arcs(program: &Program) -> ValidationResult {
    let mut result = ValidationResult::new();
    check_arcs(program, &mut result);
    result
}

fn check_arcs(program: &Program, result: &mut ValidationResult) {
    let mut machine = Machine::new();

    for (idx, command) in program.iter().enumerate() {
        let num = idx + 1;
        let Some(mv) = machine.step(command) else {
            continue;
        };
        if !mv.motion.is_arc() {
            continue;
        }

        if !command.has(Axis::I) && !command.has(Axis::J) {
            match command.get(Axis::R) {
                Some(r) => result.warn(
                    Some(num),
                    format!("Arc given by radius (R{}); centre correction will skip it", r),
                ),
                None => result.fail(num, "Arc without centre (no I/J or R)"),
            }
            continue;
        }

        let (Some(start), Some(end)) = (mv.from.xy(), mv.to.xy()) else {
            result.warn(Some(num), "Arc start point unknown");
            continue;
        };

        let center = (
            start.0 + command.get(Axis::I).unwrap_or(0.0),
            start.1 + command.get(Axis::J).unwrap_or(0.0),
        );
        let r_start = (start.0 - center.0).hypot(start.1 - center.1);
        let r_end = (end.0 - center.0).hypot(end.1 - center.1);
        let diff = (r_start - r_end).abs();

        if diff > ARC_RADIUS_TOLERANCE {
            result.warn(
                Some(num),
                format!("Arc radius differs by {:.4} between start and end", diff),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    #[test]
    fn test_valid_program() {
        let program = parse_program("G21\nG00 X0 Y0\nG01 Z-1\nG02 X10 Y0 I5 J0\nG00 Z3\n");
        let result = validate_program(&program);
        assert!(result.passed);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn test_warnings() {
        let program = parse_program("G00 X0 Y0\nG02 X10 Y0.2 I5 J0.5\nG03 X0 Y0 R5\n");
        let result = validate_program(&program);
        assert!(result.passed);
        assert_eq!(result.warnings.len(), 4);
        assert!(result.warnings[0].contains("unit marker"));
        assert!(result.warnings[1].starts_with("Command 2: Arc radius differs"));
        assert!(result.warnings[2].contains("R5"));
        assert!(result.warnings[3].contains("below Z0"));
    }

    #[test]
    fn test_unknown_start_warned() {
        let result = validate_arcs(&parse_program("G02 X1 Y1 I1 J0\n"));
        assert!(result.passed);
        assert_eq!(result.warnings, vec!["Command 1: Arc start point unknown"]);
    }

    #[test]
    fn test_arc_without_centre_is_error() {
        let program = parse_program("G21\nG00 X0 Y0\nG01 Z-1\nG02 X4 Y0\n");
        let result = validate_program(&program);
        assert!(!result.passed);
        assert_eq!(result.errors, vec!["Command 4: Arc without centre (no I/J or R)"]);
    }

    #[test]
    fn test_result_messages() {
        let mut result = ValidationResult::new();
        assert!(result.is_clean());

        result.warn(None, "odd");
        assert!(result.passed);
        assert!(!result.is_clean());

        result.fail(7, "bad");
        assert!(!result.passed);
        assert_eq!(result.warnings, vec!["odd"]);
        assert_eq!(result.errors, vec!["Command 7: bad"]);
    }

    #[test]
    fn test_modal_arc_checked() {
        let program = parse_program("G00 X0 Y0\nG02 X10 Y0 I5 J0\nX20 Y0.2 I5 J0.5\n");
        let result = validate_arcs(&program);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].starts_with("Command 3: Arc radius differs"));
    }
}
