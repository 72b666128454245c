//! Splitting a cut into several shallower passes.

use tracing::debug;

use super::{FilterChain, ZLevel};
use crate::config::EPS;
use crate::model::Program;

/// Depth of every pass needed to reach `cut` without removing more than
/// `step` per pass. Both are negative; the passes are evenly spaced and the
/// last one ends exactly at `cut`.
///
/// A non-negative `step`, or a `cut` no deeper than `step`, gives one pass.
pub fn pass_depths(cut: f64, step: f64) -> Vec<f64> {
    let passes = if step < 0.0 && cut < step {
        ((cut / step) - EPS).ceil().max(1.0) as usize
    } else {
        1
    };
    (1..=passes)
        .map(|k| cut * k as f64 / passes as f64)
        .collect()
}

/// Repeat a program once per pass, each copy with its cutting moves at the
/// pass depth and its travel moves at `safe`.
pub fn multipass(program: &Program, cut: f64, safe: f64, step: f64) -> Program {
    let mut result = Program::normalized(program.units());
    for depth in pass_depths(cut, step) {
        debug!("Generating pass at Z = {:.4}", depth);
        let mut chain = FilterChain::new().with(ZLevel::new(Some(depth), Some(safe)));
        result.extend(&program.clone_with(&mut chain));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Axis;
    use crate::parser::parse_program;

    #[test]
    fn test_pass_depths() {
        assert_eq!(pass_depths(-2.0, -1.0), vec![-1.0, -2.0]);
        assert_eq!(pass_depths(-2.5, -1.0), vec![-2.5 / 3.0, -5.0 / 3.0, -2.5]);
        assert_eq!(pass_depths(-0.5, -1.0), vec![-0.5]);
        assert_eq!(pass_depths(-1.0, -1.0), vec![-1.0]);
        assert_eq!(pass_depths(-3.0, 0.0), vec![-3.0]);
    }

    #[test]
    fn test_multipass_repeats_program() {
        let program = parse_program("G00 Z5\nG01 Z-0.1\nG01 X10\nG00 Z5\n");
        let result = multipass(&program, -2.0, 3.0, -1.0);

        assert_eq!(result.len(), 8);
        let zs: Vec<f64> = result.iter().filter_map(|c| c.get(Axis::Z)).collect();
        assert_eq!(zs, vec![3.0, -1.0, 3.0, 3.0, -2.0, 3.0]);
        assert_eq!(result.bounds().z.min, Some(-2.0));
        assert_eq!(program.bounds().z.min, Some(-0.1));
    }
}
