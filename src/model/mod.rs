//! Data model types for G-code programs.

mod command;
mod program;

pub use command::{Axis, Command, Motion};
pub use program::{AxisRange, Bounds, Program, CONVERTED_COMMENT};
