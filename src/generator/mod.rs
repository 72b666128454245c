//! G-code text generator module.

mod gcode;
mod pocket;

pub use gcode::{format_value, serialize_program, serialize_with, GcodeWriter};
pub use pocket::{area_cut, center_cut, Pocket};
