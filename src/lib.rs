//! gcode-tools - Parse, transform and optimise G-code toolpaths.
//!
//! Programs are parsed into a unit-normalised [`Program`], transformed by
//! running every command through a [`FilterChain`], and written back out as
//! text. The optimizer re-orders the cutting moves of a finished program to
//! cut down on travel between them.
//!
//! # Example
//!
//! ```
//! use gcode_tools::{optimize, parse_program, serialize_program, FilterChain, Translate};
//!
//! let program = parse_program("G21\nG00 X5 Y5\nG01 Z-1 F100\nG01 X10 Y5\nG00 Z3\n");
//! let mut chain = FilterChain::new().with(Translate::to_origin(&program));
//! let moved = program.clone_with(&mut chain);
//! assert_eq!(moved.bounds().x.min, Some(0.0));
//!
//! let text = serialize_program(&optimize(&moved));
//! assert!(text.starts_with("G21\n"));
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod model;
pub mod parser;
pub mod transform;
pub mod validation;

// Re-exports for convenience
pub use config::{Settings, Units};
pub use error::{ErrorKind, GcodeError, Result};
pub use generator::{
    area_cut, center_cut, serialize_program, serialize_with, GcodeWriter, Pocket,
};
pub use model::{Axis, Bounds, Command, Motion, Program};
pub use parser::{parse_line, parse_program, CommandWindow, Parser};
pub use transform::{
    multipass, optimize, optimize_with_report, ArcCorrector, Emit, Filter, FilterChain, Flip,
    Rotate, SwapXY, Translate, ZLevel,
};
pub use validation::{validate_program, ValidationResult};

/// Parse several documents with the generator boilerplate stripped from each
/// and join them into one program.
///
/// Each document keeps only what lies between its `G00 X0 Y0` and `M02`
/// lines; see [`CommandWindow::boilerplate`].
pub fn merge_documents<'a>(documents: impl IntoIterator<Item = &'a str>) -> Program {
    let mut merged = Program::new();
    for text in documents {
        let parsed = Parser::new()
            .with_window(CommandWindow::boilerplate())
            .parse(text);
        merged.extend(&parsed.program);
    }
    merged
}
