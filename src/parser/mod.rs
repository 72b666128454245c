//! G-code text parser module.

mod line;
mod program;

pub use line::{normalize_word, parse_line, tokenize, Token};
pub use program::{parse_program, CommandWindow, Parsed, Parser, SkippedLine};
