//! G-code text generation.

use std::fmt::Write;

use crate::config::DECIMALS;
use crate::model::{Command, Program};

/// G-code writer accumulating lines into a buffer.
pub struct GcodeWriter {
    /// Output buffer.
    buffer: String,
    /// Number of lines written.
    lines: usize,
}

impl GcodeWriter {
    /// Create a new G-code writer.
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            lines: 0,
        }
    }

    /// Number of lines written so far.
    pub fn line_count(&self) -> usize {
        self.lines
    }

    /// Get the generated G-code.
    pub fn output(&self) -> &str {
        &self.buffer
    }

    /// Take the generated G-code.
    pub fn take_output(self) -> String {
        self.buffer
    }

    /// Write a line verbatim.
    pub fn write_raw(&mut self, content: &str) {
        // Writing to a String cannot fail.
        let _ = writeln!(self.buffer, "{}", content);
        self.lines += 1;
    }

    /// Write a block of text (prefix/suffix boilerplate), trimmed, one line
    /// per input line. Empty blocks write nothing.
    pub fn write_block(&mut self, block: &str) {
        let block = block.trim();
        if block.is_empty() {
            return;
        }
        for line in block.lines() {
            self.write_raw(line.trim_end());
        }
    }

    /// Write a comment line.
    pub fn write_comment(&mut self, comment: &str) {
        self.write_raw(&format!("({})", comment));
    }

    /// Write one command.
    pub fn write_command(&mut self, command: &Command) {
        self.write_raw(&command.to_string());
    }

    /// Write every command of a program.
    pub fn write_program(&mut self, program: &Program) {
        for command in program {
            self.write_command(command);
        }
    }
}

impl Default for GcodeWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a parameter value for G-code output.
///
/// Always four decimal places. Values that round to zero are written without
/// a sign, so `-0.00001` becomes `0.0000`.
pub fn format_value(value: f64) -> String {
    let formatted = format!("{:.prec$}", value, prec = DECIMALS);
    match formatted.strip_prefix('-') {
        Some(unsigned) if unsigned.bytes().all(|b| b == b'0' || b == b'.') => unsigned.to_string(),
        _ => formatted,
    }
}

/// Serialise a program, one command per line.
pub fn serialize_program(program: &Program) -> String {
    let mut writer = GcodeWriter::new();
    writer.write_program(program);
    writer.take_output()
}

/// Serialise a program wrapped in prefix and suffix boilerplate.
pub fn serialize_with(program: &Program, prefix: &str, suffix: &str) -> String {
    let mut writer = GcodeWriter::new();
    writer.write_block(prefix);
    writer.write_program(program);
    writer.write_block(suffix);
    writer.take_output()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(0.0), "0.0000");
        assert_eq!(format_value(1.0), "1.0000");
        assert_eq!(format_value(1.5), "1.5000");
        assert_eq!(format_value(-2.25), "-2.2500");
        assert_eq!(format_value(129.46062992), "129.4606");
        assert_eq!(format_value(0.00006), "0.0001");
        assert_eq!(format_value(-0.00001), "0.0000");
        assert_eq!(format_value(-0.0), "0.0000");
    }

    #[test]
    fn test_gcode_writer() {
        use crate::model::Axis;

        let mut writer = GcodeWriter::new();
        writer.write_comment("header");
        writer.write_command(&Command::new("G00").with(Axis::X, 1.0).with(Axis::Y, 2.0));
        writer.write_block("  G01 Z-0.5  \n\n");

        assert_eq!(writer.line_count(), 3);
        assert_eq!(
            writer.output(),
            "(header)\nG00 X1.0000 Y2.0000\nG01 Z-0.5\n"
        );
    }

    #[test]
    fn test_serialize_with_boilerplate() {
        let program = parse_program("G01 X1");
        let text = serialize_with(&program, "\nG21\nG90\n", "");
        assert_eq!(text, "G21\nG90\nG01 X1.0000\n");
    }

    #[test]
    fn test_serialize_program_round_trip() {
        let source = "G21\nG00 Z3.0000 (safe)\nG02 X1.0000 Y1.0000 I0.5000 J0.5000\nM02\n";
        let program = parse_program(source);
        assert_eq!(serialize_program(&program), source);
    }
}
