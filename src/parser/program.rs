//! Whole-program parser with optional line window.

use tracing::{debug, warn};

use super::line::parse_line;
use crate::config::{Units, WORD_END, WORD_RAPID};
use crate::error::GcodeError;
use crate::model::{Axis, Command, Program};

/// Restricts parsing to the commands between two marker commands.
///
/// Commands are accepted after one matching `start` (or from the beginning
/// when there is no start marker) until one matching `end`. The markers
/// themselves are kept only when `inclusive` is set. Matching ignores comments.
#[derive(Debug, Clone)]
pub struct CommandWindow {
    start: Option<Command>,
    end: Option<Command>,
    inclusive: bool,
    accepting: bool,
}

impl CommandWindow {
    /// Create a window between two optional markers.
    pub fn new(start: Option<Command>, end: Option<Command>, inclusive: bool) -> Self {
        let accepting = start.is_none();
        Self {
            start,
            end,
            inclusive,
            accepting,
        }
    }

    /// Window that strips the usual generator boilerplate: everything up to
    /// and including `G00 X0 Y0`, and everything from `M02` onwards.
    pub fn boilerplate() -> Self {
        let home = Command::new(WORD_RAPID).with(Axis::X, 0.0).with(Axis::Y, 0.0);
        Self::new(Some(home), Some(Command::new(WORD_END)), false)
    }

    /// Decide whether a command is inside the window.
    pub fn accept(&mut self, command: &Command) -> bool {
        if self.accepting {
            if self.end.as_ref().is_some_and(|end| end.matches(command)) {
                self.accepting = false;
                return self.inclusive;
            }
            true
        } else {
            if self.start.as_ref().is_some_and(|start| start.matches(command)) {
                self.accepting = true;
                return self.inclusive;
            }
            false
        }
    }

    /// Rewind to the state before the first line.
    pub fn reset(&mut self) {
        self.accepting = self.start.is_none();
    }
}

/// A line that was dropped because it could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLine {
    /// 1-based line number.
    pub line: usize,
    /// Original text.
    pub text: String,
    /// Why the line was dropped.
    pub error: GcodeError,
}

/// Result of parsing a document.
#[derive(Debug, Clone, Default)]
pub struct Parsed {
    /// The parsed program.
    pub program: Program,
    /// Lines dropped as malformed.
    pub skipped: Vec<SkippedLine>,
}

/// G-code document parser.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    window: Option<CommandWindow>,
}

impl Parser {
    /// Create a parser that accepts every line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only keep the commands inside the given window.
    pub fn with_window(mut self, window: CommandWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Parse a whole document.
    ///
    /// Malformed lines are dropped and reported in [`Parsed::skipped`]; they
    /// never abort the parse. Unit markers outside the window still select
    /// the unit mode.
    pub fn parse(&mut self, text: &str) -> Parsed {
        let mut parsed = Parsed::default();

        if let Some(window) = self.window.as_mut() {
            window.reset();
        }

        for (idx, raw) in text.lines().enumerate() {
            let command = match parse_line(raw) {
                Ok(command) => command,
                Err(error) => {
                    warn!("Line {}: {} - line ignored", idx + 1, error);
                    parsed.skipped.push(SkippedLine {
                        line: idx + 1,
                        text: raw.to_string(),
                        error,
                    });
                    continue;
                }
            };

            let accepted = self
                .window
                .as_mut()
                .is_none_or(|window| window.accept(&command));

            if accepted {
                parsed.program.append(command);
            } else if let Some(mode) = Units::from_word(&command.word) {
                parsed.program.select_units(mode);
            }
        }

        debug!(
            "Parsed {} command(s), skipped {} line(s)",
            parsed.program.len(),
            parsed.skipped.len()
        );

        parsed
    }
}

/// Parse a whole document into a program.
pub fn parse_program(text: &str) -> Program {
    Parser::new().parse(text).program
}
