//! Single-line tokenizer for G-code text.

use tracing::trace;

use crate::error::{GcodeError, Result};
use crate::model::{Axis, Command};

/// A `<letter><signed-decimal>` word found on a line.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Upper-cased letter.
    pub letter: char,
    /// Numeric value.
    pub value: f64,
    /// 1-based column of the letter.
    pub column: usize,
}

/// Parse one line of text into a command.
///
/// Comments in parentheses may appear anywhere on the line; all of them are
/// kept, joined by a space, as the command comment. An unterminated `(` takes
/// the rest of the line. A `;` starts a comment running to the end of the line.
/// Lines starting with `%` are tape markers and are kept whole as a comment.
///
/// The first token is the command word unless its letter is an axis letter,
/// in which case the line is a modal continuation with an empty word. Leading
/// line numbers (`N` words) are discarded. When an axis letter repeats, the
/// last occurrence wins.
pub fn parse_line(raw: &str) -> Result<Command> {
    let line = raw.trim();

    if line.starts_with('%') {
        return Ok(Command::default().with_comment(line));
    }

    let (code, comment) = split_comments(line)?;
    let tokens = tokenize(&code)?;

    let mut command = Command::default();
    command.comment = comment;

    let mut rest = tokens.iter().skip_while(|t| t.letter == 'N').peekable();

    if let Some(first) = rest.peek() {
        if Axis::from_letter(first.letter).is_none() {
            command.word = normalize_word(first.letter, first.value);
            rest.next();
        }
    }

    for token in rest {
        match Axis::from_letter(token.letter) {
            Some(axis) => command.set(axis, token.value),
            None => trace!(
                "Ignoring unsupported word {}{} at column {}",
                token.letter,
                token.value,
                token.column
            ),
        }
    }

    Ok(command)
}

/// Canonical form of a command word: integer codes are zero-padded to two
/// digits ("G1" becomes "G01"); fractional codes keep one decimal ("G38.2").
pub fn normalize_word(letter: char, value: f64) -> String {
    let letter = letter.to_ascii_uppercase();
    if value.fract() == 0.0 {
        format!("{}{:02}", letter, value as i64)
    } else {
        format!("{}{:.1}", letter, value)
    }
}

/// Separate the code part of a line from its comments.
fn split_comments(line: &str) -> Result<(String, Option<String>)> {
    let mut code = String::with_capacity(line.len());
    let mut comments: Vec<&str> = Vec::new();
    let mut rest = line;
    let mut offset = 0;

    loop {
        let open = rest.find('(');
        let semicolon = rest.find(';');
        let close = rest.find(')');

        // A ')' before any '(' or ';' has nothing to close.
        if let Some(c) = close {
            let opener = [open, semicolon].into_iter().flatten().min();
            if opener.is_none_or(|o| c < o) {
                return Err(GcodeError::UnbalancedComment {
                    column: offset + c + 1,
                });
            }
        }

        match (open, semicolon) {
            (Some(o), s) if s.is_none_or(|s| o < s) => {
                code.push_str(&rest[..o]);
                code.push(' ');
                match rest[o..].find(')') {
                    Some(end) => {
                        comments.push(&rest[o..=o + end]);
                        offset += o + end + 1;
                        rest = &rest[o + end + 1..];
                    }
                    None => {
                        comments.push(&rest[o..]);
                        break;
                    }
                }
            }
            (_, Some(s)) => {
                code.push_str(&rest[..s]);
                comments.push(rest[s..].trim_end());
                break;
            }
            _ => {
                code.push_str(rest);
                break;
            }
        }
    }

    let comment = if comments.is_empty() {
        None
    } else {
        Some(comments.join(" "))
    };

    Ok((code, comment))
}

/// Split the code part of a line into tokens by longest match.
pub fn tokenize(code: &str) -> Result<Vec<Token>> {
    let bytes = code.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            let found = code[i..].chars().next().unwrap_or(c);
            return Err(GcodeError::UnexpectedCharacter {
                column: i + 1,
                found,
            });
        }

        let start = i;
        i += 1;
        let number_start = i;

        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let mut digits = 0;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            digits += 1;
        }
        if i < bytes.len() && bytes[i] == b'.' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
                digits += 1;
            }
        }

        let text = &code[number_start..i];
        let value = if digits > 0 {
            text.parse::<f64>().ok()
        } else {
            None
        };

        match value {
            Some(value) => tokens.push(Token {
                letter: c.to_ascii_uppercase(),
                value,
                column: start + 1,
            }),
            None => {
                return Err(GcodeError::InvalidNumber {
                    column: start + 1,
                    token: code[start..i].to_string(),
                })
            }
        }
    }

    Ok(tokens)
}
