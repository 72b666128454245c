//! A single machine instruction: command word, axis parameters and comment.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{float_cmp, WORD_ARC_CCW, WORD_ARC_CW, WORD_LINEAR, WORD_RAPID};
use crate::generator::format_value;

/// Parameter letters retained on a command, in canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
    I,
    J,
    K,
    R,
    F,
    P,
}

impl Axis {
    /// All axes in canonical order.
    pub const ALL: [Axis; 9] = [
        Axis::X,
        Axis::Y,
        Axis::Z,
        Axis::I,
        Axis::J,
        Axis::K,
        Axis::R,
        Axis::F,
        Axis::P,
    ];

    /// Axes holding lengths, which are converted when the unit mode is inch.
    pub const LENGTHS: [Axis; 7] = [
        Axis::X,
        Axis::Y,
        Axis::Z,
        Axis::I,
        Axis::J,
        Axis::K,
        Axis::R,
    ];

    /// Look up an axis by its (case-insensitive) letter.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'X' => Some(Axis::X),
            'Y' => Some(Axis::Y),
            'Z' => Some(Axis::Z),
            'I' => Some(Axis::I),
            'J' => Some(Axis::J),
            'K' => Some(Axis::K),
            'R' => Some(Axis::R),
            'F' => Some(Axis::F),
            'P' => Some(Axis::P),
            _ => None,
        }
    }

    /// The letter written for this axis.
    pub fn letter(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
            Axis::I => 'I',
            Axis::J => 'J',
            Axis::K => 'K',
            Axis::R => 'R',
            Axis::F => 'F',
            Axis::P => 'P',
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Motion mode selected by a G word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Motion {
    /// Rapid positioning (G00).
    Rapid,
    /// Straight cut (G01).
    Linear,
    /// Clockwise arc (G02).
    ArcCw,
    /// Counter-clockwise arc (G03).
    ArcCcw,
}

impl Motion {
    /// Motion mode for a canonical command word.
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            WORD_RAPID => Some(Motion::Rapid),
            WORD_LINEAR => Some(Motion::Linear),
            WORD_ARC_CW => Some(Motion::ArcCw),
            WORD_ARC_CCW => Some(Motion::ArcCcw),
            _ => None,
        }
    }

    /// Canonical command word.
    pub fn word(self) -> &'static str {
        match self {
            Motion::Rapid => WORD_RAPID,
            Motion::Linear => WORD_LINEAR,
            Motion::ArcCw => WORD_ARC_CW,
            Motion::ArcCcw => WORD_ARC_CCW,
        }
    }

    /// Check if this is an arc.
    pub fn is_arc(self) -> bool {
        matches!(self, Motion::ArcCw | Motion::ArcCcw)
    }

    /// Same motion with the opposite winding. Non-arcs are unchanged.
    pub fn reversed(self) -> Self {
        match self {
            Motion::ArcCw => Motion::ArcCcw,
            Motion::ArcCcw => Motion::ArcCw,
            other => other,
        }
    }
}

/// One line of G-code in structured form.
///
/// Parameters are stored per axis as `Option<f64>`: an absent parameter is
/// distinct from an explicit zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Canonical command word ("G01", "M02", ...). Empty for modal
    /// continuation, blank and comment-only lines.
    pub word: String,
    /// Parameter values indexed by axis.
    params: [Option<f64>; 9],
    /// Trailing comment including its parentheses.
    pub comment: Option<String>,
}

impl Command {
    /// Create a command with the given word and no parameters.
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            ..Default::default()
        }
    }

    /// Builder: set a parameter.
    pub fn with(mut self, axis: Axis, value: f64) -> Self {
        self.set(axis, value);
        self
    }

    /// Builder: set the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Get a parameter value.
    pub fn get(&self, axis: Axis) -> Option<f64> {
        self.params[axis.index()]
    }

    /// Set a parameter value.
    pub fn set(&mut self, axis: Axis, value: f64) {
        self.params[axis.index()] = Some(value);
    }

    /// Replace a parameter with an optional value.
    pub fn put(&mut self, axis: Axis, value: Option<f64>) {
        self.params[axis.index()] = value;
    }

    /// Remove a parameter.
    pub fn clear(&mut self, axis: Axis) {
        self.params[axis.index()] = None;
    }

    /// Check whether a parameter is present.
    pub fn has(&self, axis: Axis) -> bool {
        self.get(axis).is_some()
    }

    /// Exchange two parameters, keeping absence.
    pub fn swap(&mut self, a: Axis, b: Axis) {
        self.params.swap(a.index(), b.index());
    }

    /// Present parameters in canonical order.
    pub fn params(&self) -> impl Iterator<Item = (Axis, f64)> + '_ {
        Axis::ALL
            .iter()
            .filter_map(move |&axis| self.get(axis).map(|v| (axis, v)))
    }

    /// Check if any X/Y/Z coordinate is present.
    pub fn has_position(&self) -> bool {
        self.has(Axis::X) || self.has(Axis::Y) || self.has(Axis::Z)
    }

    /// Motion mode named by this command's word, if any.
    pub fn motion(&self) -> Option<Motion> {
        Motion::from_word(&self.word)
    }

    /// Check if this command is a G02/G03 arc.
    pub fn is_arc(&self) -> bool {
        self.motion().is_some_and(Motion::is_arc)
    }

    /// Check if the line carries nothing but (optionally) a comment.
    pub fn is_blank(&self) -> bool {
        self.word.is_empty() && self.params.iter().all(Option::is_none)
    }

    /// Compare word and parameters, ignoring the comment.
    pub fn matches(&self, other: &Command) -> bool {
        self.word == other.word
            && self
                .params
                .iter()
                .zip(other.params.iter())
                .all(|(a, b)| match (a, b) {
                    (Some(a), Some(b)) => float_cmp::approx_eq(*a, *b),
                    (None, None) => true,
                    _ => false,
                })
    }
}

impl fmt::Display for Command {
    /// Word, present parameters in canonical order at fixed precision, then
    /// the comment.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::with_capacity(11);
        if !self.word.is_empty() {
            parts.push(self.word.clone());
        }
        for (axis, value) in self.params() {
            parts.push(format!("{}{}", axis.letter(), format_value(value)));
        }
        if let Some(comment) = &self.comment {
            parts.push(comment.clone());
        }
        write!(f, "{}", parts.join(" "))
    }
}
