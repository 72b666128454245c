//! Configuration constants and settings for the toolchain.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GcodeError, Result};

/// Floating-point comparison epsilon.
pub const EPS: f64 = 0.0001;

/// Conversion factor: inch to mm.
pub const MM_PER_INCH: f64 = 25.4;

/// Number of decimal places used when writing parameter values.
pub const DECIMALS: usize = 4;

/// Safe height used by the optimiser when the source never retracts above zero.
pub const DEFAULT_SAFE_HEIGHT: f64 = 3.0;

/// Allowed difference between start and end radius before an arc is reported.
pub const ARC_RADIUS_TOLERANCE: f64 = 0.005;

/// Default file name for the settings document.
pub const SETTINGS_FILE: &str = "gcode.json";

/// Rapid positioning.
pub const WORD_RAPID: &str = "G00";
/// Linear interpolation.
pub const WORD_LINEAR: &str = "G01";
/// Clockwise arc.
pub const WORD_ARC_CW: &str = "G02";
/// Counter-clockwise arc.
pub const WORD_ARC_CCW: &str = "G03";
/// Inch unit marker.
pub const WORD_INCH: &str = "G20";
/// Millimetre unit marker.
pub const WORD_MM: &str = "G21";
/// Program end.
pub const WORD_END: &str = "M02";

/// Unit mode declared by a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Units {
    #[default]
    Unspecified,
    Inch,
    Millimetre,
}

impl Units {
    /// Unit mode selected by a command word, if it is a unit marker.
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            WORD_INCH => Some(Units::Inch),
            WORD_MM => Some(Units::Millimetre),
            _ => None,
        }
    }

    /// Get the conversion factor to convert from this unit to millimetres.
    pub fn to_mm_factor(&self) -> f64 {
        match self {
            Units::Inch => MM_PER_INCH,
            Units::Millimetre | Units::Unspecified => 1.0,
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Units::Unspecified => write!(f, "unspecified"),
            Units::Inch => write!(f, "inch"),
            Units::Millimetre => write!(f, "mm"),
        }
    }
}

/// Settings shared by all tools: option defaults plus the boilerplate written
/// before and after generated programs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Default values for numeric options, keyed by option name.
    #[serde(default)]
    pub defaults: BTreeMap<String, f64>,
    /// Lines written before the program body.
    #[serde(default)]
    pub prefix: Vec<String>,
    /// Lines written after the program body.
    #[serde(default)]
    pub suffix: Vec<String>,
}

impl Settings {
    /// Parse settings from JSON text.
    ///
    /// Lines whose first non-blank characters are `#` or `//` are comments and
    /// are blanked before parsing, so error positions still match the file.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let cleaned: Vec<&str> = text
            .lines()
            .map(|line| {
                let trimmed = line.trim_start();
                if trimmed.starts_with('#') || trimmed.starts_with("//") {
                    ""
                } else {
                    line
                }
            })
            .collect();

        serde_json::from_str(&cleaned.join("\n")).map_err(|e| GcodeError::InvalidSettings {
            message: e.to_string(),
        })
    }

    /// Resolve a numeric option: explicit value, then settings default, then
    /// the application fallback.
    pub fn resolve(&self, name: &str, explicit: Option<f64>, fallback: Option<f64>) -> Result<f64> {
        explicit
            .or_else(|| self.defaults.get(name).copied())
            .or(fallback)
            .ok_or_else(|| GcodeError::MissingOption {
                name: name.to_string(),
            })
    }

    /// Render the prefix with option values substituted.
    pub fn render_prefix(&self, values: &BTreeMap<String, f64>) -> String {
        render_template(&self.prefix.join("\n"), values)
    }

    /// Render the suffix with option values substituted.
    pub fn render_suffix(&self, values: &BTreeMap<String, f64>) -> String {
        render_template(&self.suffix.join("\n"), values)
    }
}

/// Substitute `$name` and `${name}` placeholders.
///
/// Unknown placeholders are left as written. `$$` produces a literal `$`.
pub fn render_template(template: &str, values: &BTreeMap<String, f64>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match values.get(name) {
            Some(value) if !name.is_empty() => {
                out.push_str(&format!("{:.prec$}", value, prec = DECIMALS));
                rest = &after[consumed..];
            }
            _ => {
                out.push('$');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Utility functions for floating-point comparisons.
pub mod float_cmp {
    use super::EPS;

    /// Check if two floats are approximately equal.
    #[inline]
    pub fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    /// Check if a float is approximately zero.
    #[inline]
    pub fn approx_zero(a: f64) -> bool {
        a.abs() < EPS
    }

    /// Check if two points are approximately equal.
    #[inline]
    pub fn same_point(a: (f64, f64), b: (f64, f64)) -> bool {
        approx_eq(a.0, b.0) && approx_eq(a.1, b.1)
    }
}
