//! Command filters and program transformations.
//!
//! A [`Filter`] turns one command into zero, one or many commands. Filters
//! are combined into a [`FilterChain`] and applied with
//! [`Program::clone_with`](crate::model::Program::clone_with), which always
//! produces a new program.

mod arcs;
mod geometry;
mod multipass;
mod optimize;
mod position;
mod zlevel;

pub use arcs::{corrected_center, ArcCorrector, ArcStats};
pub use geometry::{Flip, Rotate, SwapXY, Translate};
pub use multipass::{multipass, pass_depths};
pub use optimize::{
    air_travel, extract, optimize, optimize_with_report, sequence, Extraction, OptimizeReport,
    Primitive, Shape,
};
pub use position::{center_from_radius, Machine, Move, Position};
pub use zlevel::ZLevel;

use crate::model::Command;

/// Output of a filter for one input command.
#[derive(Debug, Clone, PartialEq)]
pub enum Emit {
    /// The command is removed.
    Drop,
    /// The command is replaced by one command.
    One(Command),
    /// The command is replaced by a sequence of commands.
    Many(Vec<Command>),
}

impl Emit {
    /// Flatten into a vector.
    pub fn into_vec(self) -> Vec<Command> {
        match self {
            Emit::Drop => Vec::new(),
            Emit::One(command) => vec![command],
            Emit::Many(commands) => commands,
        }
    }
}

impl From<Command> for Emit {
    fn from(command: Command) -> Self {
        Emit::One(command)
    }
}

impl From<Option<Command>> for Emit {
    fn from(command: Option<Command>) -> Self {
        command.map_or(Emit::Drop, Emit::One)
    }
}

impl From<Vec<Command>> for Emit {
    fn from(commands: Vec<Command>) -> Self {
        Emit::Many(commands)
    }
}

/// A transformation applied to each command of a program in order.
///
/// Filters may keep state (the last known tool position, counters). That
/// state belongs to one instance and one pass; [`Filter::reset`] is called
/// before every pass.
pub trait Filter {
    /// Transform one command.
    fn apply(&mut self, command: Command) -> Emit;

    /// Forget per-pass state.
    fn reset(&mut self) {}
}

/// Adapter turning a closure into a [`Filter`].
pub struct FnFilter<F>(F);

/// Wrap a closure as a filter.
pub fn filter_fn<F>(f: F) -> FnFilter<F>
where
    F: FnMut(Command) -> Emit,
{
    FnFilter(f)
}

impl<F> Filter for FnFilter<F>
where
    F: FnMut(Command) -> Emit,
{
    fn apply(&mut self, command: Command) -> Emit {
        (self.0)(command)
    }
}

/// Ordered sequence of filters.
///
/// Every output of stage *k* is fed to stage *k+1*; a dropped command never
/// reaches later stages.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    /// Create an empty chain (the identity transform).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append a filter.
    pub fn with(mut self, filter: impl Filter + 'static) -> Self {
        self.push(filter);
        self
    }

    /// Append a filter.
    pub fn push(&mut self, filter: impl Filter + 'static) {
        self.filters.push(Box::new(filter));
    }

    /// Number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if the chain has no filters.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run one command through every stage.
    pub fn run(&mut self, command: Command) -> Vec<Command> {
        let mut current = vec![command];
        for filter in &mut self.filters {
            let mut next = Vec::with_capacity(current.len());
            for command in current {
                next.extend(filter.apply(command).into_vec());
            }
            if next.is_empty() {
                return next;
            }
            current = next;
        }
        current
    }

    /// Reset every filter before a new pass.
    pub fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }
}

impl Filter for FilterChain {
    fn apply(&mut self, command: Command) -> Emit {
        Emit::Many(self.run(command))
    }

    fn reset(&mut self) {
        FilterChain::reset(self);
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.filters.len())
            .finish()
    }
}
