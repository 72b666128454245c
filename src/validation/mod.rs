mod validate;

pub use validate::{validate_arcs, validate_program, ValidationResult};
