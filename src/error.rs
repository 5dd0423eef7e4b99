//! Crate-wide error type.
//!
//! Every fallible operation returns [`Result`]. Errors are raised *before* any
//! state is mutated, so a failed call leaves a [`crate::models::MixtureModel`]
//! exactly as it was.

/// Errors raised by model bookkeeping, fitting and the bundled solver.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PsfError {
    /// A weight mapping or tag sequence referenced a family that was never registered.
    #[error("Unknown basis family '{0}' (register it with `add` first).")]
    UnknownFamily(String),

    /// Array lengths or row counts disagree with each other or with the count table.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The minimizer could not run (bad bounds, non-finite objective, ...).
    #[error("Solver error: {0}")]
    Solver(String),

    /// Configuration or caller input that cannot be used as given.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PsfError {
    pub fn shape(message: impl Into<String>) -> Self {
        Self::ShapeMismatch(message.into())
    }

    pub fn solver(message: impl Into<String>) -> Self {
        Self::Solver(message.into())
    }
}

pub type Result<T> = std::result::Result<T, PsfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_family() {
        let err = PsfError::UnknownFamily("moffat".to_string());
        assert!(err.to_string().contains("'moffat'"));
        assert!(PsfError::shape("odd length").to_string().starts_with("Shape mismatch"));
    }
}
