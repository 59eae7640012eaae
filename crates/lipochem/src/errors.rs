use miette::Diagnostic;
use thiserror::Error;

pub type Result<T, E = Box<LipidError>> = std::result::Result<T, E>;

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum LipidError {
    /// A structural invariant of the lipid model was violated. These are
    /// programming or data errors and abort the operation that raised them.
    #[error("constraint violated: {message}")]
    ConstraintViolation { message: String },

    /// The input describes chemistry that is valid but not modelled here, so
    /// callers can tell "malformed" apart from "valid but unimplemented".
    #[error("unsupported structure: {message}")]
    UnsupportedFeature { message: String },

    /// A packaged reference table failed to load. Fatal at registry
    /// initialization, never recoverable per call.
    #[error("failed to load the packaged {table} table: {message}")]
    RegistryLoad { table: String, message: String },
}

impl LipidError {
    pub(crate) fn constraint(message: impl Into<String>) -> Box<Self> {
        Box::new(Self::ConstraintViolation {
            message: message.into(),
        })
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Box<Self> {
        Box::new(Self::UnsupportedFeature {
            message: message.into(),
        })
    }

    pub(crate) fn registry_load(table: &str, message: impl ToString) -> Box<Self> {
        Box::new(Self::RegistryLoad {
            table: table.to_owned(),
            message: message.to_string(),
        })
    }
}
