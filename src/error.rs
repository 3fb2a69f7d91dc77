//! Errors raised while compiling operator templates into flux-gather kernels.
use crate::backend::BuildError;
use std::error::Error;
use std::fmt;
use std::fmt::Display;

#[derive(Debug)]
pub enum CompileError {
    /// A symbolic reference could not be resolved against the structure of its operand.
    ///
    /// This always indicates a bug in the construction of the operator template.
    SymbolicInconsistency(String),
    /// The native module builder rejected the generated source.
    Build(BuildError),
}

impl Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::SymbolicInconsistency(message) => write!(f, "Symbolic inconsistency: {}", message),
            CompileError::Build(err) => write!(f, "Failed to build flux gather kernel: {}", err),
        }
    }
}

impl Error for CompileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CompileError::SymbolicInconsistency(_) => None,
            CompileError::Build(err) => Some(err),
        }
    }
}

impl From<BuildError> for CompileError {
    fn from(err: BuildError) -> Self {
        CompileError::Build(err)
    }
}
