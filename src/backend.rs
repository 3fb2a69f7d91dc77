//! The native module build service.
//!
//! Generated gather kernels are handed to a [`NativeModuleBuilder`] as a [`Module`] together
//! with the [`Platform`] they should be built for. The builder returns a loadable entry point,
//! or a [`BuildError`] carrying the offending source.
use crate::face_group::FaceGroup;
use dgflux_cgen::Module;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::path::PathBuf;

mod interpreter;

pub use interpreter::InterpreterBuilder;

/// Describes the toolchain and flags native modules are built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub name: String,
    pub cxx: String,
    pub cxxflags: Vec<String>,
    pub include_dirs: Vec<PathBuf>,
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            name: "host".to_string(),
            cxx: "c++".to_string(),
            cxxflags: vec!["-O3".to_string(), "-fPIC".to_string()],
            include_dirs: Vec::new(),
        }
    }
}

/// A compiled flux gather entry point.
///
/// The kernel reads the `inputs` at the volume nodes referenced by the face pairs of
/// `face_group` and writes the flux values into the face storage `outputs`, one output
/// array per flux.
pub trait GatherKernel {
    fn call(&self, face_group: &FaceGroup, outputs: &mut [&mut [f64]], inputs: &[&[f64]]) -> Result<(), KernelError>;
}

impl<K: GatherKernel + ?Sized> GatherKernel for Box<K> {
    fn call(&self, face_group: &FaceGroup, outputs: &mut [&mut [f64]], inputs: &[&[f64]]) -> Result<(), KernelError> {
        (**self).call(face_group, outputs, inputs)
    }
}

pub trait NativeModuleBuilder {
    /// Builds `module` and returns its function `entry_point`.
    ///
    /// Builders must not retry: building the same source again fails the same way.
    fn build(
        &self,
        module: &Module,
        platform: &Platform,
        entry_point: &str,
    ) -> Result<Box<dyn GatherKernel>, BuildError>;
}

/// The toolchain rejected a generated module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildError {
    pub generated_source: String,
    pub diagnostics: Vec<String>,
}

impl Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "native build failed with {} diagnostic(s):", self.diagnostics.len())?;
        for diagnostic in &self.diagnostics {
            writeln!(f, "  {}", diagnostic)?;
        }
        writeln!(f, "--- generated source ---")?;
        write!(f, "{}", self.generated_source)
    }
}

impl Error for BuildError {}

/// A compiled kernel was invoked with data inconsistent with its face group or signature.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelError {
    ArgumentCount {
        expected_outputs: usize,
        expected_inputs: usize,
        outputs: usize,
        inputs: usize,
    },
    OutOfBounds {
        array: String,
        index: i64,
        len: usize,
    },
    Type(String),
}

impl Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::ArgumentCount {
                expected_outputs,
                expected_inputs,
                outputs,
                inputs,
            } => write!(
                f,
                "Kernel expects {} output and {} input arrays, but got {} and {}",
                expected_outputs, expected_inputs, outputs, inputs
            ),
            KernelError::OutOfBounds { array, index, len } => {
                write!(f, "Index {} out of bounds for {} of length {}", index, array, len)
            }
            KernelError::Type(message) => write!(f, "Type error: {}", message),
        }
    }
}

impl Error for KernelError {}
