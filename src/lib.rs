//! Compilation of discontinuous Galerkin flux terms into gather kernels.
//!
//! Operator templates ([`optemplate::OpExpr`]) containing flux terms are compiled by the
//! [`compiler::OperatorCompiler`] into a plan of flux batches. Each batch is a generated C++
//! function ([`dgflux_cgen::Module`]) built by a [`backend::NativeModuleBuilder`], which gathers
//! the values of all fluxes of one [`kind::FluxKind`] into face storage.
pub mod backend;
pub mod compiler;
pub mod discretization;
pub mod error;
pub mod face_group;
pub mod flux;
pub mod instrument;
pub mod kind;
pub mod linear_combination;
pub mod optemplate;
pub mod polynomial;
pub mod translate;
pub mod variable_info;

#[cfg(feature = "proptest")]
pub mod proptest;

pub extern crate dgflux_cgen;
pub extern crate nalgebra;
