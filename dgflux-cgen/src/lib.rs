//! A small typed representation of C++ source code, and a printer for it.
//!
//! Code generators build a [`Module`] out of declarations and statements, and only the printer
//! decides how the result is laid out as text. This keeps the generated program inspectable
//! (and executable by an interpreter) independently of its textual form.

mod ast;
pub mod printer;

pub use ast::*;
