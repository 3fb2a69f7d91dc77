//! Compilation of operator templates into executable plans.
//!
//! An operator template is compiled into a [`Code`] plan: a sequence of flux batches, each
//! gathering all ready flux terms of one [`FluxKind`](crate::kind::FluxKind) with a single
//! compiled kernel, followed by the assignment of the result.
mod base;
mod execute;
mod flux_batch;

pub use base::*;
pub use execute::*;
pub use flux_batch::*;
