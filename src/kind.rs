use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// Identifies a portion of the mesh boundary, e.g. `"inflow"` or `"wall"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoundaryTag(pub String);

impl BoundaryTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BoundaryTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl Display for BoundaryTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Distinguishes flux terms coupling two elements from flux terms coupling an element
/// to a tagged part of the boundary.
///
/// Flux terms of the same kind are gathered by one compiled kernel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FluxKind {
    Interior,
    Boundary(BoundaryTag),
}

impl FluxKind {
    pub fn boundary(tag: impl Into<String>) -> Self {
        FluxKind::Boundary(BoundaryTag::new(tag))
    }

    pub fn is_interior(&self) -> bool {
        matches!(self, FluxKind::Interior)
    }
}

impl Display for FluxKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FluxKind::Interior => write!(f, "interior"),
            FluxKind::Boundary(tag) => write!(f, "boundary({})", tag),
        }
    }
}
