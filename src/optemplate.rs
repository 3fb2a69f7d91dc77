//! A minimal operator-template expression graph.
//!
//! Operator templates describe the right-hand side of a semi-discrete DG scheme in terms of
//! named fields, arithmetic and operators. Only the flux operator is represented explicitly
//! here, since it is the one operator whose evaluation is compiled into native kernels.
use crate::flux::FluxExpr;
use crate::kind::{BoundaryTag, FluxKind};
use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;
use std::ops::{Add, Mul};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OpExpr {
    /// A named input field, i.e. a vector of values at all volume nodes.
    Field(String),
    /// A named intermediate result produced by a previously executed instruction.
    Variable(String),
    Constant(OrderedFloat<f64>),
    /// An array-of-arrays field, one entry per physical component.
    Vector(Vec<OpExpr>),
    Sum(Vec<OpExpr>),
    Product(Vec<OpExpr>),
    Flux(Box<FluxBinding>),
}

/// A flux operator applied to its operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FluxBinding {
    pub flux: FluxExpr,
    pub field: FluxOperand,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FluxOperand {
    /// The flux couples the values of this field on both sides of interior faces.
    Field(OpExpr),
    /// The flux couples a field with a boundary condition on tagged boundary faces.
    BoundaryPair(BoundaryPair),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoundaryPair {
    pub field: OpExpr,
    pub bfield: OpExpr,
    pub tag: BoundaryTag,
}

impl FluxBinding {
    pub fn kind(&self) -> FluxKind {
        match &self.field {
            FluxOperand::Field(_) => FluxKind::Interior,
            FluxOperand::BoundaryPair(pair) => FluxKind::Boundary(pair.tag.clone()),
        }
    }

    /// The expressions the flux reads, i.e. the field or the field and the boundary field.
    pub fn operands(&self) -> Vec<&OpExpr> {
        match &self.field {
            FluxOperand::Field(field) => vec![field],
            FluxOperand::BoundaryPair(pair) => vec![&pair.field, &pair.bfield],
        }
    }

    fn map_operands(&self, mut f: impl FnMut(&OpExpr) -> OpExpr) -> FluxBinding {
        let field = match &self.field {
            FluxOperand::Field(field) => FluxOperand::Field(f(field)),
            FluxOperand::BoundaryPair(pair) => FluxOperand::BoundaryPair(BoundaryPair {
                field: f(&pair.field),
                bfield: f(&pair.bfield),
                tag: pair.tag.clone(),
            }),
        };
        FluxBinding {
            flux: self.flux.clone(),
            field,
        }
    }

    /// Replaces nested flux bindings inside the operands by the variables holding their values.
    pub fn substitute_fluxes(&self, names: &FxHashMap<FluxBinding, String>) -> FluxBinding {
        self.map_operands(|operand| operand.substitute_fluxes(names))
    }
}

impl OpExpr {
    pub fn field(name: impl Into<String>) -> Self {
        OpExpr::Field(name.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        OpExpr::Variable(name.into())
    }

    pub fn constant(value: f64) -> Self {
        OpExpr::Constant(OrderedFloat(value))
    }

    pub fn zero() -> Self {
        OpExpr::constant(0.0)
    }

    /// An array-of-arrays field made up of the given component expressions.
    pub fn vector(components: Vec<OpExpr>) -> Self {
        OpExpr::Vector(components)
    }

    /// An array-of-arrays of named fields `{prefix}{i}` for `i` in `0 .. count`.
    pub fn field_vector(prefix: &str, count: usize) -> Self {
        OpExpr::Vector((0..count).map(|i| OpExpr::field(format!("{prefix}{i}"))).collect())
    }

    /// Applies an interior flux to `field`.
    pub fn flux(flux: FluxExpr, field: OpExpr) -> Self {
        OpExpr::Flux(Box::new(FluxBinding {
            flux,
            field: FluxOperand::Field(field),
        }))
    }

    /// Applies a boundary flux to `field` on the boundary `tag`, with `bfield` holding the
    /// boundary condition.
    pub fn boundary_flux(flux: FluxExpr, field: OpExpr, bfield: OpExpr, tag: impl Into<String>) -> Self {
        OpExpr::Flux(Box::new(FluxBinding {
            flux,
            field: FluxOperand::BoundaryPair(BoundaryPair {
                field,
                bfield,
                tag: BoundaryTag::new(tag),
            }),
        }))
    }

    /// Whether this expression is statically known to be zero.
    pub fn is_zero(&self) -> bool {
        matches!(self, OpExpr::Constant(value) if value.0 == 0.0)
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, OpExpr::Vector(_))
    }

    /// Visits this expression and all subexpressions, including flux operands, in post-order.
    pub fn walk_post_order<'a>(&'a self, visit: &mut impl FnMut(&'a OpExpr)) {
        match self {
            OpExpr::Field(_) | OpExpr::Variable(_) | OpExpr::Constant(_) => {}
            OpExpr::Vector(children) | OpExpr::Sum(children) | OpExpr::Product(children) => {
                children.iter().for_each(|child| child.walk_post_order(visit))
            }
            OpExpr::Flux(binding) => binding
                .operands()
                .into_iter()
                .for_each(|operand| operand.walk_post_order(visit)),
        }
        visit(self);
    }

    /// Collects the distinct flux bindings in this expression, innermost first.
    pub fn collect_fluxes(&self) -> Vec<&FluxBinding> {
        let mut fluxes: Vec<&FluxBinding> = Vec::new();
        self.walk_post_order(&mut |expr| {
            if let OpExpr::Flux(binding) = expr {
                if !fluxes.contains(&binding.as_ref()) {
                    fluxes.push(binding);
                }
            }
        });
        fluxes
    }

    pub fn contains_flux(&self) -> bool {
        let mut found = false;
        self.walk_post_order(&mut |expr| found |= matches!(expr, OpExpr::Flux(_)));
        found
    }

    /// Replaces every flux binding that has a name in `names` by the corresponding variable.
    pub fn substitute_fluxes(&self, names: &FxHashMap<FluxBinding, String>) -> OpExpr {
        match self {
            OpExpr::Field(_) | OpExpr::Variable(_) | OpExpr::Constant(_) => self.clone(),
            OpExpr::Vector(children) => OpExpr::Vector(Self::substitute_all(children, names)),
            OpExpr::Sum(children) => OpExpr::Sum(Self::substitute_all(children, names)),
            OpExpr::Product(children) => OpExpr::Product(Self::substitute_all(children, names)),
            OpExpr::Flux(binding) => match names.get(binding.as_ref()) {
                Some(name) => OpExpr::Variable(name.clone()),
                None => OpExpr::Flux(Box::new(binding.substitute_fluxes(names))),
            },
        }
    }

    fn substitute_all(children: &[OpExpr], names: &FxHashMap<FluxBinding, String>) -> Vec<OpExpr> {
        children
            .iter()
            .map(|child| child.substitute_fluxes(names))
            .collect()
    }
}

impl Add for OpExpr {
    type Output = OpExpr;

    fn add(self, rhs: OpExpr) -> OpExpr {
        let mut terms = match self {
            OpExpr::Sum(terms) => terms,
            other => vec![other],
        };
        terms.push(rhs);
        OpExpr::Sum(terms)
    }
}

impl Mul for OpExpr {
    type Output = OpExpr;

    fn mul(self, rhs: OpExpr) -> OpExpr {
        let mut factors = match self {
            OpExpr::Product(factors) => factors,
            other => vec![other],
        };
        factors.push(rhs);
        OpExpr::Product(factors)
    }
}

impl Mul<OpExpr> for f64 {
    type Output = OpExpr;

    fn mul(self, rhs: OpExpr) -> OpExpr {
        OpExpr::constant(self) * rhs
    }
}
