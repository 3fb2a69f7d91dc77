//! Symbolic flux expressions.
//!
//! A flux is a face-local expression in the values of a field on both sides of a face,
//! the face normal and a penalty term. It is evaluated at every face node.
use ordered_float::OrderedFloat;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A reference to one scalar component of the field a flux is applied to.
///
/// `is_local` selects the value on the face's own element, as opposed to the value on
/// the neighboring element (or the boundary condition, for boundary fluxes).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldComponent {
    pub index: usize,
    pub is_local: bool,
}

impl FieldComponent {
    pub fn new(index: usize, is_local: bool) -> Self {
        Self { index, is_local }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FluxExpr {
    Constant(OrderedFloat<f64>),
    /// Component `axis` of the outward unit normal of the face.
    Normal { axis: usize },
    /// The interior penalty `(order^2 / h)^power`.
    PenaltyTerm { power: OrderedFloat<f64> },
    FieldComponent(FieldComponent),
    Sum(Vec<FluxExpr>),
    Product(Vec<FluxExpr>),
    Quotient(Box<FluxExpr>, Box<FluxExpr>),
    Power(Box<FluxExpr>, Box<FluxExpr>),
    Negation(Box<FluxExpr>),
}

impl FluxExpr {
    pub fn constant(value: f64) -> Self {
        FluxExpr::Constant(OrderedFloat(value))
    }

    pub fn normal(axis: usize) -> Self {
        FluxExpr::Normal { axis }
    }

    pub fn penalty(power: f64) -> Self {
        FluxExpr::PenaltyTerm {
            power: OrderedFloat(power),
        }
    }

    /// The value of component `index` on the face's own element.
    pub fn local(index: usize) -> Self {
        FluxExpr::FieldComponent(FieldComponent::new(index, true))
    }

    /// The value of component `index` across the face.
    pub fn neighbor(index: usize) -> Self {
        FluxExpr::FieldComponent(FieldComponent::new(index, false))
    }

    /// The average `(u^- + u^+)/2` of component `index`.
    pub fn average(index: usize) -> Self {
        FluxExpr::constant(0.5) * (FluxExpr::local(index) + FluxExpr::neighbor(index))
    }

    /// The jump `u^- - u^+` of component `index`.
    pub fn jump(index: usize) -> Self {
        FluxExpr::local(index) - FluxExpr::neighbor(index)
    }

    pub fn pow(self, exponent: FluxExpr) -> Self {
        FluxExpr::Power(Box::new(self), Box::new(exponent))
    }

    /// Visits this expression and all of its subexpressions in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a FluxExpr)) {
        visit(self);
        match self {
            FluxExpr::Constant(_)
            | FluxExpr::Normal { .. }
            | FluxExpr::PenaltyTerm { .. }
            | FluxExpr::FieldComponent(_) => {}
            FluxExpr::Sum(terms) | FluxExpr::Product(terms) => terms.iter().for_each(|term| term.walk(visit)),
            FluxExpr::Quotient(a, b) | FluxExpr::Power(a, b) => {
                a.walk(visit);
                b.walk(visit);
            }
            FluxExpr::Negation(operand) => operand.walk(visit),
        }
    }

    /// The distinct field components this flux depends on, in order of first occurrence.
    pub fn field_components(&self) -> Vec<FieldComponent> {
        let mut components = Vec::new();
        self.walk(&mut |expr| {
            if let FluxExpr::FieldComponent(fc) = expr {
                if !components.contains(fc) {
                    components.push(*fc);
                }
            }
        });
        components
    }
}

impl From<f64> for FluxExpr {
    fn from(value: f64) -> Self {
        FluxExpr::constant(value)
    }
}

impl Add for FluxExpr {
    type Output = FluxExpr;

    fn add(self, rhs: FluxExpr) -> FluxExpr {
        let mut terms = match self {
            FluxExpr::Sum(terms) => terms,
            other => vec![other],
        };
        match rhs {
            FluxExpr::Sum(rhs_terms) => terms.extend(rhs_terms),
            other => terms.push(other),
        }
        FluxExpr::Sum(terms)
    }
}

impl Sub for FluxExpr {
    type Output = FluxExpr;

    fn sub(self, rhs: FluxExpr) -> FluxExpr {
        self + (-rhs)
    }
}

impl Mul for FluxExpr {
    type Output = FluxExpr;

    fn mul(self, rhs: FluxExpr) -> FluxExpr {
        let mut factors = match self {
            FluxExpr::Product(factors) => factors,
            other => vec![other],
        };
        match rhs {
            FluxExpr::Product(rhs_factors) => factors.extend(rhs_factors),
            other => factors.push(other),
        }
        FluxExpr::Product(factors)
    }
}

impl Mul<FluxExpr> for f64 {
    type Output = FluxExpr;

    fn mul(self, rhs: FluxExpr) -> FluxExpr {
        FluxExpr::constant(self) * rhs
    }
}

impl Div for FluxExpr {
    type Output = FluxExpr;

    fn div(self, rhs: FluxExpr) -> FluxExpr {
        FluxExpr::Quotient(Box::new(self), Box::new(rhs))
    }
}

impl Neg for FluxExpr {
    type Output = FluxExpr;

    fn neg(self) -> FluxExpr {
        FluxExpr::Negation(Box::new(self))
    }
}
