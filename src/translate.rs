//! Translation of symbolic fluxes into C++ expressions for the gather kernel loop body.
//!
//! The generated expressions refer to names bound by the surrounding kernel template:
//! `fp` is the current face pair, `<arg>_it` the iterator of each argument and
//! `loc_idx`/`opp_idx` the volume node indices of the current face node on either side.
use crate::error::CompileError;
use crate::flux::{FieldComponent, FluxExpr};
use crate::variable_info::{ArgName, FluxVariableInfo};
use dgflux_cgen::printer::PREC_PRODUCT;
use dgflux_cgen::Expr;

/// One of the two sides of a face pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Side {
    Local,
    Opposite,
}

impl Side {
    pub fn from_is_local(is_local: bool) -> Self {
        if is_local {
            Side::Local
        } else {
            Side::Opposite
        }
    }

    /// The side a field component reads from in a (possibly flipped) translation.
    pub fn of_component(component: FieldComponent, is_flipped: bool) -> Self {
        Side::from_is_local(component.is_local ^ is_flipped)
    }

    /// Prefix used for names belonging to this side.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Local => "loc",
            Side::Opposite => "opp",
        }
    }

    /// The face-pair record of this side, `fp.loc` or `fp.opp`.
    pub fn face_side(&self) -> Expr {
        Expr::ident("fp").member(self.as_str())
    }

    /// The volume node index of the current face node on this side.
    pub fn node_index(&self) -> Expr {
        Expr::ident(format!("{}_idx", self.as_str()))
    }
}

/// Translates the flux with index `flux_index` of a batch.
///
/// A flipped translator evaluates the flux as seen from the opposite side of the face,
/// so that a single flux expression serves both orientations of a face pair.
#[derive(Debug, Clone, Copy)]
pub struct FluxToCode<'a> {
    flux_index: usize,
    info: &'a FluxVariableInfo,
    is_flipped: bool,
}

impl<'a> FluxToCode<'a> {
    pub fn new(flux_index: usize, info: &'a FluxVariableInfo, is_flipped: bool) -> Self {
        Self {
            flux_index,
            info,
            is_flipped,
        }
    }

    fn geometry_side(&self) -> Side {
        Side::from_is_local(!self.is_flipped)
    }

    pub fn translate(&self, flux: &FluxExpr) -> Result<Expr, CompileError> {
        let expr = match flux {
            FluxExpr::Constant(value) => real_literal(value.0)?,
            FluxExpr::Normal { axis } => Expr::call(
                "value_type",
                vec![self
                    .geometry_side()
                    .face_side()
                    .member("normal")
                    .index(Expr::Int(*axis as i64))],
            ),
            FluxExpr::PenaltyTerm { power } => {
                let side = self.geometry_side().face_side();
                let order = side.clone().member("order");
                let h = side.member("h");
                let base = order.clone() * order / h;
                Expr::call("value_type", vec![Expr::call("pow", vec![base, real_literal(power.0)?])])
            }
            FluxExpr::FieldComponent(component) => self.translate_field_component(*component)?,
            FluxExpr::Sum(terms) => {
                let mut terms = terms.iter();
                match terms.next() {
                    None => Expr::Int(0),
                    Some(first) => {
                        let mut sum = self.translate(first)?;
                        for term in terms {
                            sum = match term {
                                FluxExpr::Negation(operand) => sum - self.translate(operand)?,
                                _ => sum + self.translate(term)?,
                            };
                        }
                        sum
                    }
                }
            }
            FluxExpr::Product(factors) => {
                let mut factors = factors.iter();
                match factors.next() {
                    None => Expr::Int(1),
                    Some(first) => {
                        let mut product = self.translate(first)?;
                        for factor in factors {
                            product = product * self.translate(factor)?;
                        }
                        product
                    }
                }
            }
            FluxExpr::Quotient(numerator, denominator) => self.translate(numerator)? / self.translate(denominator)?,
            FluxExpr::Power(base, exponent) => {
                Expr::call("pow", vec![self.translate(base)?, self.translate(exponent)?])
            }
            FluxExpr::Negation(operand) => -self.translate(operand)?,
        };
        Ok(expr)
    }

    fn translate_field_component(&self, component: FieldComponent) -> Result<Expr, CompileError> {
        let side = Side::of_component(component, self.is_flipped);
        match self.info.arg_name(self.flux_index, component) {
            Some(ArgName::Zero) => Ok(Expr::Int(0)),
            Some(ArgName::Name(name)) => Ok(Expr::ident(format!("{}_it", name)).index(side.node_index())),
            None => Err(CompileError::SymbolicInconsistency(format!(
                "no argument recorded for {:?} of flux {}",
                component, self.flux_index
            ))),
        }
    }

    /// Renders the translated flux as it appears in a product context.
    pub fn translate_to_string(&self, flux: &FluxExpr) -> Result<String, CompileError> {
        Ok(self.translate(flux)?.to_code(PREC_PRODUCT))
    }
}

fn real_literal(value: f64) -> Result<Expr, CompileError> {
    if value.is_finite() {
        Ok(Expr::Real(value))
    } else {
        Err(CompileError::SymbolicInconsistency(format!(
            "non-finite value {} has no C++ literal",
            value
        )))
    }
}
