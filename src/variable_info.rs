//! Assignment of kernel arguments to the field components read by a batch of fluxes.
use crate::error::CompileError;
use crate::flux::FieldComponent;
use crate::optemplate::{FluxBinding, FluxOperand, OpExpr};
use rustc_hash::FxHashMap;

/// What a field component of a particular flux reads from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgName {
    /// The component is statically zero and is not passed to the kernel at all.
    Zero,
    /// The component is read from the kernel argument of this name.
    Name(String),
}

/// The kernel arguments of a flux batch.
///
/// Every distinct non-zero operand expression in the batch is passed exactly once,
/// regardless of how many fluxes read it.
#[derive(Debug, Clone, PartialEq)]
pub struct FluxVariableInfo {
    /// The operand expression of each argument, and whether it was first seen as a local value.
    pub arg_specs: Vec<(OpExpr, bool)>,
    pub arg_names: Vec<String>,
    pub flux_index_and_dependency_to_arg_name: FxHashMap<(usize, FieldComponent), ArgName>,
}

impl FluxVariableInfo {
    /// Scans a batch of flux bindings sharing one flux kind.
    pub fn new(fluxes: &[FluxBinding]) -> Result<Self, CompileError> {
        let mut info = FluxVariableInfo {
            arg_specs: Vec::new(),
            arg_names: Vec::new(),
            flux_index_and_dependency_to_arg_name: FxHashMap::default(),
        };
        let mut field_expr_to_arg_name: FxHashMap<OpExpr, String> = FxHashMap::default();

        for (flux_index, binding) in fluxes.iter().enumerate() {
            for fc in binding.flux.field_components() {
                let field_expr = resolve_operand(binding, fc)?;

                let arg_name = if field_expr.is_zero() {
                    ArgName::Zero
                } else if let Some(name) = field_expr_to_arg_name.get(field_expr) {
                    ArgName::Name(name.clone())
                } else {
                    let name = format!("arg{}", info.arg_specs.len());
                    field_expr_to_arg_name.insert(field_expr.clone(), name.clone());
                    info.arg_names.push(name.clone());
                    info.arg_specs.push((field_expr.clone(), fc.is_local));
                    ArgName::Name(name)
                };

                info.flux_index_and_dependency_to_arg_name
                    .insert((flux_index, fc), arg_name);
            }
        }

        Ok(info)
    }

    pub fn arg_name(&self, flux_index: usize, component: FieldComponent) -> Option<&ArgName> {
        self.flux_index_and_dependency_to_arg_name
            .get(&(flux_index, component))
    }
}

/// Finds the scalar operand expression a field component refers to.
fn resolve_operand(binding: &FluxBinding, fc: FieldComponent) -> Result<&OpExpr, CompileError> {
    let field = match &binding.field {
        FluxOperand::Field(field) => field,
        FluxOperand::BoundaryPair(pair) if fc.is_local => &pair.field,
        FluxOperand::BoundaryPair(pair) => &pair.bfield,
    };

    match field {
        OpExpr::Vector(components) => components.get(fc.index).ok_or_else(|| {
            CompileError::SymbolicInconsistency(format!(
                "field component {} out of range for operand with {} components",
                fc.index,
                components.len()
            ))
        }),
        scalar if fc.index == 0 => Ok(scalar),
        _ => Err(CompileError::SymbolicInconsistency(format!(
            "field component {} referenced on a scalar operand",
            fc.index
        ))),
    }
}
