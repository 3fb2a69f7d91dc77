use crate::compiler::CompiledFluxBatchAssign;
use crate::error::CompileError;
use crate::kind::FluxKind;
use crate::optemplate::{FluxBinding, OpExpr};
use log::info;
use rustc_hash::{FxHashMap, FxHashSet};

/// A flux term found in an operator template.
#[derive(Debug, Clone, PartialEq)]
pub struct FluxRecord {
    pub flux_expr: FluxBinding,
    pub kind: FluxKind,
    /// The distinct operand expressions the flux reads.
    pub dependencies: FxHashSet<OpExpr>,
}

#[derive(Debug)]
pub enum Instruction {
    FluxBatch(CompiledFluxBatchAssign),
    /// Evaluates `expr` elementwise and stores the value in the variable `name`.
    Assign { name: String, expr: OpExpr },
}

impl Instruction {
    /// The variables this instruction assigns to.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Instruction::FluxBatch(batch) => batch.names.iter().map(String::as_str).collect(),
            Instruction::Assign { name, .. } => vec![name.as_str()],
        }
    }
}

/// A compiled operator template.
#[derive(Debug)]
pub struct Code {
    pub instructions: Vec<Instruction>,
    /// The variable holding the value of the operator template after execution.
    pub result: String,
}

impl Code {
    pub fn flux_batches(&self) -> impl Iterator<Item = &CompiledFluxBatchAssign> {
        self.instructions
            .iter()
            .filter_map(|instruction| match instruction {
                Instruction::FluxBatch(batch) => Some(batch),
                Instruction::Assign { .. } => None,
            })
    }
}

/// Name of the variable [`FluxBatchCompiler::compile`] stores the result in.
pub const RESULT_NAME: &str = "result";

/// Compiles operator templates by gathering their flux terms in batches.
///
/// Implementors decide how flux terms are found and how a batch of them is turned into an
/// instruction, while the scheduling of batches is shared.
pub trait FluxBatchCompiler {
    /// Finds all flux terms in `expr`, including those nested in the operands of other fluxes.
    fn get_contained_fluxes(&self, expr: &OpExpr) -> Vec<FluxRecord>;

    /// Compiles a batch of fluxes of the same kind, whose values are assigned to `names`.
    fn make_flux_batch_assign(
        &self,
        names: Vec<String>,
        fluxes: Vec<FluxBinding>,
        kind: &FluxKind,
    ) -> Result<CompiledFluxBatchAssign, CompileError>;

    /// Compiles `expr` into a plan.
    ///
    /// A flux is ready once every flux in its operands has been computed. Each batch
    /// consists of all ready fluxes sharing the kind of the first ready flux, so that fluxes
    /// of one kind are gathered together as far as their dependencies allow.
    fn compile(&self, expr: &OpExpr) -> Result<Code, CompileError> {
        let mut pending = self.get_contained_fluxes(expr);
        let mut computed: FxHashMap<FluxBinding, String> = FxHashMap::default();
        let mut instructions = Vec::new();

        while !pending.is_empty() {
            let is_ready = |record: &FluxRecord| {
                record
                    .dependencies
                    .iter()
                    .all(|dep| !dep.substitute_fluxes(&computed).contains_flux())
            };
            // The innermost flux of any nesting is always ready
            let kind = pending
                .iter()
                .find(|record| is_ready(record))
                .map(|record| record.kind.clone())
                .expect("Internal error: no flux is ready for computation");

            let (batch, rest): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|record| record.kind == kind && is_ready(record));
            pending = rest;

            let names: Vec<String> = (computed.len()..computed.len() + batch.len())
                .map(|i| format!("flux{}", i))
                .collect();
            let fluxes = batch
                .iter()
                .map(|record| record.flux_expr.substitute_fluxes(&computed))
                .collect();
            let assign = self.make_flux_batch_assign(names.clone(), fluxes, &kind)?;

            computed.extend(batch.into_iter().map(|record| record.flux_expr).zip(names));
            instructions.push(Instruction::FluxBatch(assign));
        }

        info!(
            "Compiled operator with {} flux(es) into {} flux batch(es)",
            computed.len(),
            instructions.len()
        );

        instructions.push(Instruction::Assign {
            name: RESULT_NAME.to_string(),
            expr: expr.substitute_fluxes(&computed),
        });

        Ok(Code {
            instructions,
            result: RESULT_NAME.to_string(),
        })
    }
}
