use crate::compiler::{Code, CompiledFluxBatchAssign, Instruction};
use crate::discretization::Discretization;
use crate::optemplate::OpExpr;
use eyre::{bail, eyre, WrapErr};
use itertools::Itertools;
use log::debug;
use nalgebra::DVector;
use rustc_hash::FxHashMap;

/// The value of an operator template or one of its subexpressions.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(f64),
    /// Nodal values, either at volume nodes or in face storage.
    Vector(DVector<f64>),
    /// An array-of-arrays value.
    Composite(Vec<FieldValue>),
}

impl FieldValue {
    pub fn as_vector(&self) -> Option<&DVector<f64>> {
        match self {
            FieldValue::Vector(vector) => Some(vector),
            _ => None,
        }
    }

    fn zip_with(self, other: FieldValue, op: fn(f64, f64) -> f64) -> eyre::Result<FieldValue> {
        use FieldValue::*;
        let value = match (self, other) {
            (Scalar(a), Scalar(b)) => Scalar(op(a, b)),
            (Scalar(a), Vector(b)) => Vector(b.map(|b| op(a, b))),
            (Vector(a), Scalar(b)) => Vector(a.map(|a| op(a, b))),
            (Vector(a), Vector(b)) => {
                if a.len() != b.len() {
                    bail!("Cannot combine vectors of lengths {} and {}", a.len(), b.len());
                }
                Vector(a.zip_map(&b, op))
            }
            (Composite(a), Composite(b)) => {
                if a.len() != b.len() {
                    bail!("Cannot combine composites with {} and {} components", a.len(), b.len());
                }
                Composite(
                    a.into_iter()
                        .zip(b)
                        .map(|(a, b)| a.zip_with(b, op))
                        .collect::<eyre::Result<_>>()?,
                )
            }
            (Composite(a), b) => Composite(
                a.into_iter()
                    .map(|a| a.zip_with(b.clone(), op))
                    .collect::<eyre::Result<_>>()?,
            ),
            (a, Composite(b)) => Composite(
                b.into_iter()
                    .map(|b| a.clone().zip_with(b, op))
                    .collect::<eyre::Result<_>>()?,
            ),
        };
        Ok(value)
    }
}

struct Executor<'a, D: ?Sized> {
    discr: &'a D,
    fields: &'a FxHashMap<String, FieldValue>,
    variables: FxHashMap<String, FieldValue>,
}

impl<'a, D> Executor<'a, D>
where
    D: ?Sized + Discretization,
{
    fn eval(&self, expr: &OpExpr) -> eyre::Result<FieldValue> {
        let value = match expr {
            OpExpr::Field(name) => self
                .fields
                .get(name)
                .cloned()
                .ok_or_else(|| eyre!("No value supplied for field `{}`", name))?,
            OpExpr::Variable(name) => self
                .variables
                .get(name)
                .cloned()
                .ok_or_else(|| eyre!("Variable `{}` used before assignment", name))?,
            OpExpr::Constant(value) => FieldValue::Scalar(value.0),
            OpExpr::Vector(components) => {
                FieldValue::Composite(components.iter().map(|c| self.eval(c)).collect::<eyre::Result<_>>()?)
            }
            OpExpr::Sum(terms) => self.fold(terms, 0.0, |a, b| a + b)?,
            OpExpr::Product(factors) => self.fold(factors, 1.0, |a, b| a * b)?,
            OpExpr::Flux(binding) => bail!("Flux {:?} has not been compiled", binding.flux),
        };
        Ok(value)
    }

    fn fold(&self, operands: &[OpExpr], identity: f64, op: fn(f64, f64) -> f64) -> eyre::Result<FieldValue> {
        operands
            .iter()
            .try_fold(FieldValue::Scalar(identity), |acc, operand| acc.zip_with(self.eval(operand)?, op))
    }

    fn run_flux_batch(&mut self, batch: &CompiledFluxBatchAssign) -> eyre::Result<()> {
        let inputs: Vec<DVector<f64>> = batch
            .arg_specs
            .iter()
            .map(|(expr, _)| match self.eval(expr)? {
                FieldValue::Vector(vector) => Ok(vector),
                other => Err(eyre!("Flux argument {:?} evaluated to non-nodal value {:?}", expr, other)),
            })
            .collect::<eyre::Result<_>>()?;
        let input_slices = inputs.iter().map(|input| input.as_slice()).collect_vec();

        let storage_len = self.discr.flux_storage_len(&batch.kind);
        let mut outputs = vec![DVector::zeros(storage_len); batch.names.len()];

        let groups = self.discr.face_groups(&batch.kind);
        debug!("Gathering {} flux(es) over {} {} face group(s)", batch.names.len(), groups.len(), batch.kind);
        for group in groups {
            let mut output_slices = outputs
                .iter_mut()
                .map(|output| output.as_mut_slice())
                .collect_vec();
            batch
                .compiled_entry_point
                .call(group, &mut output_slices, &input_slices)
                .wrap_err_with(|| format!("Failed to gather {} fluxes {:?}", batch.kind, batch.names))?;
        }

        for (name, output) in batch.names.iter().zip(outputs) {
            self.variables.insert(name.clone(), FieldValue::Vector(output));
        }
        Ok(())
    }
}

impl Code {
    /// Executes the plan on `discr` with the given input fields and returns its result.
    pub fn execute<D>(&self, discr: &D, fields: &FxHashMap<String, FieldValue>) -> eyre::Result<FieldValue>
    where
        D: ?Sized + Discretization,
    {
        let mut executor = Executor {
            discr,
            fields,
            variables: FxHashMap::default(),
        };

        for instruction in &self.instructions {
            match instruction {
                Instruction::FluxBatch(batch) => executor.run_flux_batch(batch)?,
                Instruction::Assign { name, expr } => {
                    let value = executor.eval(expr)?;
                    executor.variables.insert(name.clone(), value);
                }
            }
        }

        executor
            .variables
            .remove(&self.result)
            .ok_or_else(|| eyre!("Plan does not assign its result `{}`", self.result))
    }
}
