use crate::backend::{GatherKernel, NativeModuleBuilder};
use crate::compiler::{FluxBatchCompiler, FluxRecord};
use crate::discretization::Discretization;
use crate::error::CompileError;
use crate::instrument::{time_and_count, time_count_flop};
use crate::kind::FluxKind;
use crate::optemplate::{FluxBinding, OpExpr};
use crate::translate::{FluxToCode, Side};
use crate::variable_info::FluxVariableInfo;
use dgflux_cgen::{
    Block, Declarator, Expr, For, ForEach, FunctionBody, FunctionDeclaration, Module, ModuleItem, Statement,
};
use log::debug;
use std::fmt;
use std::fmt::Formatter;

/// Name of the entry point of generated gather modules.
pub const GATHER_ENTRY_POINT: &str = "gather_flux";

const ARRAY_TYPE: &str = "numpy_array<value_type>";
const NODE_NUMBER_TYPE: &str = "node_number_t";
const INDEX_LIST_TYPE: &str = "index_lists_t::const_iterator";

/// A batch of fluxes gathered by a single compiled kernel.
pub struct CompiledFluxBatchAssign {
    /// The variable each flux value is assigned to.
    pub names: Vec<String>,
    pub fluxes: Vec<FluxBinding>,
    pub kind: FluxKind,
    /// The operand expression passed as each kernel argument.
    pub arg_specs: Vec<(OpExpr, bool)>,
    /// The module the entry point was built from.
    pub module: Module,
    /// Called as `(face_group, [flux0_on_faces, ...], [arg0, ...])`.
    pub compiled_entry_point: Box<dyn GatherKernel>,
}

impl fmt::Debug for CompiledFluxBatchAssign {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFluxBatchAssign")
            .field("names", &self.names)
            .field("fluxes", &self.fluxes)
            .field("kind", &self.kind)
            .field("arg_specs", &self.arg_specs)
            .finish_non_exhaustive()
    }
}

/// Compiles flux batches into native gather kernels for a discretization.
pub struct OperatorCompiler<'a> {
    discr: &'a dyn Discretization,
    builder: &'a dyn NativeModuleBuilder,
}

impl<'a> OperatorCompiler<'a> {
    pub fn new(discr: &'a dyn Discretization, builder: &'a dyn NativeModuleBuilder) -> Self {
        Self { discr, builder }
    }

    fn module_prelude(&self) -> Module {
        let mut module = Module::new();
        module.extend([
            ModuleItem::Include("hedge/face_operators.hpp".to_string()),
            ModuleItem::Include("boost/foreach.hpp".to_string()),
            ModuleItem::Line,
            ModuleItem::Statement("using namespace hedge".to_string()),
            ModuleItem::Statement("using namespace pyublas".to_string()),
            ModuleItem::Line,
            ModuleItem::Typedef(Declarator::value(
                self.discr.default_scalar_type().c_name(),
                "value_type",
            )),
            ModuleItem::Line,
        ]);
        module
    }

    fn build(&self, module: &Module) -> Result<Box<dyn GatherKernel>, CompileError> {
        debug!("Generated flux gather module:\n{}", module);
        Ok(self
            .builder
            .build(module, self.discr.platform(), GATHER_ENTRY_POINT)?)
    }

    pub fn make_interior_flux_batch_assign(
        &self,
        names: Vec<String>,
        fluxes: Vec<FluxBinding>,
        kind: &FluxKind,
    ) -> Result<CompiledFluxBatchAssign, CompileError> {
        let info = FluxVariableInfo::new(&fluxes)?;

        let mut face_pair_body = Block::new();
        for side in [Side::Local, Side::Opposite] {
            face_pair_body.extend(side_initializers(side));
            face_pair_body.push(fof_base_initializer(side));
            face_pair_body.push(Statement::Line);
        }
        face_pair_body.push(Statement::Initializer(
            Declarator::value(INDEX_LIST_TYPE, "opp_write_map"),
            Expr::ident("fg").method("index_list", vec![fp().member("opp_native_write_map")]),
        ));
        face_pair_body.push(Statement::Line);

        let mut node_body: Block = node_index_initializers().collect();
        for flux_index in 0..fluxes.len() {
            for (side, target) in [
                (Side::Local, Expr::ident("i")),
                (Side::Opposite, Expr::ident("opp_write_map").index(Expr::ident("i"))),
            ] {
                let flux = FluxToCode::new(flux_index, &info, side == Side::Opposite)
                    .translate(&fluxes[flux_index].flux)?;
                node_body.push(flux_assignment(flux_index, fof_base(side) + target, flux));
            }
        }
        face_pair_body.push(face_node_loop(node_body));

        let module = self.gather_module(fluxes.len(), &info, face_pair_body);
        let mut kernel = self.build(&module)?;

        if self.discr.instrumented() {
            let flops = fluxes.len() as u64 * self.discr.gather_flops() * info.arg_names.len() as u64;
            kernel = Box::new(time_count_flop(
                kernel,
                self.discr.gather_timer(),
                self.discr.gather_counter(),
                self.discr.gather_flop_counter(),
                flops,
            ));
        }

        Ok(CompiledFluxBatchAssign {
            names,
            fluxes,
            kind: kind.clone(),
            arg_specs: info.arg_specs,
            module,
            compiled_entry_point: kernel,
        })
    }

    pub fn make_boundary_flux_batch_assign(
        &self,
        names: Vec<String>,
        fluxes: Vec<FluxBinding>,
        kind: &FluxKind,
    ) -> Result<CompiledFluxBatchAssign, CompileError> {
        let info = FluxVariableInfo::new(&fluxes)?;

        let mut face_pair_body = Block::new();
        for side in [Side::Local, Side::Opposite] {
            face_pair_body.extend(side_initializers(side));
            face_pair_body.push(Statement::Line);
        }
        face_pair_body.push(fof_base_initializer(Side::Local));
        face_pair_body.push(Statement::Line);

        // The opposite side holds the boundary values, so nothing is written there
        let mut node_body: Block = node_index_initializers().collect();
        for (flux_index, binding) in fluxes.iter().enumerate() {
            let flux = FluxToCode::new(flux_index, &info, false).translate(&binding.flux)?;
            node_body.push(flux_assignment(
                flux_index,
                fof_base(Side::Local) + Expr::ident("i"),
                flux,
            ));
        }
        face_pair_body.push(face_node_loop(node_body));

        let module = self.gather_module(fluxes.len(), &info, face_pair_body);
        let mut kernel = self.build(&module)?;

        if self.discr.instrumented() {
            // TODO: measure boundary gathers before adding a flop estimate here
            kernel = Box::new(time_and_count(
                kernel,
                self.discr.gather_timer(),
                self.discr.gather_counter(),
            ));
        }

        Ok(CompiledFluxBatchAssign {
            names,
            fluxes,
            kind: kind.clone(),
            arg_specs: info.arg_specs,
            module,
            compiled_entry_point: kernel,
        })
    }

    /// Assembles the module around the per-face-pair body of a gather kernel.
    fn gather_module(&self, flux_count: usize, info: &FluxVariableInfo, face_pair_body: Block) -> Module {
        let array = |name: String| Declarator::value(ARRAY_TYPE, name);

        let params = std::iter::once(Declarator::value("face_group", "fg").constant().reference())
            .chain((0..flux_count).map(|i| array(format!("flux{}_on_faces", i))))
            .chain(
                info.arg_names
                    .iter()
                    .map(|name| array(name.clone()).constant().reference()),
            )
            .collect();
        let declaration = FunctionDeclaration::new(Declarator::value("void", GATHER_ENTRY_POINT), params);

        let mut body: Block = (0..flux_count)
            .map(|i| {
                Statement::Initializer(
                    Declarator::value(format!("{}::iterator", ARRAY_TYPE), format!("fof{}_it", i)).constant(),
                    Expr::ident(format!("flux{}_on_faces", i)).method("begin", vec![]),
                )
            })
            .chain(info.arg_names.iter().map(|name| {
                Statement::Initializer(
                    Declarator::value(format!("{}::const_iterator", ARRAY_TYPE), format!("{}_it", name)).constant(),
                    Expr::ident(name.as_str()).method("begin", vec![]),
                )
            }))
            .collect();
        body.push(Statement::Line);
        body.push(Statement::ForEach(ForEach {
            element: Declarator::value("face_pair", "fp").constant().reference(),
            range: Expr::ident("fg").member("face_pairs"),
            body: face_pair_body,
        }));

        let mut module = self.module_prelude();
        module.add_function(FunctionBody::new(declaration, body));
        module
    }
}

fn fp() -> Expr {
    Expr::ident("fp")
}

fn side_name(side: Side, suffix: &str) -> String {
    format!("{}_{}", side.as_str(), suffix)
}

fn fof_base(side: Side) -> Expr {
    Expr::ident(side_name(side, "fof_base"))
}

/// The element base index and face index list of one side of the current face pair.
fn side_initializers(side: Side) -> [Statement; 2] {
    [
        Statement::Initializer(
            Declarator::value(NODE_NUMBER_TYPE, side_name(side, "ebi")),
            side.face_side().member("el_base_index"),
        ),
        Statement::Initializer(
            Declarator::value(INDEX_LIST_TYPE, side_name(side, "idx_list")),
            Expr::ident("fg").method("index_list", vec![side.face_side().member("face_index_list_number")]),
        ),
    ]
}

/// The offset of the face of one side in face storage.
fn fof_base_initializer(side: Side) -> Statement {
    let fg = Expr::ident("fg");
    let face = side.face_side();
    Statement::Initializer(
        Declarator::value(NODE_NUMBER_TYPE, side_name(side, "fof_base")),
        fg.clone().method("face_length", vec![])
            * (face.clone().member("local_el_number") * fg.member("face_count") + face.member("face_id")),
    )
}

fn node_index_initializers() -> impl Iterator<Item = Statement> {
    [Side::Local, Side::Opposite].into_iter().map(|side| {
        Statement::Initializer(
            Declarator::value(NODE_NUMBER_TYPE, side_name(side, "idx")).maybe_unused(),
            Expr::ident(side_name(side, "ebi")) + Expr::ident(side_name(side, "idx_list")).index(Expr::ident("i")),
        )
    })
}

fn flux_assignment(flux_index: usize, target: Expr, flux: Expr) -> Statement {
    Statement::Assign(
        Expr::ident(format!("fof{}_it", flux_index)).index(target),
        Side::Local.face_side().member("face_jacobian") * flux,
    )
}

fn face_node_loop(body: Block) -> Statement {
    Statement::For(For {
        counter: "i".to_string(),
        start: Expr::Int(0),
        end: Expr::ident("fg").method("face_length", vec![]),
        body,
    })
}

/// The distinct expressions an operand reads, with array-of-arrays expanded into components.
fn operand_dependencies(operand: &OpExpr) -> Vec<OpExpr> {
    match operand {
        OpExpr::Vector(components) => components.clone(),
        other => vec![other.clone()],
    }
}

impl<'a> FluxBatchCompiler for OperatorCompiler<'a> {
    fn get_contained_fluxes(&self, expr: &OpExpr) -> Vec<FluxRecord> {
        expr.collect_fluxes()
            .into_iter()
            .map(|binding| FluxRecord {
                flux_expr: binding.clone(),
                kind: binding.kind(),
                dependencies: binding
                    .operands()
                    .into_iter()
                    .flat_map(operand_dependencies)
                    .collect(),
            })
            .collect()
    }

    fn make_flux_batch_assign(
        &self,
        names: Vec<String>,
        fluxes: Vec<FluxBinding>,
        kind: &FluxKind,
    ) -> Result<CompiledFluxBatchAssign, CompileError> {
        match kind {
            FluxKind::Interior => self.make_interior_flux_batch_assign(names, fluxes, kind),
            FluxKind::Boundary(_) => self.make_boundary_flux_batch_assign(names, fluxes, kind),
        }
    }
}
