use dgflux::error::CompileError;
use dgflux::flux::{FieldComponent, FluxExpr};
use dgflux::optemplate::{FluxBinding, OpExpr};
use dgflux::proptest::flux_expr;
use dgflux::variable_info::{ArgName, FluxVariableInfo};
use proptest::collection::vec;
use proptest::prelude::*;
use rustc_hash::FxHashSet;

fn bind(expr: OpExpr) -> FluxBinding {
    match expr {
        OpExpr::Flux(binding) => *binding,
        other => panic!("not a flux: {:?}", other),
    }
}

fn name(name: &str) -> ArgName {
    ArgName::Name(name.to_string())
}

#[test]
fn operands_shared_between_fluxes_get_one_argument() {
    let fluxes = vec![
        bind(OpExpr::flux(FluxExpr::jump(0), OpExpr::field("u"))),
        bind(OpExpr::flux(FluxExpr::average(0), OpExpr::field("u"))),
        bind(OpExpr::flux(FluxExpr::local(0), OpExpr::field("v"))),
    ];
    let info = FluxVariableInfo::new(&fluxes).unwrap();

    assert_eq!(info.arg_names, vec!["arg0", "arg1"]);
    assert_eq!(
        info.arg_specs,
        vec![(OpExpr::field("u"), true), (OpExpr::field("v"), true)]
    );
    assert_eq!(info.arg_name(0, FieldComponent::new(0, false)), Some(&name("arg0")));
    assert_eq!(info.arg_name(1, FieldComponent::new(0, true)), Some(&name("arg0")));
    assert_eq!(info.arg_name(2, FieldComponent::new(0, true)), Some(&name("arg1")));
    assert_eq!(info.arg_name(2, FieldComponent::new(0, false)), None);
}

#[test]
fn vector_operands_are_indexed_by_component() {
    let q = OpExpr::field_vector("q", 3);
    let flux = FluxExpr::normal(0) * FluxExpr::jump(2) + FluxExpr::normal(1) * FluxExpr::local(1);
    let info = FluxVariableInfo::new(&[bind(OpExpr::flux(flux, q))]).unwrap();

    assert_eq!(
        info.arg_specs,
        vec![(OpExpr::field("q2"), true), (OpExpr::field("q1"), true)]
    );
    assert_eq!(info.arg_name(0, FieldComponent::new(2, false)), Some(&name("arg0")));
    assert_eq!(info.arg_name(0, FieldComponent::new(1, true)), Some(&name("arg1")));
}

#[test]
fn boundary_pairs_read_the_boundary_field_for_non_local_components() {
    let binding = bind(OpExpr::boundary_flux(
        FluxExpr::jump(0),
        OpExpr::field("u"),
        OpExpr::field("g"),
        "inflow",
    ));
    let info = FluxVariableInfo::new(&[binding]).unwrap();

    assert_eq!(
        info.arg_specs,
        vec![(OpExpr::field("u"), true), (OpExpr::field("g"), false)]
    );
}

#[test]
fn zero_operands_are_not_passed() {
    let binding = bind(OpExpr::boundary_flux(
        FluxExpr::jump(0),
        OpExpr::field("u"),
        OpExpr::zero(),
        "wall",
    ));
    let info = FluxVariableInfo::new(&[binding]).unwrap();

    assert_eq!(info.arg_names, vec!["arg0"]);
    assert_eq!(info.arg_name(0, FieldComponent::new(0, false)), Some(&ArgName::Zero));
}

#[test]
fn out_of_range_components_are_inconsistent() {
    let scalar = bind(OpExpr::flux(FluxExpr::local(1), OpExpr::field("u")));
    assert!(matches!(
        FluxVariableInfo::new(&[scalar]),
        Err(CompileError::SymbolicInconsistency(_))
    ));

    let vector = bind(OpExpr::flux(FluxExpr::local(2), OpExpr::field_vector("q", 2)));
    assert!(matches!(
        FluxVariableInfo::new(&[vector]),
        Err(CompileError::SymbolicInconsistency(_))
    ));
}

fn operand() -> impl Strategy<Value = OpExpr> {
    prop_oneof![
        Just(OpExpr::zero()),
        Just(OpExpr::field("a")),
        Just(OpExpr::field("b")),
        Just(OpExpr::field("c")),
    ]
}

proptest! {
    #[test]
    fn one_argument_per_distinct_non_zero_operand(
        batch in vec((flux_expr(2), operand(), operand()), 1..5)
    ) {
        let fluxes: Vec<_> = batch
            .into_iter()
            .map(|(flux, first, second)| bind(OpExpr::flux(flux, OpExpr::vector(vec![first, second]))))
            .collect();
        let info = FluxVariableInfo::new(&fluxes).unwrap();

        let mut expected = FxHashSet::default();
        for (flux_index, binding) in fluxes.iter().enumerate() {
            let components = match &binding.field {
                dgflux::optemplate::FluxOperand::Field(OpExpr::Vector(components)) => components,
                _ => unreachable!(),
            };
            for fc in binding.flux.field_components() {
                let operand = &components[fc.index];
                let arg_name = info.arg_name(flux_index, fc).unwrap();
                if operand.is_zero() {
                    prop_assert_eq!(arg_name, &ArgName::Zero);
                } else {
                    expected.insert(operand.clone());
                    let position = info.arg_specs.iter().position(|(expr, _)| expr == operand).unwrap();
                    prop_assert_eq!(arg_name, &ArgName::Name(info.arg_names[position].clone()));
                }
            }
        }
        prop_assert_eq!(info.arg_names.len(), expected.len());
    }
}
