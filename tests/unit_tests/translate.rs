use dgflux::error::CompileError;
use dgflux::flux::{FieldComponent, FluxExpr};
use dgflux::optemplate::{FluxBinding, OpExpr};
use dgflux::proptest::flux_expr;
use dgflux::translate::{FluxToCode, Side};
use dgflux::variable_info::FluxVariableInfo;
use proptest::prelude::*;

fn info_for(flux: FluxExpr, field: OpExpr) -> FluxVariableInfo {
    let binding: FluxBinding = match OpExpr::flux(flux, field) {
        OpExpr::Flux(binding) => *binding,
        _ => unreachable!(),
    };
    FluxVariableInfo::new(&[binding]).unwrap()
}

fn translate(flux: &FluxExpr, info: &FluxVariableInfo, is_flipped: bool) -> String {
    FluxToCode::new(0, info, is_flipped)
        .translate(flux)
        .unwrap()
        .to_string()
}

#[test]
fn normals_are_read_from_the_geometry_of_the_evaluating_side() {
    let flux = FluxExpr::normal(1);
    let info = info_for(flux.clone(), OpExpr::field("u"));
    assert_eq!(translate(&flux, &info, false), "value_type(fp.loc.normal[1])");
    assert_eq!(translate(&flux, &info, true), "value_type(fp.opp.normal[1])");
}

#[test]
fn penalty_terms_use_a_real_power() {
    let flux = FluxExpr::penalty(0.5);
    let info = info_for(flux.clone(), OpExpr::field("u"));
    assert_eq!(
        translate(&flux, &info, false),
        "value_type(pow(fp.loc.order*fp.loc.order/fp.loc.h, 0.5))"
    );
    assert_eq!(
        translate(&flux, &info, true),
        "value_type(pow(fp.opp.order*fp.opp.order/fp.opp.h, 0.5))"
    );
}

#[test]
fn field_components_select_side_by_xor() {
    let flux = FluxExpr::jump(0);
    let info = info_for(flux.clone(), OpExpr::field("u"));
    assert_eq!(translate(&flux, &info, false), "arg0_it[loc_idx] - arg0_it[opp_idx]");
    assert_eq!(translate(&flux, &info, true), "arg0_it[opp_idx] - arg0_it[loc_idx]");
}

#[test]
fn products_of_sums_are_parenthesized() {
    let flux = FluxExpr::average(0);
    let info = info_for(flux.clone(), OpExpr::field("u"));
    assert_eq!(translate(&flux, &info, false), "0.5*(arg0_it[loc_idx] + arg0_it[opp_idx])");

    let jump = FluxExpr::jump(0);
    let to_code = FluxToCode::new(0, &info, false);
    assert_eq!(
        to_code.translate_to_string(&jump).unwrap(),
        "(arg0_it[loc_idx] - arg0_it[opp_idx])"
    );
}

#[test]
fn zero_operands_translate_to_literal_zero() {
    let flux = FluxExpr::jump(0);
    let binding: FluxBinding = match OpExpr::boundary_flux(flux.clone(), OpExpr::field("u"), OpExpr::zero(), "wall") {
        OpExpr::Flux(binding) => *binding,
        _ => unreachable!(),
    };
    let info = FluxVariableInfo::new(&[binding]).unwrap();
    assert_eq!(translate(&flux, &info, false), "arg0_it[loc_idx] - 0");
}

#[test]
fn unknown_components_are_inconsistent() {
    let info = info_for(FluxExpr::local(0), OpExpr::field("u"));
    let result = FluxToCode::new(0, &info, false).translate(&FluxExpr::neighbor(0));
    assert!(matches!(result, Err(CompileError::SymbolicInconsistency(_))));

    let result = FluxToCode::new(1, &info, false).translate(&FluxExpr::local(0));
    assert!(matches!(result, Err(CompileError::SymbolicInconsistency(_))));
}

#[test]
fn non_finite_constants_are_rejected() {
    let info = info_for(FluxExpr::local(0), OpExpr::field("u"));
    for flux in [
        FluxExpr::constant(f64::INFINITY) * FluxExpr::local(0),
        FluxExpr::local(0) + FluxExpr::constant(f64::NAN),
        FluxExpr::penalty(f64::NEG_INFINITY) * FluxExpr::local(0),
    ] {
        let result = FluxToCode::new(0, &info, false).translate(&flux);
        assert!(matches!(result, Err(CompileError::SymbolicInconsistency(_))));
    }
}

proptest! {
    #[test]
    fn translation_is_deterministic(flux in flux_expr(2), is_flipped in any::<bool>()) {
        let info = info_for(flux.clone(), OpExpr::field_vector("q", 2));
        let first = translate(&flux, &info, is_flipped);
        let second = translate(&flux.clone(), &info.clone(), is_flipped);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn side_selection_is_an_involution(index in 0..4usize, is_local in any::<bool>(), is_flipped in any::<bool>()) {
        let component = FieldComponent::new(index, is_local);
        let swapped = FieldComponent::new(index, !is_local);
        prop_assert_eq!(
            Side::of_component(component, is_flipped),
            Side::of_component(swapped, !is_flipped)
        );
        prop_assert_eq!(
            Side::of_component(component, is_flipped) == Side::Local,
            is_local ^ is_flipped
        );
    }
}
