use dgflux::flux::FluxExpr;
use dgflux::kind::FluxKind;
use dgflux::optemplate::{FluxBinding, OpExpr};
use rustc_hash::FxHashMap;

fn binding(expr: &OpExpr) -> FluxBinding {
    match expr {
        OpExpr::Flux(binding) => binding.as_ref().clone(),
        _ => panic!("not a flux: {:?}", expr),
    }
}

#[test]
fn zero_detection() {
    assert!(OpExpr::zero().is_zero());
    assert!(OpExpr::constant(-0.0).is_zero());
    assert!(!OpExpr::constant(1.0).is_zero());
    assert!(!OpExpr::field("u").is_zero());
}

#[test]
fn field_vector_names_components() {
    assert_eq!(
        OpExpr::field_vector("q", 2),
        OpExpr::vector(vec![OpExpr::field("q0"), OpExpr::field("q1")])
    );
    assert!(OpExpr::field_vector("q", 2).is_vector());
}

#[test]
fn binding_kinds_and_operands() {
    let interior = binding(&OpExpr::flux(FluxExpr::jump(0), OpExpr::field("u")));
    assert_eq!(interior.kind(), FluxKind::Interior);
    assert_eq!(interior.operands(), vec![&OpExpr::field("u")]);

    let boundary = binding(&OpExpr::boundary_flux(
        FluxExpr::jump(0),
        OpExpr::field("u"),
        OpExpr::field("g"),
        "wall",
    ));
    assert_eq!(boundary.kind(), FluxKind::boundary("wall"));
    assert_eq!(boundary.operands(), vec![&OpExpr::field("u"), &OpExpr::field("g")]);
}

#[test]
fn collect_fluxes_is_innermost_first_and_distinct() {
    let inner = OpExpr::flux(FluxExpr::jump(0), OpExpr::field("u"));
    let outer = OpExpr::flux(FluxExpr::average(0), inner.clone());
    let expr = outer.clone() + 2.0 * inner.clone();

    let fluxes = expr.collect_fluxes();
    assert_eq!(fluxes, vec![&binding(&inner), &binding(&outer)]);
    assert!(expr.contains_flux());
    assert!(!(OpExpr::field("u") * OpExpr::constant(2.0)).contains_flux());
}

#[test]
fn substitute_fluxes_replaces_computed_bindings() {
    let inner = OpExpr::flux(FluxExpr::jump(0), OpExpr::field("u"));
    let outer = OpExpr::flux(FluxExpr::average(0), inner.clone());
    let expr = outer + inner.clone();

    let mut names = FxHashMap::default();
    names.insert(binding(&inner), "flux0".to_string());

    let substituted = expr.substitute_fluxes(&names);
    assert_eq!(
        substituted,
        OpExpr::flux(FluxExpr::average(0), OpExpr::variable("flux0")) + OpExpr::variable("flux0")
    );
}
