use dgflux::kind::{BoundaryTag, FluxKind};
use rustc_hash::FxHashSet;

#[test]
fn flux_kind_display() {
    assert_eq!(FluxKind::Interior.to_string(), "interior");
    assert_eq!(FluxKind::boundary("inflow").to_string(), "boundary(inflow)");
}

#[test]
fn flux_kinds_group_by_variant_and_tag() {
    let kinds: FxHashSet<_> = [
        FluxKind::Interior,
        FluxKind::boundary("wall"),
        FluxKind::Interior,
        FluxKind::Boundary(BoundaryTag::from("wall")),
        FluxKind::boundary("inflow"),
    ]
    .into_iter()
    .collect();

    assert_eq!(kinds.len(), 3);
    assert!(kinds.contains(&FluxKind::boundary("inflow")));
    assert!(!kinds.contains(&FluxKind::boundary("outflow")));
    assert!(FluxKind::Interior.is_interior());
    assert!(!FluxKind::boundary("wall").is_interior());
}
