use dgflux::flux::{FieldComponent, FluxExpr};

#[test]
fn arithmetic_flattens_sums_and_products() {
    let sum = FluxExpr::local(0) + FluxExpr::local(1) + FluxExpr::neighbor(0);
    assert_eq!(
        sum,
        FluxExpr::Sum(vec![FluxExpr::local(0), FluxExpr::local(1), FluxExpr::neighbor(0)])
    );

    let product = FluxExpr::normal(0) * (FluxExpr::normal(1) * FluxExpr::local(0));
    assert_eq!(
        product,
        FluxExpr::Product(vec![FluxExpr::normal(0), FluxExpr::normal(1), FluxExpr::local(0)])
    );
}

#[test]
fn jump_and_average() {
    assert_eq!(
        FluxExpr::jump(2),
        FluxExpr::Sum(vec![
            FluxExpr::local(2),
            FluxExpr::Negation(Box::new(FluxExpr::neighbor(2)))
        ])
    );
    assert_eq!(
        FluxExpr::average(0),
        FluxExpr::Product(vec![
            FluxExpr::constant(0.5),
            FluxExpr::Sum(vec![FluxExpr::local(0), FluxExpr::neighbor(0)])
        ])
    );
    assert_eq!(2.0 * FluxExpr::local(0), FluxExpr::constant(2.0) * FluxExpr::local(0));
}

#[test]
fn field_components_are_distinct_in_first_occurrence_order() {
    let flux = FluxExpr::neighbor(1) * FluxExpr::normal(0)
        + FluxExpr::local(0) / FluxExpr::neighbor(1)
        + FluxExpr::penalty(1.0) * FluxExpr::jump(0);

    assert_eq!(
        flux.field_components(),
        vec![
            FieldComponent::new(1, false),
            FieldComponent::new(0, true),
            FieldComponent::new(0, false),
        ]
    );
    assert!(FluxExpr::normal(0).field_components().is_empty());
}
