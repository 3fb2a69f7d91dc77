//! Strategies for property-based testing of flux compilation.
use crate::face_group::{FaceGroup, FaceGroupBuilder, FacePair, FaceSide};
use crate::flux::{FieldComponent, FluxExpr};
use ::proptest::collection::vec;
use ::proptest::prelude::*;
use itertools::{izip, Itertools};

/// Flux expressions over the components `0 .. components` of their operand.
///
/// # Panics
///
/// Panics if `components` is zero.
pub fn flux_expr(components: usize) -> impl Strategy<Value = FluxExpr> {
    assert!(components > 0, "Fluxes need at least one operand component");
    let leaf = prop_oneof![
        (-10.0..10.0).prop_map(FluxExpr::constant),
        (0..3usize).prop_map(FluxExpr::normal),
        prop_oneof![Just(0.5), Just(1.0), Just(2.0)].prop_map(FluxExpr::penalty),
        (0..components, any::<bool>())
            .prop_map(|(index, is_local)| FluxExpr::FieldComponent(FieldComponent::new(index, is_local))),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            vec(inner.clone(), 1..4).prop_map(FluxExpr::Sum),
            vec(inner.clone(), 1..4).prop_map(FluxExpr::Product),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a / b),
            inner.prop_map(|a| -a),
        ]
    })
}

pub fn permutation(n: usize) -> impl Strategy<Value = Vec<usize>> + Clone {
    Just((0..n).collect_vec()).prop_shuffle()
}

/// A face group coupling a chain of elements, each element sharing its face 1 with face 0
/// of the next element.
#[derive(Debug, Clone)]
pub struct ChainFaceGroup {
    pub face_group: FaceGroup,
    pub element_count: usize,
    /// Each element has its face 0 nodes first, then its face 1 nodes.
    pub nodes_per_element: usize,
}

/// Chains of 2 to 4 elements with faces of 1 to 3 nodes, with arbitrary node orderings of
/// the local faces and arbitrary write maps.
pub fn chain_face_group() -> impl Strategy<Value = ChainFaceGroup> {
    (1usize..4, 2usize..5)
        .prop_flat_map(|(face_length, element_count)| {
            let orderings = vec(permutation(face_length), element_count - 1);
            (Just(face_length), Just(element_count), orderings.clone(), orderings)
        })
        .prop_map(|(face_length, element_count, loc_orderings, write_maps)| {
            let face_count = 2;
            let nodes_per_element = face_length * face_count;
            let mut builder = FaceGroupBuilder::new(face_length, face_count);
            let opp_list = builder.index_list(&(0..face_length).collect_vec());

            for (element, loc_ordering, write_map) in izip!(0.., loc_orderings, write_maps) {
                let loc_list = builder.index_list(&loc_ordering.iter().map(|i| face_length + i).collect_vec());
                let write_map = builder.index_list(&write_map);
                builder.push_pair(FacePair {
                    loc: FaceSide::new(element * nodes_per_element, loc_list, element, 1).with_normal(&[1.0]),
                    opp: FaceSide::new((element + 1) * nodes_per_element, opp_list, element + 1, 0)
                        .with_normal(&[-1.0]),
                    opp_native_write_map: write_map,
                });
            }

            ChainFaceGroup {
                face_group: builder.build(),
                element_count,
                nodes_per_element,
            }
        })
}
