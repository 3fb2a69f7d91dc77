use dgflux::linear_combination::{
    make_combiner, CombineError, Combiner, CombinerCache, CombinerContext, DType, LinearCombiner, NumericArray,
    ScalarValue, Shape, Vector,
};
use matrixcompare::assert_matrix_eq;
use nalgebra::{dvector, DVector};
use num::Complex;
use proptest::prelude::*;
use std::cell::Cell;

fn f64_vector(values: &[f64]) -> Vector {
    Vector::from(DVector::from_column_slice(values))
}

fn real(x: f64) -> ScalarValue {
    ScalarValue::Real(x)
}

fn numeric_f64(vector: &Vector) -> &DVector<f64> {
    match vector {
        Vector::Numeric(NumericArray::Float64(x)) => x,
        other => panic!("Expected f64 vector, got {:?}", other),
    }
}

#[test]
fn native_combiner_computes_weighted_sum() {
    let x = f64_vector(&[1.0, 2.0, 3.0]);
    let y = f64_vector(&[-1.0, 0.5, 4.0]);
    let combiner = make_combiner(DType::Float64, DType::Float64, &x, 2, None).unwrap();
    assert!(combiner.is_native());

    let result = combiner
        .combine(&[(real(2.0), &x), (real(-1.0), &y)])
        .unwrap();
    assert_matrix_eq!(numeric_f64(&result).clone(), dvector![3.0, 3.5, 2.0], comp = float);
}

#[test]
fn native_combiner_widens_single_precision_vectors() {
    let x = Vector::from(dvector![1.5f32, -2.0f32]);
    let combiner = make_combiner(DType::Float64, DType::Float64, &x, 1, None).unwrap();
    assert!(combiner.is_native());

    let result = combiner.combine(&[(real(0.5), &x)]).unwrap();
    assert_eq!(numeric_f64(&result), &dvector![0.75, -1.0]);
}

#[test]
fn complex_factors_produce_complex_results() {
    let x = f64_vector(&[1.0, 2.0]);
    let combiner = make_combiner(DType::Complex64, DType::Complex64, &x, 1, None).unwrap();
    assert!(combiner.is_native());

    let factor = ScalarValue::from(Complex::new(0.0, 1.0));
    let result = combiner.combine(&[(factor, &x)]).unwrap();
    assert_eq!(
        result,
        Vector::from(dvector![Complex::new(0.0, 1.0), Complex::new(0.0, 2.0)])
    );
}

#[test]
fn composite_vectors_are_combined_per_component() {
    let x = Vector::Composite(vec![f64_vector(&[1.0, 2.0]), f64_vector(&[3.0, 4.0])]);
    let y = Vector::Composite(vec![f64_vector(&[1.0, 1.0]), f64_vector(&[1.0, 1.0])]);
    let combiner = make_combiner(DType::Float64, DType::Float64, &x, 2, None).unwrap();
    assert!(matches!(combiner, Combiner::Composite { len: 2, .. }));
    assert!(combiner.is_native());

    let result = combiner
        .combine(&[(real(1.0), &x), (real(10.0), &y)])
        .unwrap();
    assert_eq!(
        result,
        Vector::Composite(vec![f64_vector(&[11.0, 12.0]), f64_vector(&[13.0, 14.0])])
    );
}

#[test]
fn narrowing_complex_vectors_falls_back_to_unoptimized_combination() {
    let x = Vector::from(dvector![Complex::new(1.0, 5.0), Complex::new(2.0, -1.0)]);
    let combiner = make_combiner(DType::Float64, DType::Float64, &x, 1, None).unwrap();
    assert!(combiner.is_unoptimized());

    let result = combiner.combine(&[(real(3.0), &x)]).unwrap();
    assert_eq!(numeric_f64(&result), &dvector![3.0, 6.0]);
}

#[derive(Default)]
struct CountingContext {
    requests: Cell<usize>,
}

#[derive(Debug)]
struct ZeroCombiner;

impl LinearCombiner for ZeroCombiner {
    fn combine(&self, _: &[(ScalarValue, &Vector)]) -> Result<Vector, CombineError> {
        Ok(f64_vector(&[0.0]))
    }
}

impl CombinerContext for CountingContext {
    fn make_linear_combiner(
        &self,
        _result: DType,
        _scalar: DType,
        _sample: &Vector,
        _arg_count: usize,
    ) -> Option<Box<dyn LinearCombiner>> {
        self.requests.set(self.requests.get() + 1);
        Some(Box::new(ZeroCombiner))
    }
}

#[test]
fn context_is_consulted_only_without_native_kernel() {
    let context = CountingContext::default();

    let real = f64_vector(&[1.0]);
    let combiner = make_combiner(DType::Float64, DType::Float64, &real, 1, Some(&context)).unwrap();
    assert!(combiner.is_native());
    assert_eq!(context.requests.get(), 0);

    let complex = Vector::from(dvector![Complex::new(1.0, 1.0)]);
    let combiner = make_combiner(DType::Float64, DType::Float64, &complex, 1, Some(&context)).unwrap();
    assert!(matches!(combiner, Combiner::Custom(_)));
    assert_eq!(context.requests.get(), 1);
}

#[test]
fn combiners_reject_mismatched_arguments() {
    let x = f64_vector(&[1.0, 2.0]);
    let combiner = make_combiner(DType::Float64, DType::Float64, &x, 2, None).unwrap();

    assert_eq!(
        combiner.combine(&[(real(1.0), &x)]).unwrap_err(),
        CombineError::ArgumentCount { expected: 2, found: 1 }
    );

    let short = f64_vector(&[1.0]);
    assert_eq!(
        combiner
            .combine(&[(real(1.0), &x), (real(1.0), &short)])
            .unwrap_err(),
        CombineError::ShapeMismatch {
            expected: Shape::Numeric {
                dtype: DType::Float64,
                len: 2
            },
            found: Shape::Numeric {
                dtype: DType::Float64,
                len: 1
            },
        }
    );

    let complex_factor = ScalarValue::from(Complex::new(1.0, 1.0));
    assert!(matches!(
        combiner.combine(&[(complex_factor, &x), (real(1.0), &x)]),
        Err(CombineError::ScalarMismatch { .. })
    ));
}

#[test]
fn unoptimized_combiners_reject_mismatched_arguments() {
    let x = Vector::from(dvector![Complex::new(1.0, 0.0), Complex::new(2.0, 0.0), Complex::new(3.0, 0.0)]);
    let combiner = make_combiner(DType::Float64, DType::Float64, &x, 2, None).unwrap();
    assert!(combiner.is_unoptimized());

    assert_eq!(
        combiner.combine(&[(real(1.0), &x)]).unwrap_err(),
        CombineError::ArgumentCount { expected: 2, found: 1 }
    );

    let expected = Shape::Numeric {
        dtype: DType::Complex64,
        len: 3,
    };
    let short = Vector::from(dvector![Complex::new(1.0, 0.0), Complex::new(2.0, 0.0)]);
    assert_eq!(
        combiner
            .combine(&[(real(1.0), &short), (real(1.0), &short)])
            .unwrap_err(),
        CombineError::ShapeMismatch {
            expected: expected.clone(),
            found: Shape::Numeric {
                dtype: DType::Complex64,
                len: 2
            },
        }
    );

    let single = Vector::from(dvector![1.0f32, 2.0, 3.0]);
    assert_eq!(
        combiner
            .combine(&[(real(1.0), &single), (real(1.0), &x)])
            .unwrap_err(),
        CombineError::ShapeMismatch {
            expected,
            found: Shape::Numeric {
                dtype: DType::Float32,
                len: 3
            },
        }
    );

    let complex_factor = ScalarValue::from(Complex::new(1.0, 1.0));
    assert!(matches!(
        combiner.combine(&[(complex_factor, &x), (real(1.0), &x)]),
        Err(CombineError::ScalarMismatch { .. })
    ));

    let result = combiner.combine(&[(real(1.0), &x), (real(2.0), &x)]).unwrap();
    assert_eq!(numeric_f64(&result), &dvector![3.0, 6.0, 9.0]);
}

#[test]
fn composite_shapes_must_be_homogeneous() {
    let ragged = Vector::Composite(vec![f64_vector(&[1.0]), f64_vector(&[1.0, 2.0])]);
    assert_eq!(ragged.shape().unwrap_err(), CombineError::InhomogeneousComposite);
    assert_eq!(Vector::Composite(vec![]).shape().unwrap_err(), CombineError::EmptyComposite);
    assert!(make_combiner(DType::Float64, DType::Float64, &ragged, 1, None).is_err());
}

#[test]
fn cache_reuses_combiners_per_signature() {
    let cache = CombinerCache::new();
    assert!(cache.is_empty());

    let x = f64_vector(&[1.0, 2.0]);
    let first = cache
        .get_or_make(DType::Float64, DType::Float64, &x, 2, None)
        .unwrap();
    let again = cache
        .get_or_make(DType::Float64, DType::Float64, &f64_vector(&[5.0, 6.0]), 2, None)
        .unwrap();
    assert!(std::rc::Rc::ptr_eq(&first, &again));
    assert_eq!(cache.len(), 1);

    cache
        .get_or_make(DType::Float64, DType::Float64, &x, 3, None)
        .unwrap();
    cache
        .get_or_make(DType::Float32, DType::Float64, &x, 2, None)
        .unwrap();
    assert_eq!(cache.len(), 3);
}

proptest! {
    #[test]
    fn native_and_unoptimized_combination_agree(
        (x, y) in (1usize..8).prop_flat_map(|n| (
            proptest::collection::vec(-10.0..10.0f64, n),
            proptest::collection::vec(-10.0..10.0f64, n),
        )),
        a in -5.0..5.0f64,
        b in -5.0..5.0f64,
    ) {
        let x = f64_vector(&x);
        let y = f64_vector(&y);
        let native = make_combiner(DType::Float64, DType::Float64, &x, 2, None).unwrap();
        let combined = native.combine(&[(real(a), &x), (real(b), &y)]).unwrap();

        let expected = numeric_f64(&x) * a + numeric_f64(&y) * b;
        assert_matrix_eq!(numeric_f64(&combined).clone(), expected, comp = abs, tol = 1e-12);
    }
}
