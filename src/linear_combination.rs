//! Optimized linear combinations `Σ f_k v_k` of vectors, as needed by time steppers.
//!
//! [`make_combiner`] inspects a sample vector once and picks a strategy:
//!
//! 1. composite (array-of-arrays) vectors are combined component by component, using a
//!    combiner for the common shape of the components;
//! 2. numeric arrays are combined by a native fused multiply-add kernel for the exact triple
//!    of result, scalar and vector types, if one exists;
//! 3. otherwise a [`CombinerContext`] may supply a custom combiner;
//! 4. otherwise an unoptimized combiner is used and a warning is logged.
use dgflux_traits::NativeScalar;
use log::warn;
use nalgebra::{DVector, Scalar};
use num::Complex;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;

/// Element types of numeric arrays and factors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DType {
    Float32,
    Float64,
    /// Complex numbers with `f64` parts.
    Complex64,
}

impl DType {
    pub fn is_complex(&self) -> bool {
        matches!(self, DType::Complex64)
    }

    /// Whether every value of type `other` can be converted to this type without discarding
    /// an imaginary part.
    pub fn can_represent(&self, other: DType) -> bool {
        self.is_complex() || !other.is_complex()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NumericArray {
    Float32(DVector<f32>),
    Float64(DVector<f64>),
    Complex64(DVector<Complex<f64>>),
}

impl NumericArray {
    pub fn dtype(&self) -> DType {
        match self {
            NumericArray::Float32(_) => DType::Float32,
            NumericArray::Float64(_) => DType::Float64,
            NumericArray::Complex64(_) => DType::Complex64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            NumericArray::Float32(x) => x.len(),
            NumericArray::Float64(x) => x.len(),
            NumericArray::Complex64(x) => x.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds `factor * self` to `result`, converting each element to the result type.
    fn accumulate_into<R: NativeScalar>(&self, result: &mut DVector<R>, factor: R) {
        match self {
            NumericArray::Float32(x) => axpy_converted(result, factor, x, R::from_f32),
            NumericArray::Float64(x) => axpy_converted(result, factor, x, R::from_f64),
            NumericArray::Complex64(x) => axpy_converted(result, factor, x, R::from_c64),
        }
    }

    fn converted<R: NativeScalar>(&self) -> DVector<R> {
        match self {
            NumericArray::Float32(x) => x.map(R::from_f32),
            NumericArray::Float64(x) => x.map(R::from_f64),
            NumericArray::Complex64(x) => x.map(R::from_c64),
        }
    }
}

fn axpy_converted<R, V>(result: &mut DVector<R>, factor: R, x: &DVector<V>, convert: impl Fn(V) -> R)
where
    R: NativeScalar,
    V: Scalar + Copy,
{
    for (r, &x) in result.iter_mut().zip(x.iter()) {
        *r += factor * convert(x);
    }
}

/// A vector operand of a linear combination.
#[derive(Debug, Clone, PartialEq)]
pub enum Vector {
    Numeric(NumericArray),
    /// An array-of-arrays vector, combined component by component.
    Composite(Vec<Vector>),
}

impl From<NumericArray> for Vector {
    fn from(array: NumericArray) -> Self {
        Vector::Numeric(array)
    }
}

impl From<DVector<f64>> for Vector {
    fn from(x: DVector<f64>) -> Self {
        Vector::Numeric(NumericArray::Float64(x))
    }
}

impl From<DVector<f32>> for Vector {
    fn from(x: DVector<f32>) -> Self {
        Vector::Numeric(NumericArray::Float32(x))
    }
}

impl From<DVector<Complex<f64>>> for Vector {
    fn from(x: DVector<Complex<f64>>) -> Self {
        Vector::Numeric(NumericArray::Complex64(x))
    }
}

impl Vector {
    /// The shape of this vector, provided all components of composites share one shape.
    pub fn shape(&self) -> Result<Shape, CombineError> {
        match self {
            Vector::Numeric(array) => Ok(Shape::Numeric {
                dtype: array.dtype(),
                len: array.len(),
            }),
            Vector::Composite(components) => {
                let (first, rest) = components.split_first().ok_or(CombineError::EmptyComposite)?;
                let component = first.shape()?;
                for other in rest {
                    if other.shape()? != component {
                        return Err(CombineError::InhomogeneousComposite);
                    }
                }
                Ok(Shape::Composite {
                    len: components.len(),
                    component: Box::new(component),
                })
            }
        }
    }
}

/// Structure, element type and length of a [`Vector`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Shape {
    Numeric { dtype: DType, len: usize },
    Composite { len: usize, component: Box<Shape> },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ScalarValue {
    Real(f64),
    Complex(Complex<f64>),
}

impl ScalarValue {
    pub fn dtype(&self) -> DType {
        match self {
            ScalarValue::Real(_) => DType::Float64,
            ScalarValue::Complex(_) => DType::Complex64,
        }
    }

    fn to_native<R: NativeScalar>(self) -> R {
        match self {
            ScalarValue::Real(x) => R::from_f64(x),
            ScalarValue::Complex(z) => R::from_c64(z),
        }
    }
}

impl From<f64> for ScalarValue {
    fn from(x: f64) -> Self {
        ScalarValue::Real(x)
    }
}

impl From<Complex<f64>> for ScalarValue {
    fn from(z: Complex<f64>) -> Self {
        ScalarValue::Complex(z)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CombineError {
    ArgumentCount { expected: usize, found: usize },
    ShapeMismatch { expected: Shape, found: Shape },
    /// A composite vector whose components do not all have the same shape.
    InhomogeneousComposite,
    EmptyComposite,
    ScalarMismatch { expected: DType, found: DType },
}

impl Display for CombineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CombineError::ArgumentCount { expected, found } => {
                write!(f, "Combiner expects {} (factor, vector) pairs, got {}", expected, found)
            }
            CombineError::ShapeMismatch { expected, found } => {
                write!(f, "Vector of shape {:?} does not match combiner shape {:?}", found, expected)
            }
            CombineError::InhomogeneousComposite => write!(f, "Composite vector components differ in shape"),
            CombineError::EmptyComposite => write!(f, "Composite vector has no components"),
            CombineError::ScalarMismatch { expected, found } => {
                write!(f, "Factor of type {:?} does not match combiner factor type {:?}", found, expected)
            }
        }
    }
}

impl Error for CombineError {}

/// Computes linear combinations of vectors of a fixed shape.
pub trait LinearCombiner: Debug {
    /// Computes `Σ factor_k * vector_k` over `args`.
    fn combine(&self, args: &[(ScalarValue, &Vector)]) -> Result<Vector, CombineError>;
}

/// An external source of combiners for shapes without a native kernel.
pub trait CombinerContext {
    fn make_linear_combiner(
        &self,
        result: DType,
        scalar: DType,
        sample: &Vector,
        arg_count: usize,
    ) -> Option<Box<dyn LinearCombiner>>;
}

/// A fused multiply-add kernel for one triple of result, factor and vector types.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeCombiner {
    result: DType,
    scalar: DType,
    vector: DType,
    len: usize,
    arg_count: usize,
}

impl NativeCombiner {
    fn new(result: DType, scalar: DType, vector: DType, len: usize, arg_count: usize) -> Option<Self> {
        (result.can_represent(scalar) && result.can_represent(vector)).then(|| Self {
            result,
            scalar,
            vector,
            len,
            arg_count,
        })
    }

    fn combine_as<R: NativeScalar>(&self, args: &[(ScalarValue, &NumericArray)]) -> DVector<R> {
        let mut result = DVector::from_element(self.len, R::zero());
        for (factor, array) in args {
            array.accumulate_into(&mut result, factor.to_native());
        }
        result
    }
}

impl LinearCombiner for NativeCombiner {
    fn combine(&self, args: &[(ScalarValue, &Vector)]) -> Result<Vector, CombineError> {
        check_arg_count(self.arg_count, args.len())?;
        let expected = Shape::Numeric {
            dtype: self.vector,
            len: self.len,
        };
        let mut arrays = Vec::with_capacity(args.len());
        for &(factor, vector) in args {
            if factor.dtype().is_complex() && !self.scalar.is_complex() {
                return Err(CombineError::ScalarMismatch {
                    expected: self.scalar,
                    found: factor.dtype(),
                });
            }
            match vector {
                Vector::Numeric(array) if array.dtype() == self.vector && array.len() == self.len => {
                    arrays.push((factor, array))
                }
                other => {
                    return Err(CombineError::ShapeMismatch {
                        expected,
                        found: other.shape()?,
                    })
                }
            }
        }

        let result = match self.result {
            DType::Float32 => NumericArray::Float32(self.combine_as(&arrays)),
            DType::Float64 => NumericArray::Float64(self.combine_as(&arrays)),
            DType::Complex64 => NumericArray::Complex64(self.combine_as(&arrays)),
        };
        Ok(Vector::Numeric(result))
    }
}

/// Computes `Σ result_type(factor_k) * vector_k` with one temporary per term.
#[derive(Debug, Clone, PartialEq)]
pub struct UnoptimizedCombiner {
    result: DType,
    scalar: DType,
    shape: Shape,
    arg_count: usize,
}

impl UnoptimizedCombiner {
    fn sum_as<R: NativeScalar>(&self, args: &[(ScalarValue, &NumericArray)]) -> DVector<R> {
        let len = match self.shape {
            Shape::Numeric { len, .. } => len,
            Shape::Composite { .. } => 0,
        };
        args.iter()
            .map(|(factor, array)| array.converted::<R>() * factor.to_native::<R>())
            .fold(DVector::zeros(len), |sum, term| sum + term)
    }
}

impl LinearCombiner for UnoptimizedCombiner {
    fn combine(&self, args: &[(ScalarValue, &Vector)]) -> Result<Vector, CombineError> {
        check_arg_count(self.arg_count, args.len())?;
        let mut arrays = Vec::with_capacity(args.len());
        for &(factor, vector) in args {
            if factor.dtype().is_complex() && !self.scalar.is_complex() {
                return Err(CombineError::ScalarMismatch {
                    expected: self.scalar,
                    found: factor.dtype(),
                });
            }
            let shape = vector.shape()?;
            match vector {
                Vector::Numeric(array) if shape == self.shape => arrays.push((factor, array)),
                _ => {
                    return Err(CombineError::ShapeMismatch {
                        expected: self.shape.clone(),
                        found: shape,
                    })
                }
            }
        }

        let result = match self.result {
            DType::Float32 => NumericArray::Float32(self.sum_as(&arrays)),
            DType::Float64 => NumericArray::Float64(self.sum_as(&arrays)),
            DType::Complex64 => NumericArray::Complex64(self.sum_as(&arrays)),
        };
        Ok(Vector::Numeric(result))
    }
}

/// A linear combination strategy, chosen once for a shape by [`make_combiner`].
#[derive(Debug)]
pub enum Combiner {
    Native(NativeCombiner),
    /// Applies the component combiner to each of `len` components of composite vectors.
    Composite {
        len: usize,
        component_shape: Shape,
        component: Box<Combiner>,
    },
    Custom(Box<dyn LinearCombiner>),
    Unoptimized(UnoptimizedCombiner),
}

impl LinearCombiner for Combiner {
    fn combine(&self, args: &[(ScalarValue, &Vector)]) -> Result<Vector, CombineError> {
        match self {
            Combiner::Native(combiner) => combiner.combine(args),
            Combiner::Custom(combiner) => combiner.combine(args),
            Combiner::Unoptimized(combiner) => combiner.combine(args),
            Combiner::Composite {
                len,
                component_shape,
                component,
            } => {
                let mut per_argument = Vec::with_capacity(args.len());
                for &(factor, vector) in args {
                    match vector {
                        Vector::Composite(components) if components.len() == *len => {
                            per_argument.push((factor, components))
                        }
                        other => {
                            return Err(CombineError::ShapeMismatch {
                                expected: Shape::Composite {
                                    len: *len,
                                    component: Box::new(component_shape.clone()),
                                },
                                found: other.shape()?,
                            })
                        }
                    }
                }

                let components = (0..*len)
                    .map(|i| {
                        let args_i: Vec<_> = per_argument
                            .iter()
                            .map(|(factor, components)| (*factor, &components[i]))
                            .collect();
                        component.combine(&args_i)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Vector::Composite(components))
            }
        }
    }
}

impl Combiner {
    pub fn is_native(&self) -> bool {
        match self {
            Combiner::Native(_) => true,
            Combiner::Composite { component, .. } => component.is_native(),
            _ => false,
        }
    }

    pub fn is_unoptimized(&self) -> bool {
        match self {
            Combiner::Unoptimized(_) => true,
            Combiner::Composite { component, .. } => component.is_unoptimized(),
            _ => false,
        }
    }
}

fn check_arg_count(expected: usize, found: usize) -> Result<(), CombineError> {
    if expected == found {
        Ok(())
    } else {
        Err(CombineError::ArgumentCount { expected, found })
    }
}

/// Creates a combiner of `arg_count` vectors shaped like `sample` with factors of type
/// `scalar`, producing vectors with elements of type `result`.
pub fn make_combiner(
    result: DType,
    scalar: DType,
    sample: &Vector,
    arg_count: usize,
    context: Option<&dyn CombinerContext>,
) -> Result<Combiner, CombineError> {
    match (sample, sample.shape()?) {
        (Vector::Composite(components), Shape::Composite { len, component }) => {
            let component_combiner = make_combiner(result, scalar, &components[0], arg_count, context)?;
            Ok(Combiner::Composite {
                len,
                component_shape: *component,
                component: Box::new(component_combiner),
            })
        }
        (_, shape) => {
            if let Shape::Numeric { dtype, len } = shape {
                if let Some(native) = NativeCombiner::new(result, scalar, dtype, len, arg_count) {
                    return Ok(Combiner::Native(native));
                }
            }
            if let Some(custom) = context.and_then(|ctx| ctx.make_linear_combiner(result, scalar, sample, arg_count)) {
                return Ok(Combiner::Custom(custom));
            }
            warn!("using unoptimized linear combination routine");
            Ok(Combiner::Unoptimized(UnoptimizedCombiner {
                result,
                scalar,
                shape,
                arg_count,
            }))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CombinerKey {
    result: DType,
    scalar: DType,
    shape: Shape,
    arg_count: usize,
}

/// Memoizes combiners by result type, factor type, shape and argument count.
///
/// Combiners are created on first request, so a fallback warning is logged once per
/// distinct signature.
#[derive(Debug, Default)]
pub struct CombinerCache {
    combiners: RefCell<FxHashMap<CombinerKey, Rc<Combiner>>>,
}

impl CombinerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_make(
        &self,
        result: DType,
        scalar: DType,
        sample: &Vector,
        arg_count: usize,
        context: Option<&dyn CombinerContext>,
    ) -> Result<Rc<Combiner>, CombineError> {
        let key = CombinerKey {
            result,
            scalar,
            shape: sample.shape()?,
            arg_count,
        };
        if let Some(combiner) = self.combiners.borrow().get(&key) {
            return Ok(Rc::clone(combiner));
        }
        let combiner = Rc::new(make_combiner(result, scalar, sample, arg_count, context)?);
        self.combiners
            .borrow_mut()
            .insert(key, Rc::clone(&combiner));
        Ok(combiner)
    }

    pub fn len(&self) -> usize {
        self.combiners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
