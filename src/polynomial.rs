//! Orthonormal Jacobi polynomials and Vandermonde matrices.
//!
//! The polynomials are normalized on `[-1, 1]` with respect to the weight
//! `(1 - x)^α (1 + x)^β`, so that Vandermonde matrices of the Legendre family (`α = β = 0`)
//! are well conditioned.
use dgflux_traits::Real;
use nalgebra::{convert, DMatrix, Scalar};
use num::Zero;
use numeric_literals::replace_float_literals;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// The orthonormal Jacobi polynomial `P_N^{(α, β)}`.
///
/// Construction precomputes the coefficients of the three-term recurrence, so that
/// evaluation at a point costs `O(N)` multiply-adds.
#[derive(Debug, Clone, PartialEq)]
pub struct JacobiPolynomial {
    alpha: u32,
    beta: u32,
    degree: usize,
    p0: f64,
    gamma1_sqrt: f64,
    /// `(a_{i}, a_{i+1}, b_{i+1})` for each step of the recurrence.
    recurrence: Vec<(f64, f64, f64)>,
}

fn factorial(n: u32) -> f64 {
    (1..=n).map(f64::from).product()
}

impl JacobiPolynomial {
    pub fn new(alpha: u32, beta: u32, degree: usize) -> Self {
        let (a, b) = (f64::from(alpha), f64::from(beta));

        let gamma0 = 2f64.powf(a + b + 1.0) / (a + b + 1.0) * factorial(alpha) * factorial(beta)
            / factorial(alpha + beta);
        let gamma1 = (a + 1.0) * (b + 1.0) / (a + b + 3.0) * gamma0;

        let p0 = 1.0 / gamma0.sqrt();

        let mut a_old = 2.0 / (2.0 + a + b) * ((a + 1.0) * (b + 1.0) / (a + b + 3.0)).sqrt();
        let recurrence = (1..degree)
            .map(|i| {
                let i = i as f64;
                let h1 = 2.0 * i + a + b;
                let a_new = 2.0 / (h1 + 2.0)
                    * ((i + 1.0) * (i + 1.0 + a + b) * (i + 1.0 + a) * (i + 1.0 + b) / (h1 + 1.0) / (h1 + 3.0)).sqrt();
                let b_new = -(a * a - b * b) / h1 / (h1 + 2.0);
                let step = (a_old, a_new, b_new);
                a_old = a_new;
                step
            })
            .collect();

        Self {
            alpha,
            beta,
            degree,
            p0,
            gamma1_sqrt: gamma1.sqrt(),
            recurrence,
        }
    }

    /// The Legendre polynomial `P_N = P_N^{(0, 0)}`.
    pub fn legendre(degree: usize) -> Self {
        Self::new(0, 0, degree)
    }

    pub fn alpha(&self) -> u32 {
        self.alpha
    }

    pub fn beta(&self) -> u32 {
        self.beta
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    #[replace_float_literals(convert::<f64, T>(literal))]
    pub fn evaluate<T: Real>(&self, x: T) -> T {
        let p0: T = convert(self.p0);
        if self.degree == 0 {
            return p0;
        }

        let a: T = convert(f64::from(self.alpha));
        let b: T = convert(f64::from(self.beta));
        let mut previous = p0;
        let mut current = ((a + b + 2.0) * x / 2.0 + (a - b) / 2.0) / convert(self.gamma1_sqrt);
        for &(a_old, a_new, b_new) in &self.recurrence {
            let next = (-convert::<_, T>(a_old) * previous + (x - convert(b_new)) * current) / convert(a_new);
            previous = current;
            current = next;
        }
        current
    }
}

/// The derivative of the orthonormal Jacobi polynomial `P_N^{(α, β)}`.
///
/// Uses `d/dx P_N^{(α, β)} = sqrt(N (N + α + β + 1)) P_{N-1}^{(α + 1, β + 1)}`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffJacobiPolynomial {
    factor: f64,
    lowered: Option<JacobiPolynomial>,
}

impl DiffJacobiPolynomial {
    pub fn new(alpha: u32, beta: u32, degree: usize) -> Self {
        if degree == 0 {
            Self {
                factor: 0.0,
                lowered: None,
            }
        } else {
            let n = degree as f64;
            Self {
                factor: (n * (n + f64::from(alpha) + f64::from(beta) + 1.0)).sqrt(),
                lowered: Some(JacobiPolynomial::new(alpha + 1, beta + 1, degree - 1)),
            }
        }
    }

    pub fn legendre(degree: usize) -> Self {
        Self::new(0, 0, degree)
    }

    pub fn evaluate<T: Real>(&self, x: T) -> T {
        match &self.lowered {
            Some(lowered) => convert::<_, T>(self.factor) * lowered.evaluate(x),
            None => T::zero(),
        }
    }
}

/// Returns the matrix `V[(i, j)] = f_j(x_i)` for `functions = [f_j]` and `points = [x_i]`.
pub fn generic_vandermonde<P, T, F>(points: &[P], functions: &[F]) -> DMatrix<T>
where
    T: Scalar + Zero,
    F: Fn(&P) -> T,
{
    DMatrix::from_fn(points.len(), functions.len(), |i, j| functions[j](&points[i]))
}

/// Returns one Vandermonde matrix per value of the vector-valued `functions`,
/// i.e. `V_n[(i, j)] = f_j(x_i)[n]`.
///
/// The number of matrices is the number of values returned by the first function at the
/// first point, and no matrices are returned if there are no points or functions.
///
/// # Panics
///
/// Panics if a function returns fewer values than the first function at the first point.
pub fn generic_multi_vandermonde<P, T, F>(points: &[P], functions: &[F]) -> Vec<DMatrix<T>>
where
    T: Scalar + Zero,
    F: Fn(&P) -> Vec<T>,
{
    let count = match (points.first(), functions.first()) {
        (Some(x), Some(f)) => f(x).len(),
        _ => return Vec::new(),
    };

    let mut result = vec![DMatrix::zeros(points.len(), functions.len()); count];
    for (i, x) in points.iter().enumerate() {
        for (j, f) in functions.iter().enumerate() {
            let values = f(x);
            for (n, matrix) in result.iter_mut().enumerate() {
                matrix[(i, j)] = values[n].clone();
            }
        }
    }
    result
}

/// The Vandermonde matrix of the Legendre polynomials of degree `0 ..= degree`.
pub fn legendre_vandermonde<T: Real>(points: &[T], degree: usize) -> DMatrix<T> {
    let polynomials: Vec<_> = (0..=degree).map(JacobiPolynomial::legendre).collect();
    let functions: Vec<_> = polynomials
        .iter()
        .map(|p| move |x: &T| p.evaluate(*x))
        .collect();
    generic_vandermonde(points, &functions)
}

/// Owns Jacobi polynomials and their derivatives by `(α, β, N)`, so that their recurrence
/// coefficients are only computed once.
#[derive(Debug, Default)]
pub struct JacobiCache {
    polynomials: RefCell<FxHashMap<(u32, u32, usize), Rc<JacobiPolynomial>>>,
    derivatives: RefCell<FxHashMap<(u32, u32, usize), Rc<DiffJacobiPolynomial>>>,
}

impl JacobiCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jacobi(&self, alpha: u32, beta: u32, degree: usize) -> Rc<JacobiPolynomial> {
        Rc::clone(
            self.polynomials
                .borrow_mut()
                .entry((alpha, beta, degree))
                .or_insert_with(|| Rc::new(JacobiPolynomial::new(alpha, beta, degree))),
        )
    }

    pub fn diff_jacobi(&self, alpha: u32, beta: u32, degree: usize) -> Rc<DiffJacobiPolynomial> {
        Rc::clone(
            self.derivatives
                .borrow_mut()
                .entry((alpha, beta, degree))
                .or_insert_with(|| Rc::new(DiffJacobiPolynomial::new(alpha, beta, degree))),
        )
    }

    pub fn legendre(&self, degree: usize) -> Rc<JacobiPolynomial> {
        self.jacobi(0, 0, degree)
    }

    /// Number of distinct polynomials and derivatives held by the cache.
    pub fn len(&self) -> usize {
        self.polynomials.borrow().len() + self.derivatives.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
