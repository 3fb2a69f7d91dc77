//! The discretization context flux kernels are compiled for and run on.
use crate::backend::Platform;
use crate::face_group::FaceGroup;
use crate::instrument::{EventCounter, IntervalTimer};
use crate::kind::{BoundaryTag, FluxKind};
use dgflux_traits::NativeScalar;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The floating point type generated kernels compute in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    Float32,
    Float64,
}

impl Default for ScalarType {
    fn default() -> Self {
        ScalarType::Float64
    }
}

impl ScalarType {
    /// Name of the corresponding C++ type.
    pub fn c_name(&self) -> &'static str {
        match self {
            ScalarType::Float32 => <f32 as NativeScalar>::C_TYPE,
            ScalarType::Float64 => <f64 as NativeScalar>::C_TYPE,
        }
    }

    pub fn from_c_name(name: &str) -> Option<Self> {
        [ScalarType::Float32, ScalarType::Float64]
            .into_iter()
            .find(|scalar_type| scalar_type.c_name() == name)
    }

    /// Rounds `value` to the nearest value representable in this type.
    pub fn round(&self, value: f64) -> f64 {
        match self {
            ScalarType::Float32 => f64::from(<f32 as NativeScalar>::from_f64(value)),
            ScalarType::Float64 => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiscretizationSettings {
    pub default_scalar_type: ScalarType,
    pub platform: Platform,
    /// Whether compiled kernels record timings, call counts and flop estimates.
    pub instrumented: bool,
}

/// What the operator compiler needs to know about the discretization it compiles for.
pub trait Discretization {
    fn default_scalar_type(&self) -> ScalarType;

    fn platform(&self) -> &Platform;

    fn instrumented(&self) -> bool;

    fn gather_timer(&self) -> Arc<IntervalTimer>;

    fn gather_counter(&self) -> Arc<EventCounter>;

    fn gather_flop_counter(&self) -> Arc<EventCounter>;

    /// Number of elements in the (single) element group.
    fn element_count(&self) -> usize;

    /// The face groups flux terms of the given kind are gathered over.
    fn face_groups(&self, kind: &FluxKind) -> &[FaceGroup];

    /// Estimated number of floating point operations of gathering one argument for one flux
    /// over all interior faces.
    fn gather_flops(&self) -> u64 {
        self.face_groups(&FluxKind::Interior)
            .iter()
            .map(|group| 2 * group.face_storage_len(self.element_count()) as u64)
            .sum()
    }

    /// Length of the face storage flux values of the given kind are gathered into.
    fn flux_storage_len(&self, kind: &FluxKind) -> usize {
        self.face_groups(kind)
            .iter()
            .map(|group| group.face_storage_len(self.element_count()))
            .max()
            .unwrap_or(0)
    }
}

/// A discretization described directly by its face groups.
#[derive(Debug)]
pub struct FaceDiscretization {
    settings: DiscretizationSettings,
    element_count: usize,
    interior_groups: Vec<FaceGroup>,
    boundary_groups: FxHashMap<BoundaryTag, Vec<FaceGroup>>,
    gather_timer: Arc<IntervalTimer>,
    gather_counter: Arc<EventCounter>,
    gather_flop_counter: Arc<EventCounter>,
}

impl FaceDiscretization {
    pub fn builder(element_count: usize) -> FaceDiscretizationBuilder {
        FaceDiscretizationBuilder {
            settings: DiscretizationSettings::default(),
            element_count,
            interior_groups: Vec::new(),
            boundary_groups: FxHashMap::default(),
        }
    }
}

impl Discretization for FaceDiscretization {
    fn default_scalar_type(&self) -> ScalarType {
        self.settings.default_scalar_type
    }

    fn platform(&self) -> &Platform {
        &self.settings.platform
    }

    fn instrumented(&self) -> bool {
        self.settings.instrumented
    }

    fn gather_timer(&self) -> Arc<IntervalTimer> {
        Arc::clone(&self.gather_timer)
    }

    fn gather_counter(&self) -> Arc<EventCounter> {
        Arc::clone(&self.gather_counter)
    }

    fn gather_flop_counter(&self) -> Arc<EventCounter> {
        Arc::clone(&self.gather_flop_counter)
    }

    fn element_count(&self) -> usize {
        self.element_count
    }

    fn face_groups(&self, kind: &FluxKind) -> &[FaceGroup] {
        match kind {
            FluxKind::Interior => &self.interior_groups,
            FluxKind::Boundary(tag) => self
                .boundary_groups
                .get(tag)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        }
    }
}

#[derive(Debug)]
pub struct FaceDiscretizationBuilder {
    settings: DiscretizationSettings,
    element_count: usize,
    interior_groups: Vec<FaceGroup>,
    boundary_groups: FxHashMap<BoundaryTag, Vec<FaceGroup>>,
}

impl FaceDiscretizationBuilder {
    pub fn with_settings(self, settings: DiscretizationSettings) -> Self {
        Self { settings, ..self }
    }

    pub fn with_interior_group(mut self, group: FaceGroup) -> Self {
        self.interior_groups.push(group);
        self
    }

    pub fn with_boundary_group(mut self, tag: impl Into<String>, group: FaceGroup) -> Self {
        self.boundary_groups
            .entry(BoundaryTag::new(tag))
            .or_default()
            .push(group);
        self
    }

    pub fn build(self) -> FaceDiscretization {
        FaceDiscretization {
            settings: self.settings,
            element_count: self.element_count,
            interior_groups: self.interior_groups,
            boundary_groups: self.boundary_groups,
            gather_timer: Default::default(),
            gather_counter: Default::default(),
            gather_flop_counter: Default::default(),
        }
    }
}
