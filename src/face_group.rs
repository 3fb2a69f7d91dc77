//! Face-pair topology consumed by compiled flux-gather kernels.
//!
//! The layout of [`FaceSide`], [`FacePair`] and [`FaceGroup`] is the data contract generated
//! kernels are written against: every field accessed by generated code (`fp.loc.el_base_index`,
//! `fg.index_list(...)`, `fg.face_count` and so on) exists here under the same name.
use nalgebra::DVector;
use rustc_hash::FxHashMap;

/// One side of a face pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceSide {
    /// Index of the first volume node of the element this side belongs to.
    pub el_base_index: usize,
    /// The index list mapping face nodes to element-local volume nodes.
    pub face_index_list_number: usize,
    /// Number of the element within its element group, used to locate face storage.
    pub local_el_number: usize,
    /// Number of the face within the element.
    pub face_id: usize,
    /// Outward unit normal.
    pub normal: DVector<f64>,
    pub face_jacobian: f64,
    /// Polynomial order of the element.
    pub order: usize,
    /// Characteristic length of the element.
    pub h: f64,
}

impl FaceSide {
    pub fn new(el_base_index: usize, face_index_list_number: usize, local_el_number: usize, face_id: usize) -> Self {
        Self {
            el_base_index,
            face_index_list_number,
            local_el_number,
            face_id,
            normal: DVector::zeros(0),
            face_jacobian: 1.0,
            order: 1,
            h: 1.0,
        }
    }

    pub fn with_normal(self, normal: &[f64]) -> Self {
        Self {
            normal: DVector::from_column_slice(normal),
            ..self
        }
    }

    pub fn with_face_jacobian(self, face_jacobian: f64) -> Self {
        Self { face_jacobian, ..self }
    }

    pub fn with_order_and_h(self, order: usize, h: f64) -> Self {
        Self { order, h, ..self }
    }
}

/// Two coupled element faces.
///
/// For boundary faces the opposite side describes where the boundary condition values
/// are found, and the element it refers to does not exist.
#[derive(Debug, Clone, PartialEq)]
pub struct FacePair {
    pub loc: FaceSide,
    pub opp: FaceSide,
    /// Index list mapping local face node order to the opposite face's node order.
    pub opp_native_write_map: usize,
}

/// Compact storage for a number of index lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLists {
    data: Vec<usize>,
    offsets: Vec<usize>,
}

impl Default for IndexLists {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexLists {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            offsets: vec![0],
        }
    }

    /// Appends a list and returns its number.
    pub fn push(&mut self, list: &[usize]) -> usize {
        self.data.extend_from_slice(list);
        self.offsets.push(self.data.len());
        self.len() - 1
    }

    pub fn get(&self, number: usize) -> Option<&[usize]> {
        let begin = *self.offsets.get(number)?;
        let end = *self.offsets.get(number + 1)?;
        self.data.get(begin..end)
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A collection of face pairs with a uniform number of nodes per face.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceGroup {
    pub face_pairs: Vec<FacePair>,
    pub index_lists: IndexLists,
    face_length: usize,
    /// Number of faces per element.
    pub face_count: usize,
}

impl FaceGroup {
    /// Number of nodes on each face.
    pub fn face_length(&self) -> usize {
        self.face_length
    }

    pub fn index_list(&self, number: usize) -> Option<&[usize]> {
        self.index_lists.get(number)
    }

    /// Length of the face storage needed for `element_count` elements, i.e. one slot per
    /// face node of every face of every element.
    pub fn face_storage_len(&self, element_count: usize) -> usize {
        self.face_length * self.face_count * element_count
    }
}

/// Incrementally builds a [`FaceGroup`], sharing identical index lists between face pairs.
#[derive(Debug, Clone)]
pub struct FaceGroupBuilder {
    face_length: usize,
    face_count: usize,
    index_lists: IndexLists,
    list_numbers: FxHashMap<Vec<usize>, usize>,
    face_pairs: Vec<FacePair>,
}

impl FaceGroupBuilder {
    pub fn new(face_length: usize, face_count: usize) -> Self {
        Self {
            face_length,
            face_count,
            index_lists: IndexLists::new(),
            list_numbers: FxHashMap::default(),
            face_pairs: Vec::new(),
        }
    }

    /// Registers an index list, returning the number of an identical existing list if there is one.
    ///
    /// # Panics
    ///
    /// Panics if the list does not have exactly one entry per face node.
    pub fn index_list(&mut self, list: &[usize]) -> usize {
        assert_eq!(
            list.len(),
            self.face_length,
            "Index lists must have one entry per face node."
        );
        if let Some(&number) = self.list_numbers.get(list) {
            return number;
        }
        let number = self.index_lists.push(list);
        self.list_numbers.insert(list.to_vec(), number);
        number
    }

    /// # Panics
    ///
    /// Panics if the pair refers to an index list that has not been registered.
    pub fn push_pair(&mut self, pair: FacePair) -> &mut Self {
        for number in [
            pair.loc.face_index_list_number,
            pair.opp.face_index_list_number,
            pair.opp_native_write_map,
        ] {
            assert!(
                number < self.index_lists.len(),
                "Face pair refers to unregistered index list {}",
                number
            );
        }
        self.face_pairs.push(pair);
        self
    }

    pub fn build(self) -> FaceGroup {
        FaceGroup {
            face_pairs: self.face_pairs,
            index_lists: self.index_lists,
            face_length: self.face_length,
            face_count: self.face_count,
        }
    }
}
