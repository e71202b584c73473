//! N-dimensional element storage of data arrays.
//!
//! An [`NdBuffer`] is a shape plus a flat, row-major vector of typed values.
//! Hyperslabs are addressed by an `offset` and a `count` per axis.

use log::trace;

use crate::{
    error::{Error, Result},
    value::DataType,
};

/// Flat typed storage of an [`NdBuffer`].
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValues {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    UInt(Vec<u64>),
    Float(Vec<f64>),
    Text(Vec<String>),
}

impl ArrayValues {
    pub fn len(&self) -> usize {
        match self {
            ArrayValues::Bool(v) => v.len(),
            ArrayValues::Int(v) => v.len(),
            ArrayValues::UInt(v) => v.len(),
            ArrayValues::Float(v) => v.len(),
            ArrayValues::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ArrayValues::Bool(_) => DataType::Bool,
            ArrayValues::Int(_) => DataType::Int64,
            ArrayValues::UInt(_) => DataType::UInt64,
            ArrayValues::Float(_) => DataType::Double,
            ArrayValues::Text(_) => DataType::String,
        }
    }

    /// Collects the elements at the given flat indices.
    fn gather(&self, indices: &[usize]) -> ArrayValues {
        fn pick<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
            indices.iter().map(|i| values[*i].clone()).collect()
        }

        match self {
            ArrayValues::Bool(v) => ArrayValues::Bool(pick(v, indices)),
            ArrayValues::Int(v) => ArrayValues::Int(pick(v, indices)),
            ArrayValues::UInt(v) => ArrayValues::UInt(pick(v, indices)),
            ArrayValues::Float(v) => ArrayValues::Float(pick(v, indices)),
            ArrayValues::Text(v) => ArrayValues::Text(pick(v, indices)),
        }
    }
}

/// Shape plus row-major element storage.
///
/// # Examples
///
/// ```
/// use dataweave_core::ndbuffer::NdBuffer;
///
/// let buffer = NdBuffer::float(vec![2, 3], vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
/// let slice = buffer.slice(&[1, 1], &[1, 2]).unwrap();
/// assert_eq!(slice.shape(), &[1, 2]);
/// assert_eq!(slice.to_f64_vec().unwrap(), vec![4.0, 5.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NdBuffer {
    shape: Vec<usize>,
    values: ArrayValues,
}

impl NdBuffer {
    /// Creates a buffer of the given shape.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRank`] for an empty shape
    /// - [`Error::IncompatibleDimensions`] if the element count does not match the shape
    pub fn new(shape: Vec<usize>, values: ArrayValues) -> Result<Self> {
        if shape.is_empty() {
            return Err(Error::invalid_rank("buffer must have at least one axis"));
        }
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(Error::incompatible_dimensions(format!(
                "shape {shape:?} needs {expected} elements, got {}",
                values.len()
            )));
        }
        Ok(Self { shape, values })
    }

    pub fn float(shape: Vec<usize>, values: Vec<f64>) -> Result<Self> {
        Self::new(shape, ArrayValues::Float(values))
    }

    pub fn int(shape: Vec<usize>, values: Vec<i64>) -> Result<Self> {
        Self::new(shape, ArrayValues::Int(values))
    }

    pub fn text(shape: Vec<usize>, values: Vec<String>) -> Result<Self> {
        Self::new(shape, ArrayValues::Text(values))
    }

    /// Rank-1 buffer of floats.
    pub fn vector(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len()],
            values: ArrayValues::Float(values),
        }
    }

    /// Rank-2 buffer of floats from rows of equal length.
    pub fn matrix(rows: Vec<Vec<f64>>) -> Result<Self> {
        let columns = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|row| row.len() != columns) {
            return Err(Error::incompatible_dimensions(format!(
                "row {bad} has {} columns, expected {columns}",
                rows[bad].len()
            )));
        }
        Ok(Self {
            shape: vec![rows.len(), columns],
            values: ArrayValues::Float(rows.into_iter().flatten().collect()),
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &ArrayValues {
        &self.values
    }

    pub fn data_type(&self) -> DataType {
        self.values.data_type()
    }

    /// Returns the elements as `f64`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] for boolean and text buffers.
    pub fn to_f64_vec(&self) -> Result<Vec<f64>> {
        match &self.values {
            ArrayValues::Float(v) => Ok(v.clone()),
            ArrayValues::Int(v) => Ok(v.iter().map(|x| *x as f64).collect()),
            ArrayValues::UInt(v) => Ok(v.iter().map(|x| *x as f64).collect()),
            ArrayValues::Bool(_) | ArrayValues::Text(_) => Err(Error::invalid_value(format!(
                "{} data cannot be read as numbers",
                self.data_type()
            ))),
        }
    }

    /// Extracts the hyperslab starting at `offset` spanning `count` elements per axis.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRank`] if `offset` or `count` do not have one entry per axis
    /// - [`Error::OutOfBounds`] if the hyperslab leaves the shape
    pub fn slice(&self, offset: &[usize], count: &[usize]) -> Result<Self> {
        if offset.len() != self.rank() || count.len() != self.rank() {
            return Err(Error::invalid_rank(format!(
                "slice of a rank {} buffer needs {} offsets and counts, got {} and {}",
                self.rank(),
                self.rank(),
                offset.len(),
                count.len()
            )));
        }
        for (axis, ((o, c), extent)) in offset.iter().zip(count).zip(&self.shape).enumerate() {
            if o.checked_add(*c).is_none_or(|end| end > *extent) {
                return Err(Error::out_of_bounds(format!(
                    "slice [{o}, {o} + {c}) exceeds extent {extent} of axis {axis}"
                )));
            }
        }

        let strides = strides(&self.shape);
        let total: usize = count.iter().product();
        let mut indices = Vec::with_capacity(total);
        if total > 0 {
            let mut cursor = vec![0usize; self.rank()];
            loop {
                let flat: usize = cursor
                    .iter()
                    .zip(offset)
                    .zip(&strides)
                    .map(|((c, o), s)| (c + o) * s)
                    .sum();
                indices.push(flat);
                if !advance(&mut cursor, count) {
                    break;
                }
            }
        }

        Ok(Self {
            shape: count.to_vec(),
            values: self.values.gather(&indices),
        })
    }

    /// Returns row `index` along the first axis as floats.
    pub fn row_f64(&self, index: usize) -> Result<Vec<f64>> {
        let mut offset = vec![0; self.rank()];
        let mut count = self.shape.clone();
        offset[0] = index;
        count[0] = 1;
        self.slice(&offset, &count)?.to_f64_vec()
    }

    /// Grows the buffer along `axis` by the contents of `other`.
    ///
    /// The buffer is left untouched on failure.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRank`] if the ranks differ
    /// - [`Error::OutOfBounds`] if `axis` does not exist
    /// - [`Error::IncompatibleDimensions`] if any other axis differs in extent
    /// - [`Error::InvalidValue`] if the element types differ
    pub fn append(&mut self, other: &NdBuffer, axis: usize) -> Result<()> {
        if other.rank() != self.rank() {
            return Err(Error::invalid_rank(format!(
                "cannot append rank {} data to a rank {} buffer",
                other.rank(),
                self.rank()
            )));
        }
        if axis >= self.rank() {
            return Err(Error::out_of_bounds(format!(
                "axis {axis} does not exist in a rank {} buffer",
                self.rank()
            )));
        }
        let mismatch = self
            .shape
            .iter()
            .zip(other.shape())
            .enumerate()
            .find(|(i, (a, b))| *i != axis && a != b);
        if let Some((i, (a, b))) = mismatch {
            return Err(Error::incompatible_dimensions(format!(
                "axis {i} has extent {a}, appended data has {b}"
            )));
        }

        let outer: usize = self.shape[..axis].iter().product();
        let inner_self: usize = self.shape[axis..].iter().product();
        let inner_other: usize = other.shape[axis..].iter().product();

        fn interleave<T: Clone>(a: &mut Vec<T>, b: &[T], outer: usize, na: usize, nb: usize) {
            let mut merged = Vec::with_capacity(a.len() + b.len());
            for block in 0..outer {
                merged.extend_from_slice(&a[block * na..(block + 1) * na]);
                merged.extend_from_slice(&b[block * nb..(block + 1) * nb]);
            }
            *a = merged;
        }

        let (ours, theirs) = (self.data_type(), other.data_type());
        match (&mut self.values, &other.values) {
            (ArrayValues::Bool(a), ArrayValues::Bool(b)) => interleave(a, b, outer, inner_self, inner_other),
            (ArrayValues::Int(a), ArrayValues::Int(b)) => interleave(a, b, outer, inner_self, inner_other),
            (ArrayValues::UInt(a), ArrayValues::UInt(b)) => interleave(a, b, outer, inner_self, inner_other),
            (ArrayValues::Float(a), ArrayValues::Float(b)) => interleave(a, b, outer, inner_self, inner_other),
            (ArrayValues::Text(a), ArrayValues::Text(b)) => interleave(a, b, outer, inner_self, inner_other),
            _ => {
                return Err(Error::invalid_value(format!(
                    "cannot append {theirs} data to a {ours} buffer"
                )));
            }
        }
        self.shape[axis] += other.shape[axis];
        trace!(axis, shape:? = self.shape; "Appended to buffer");
        Ok(())
    }
}

/// Row-major strides of `shape`.
fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Advances a multi-index odometer-style; returns `false` after the last position.
fn advance(cursor: &mut [usize], count: &[usize]) -> bool {
    for axis in (0..cursor.len()).rev() {
        cursor[axis] += 1;
        if cursor[axis] < count[axis] {
            return true;
        }
        cursor[axis] = 0;
    }
    false
}
