//! Rectangular windows into a data array selected by tags.

use dataweave_backend::{Backend, attr};
use dataweave_core::{
    error::{Error, Result},
    identifier::Id,
    link_type::LinkType,
    ndbuffer::NdBuffer,
};
use log::trace;

use crate::{check, data_array::DataArray, handle::record};

/// A hyperslab of a [`DataArray`] given by an offset and a count per axis.
///
/// The view keeps a handle to the array; [`DataView::read`] reads the
/// window at call time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataView {
    array: DataArray,
    offset: Vec<usize>,
    count: Vec<usize>,
}

impl DataView {
    pub(crate) fn new(array: DataArray, offset: Vec<usize>, count: Vec<usize>) -> Self {
        Self {
            array,
            offset,
            count,
        }
    }

    pub fn array(&self) -> &DataArray {
        &self.array
    }

    pub fn offset(&self) -> &[usize] {
        &self.offset
    }

    pub fn count(&self) -> &[usize] {
        &self.count
    }

    /// Number of elements in the window.
    pub fn len(&self) -> usize {
        self.count.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the window from the array.
    pub fn read(&self) -> Result<NdBuffer> {
        self.array.read_slice(&self.offset, &self.count)
    }
}

/// Where a tagged region lies in physical coordinates.
pub(crate) struct Region<'a> {
    pub(crate) position: &'a [f64],
    pub(crate) extent: &'a [f64],
    pub(crate) units: &'a [String],
}

/// Offset and count of `region` within `array`.
///
/// Each axis converts its position through the array's dimension; an axis
/// with a positive extent spans up to the index of `position + extent`,
/// otherwise a single element. The leading `rank` components are used.
///
/// # Errors
///
/// - [`Error::IncompatibleDimensions`] if the region has fewer components
///   than the array has axes, or its units do not fit the dimensions
/// - [`Error::OutOfBounds`] if the window leaves the array's shape
pub(crate) fn locate(backend: &dyn Backend, array: Id, region: &Region<'_>) -> Result<(Vec<usize>, Vec<usize>)> {
    let array_record = record(backend, array)?;
    let dims = array_record.dimensions(attr::DIMENSIONS);
    let shape = array_record
        .data(attr::DATA)
        .map(|data| data.shape().to_vec())
        .unwrap_or_default();

    if region.position.len() < dims.len() {
        return Err(Error::incompatible_dimensions(format!(
            "a region with {} components cannot address data array {array} of rank {}",
            region.position.len(),
            dims.len()
        )));
    }

    let mut offset = Vec::with_capacity(dims.len());
    let mut count = Vec::with_capacity(dims.len());
    for (axis, dim) in dims.iter().enumerate() {
        let unit = region.units.get(axis).map_or("none", String::as_str);
        let position = region.position[axis];
        let start = dim.position_to_index(position, unit)?;
        let extent = region.extent.get(axis).copied().unwrap_or(0.0);
        let span = if extent > 0.0 {
            let end = dim.position_to_index(position + extent, unit)?;
            end.saturating_sub(start).max(1)
        } else {
            1
        };

        let size = shape.get(axis).copied().unwrap_or(0);
        let end = start.checked_add(span).filter(|end| *end <= size);
        if end.is_none() {
            return Err(Error::out_of_bounds(format!(
                "region at index {start} spanning {span} exceeds extent {size} of axis {} of data array {array}",
                axis + 1
            )));
        }
        offset.push(start);
        count.push(span);
    }

    trace!(array:%, offset:?, count:?; "Located region");
    Ok((offset, count))
}

/// Window of a feature's data array for one tagged region.
///
/// `row` is the index an [`LinkType::Indexed`] feature selects along the
/// first axis.
pub(crate) fn feature_window(
    backend: &dyn Backend,
    link_type: LinkType,
    data: Id,
    region: &Region<'_>,
    row: usize,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let shape = record(backend, data)?
        .data(attr::DATA)
        .map(|data| data.shape().to_vec())
        .unwrap_or_default();

    match link_type {
        LinkType::Tagged => {
            let rank = check::rank(backend, data)?;
            if rank != region.position.len() {
                return Err(Error::incompatible_dimensions(format!(
                    "tagged feature data of rank {rank} does not match a position of length {}",
                    region.position.len()
                )));
            }
            locate(backend, data, region)
        }
        LinkType::Untagged => Ok((vec![0; shape.len()], shape)),
        LinkType::Indexed => {
            let rows = shape.first().copied().unwrap_or(0);
            if row >= rows {
                return Err(Error::out_of_bounds(format!(
                    "index {row} exceeds the {rows} rows of feature data {data}"
                )));
            }
            let mut offset = vec![0; shape.len()];
            let mut count = shape;
            offset[0] = row;
            count[0] = 1;
            Ok((offset, count))
        }
    }
}

#[cfg(test)]
mod proptest_tests {
    use dataweave_core::{dimension::SampledDimension, error::ErrorKind};
    use proptest::prelude::*;

    use crate::{File, config::Config};

    // ===================
    // Strategies
    // ===================

    fn position_strategy() -> impl Strategy<Value = f64> {
        prop_oneof![
            4 => -20.0f64..200.0,
            1 => 1e15f64..1e300,
        ]
    }

    fn extent_strategy() -> impl Strategy<Value = Option<f64>> {
        prop::option::of(0.0f64..100.0)
    }

    // ===================
    // Property Test Functions
    // ===================

    /// A tagged region either fits the array or is reported as out of bounds.
    fn check_region_fits_or_fails(
        interval: f64,
        len: usize,
        position: f64,
        extent: Option<f64>,
    ) -> Result<(), TestCaseError> {
        let file = File::create(Config::default()).expect("file");
        let block = file.create_block("session", "recording").expect("block");
        let dim = SampledDimension::new(interval).expect("positive interval");
        let array = block
            .create_data_array(
                "signal",
                "trace",
                crate::NdBuffer::vector(vec![0.0; len]),
                vec![dim.into()],
            )
            .expect("array");
        let tag = block.create_tag("region", "event", vec![position]).expect("tag");
        tag.set_extent(extent.map(|e| vec![e])).expect("extent");
        tag.add_reference(&array).expect("reference");

        match tag.retrieve_data(0) {
            Ok(view) => {
                prop_assert!(view.count()[0] >= 1);
                prop_assert!(view.offset()[0] + view.count()[0] <= len);
                prop_assert_eq!(view.read().expect("window is readable").len(), view.len());
            }
            Err(err) => {
                prop_assert_eq!(err.kind(), ErrorKind::OutOfBounds);
            }
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn region_fits_or_fails(
            interval in 0.1f64..10.0,
            len in 1usize..50,
            position in position_strategy(),
            extent in extent_strategy(),
        ) {
            check_region_fits_or_fails(interval, len, position, extent)?;
        }
    }
}
