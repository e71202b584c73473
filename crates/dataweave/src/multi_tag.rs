//! Batches of regions of interest stored as data arrays.

use dataweave_backend::{Attribute, Backend, EntityKind, Record, attr};
use dataweave_core::{
    error::{Error, Result},
    identifier::Id,
    link_type::LinkType,
    ndbuffer::NdBuffer,
};
use log::debug;

use crate::{
    check,
    data_array::DataArray,
    data_view::{self, DataView, Region},
    entity::{EntityWithMetadata, EntityWithSources, NamedEntity, entity_type, remove_ref},
    feature::{self, Feature},
    filter::Filter,
    graph,
    handle::{HasHandle, Wrap, record},
    tag,
};

entity_type!(
    /// Many regions of interest sharing references, features and sources.
    ///
    /// Row `i` of the positions array (and of the optional extents array)
    /// describes region `i`. The arrays are two-dimensional and numeric,
    /// their column count equals the largest rank among the referenced
    /// arrays; arrays of smaller rank use the leading columns.
    MultiTag,
    EntityKind::MultiTag
);

impl NamedEntity for MultiTag {}
impl EntityWithMetadata for MultiTag {}
impl EntityWithSources for MultiTag {}

impl MultiTag {
    pub fn positions(&self) -> Result<DataArray> {
        let handle = self.handle()?;
        handle.read(|_, record| {
            record
                .reference(attr::POSITIONS)
                .map(|id| DataArray::wrap(handle, id))
                .ok_or_else(|| Error::missing_attribute(format!("multi tag {} has no positions", record.id())))
        })
    }

    /// Replaces the positions array.
    ///
    /// # Errors
    ///
    /// - [`Error::Consistency`] if the array lives in another block
    /// - [`Error::InvalidRank`] unless it is two-dimensional
    /// - [`Error::InvalidValue`] unless it holds numbers
    /// - [`Error::IncompatibleDimensions`] if its shape differs from the
    ///   extents or its column count from the largest referenced rank
    pub fn set_positions(&self, positions: &DataArray) -> Result<()> {
        let handle = self.handle()?;
        let other = positions.handle()?;
        handle.write(|backend| {
            let positions_id = check::target(handle, backend, other, EntityKind::DataArray)?;
            check::same_block(backend, handle.id(), positions_id)?;
            if record(backend, handle.id())?.reference(attr::EXTENTS) == Some(positions_id) {
                return Err(Error::consistency("positions and extents must be different arrays"));
            }
            let data = stored(backend, positions_id)?;
            check_layout(backend, handle.id(), positions_id, data)?;
            backend.set_attribute(handle.id(), attr::POSITIONS, Some(Attribute::Ref(positions_id)))?;
            debug!(id:% = handle.id(), positions:% = positions_id; "Replaced positions");
            Ok(())
        })
    }

    pub fn extents(&self) -> Result<Option<DataArray>> {
        let handle = self.handle()?;
        handle.read(|_, record| {
            Ok(record
                .reference(attr::EXTENTS)
                .map(|id| DataArray::wrap(handle, id)))
        })
    }

    /// Sets or removes (`None`) the extents array.
    ///
    /// # Errors
    ///
    /// The errors of [`MultiTag::set_positions`]; the shape must equal the
    /// shape of the positions.
    pub fn set_extents(&self, extents: Option<&DataArray>) -> Result<()> {
        let handle = self.handle()?;
        let Some(extents) = extents else {
            return handle.write(|backend| {
                backend.set_attribute(handle.id(), attr::EXTENTS, None)?;
                Ok(())
            });
        };
        let other = extents.handle()?;
        handle.write(|backend| {
            let extents_id = check::target(handle, backend, other, EntityKind::DataArray)?;
            check::same_block(backend, handle.id(), extents_id)?;
            let positions = record(backend, handle.id())?.reference(attr::POSITIONS);
            if positions == Some(extents_id) {
                return Err(Error::consistency("positions and extents must be different arrays"));
            }
            let data = stored(backend, extents_id)?;
            check_regions(backend, record(backend, handle.id())?, None, Some(data))?;
            backend.set_attribute(handle.id(), attr::EXTENTS, Some(Attribute::Ref(extents_id)))?;
            Ok(())
        })
    }

    /// Units of the position columns; empty when unitless.
    pub fn units(&self) -> Result<Vec<String>> {
        self.handle()?
            .read(|_, record| Ok(record.texts(attr::UNITS).to_vec()))
    }

    /// Sets one unit (or `"none"`) per position column; `None` clears them.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUnit`] for anything but SI units and `"none"`
    /// - [`Error::IncompatibleDimensions`] if the count differs from the columns
    pub fn set_units(&self, units: Option<Vec<String>>) -> Result<()> {
        let handle = self.handle()?;
        let units = tag::sanitize_units(handle, units)?;
        handle.write(|backend| {
            let columns = columns(backend, record(backend, handle.id())?)?;
            if !units.is_empty() && units.len() != columns {
                return Err(Error::incompatible_dimensions(format!(
                    "{} units do not match {columns} position columns",
                    units.len()
                )));
            }
            tag::set_units(backend, handle.id(), units)
        })
    }

    /// Number of regions, the row count of the positions.
    pub fn positions_count(&self) -> Result<usize> {
        let handle = self.handle()?;
        handle.read(|backend, record| Ok(positions(backend, record)?.shape()[0]))
    }

    // References

    pub fn references(&self, filter: &Filter) -> Result<Vec<DataArray>> {
        tag::references(self.handle()?, filter)
    }

    pub fn reference_count(&self) -> Result<usize> {
        self.handle()?
            .read(|_, record| Ok(record.refs(attr::REFERENCES).len()))
    }

    pub fn has_reference(&self, array: &DataArray) -> Result<bool> {
        tag::has_reference(self.handle()?, array)
    }

    /// Tags `array`; adding a present array is a no-op.
    ///
    /// # Errors
    ///
    /// - [`Error::Consistency`] if the array lives in another block
    /// - [`Error::IncompatibleDimensions`] if the largest referenced rank
    ///   would no longer equal the position column count
    pub fn add_reference(&self, array: &DataArray) -> Result<()> {
        let handle = self.handle()?;
        let other = array.handle()?;
        handle.write(|backend| {
            let array_id = check::target(handle, backend, other, EntityKind::DataArray)?;
            check::same_block(backend, handle.id(), array_id)?;

            let current = record(backend, handle.id())?;
            let mut refs = current.refs(attr::REFERENCES).to_vec();
            refs.push(array_id);
            check_columns(backend, columns(backend, current)?, &refs)?;
            tag::add_reference(backend, handle.id(), array_id)
        })
    }

    /// Drops the reference to `array`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompatibleDimensions`] if the remaining references
    /// would no longer match the position column count.
    pub fn remove_reference(&self, array: &DataArray) -> Result<()> {
        let handle = self.handle()?;
        let array_id = array.handle()?.id();
        handle.write(|backend| {
            let current = record(backend, handle.id())?;
            let refs: Vec<Id> = current
                .refs(attr::REFERENCES)
                .iter()
                .copied()
                .filter(|id| *id != array_id)
                .collect();
            check_columns(backend, columns(backend, current)?, &refs)?;
            remove_ref(backend, handle.id(), attr::REFERENCES, array_id)
        })
    }

    // Features

    pub fn create_feature(&self, data: &DataArray, link_type: LinkType) -> Result<Feature> {
        feature::create(self.handle()?, data, link_type)
    }

    pub fn feature(&self, id_or_data: &str) -> Result<Option<Feature>> {
        feature::find(self.handle()?, id_or_data)
    }

    pub fn has_feature(&self, id_or_data: &str) -> Result<bool> {
        Ok(self.feature(id_or_data)?.is_some())
    }

    pub fn features(&self, filter: &Filter) -> Result<Vec<Feature>> {
        graph::list(self.handle()?, filter)
    }

    pub fn feature_count(&self) -> Result<usize> {
        graph::count::<Feature>(self.handle()?)
    }

    pub fn delete_feature(&self, feature: &Feature) -> Result<()> {
        graph::delete(self.handle()?, feature)
    }

    // Retrieval

    /// Window of the `reference`-th referenced array covered by region `position`.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfBounds`] if the region or reference does not exist
    ///   or the region leaves the array
    /// - [`Error::IncompatibleDimensions`] if the units do not fit the dimensions
    pub fn retrieve_data(&self, position: usize, reference: usize) -> Result<DataView> {
        let handle = self.handle()?;
        handle.read(|backend, record| {
            let array = tag::nth_reference(record, reference)?;
            let (start, extent) = row(backend, record, position)?;
            let region = Region {
                position: &start,
                extent: &extent,
                units: record.texts(attr::UNITS),
            };
            let (offset, count) = data_view::locate(backend, array, &region)?;
            Ok(DataView::new(DataArray::wrap(handle, array), offset, count))
        })
    }

    /// Data of the `index`-th feature for region `position`.
    ///
    /// Indexed features select row `position` of the feature data.
    pub fn retrieve_feature_data(&self, position: usize, index: usize) -> Result<DataView> {
        let handle = self.handle()?;
        handle.read(|backend, record| {
            let (link_type, data) = feature::resolve(backend, handle, index)?;
            let (start, extent) = row(backend, record, position)?;
            let region = Region {
                position: &start,
                extent: &extent,
                units: record.texts(attr::UNITS),
            };
            let (offset, count) = data_view::feature_window(backend, link_type, data, &region, position)?;
            Ok(DataView::new(DataArray::wrap(handle, data), offset, count))
        })
    }
}

fn positions_id(record: &Record) -> Result<Id> {
    record
        .reference(attr::POSITIONS)
        .ok_or_else(|| Error::missing_attribute(format!("multi tag {} has no positions", record.id())))
}

fn stored(backend: &dyn Backend, array: Id) -> Result<&NdBuffer> {
    record(backend, array)?
        .data(attr::DATA)
        .ok_or_else(|| Error::missing_attribute(format!("data array {array} has no data")))
}

/// The positions buffer of `tag`, checked to be a numeric matrix.
fn positions<'a>(backend: &'a dyn Backend, tag: &Record) -> Result<&'a NdBuffer> {
    let data = stored(backend, positions_id(tag)?)?;
    check_shape(data, "positions")?;
    Ok(data)
}

fn columns(backend: &dyn Backend, tag: &Record) -> Result<usize> {
    Ok(positions(backend, tag)?.shape()[1])
}

/// Position and extent of region `index`; extents default to zero.
fn row(backend: &dyn Backend, tag: &Record, index: usize) -> Result<(Vec<f64>, Vec<f64>)> {
    let positions = positions(backend, tag)?;
    let rows = positions.shape()[0];
    if index >= rows {
        return Err(Error::out_of_bounds(format!(
            "position index {index} exceeds the {rows} positions of multi tag {}",
            tag.id()
        )));
    }
    let start = positions.row_f64(index)?;
    let extent = match tag.reference(attr::EXTENTS) {
        Some(extents) => stored(backend, extents)?.row_f64(index)?,
        None => vec![0.0; start.len()],
    };
    Ok((start, extent))
}

/// Checks that `array` can hold positions or extents.
pub(crate) fn check_region_array(backend: &dyn Backend, array: Id, what: &str) -> Result<()> {
    check_shape(stored(backend, array)?, what)
}

fn check_shape(data: &NdBuffer, what: &str) -> Result<()> {
    if data.rank() != 2 {
        return Err(Error::invalid_rank(format!(
            "multi tag {what} must be two-dimensional, got rank {}",
            data.rank()
        )));
    }
    if !data.data_type().is_numeric() {
        return Err(Error::invalid_value(format!(
            "multi tag {what} must be numeric, got {}",
            data.data_type()
        )));
    }
    Ok(())
}

/// Validates the layout of multi tag `tag` as if `array`, its positions or
/// its extents, held `data`.
pub(crate) fn check_layout(backend: &dyn Backend, tag: Id, array: Id, data: &NdBuffer) -> Result<()> {
    let tag = record(backend, tag)?;
    if tag.reference(attr::EXTENTS) == Some(array) {
        check_regions(backend, tag, None, Some(data))
    } else {
        check_regions(backend, tag, Some(data), None)
    }
}

/// Validates positions and extents of `tag`, substituting the given buffers
/// for the stored ones.
fn check_regions(
    backend: &dyn Backend,
    tag: &Record,
    positions: Option<&NdBuffer>,
    extents: Option<&NdBuffer>,
) -> Result<()> {
    let positions = match positions {
        Some(data) => data,
        None => stored(backend, positions_id(tag)?)?,
    };
    let extents = match (extents, tag.reference(attr::EXTENTS)) {
        (Some(data), _) => Some(data),
        (None, Some(id)) => Some(stored(backend, id)?),
        (None, None) => None,
    };

    check_shape(positions, "positions")?;
    let columns = positions.shape()[1];
    if let Some(extents) = extents {
        check_shape(extents, "extents")?;
        if extents.shape() != positions.shape() {
            return Err(Error::incompatible_dimensions(format!(
                "extents of shape {:?} do not match positions of shape {:?}",
                extents.shape(),
                positions.shape()
            )));
        }
    }

    let units = tag.texts(attr::UNITS).len();
    if units != 0 && units != columns {
        return Err(Error::incompatible_dimensions(format!(
            "{units} units do not match {columns} position columns"
        )));
    }
    check_columns(backend, columns, tag.refs(attr::REFERENCES))
}

/// The largest rank among `refs` must equal `columns`.
fn check_columns(backend: &dyn Backend, columns: usize, refs: &[Id]) -> Result<()> {
    let mut largest = None;
    for array in refs {
        let rank = check::rank(backend, *array)?;
        largest = largest.max(Some(rank));
    }
    match largest {
        Some(rank) if rank != columns => Err(Error::incompatible_dimensions(format!(
            "positions have {columns} columns but the largest referenced rank is {rank}"
        ))),
        _ => Ok(()),
    }
}
