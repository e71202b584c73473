//! Single regions of interest.

use dataweave_backend::{Attribute, Backend, EntityKind, Record, attr};
use dataweave_core::{
    error::{Error, Result},
    identifier::Id,
    link_type::LinkType,
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
    handle::{Handle, HasHandle, Wrap, record},
};

entity_type!(
    /// A single region of interest in one or more data arrays.
    ///
    /// The region starts at `position` and spans `extent`, one component
    /// per axis of every referenced array. An all-zero extent marks a point.
    ///
    /// # Examples
    ///
    /// ```
    /// use dataweave::{File, NdBuffer, SampledDimension, config::Config};
    ///
    /// let file = File::create(Config::default()).unwrap();
    /// let block = file.create_block("session", "recording").unwrap();
    /// let dim = SampledDimension::new(1.0).unwrap().with_unit("s").unwrap();
    /// let signal = NdBuffer::vector((0..10).map(f64::from).collect());
    /// let array = block.create_data_array("signal", "trace", signal, vec![dim.into()]).unwrap();
    ///
    /// let tag = block.create_tag("stimulus", "event", vec![2.0]).unwrap();
    /// tag.set_extent(Some(vec![3.0])).unwrap();
    /// tag.add_reference(&array).unwrap();
    ///
    /// let view = tag.retrieve_data(0).unwrap();
    /// assert_eq!(view.offset(), &[2]);
    /// assert_eq!(view.count(), &[3]);
    /// ```
    Tag,
    EntityKind::Tag
);

impl NamedEntity for Tag {}
impl EntityWithMetadata for Tag {}
impl EntityWithSources for Tag {}

impl Tag {
    pub fn position(&self) -> Result<Vec<f64>> {
        self.handle()?
            .read(|_, record| Ok(record.numbers(attr::POSITION).unwrap_or_default().to_vec()))
    }

    /// Moves the tag.
    ///
    /// A position of a different length resets the extent to a point.
    ///
    /// # Errors
    ///
    /// - [`Error::IncompatibleDimensions`] if the position is empty, its
    ///   length differs from the rank of a referenced array, or from the
    ///   number of units
    /// - [`Error::InvalidValue`] for non-finite components
    pub fn set_position(&self, position: Vec<f64>) -> Result<()> {
        let handle = self.handle()?;
        if position.is_empty() {
            return Err(Error::incompatible_dimensions(
                "tag position needs at least one component",
            ));
        }
        check::check_finite("tag position", &position)?;

        handle.write(|backend| {
            let tag = record(backend, handle.id())?;
            for array in tag.refs(attr::REFERENCES) {
                check_rank(backend, *array, position.len())?;
            }
            let units = tag.texts(attr::UNITS).len();
            if units != 0 && units != position.len() {
                return Err(Error::incompatible_dimensions(format!(
                    "position of length {} does not match {units} units",
                    position.len()
                )));
            }

            let resized = tag.numbers(attr::POSITION).map_or(0, <[f64]>::len) != position.len();
            if resized {
                let extent = vec![0.0; position.len()];
                backend.set_attribute(handle.id(), attr::EXTENT, Some(Attribute::Numbers(extent)))?;
            }
            backend.set_attribute(handle.id(), attr::POSITION, Some(Attribute::Numbers(position)))?;
            Ok(())
        })
    }

    pub fn extent(&self) -> Result<Vec<f64>> {
        self.handle()?
            .read(|_, record| Ok(record.numbers(attr::EXTENT).unwrap_or_default().to_vec()))
    }

    /// Sets the extent; `None` turns the tag into a point.
    ///
    /// # Errors
    ///
    /// - [`Error::IncompatibleDimensions`] if the length differs from the position
    /// - [`Error::InvalidValue`] for negative or non-finite components
    pub fn set_extent(&self, extent: Option<Vec<f64>>) -> Result<()> {
        let handle = self.handle()?;
        if let Some(extent) = &extent {
            check_extent(extent)?;
        }
        handle.write(|backend| {
            let len = record(backend, handle.id())?
                .numbers(attr::POSITION)
                .map_or(0, <[f64]>::len);
            let extent = extent.unwrap_or_else(|| vec![0.0; len]);
            if extent.len() != len {
                return Err(Error::incompatible_dimensions(format!(
                    "extent of length {} does not match position of length {len}",
                    extent.len()
                )));
            }
            backend.set_attribute(handle.id(), attr::EXTENT, Some(Attribute::Numbers(extent)))?;
            Ok(())
        })
    }

    /// Units of the position components; empty when unitless.
    pub fn units(&self) -> Result<Vec<String>> {
        self.handle()?
            .read(|_, record| Ok(record.texts(attr::UNITS).to_vec()))
    }

    /// Sets one unit (or `"none"`) per position component; `None` clears them.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUnit`] for anything but SI units and `"none"`
    /// - [`Error::IncompatibleDimensions`] if the count differs from the position
    pub fn set_units(&self, units: Option<Vec<String>>) -> Result<()> {
        let handle = self.handle()?;
        let units = sanitize_units(handle, units)?;
        handle.write(|backend| {
            let len = record(backend, handle.id())?
                .numbers(attr::POSITION)
                .map_or(0, <[f64]>::len);
            if !units.is_empty() && units.len() != len {
                return Err(Error::incompatible_dimensions(format!(
                    "{} units do not match position of length {len}",
                    units.len()
                )));
            }
            set_units(backend, handle.id(), units)
        })
    }

    // References

    pub fn references(&self, filter: &Filter) -> Result<Vec<DataArray>> {
        references(self.handle()?, filter)
    }

    pub fn reference_count(&self) -> Result<usize> {
        self.handle()?
            .read(|_, record| Ok(record.refs(attr::REFERENCES).len()))
    }

    pub fn has_reference(&self, array: &DataArray) -> Result<bool> {
        has_reference(self.handle()?, array)
    }

    /// Tags `array`; adding a present array is a no-op.
    ///
    /// # Errors
    ///
    /// - [`Error::Consistency`] if the array lives in another block
    /// - [`Error::IncompatibleDimensions`] if its rank differs from the
    ///   position length
    pub fn add_reference(&self, array: &DataArray) -> Result<()> {
        let handle = self.handle()?;
        let other = array.handle()?;
        handle.write(|backend| {
            let array_id = check::target(handle, backend, other, EntityKind::DataArray)?;
            check::same_block(backend, handle.id(), array_id)?;
            let len = record(backend, handle.id())?
                .numbers(attr::POSITION)
                .map_or(0, <[f64]>::len);
            check_rank(backend, array_id, len)?;
            add_reference(backend, handle.id(), array_id)
        })
    }

    /// Drops the reference to `array`; absent arrays are ignored.
    pub fn remove_reference(&self, array: &DataArray) -> Result<()> {
        let handle = self.handle()?;
        let array_id = array.handle()?.id();
        handle.write(|backend| remove_ref(backend, handle.id(), attr::REFERENCES, array_id))
    }

    // Features

    /// Links `data` to the tag.
    pub fn create_feature(&self, data: &DataArray, link_type: LinkType) -> Result<Feature> {
        feature::create(self.handle()?, data, link_type)
    }

    /// Looks up a feature by its id or the id or name of its data.
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

    /// Window of the `reference`-th referenced array covered by the tag.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfBounds`] if there is no such reference or the region
    ///   leaves the array
    /// - [`Error::IncompatibleDimensions`] if the units do not fit the dimensions
    pub fn retrieve_data(&self, reference: usize) -> Result<DataView> {
        let handle = self.handle()?;
        handle.read(|backend, record| {
            let array = nth_reference(record, reference)?;
            let region = region(record);
            let (offset, count) = data_view::locate(backend, array, &region)?;
            Ok(DataView::new(DataArray::wrap(handle, array), offset, count))
        })
    }

    /// Data of the `index`-th feature, subset according to its link type.
    ///
    /// Indexed features select the first row.
    pub fn retrieve_feature_data(&self, index: usize) -> Result<DataView> {
        let handle = self.handle()?;
        handle.read(|backend, record| {
            let (link_type, data) = feature::resolve(backend, handle, index)?;
            let region = region(record);
            let (offset, count) = data_view::feature_window(backend, link_type, data, &region, 0)?;
            Ok(DataView::new(DataArray::wrap(handle, data), offset, count))
        })
    }
}

fn region(record: &Record) -> Region<'_> {
    Region {
        position: record.numbers(attr::POSITION).unwrap_or_default(),
        extent: record.numbers(attr::EXTENT).unwrap_or_default(),
        units: record.texts(attr::UNITS),
    }
}

fn check_rank(backend: &dyn Backend, array: Id, len: usize) -> Result<()> {
    let rank = check::rank(backend, array)?;
    if rank != len {
        return Err(Error::incompatible_dimensions(format!(
            "data array {array} has rank {rank}, the tag position has {len} components"
        )));
    }
    Ok(())
}

fn check_extent(extent: &[f64]) -> Result<()> {
    check::check_finite("extent", extent)?;
    if let Some(bad) = extent.iter().find(|e| **e < 0.0) {
        return Err(Error::invalid_value(format!(
            "extent must not be negative, got {bad}"
        )));
    }
    Ok(())
}

// Shared with multi tags.

pub(crate) fn references(handle: &Handle, filter: &Filter) -> Result<Vec<DataArray>> {
    handle.read(|backend, record| {
        Ok(record
            .refs(attr::REFERENCES)
            .iter()
            .filter_map(|id| backend.get(*id))
            .filter(|array| filter.matches(array))
            .map(|array| DataArray::wrap(handle, array.id()))
            .collect())
    })
}

pub(crate) fn has_reference(handle: &Handle, array: &DataArray) -> Result<bool> {
    let id = array.handle()?.id();
    handle.read(|_, record| Ok(record.refs(attr::REFERENCES).contains(&id)))
}

pub(crate) fn add_reference(backend: &mut dyn Backend, tag: Id, array: Id) -> Result<()> {
    crate::entity::push_ref(backend, tag, attr::REFERENCES, array)?;
    debug!(id:% = tag, array:%; "Added reference");
    Ok(())
}

pub(crate) fn nth_reference(record: &Record, index: usize) -> Result<Id> {
    let refs = record.refs(attr::REFERENCES);
    refs.get(index).copied().ok_or_else(|| {
        Error::out_of_bounds(format!(
            "reference index {index} exceeds the {} references of {}",
            refs.len(),
            record.id()
        ))
    })
}

pub(crate) fn sanitize_units(handle: &Handle, units: Option<Vec<String>>) -> Result<Vec<String>> {
    units
        .unwrap_or_default()
        .iter()
        .map(|unit| check::optional_unit(handle.config(), unit))
        .collect()
}

pub(crate) fn set_units(backend: &mut dyn Backend, id: Id, units: Vec<String>) -> Result<()> {
    let value = (!units.is_empty()).then_some(Attribute::Texts(units));
    backend.set_attribute(id, attr::UNITS, value)?;
    Ok(())
}
