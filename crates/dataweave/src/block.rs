//! Top-level grouping of data arrays, tags, groups and sources.

use dataweave_backend::{Attribute, EntityKind, attr};
use dataweave_core::{
    dimension::Dimension,
    error::{Error, Result},
    ndbuffer::NdBuffer,
};
use log::debug;

use crate::{
    check,
    data_array::DataArray,
    entity::{EntityWithMetadata, NamedEntity, entity_type},
    filter::Filter,
    graph,
    group::Group,
    handle::{HasHandle, Wrap},
    multi_tag::MultiTag,
    source::{self, Source},
    tag::Tag,
};

entity_type!(
    /// A block owns the data arrays, tags, multi tags, groups and root
    /// sources of one recording or analysis unit.
    Block,
    EntityKind::Block
);

impl NamedEntity for Block {}
impl EntityWithMetadata for Block {}

impl Block {
    // Data arrays

    /// Creates a data array holding `data` described by one dimension per axis.
    ///
    /// Dimensions are numbered 1, 2, ... in the given order.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRank`] if the number of dimensions differs from the rank
    /// - the naming errors of [`File::create_block`](crate::File::create_block)
    pub fn create_data_array(
        &self,
        name: &str,
        ty: &str,
        data: NdBuffer,
        dimensions: Vec<Dimension>,
    ) -> Result<DataArray> {
        let handle = self.handle()?;
        if dimensions.len() != data.rank() {
            return Err(Error::invalid_rank(format!(
                "data of rank {} needs {} dimensions, got {}",
                data.rank(),
                data.rank(),
                dimensions.len()
            )));
        }
        let dimensions = dimensions
            .into_iter()
            .enumerate()
            .map(|(i, dim)| dim.with_index(i + 1))
            .collect();

        handle.write(|backend| {
            let record = graph::named_record(backend, handle.id(), EntityKind::DataArray, name, ty)?
                .with(attr::DATA, Attribute::Data(data))
                .with(attr::DIMENSIONS, Attribute::Dimensions(dimensions));
            let id = record.id();
            backend.create(record)?;
            debug!(id:%, name; "Created data array");
            Ok(DataArray::wrap(handle, id))
        })
    }

    pub fn data_array(&self, name_or_id: &str) -> Result<Option<DataArray>> {
        graph::get(self.handle()?, name_or_id)
    }

    pub fn has_data_array(&self, name_or_id: &str) -> Result<bool> {
        graph::has::<DataArray>(self.handle()?, name_or_id)
    }

    pub fn data_arrays(&self, filter: &Filter) -> Result<Vec<DataArray>> {
        graph::list(self.handle()?, filter)
    }

    pub fn data_array_count(&self) -> Result<usize> {
        graph::count::<DataArray>(self.handle()?)
    }

    /// Deletes a data array.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Consistency`] while a tag, multi tag or feature still
    /// references the array.
    pub fn delete_data_array(&self, array: &DataArray) -> Result<()> {
        graph::delete(self.handle()?, array)
    }

    // Tags

    /// Creates a tag at `position`; the extent defaults to a point.
    ///
    /// # Errors
    ///
    /// - [`Error::IncompatibleDimensions`] for an empty position
    /// - [`Error::InvalidValue`] for non-finite components
    pub fn create_tag(&self, name: &str, ty: &str, position: Vec<f64>) -> Result<Tag> {
        let handle = self.handle()?;
        if position.is_empty() {
            return Err(Error::incompatible_dimensions(
                "tag position needs at least one component",
            ));
        }
        check::check_finite("tag position", &position)?;
        let extent = vec![0.0; position.len()];

        handle.write(|backend| {
            let record = graph::named_record(backend, handle.id(), EntityKind::Tag, name, ty)?
                .with(attr::POSITION, Attribute::Numbers(position))
                .with(attr::EXTENT, Attribute::Numbers(extent));
            let id = record.id();
            backend.create(record)?;
            debug!(id:%, name; "Created tag");
            Ok(Tag::wrap(handle, id))
        })
    }

    pub fn tag(&self, name_or_id: &str) -> Result<Option<Tag>> {
        graph::get(self.handle()?, name_or_id)
    }

    pub fn has_tag(&self, name_or_id: &str) -> Result<bool> {
        graph::has::<Tag>(self.handle()?, name_or_id)
    }

    pub fn tags(&self, filter: &Filter) -> Result<Vec<Tag>> {
        graph::list(self.handle()?, filter)
    }

    pub fn tag_count(&self) -> Result<usize> {
        graph::count::<Tag>(self.handle()?)
    }

    pub fn delete_tag(&self, tag: &Tag) -> Result<()> {
        graph::delete(self.handle()?, tag)
    }

    // Multi tags

    /// Creates a multi tag whose regions are the rows of `positions`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRank`] unless `positions` is two-dimensional
    /// - [`Error::InvalidValue`] unless `positions` holds numbers
    /// - [`Error::Consistency`] if `positions` belongs to another block
    pub fn create_multi_tag(&self, name: &str, ty: &str, positions: &DataArray) -> Result<MultiTag> {
        let handle = self.handle()?;
        let positions = positions.handle()?;
        handle.write(|backend| {
            let positions_id = check::target(handle, backend, positions, EntityKind::DataArray)?;
            check::same_block(backend, handle.id(), positions_id)?;
            crate::multi_tag::check_region_array(backend, positions_id, "positions")?;

            let record = graph::named_record(backend, handle.id(), EntityKind::MultiTag, name, ty)?
                .with(attr::POSITIONS, Attribute::Ref(positions_id));
            let id = record.id();
            backend.create(record)?;
            debug!(id:%, name, positions:% = positions_id; "Created multi tag");
            Ok(MultiTag::wrap(handle, id))
        })
    }

    pub fn multi_tag(&self, name_or_id: &str) -> Result<Option<MultiTag>> {
        graph::get(self.handle()?, name_or_id)
    }

    pub fn has_multi_tag(&self, name_or_id: &str) -> Result<bool> {
        graph::has::<MultiTag>(self.handle()?, name_or_id)
    }

    pub fn multi_tags(&self, filter: &Filter) -> Result<Vec<MultiTag>> {
        graph::list(self.handle()?, filter)
    }

    pub fn multi_tag_count(&self) -> Result<usize> {
        graph::count::<MultiTag>(self.handle()?)
    }

    pub fn delete_multi_tag(&self, multi_tag: &MultiTag) -> Result<()> {
        graph::delete(self.handle()?, multi_tag)
    }

    // Groups

    pub fn create_group(&self, name: &str, ty: &str) -> Result<Group> {
        let handle = self.handle()?;
        handle.write(|backend| {
            let record = graph::named_record(backend, handle.id(), EntityKind::Group, name, ty)?;
            let id = record.id();
            backend.create(record)?;
            debug!(id:%, name; "Created group");
            Ok(Group::wrap(handle, id))
        })
    }

    pub fn group(&self, name_or_id: &str) -> Result<Option<Group>> {
        graph::get(self.handle()?, name_or_id)
    }

    pub fn has_group(&self, name_or_id: &str) -> Result<bool> {
        graph::has::<Group>(self.handle()?, name_or_id)
    }

    pub fn groups(&self, filter: &Filter) -> Result<Vec<Group>> {
        graph::list(self.handle()?, filter)
    }

    pub fn group_count(&self) -> Result<usize> {
        graph::count::<Group>(self.handle()?)
    }

    /// Deletes a group; its members are not affected.
    pub fn delete_group(&self, group: &Group) -> Result<()> {
        graph::delete(self.handle()?, group)
    }

    // Sources

    /// Creates a root source.
    pub fn create_source(&self, name: &str, ty: &str) -> Result<Source> {
        source::create_child(self.handle()?, name, ty)
    }

    pub fn source(&self, name_or_id: &str) -> Result<Option<Source>> {
        graph::get(self.handle()?, name_or_id)
    }

    pub fn has_source(&self, name_or_id: &str) -> Result<bool> {
        graph::has::<Source>(self.handle()?, name_or_id)
    }

    /// Root sources of this block.
    pub fn sources(&self, filter: &Filter) -> Result<Vec<Source>> {
        graph::list(self.handle()?, filter)
    }

    pub fn source_count(&self) -> Result<usize> {
        graph::count::<Source>(self.handle()?)
    }

    /// Deletes a root source and the sources it owns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Consistency`] while a tag or multi tag references
    /// one of the deleted sources.
    pub fn delete_source(&self, source: &Source) -> Result<()> {
        graph::delete(self.handle()?, source)
    }

    /// Searches the source graph breadth-first; root sources have depth 0.
    pub fn find_sources(&self, filter: &Filter, max_depth: usize) -> Result<Vec<Source>> {
        let handle = self.handle()?;
        handle.read(|backend, _| {
            let roots = backend.list(handle.id(), EntityKind::Source);
            Ok(source::search(handle, backend, roots, filter, max_depth))
        })
    }
}
