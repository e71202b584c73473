//! Links from a tag to auxiliary data.

use dataweave_backend::{Attribute, Backend, EntityKind, attr};
use dataweave_core::{
    error::{Error, Result},
    identifier::Id,
    link_type::LinkType,
};
use log::debug;

use crate::{
    check,
    data_array::DataArray,
    entity::entity_type,
    graph,
    handle::{Handle, HasHandle, Wrap, record},
};

entity_type!(
    /// A typed link from a [`Tag`](crate::Tag) or [`MultiTag`](crate::MultiTag)
    /// to a data array of the same block.
    ///
    /// The [`LinkType`] decides how the linked data is subset when a tag
    /// retrieves it.
    Feature,
    EntityKind::Feature
);

impl Feature {
    /// The linked data array.
    pub fn data(&self) -> Result<DataArray> {
        let handle = self.handle()?;
        handle.read(|_, record| {
            record
                .reference(attr::FEATURE_DATA)
                .map(|id| DataArray::wrap(handle, id))
                .ok_or_else(|| Error::missing_attribute(format!("feature {} has no data", record.id())))
        })
    }

    /// Links another data array of the owning tag's block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Consistency`] if the array lives in another block or
    /// no longer exists.
    pub fn set_data(&self, data: &DataArray) -> Result<()> {
        let handle = self.handle()?;
        let other = data.handle()?;
        handle.write(|backend| {
            let data_id = check::target(handle, backend, other, EntityKind::DataArray)?;
            check::same_block(backend, handle.id(), data_id)?;
            backend.set_attribute(handle.id(), attr::FEATURE_DATA, Some(Attribute::Ref(data_id)))?;
            Ok(())
        })
    }

    pub fn link_type(&self) -> Result<LinkType> {
        self.handle()?.read(|_, record| {
            record
                .link_type(attr::LINK_TYPE)
                .ok_or_else(|| Error::missing_attribute(format!("feature {} has no link type", record.id())))
        })
    }

    pub fn set_link_type(&self, link_type: LinkType) -> Result<()> {
        let handle = self.handle()?;
        handle.write(|backend| {
            backend.set_attribute(handle.id(), attr::LINK_TYPE, Some(Attribute::Link(link_type)))?;
            Ok(())
        })
    }
}

/// Creates a feature under the tag or multi tag `owner`.
pub(crate) fn create(owner: &Handle, data: &DataArray, link_type: LinkType) -> Result<Feature> {
    let other = data.handle()?;
    owner.write(|backend| {
        let data_id = check::target(owner, backend, other, EntityKind::DataArray)?;
        check::same_block(backend, owner.id(), data_id)?;

        let record = graph::timestamped(EntityKind::Feature, owner.id())
            .with(attr::FEATURE_DATA, Attribute::Ref(data_id))
            .with(attr::LINK_TYPE, Attribute::Link(link_type));
        let id = record.id();
        backend.create(record)?;
        debug!(id:%, owner:% = owner.id(), data:% = data_id, link_type:%; "Created feature");
        Ok(Feature::wrap(owner, id))
    })
}

/// Looks up a feature of `owner` by its id or the id or name of its data.
pub(crate) fn find(owner: &Handle, id_or_data: &str) -> Result<Option<Feature>> {
    owner.read(|backend, _| {
        let found = backend.list(owner.id(), EntityKind::Feature).into_iter().find(|id| {
            if id.to_string() == id_or_data {
                return true;
            }
            backend
                .get(*id)
                .and_then(|feature| feature.reference(attr::FEATURE_DATA))
                .and_then(|data| backend.get(data))
                .is_some_and(|data| data.id().to_string() == id_or_data || data.name() == Some(id_or_data))
        });
        Ok(found.map(|id| Feature::wrap(owner, id)))
    })
}

/// Resolves the `index`-th feature of `owner` into its link type and data.
pub(crate) fn resolve(backend: &dyn Backend, owner: &Handle, index: usize) -> Result<(LinkType, Id)> {
    let features = backend.list(owner.id(), EntityKind::Feature);
    let feature = features.get(index).ok_or_else(|| {
        Error::out_of_bounds(format!(
            "feature index {index} exceeds the {} features of {} {}",
            features.len(),
            owner.kind(),
            owner.id()
        ))
    })?;
    let feature = record(backend, *feature)?;
    let link_type = feature.link_type(attr::LINK_TYPE).unwrap_or_default();
    let data = feature
        .reference(attr::FEATURE_DATA)
        .ok_or_else(|| Error::missing_attribute(format!("feature {} has no data", feature.id())))?;
    Ok((link_type, data))
}
