//! Named subsets of a block's data.

use dataweave_backend::{EntityKind, attr};
use dataweave_core::error::Result;
use log::debug;

use crate::{
    check,
    data_array::DataArray,
    entity::{EntityWithMetadata, EntityWithSources, NamedEntity, entity_type, push_ref, remove_ref},
    filter::Filter,
    handle::{HasHandle, Wrap},
    multi_tag::MultiTag,
    tag::Tag,
};

entity_type!(
    /// An ordered set of references to data arrays, tags and multi tags of
    /// the same block.
    ///
    /// Groups never own their members: deleting a group leaves the members
    /// alone and deleting a member silently removes it from every group.
    Group,
    EntityKind::Group
);

impl NamedEntity for Group {}
impl EntityWithMetadata for Group {}
impl EntityWithSources for Group {}

impl Group {
    pub fn data_arrays(&self, filter: &Filter) -> Result<Vec<DataArray>> {
        self.members(attr::DATA_ARRAYS, filter)
    }

    pub fn data_array_count(&self) -> Result<usize> {
        self.member_count(attr::DATA_ARRAYS)
    }

    pub fn has_data_array(&self, array: &DataArray) -> Result<bool> {
        self.has_member(attr::DATA_ARRAYS, array)
    }

    /// Adds `array`; adding a present member is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Consistency`](dataweave_core::Error::Consistency) if the
    /// array lives in another block or no longer exists.
    pub fn add_data_array(&self, array: &DataArray) -> Result<()> {
        self.add_member(attr::DATA_ARRAYS, array)
    }

    pub fn remove_data_array(&self, array: &DataArray) -> Result<()> {
        self.remove_member(attr::DATA_ARRAYS, array)
    }

    pub fn tags(&self, filter: &Filter) -> Result<Vec<Tag>> {
        self.members(attr::TAGS, filter)
    }

    pub fn tag_count(&self) -> Result<usize> {
        self.member_count(attr::TAGS)
    }

    pub fn has_tag(&self, tag: &Tag) -> Result<bool> {
        self.has_member(attr::TAGS, tag)
    }

    pub fn add_tag(&self, tag: &Tag) -> Result<()> {
        self.add_member(attr::TAGS, tag)
    }

    pub fn remove_tag(&self, tag: &Tag) -> Result<()> {
        self.remove_member(attr::TAGS, tag)
    }

    pub fn multi_tags(&self, filter: &Filter) -> Result<Vec<MultiTag>> {
        self.members(attr::MULTI_TAGS, filter)
    }

    pub fn multi_tag_count(&self) -> Result<usize> {
        self.member_count(attr::MULTI_TAGS)
    }

    pub fn has_multi_tag(&self, multi_tag: &MultiTag) -> Result<bool> {
        self.has_member(attr::MULTI_TAGS, multi_tag)
    }

    pub fn add_multi_tag(&self, multi_tag: &MultiTag) -> Result<()> {
        self.add_member(attr::MULTI_TAGS, multi_tag)
    }

    pub fn remove_multi_tag(&self, multi_tag: &MultiTag) -> Result<()> {
        self.remove_member(attr::MULTI_TAGS, multi_tag)
    }

    fn members<T: Wrap>(&self, key: &str, filter: &Filter) -> Result<Vec<T>> {
        let handle = self.handle()?;
        handle.read(|backend, record| {
            Ok(record
                .refs(key)
                .iter()
                .filter_map(|id| backend.get(*id))
                .filter(|member| filter.matches(member))
                .map(|member| T::wrap(handle, member.id()))
                .collect())
        })
    }

    fn member_count(&self, key: &str) -> Result<usize> {
        self.handle()?.read(|_, record| Ok(record.refs(key).len()))
    }

    fn has_member<T: Wrap>(&self, key: &str, member: &T) -> Result<bool> {
        let id = member.handle()?.id();
        self.handle()?.read(|_, record| Ok(record.references(key, id)))
    }

    fn add_member<T: Wrap>(&self, key: &str, member: &T) -> Result<()> {
        let handle = self.handle()?;
        let other = member.handle()?;
        handle.write(|backend| {
            let member_id = check::target(handle, backend, other, T::KIND)?;
            check::same_block(backend, handle.id(), member_id)?;
            push_ref(backend, handle.id(), key, member_id)?;
            debug!(id:% = handle.id(), member:% = member_id; "Added group member");
            Ok(())
        })
    }

    fn remove_member<T: Wrap>(&self, key: &str, member: &T) -> Result<()> {
        let handle = self.handle()?;
        let member_id = member.handle()?.id();
        handle.write(|backend| remove_ref(backend, handle.id(), key, member_id))
    }
}
