//! Typed metadata fields.

use dataweave_backend::{Attribute, EntityKind, attr};
use dataweave_core::{
    error::{Error, Result},
    value::{DataType, Value},
};
use log::debug;

use crate::{
    check,
    entity::{entity_type, required_text},
    graph,
    handle::{Handle, HasHandle, Wrap},
};

entity_type!(
    /// A named, ordered list of [`Value`]s inside a [`Section`](crate::Section).
    ///
    /// The name is fixed at creation. All values share one [`DataType`]; an
    /// empty property has type [`DataType::Nothing`].
    Property,
    EntityKind::Property
);

impl Property {
    pub fn name(&self) -> Result<String> {
        self.handle()?.read(|_, record| required_text(record, attr::NAME))
    }

    pub fn definition(&self) -> Result<Option<String>> {
        self.handle()?
            .read(|_, record| Ok(record.text(attr::DEFINITION).map(str::to_string)))
    }

    pub fn set_definition(&self, definition: Option<&str>) -> Result<()> {
        if let Some(definition) = definition {
            check::check_text("definition", definition)?;
        }
        let handle = self.handle()?;
        handle.write(|backend| {
            let value = definition.map(|d| Attribute::Text(d.to_string()));
            backend.set_attribute(handle.id(), attr::DEFINITION, value)?;
            Ok(())
        })
    }

    pub fn unit(&self) -> Result<Option<String>> {
        self.handle()?
            .read(|_, record| Ok(record.text(attr::UNIT).map(str::to_string)))
    }

    /// Sets or clears the unit of the values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUnit`] unless the unit is an SI unit.
    pub fn set_unit(&self, unit: Option<&str>) -> Result<()> {
        let handle = self.handle()?;
        let unit = unit.map(|u| check::unit(handle.config(), u)).transpose()?;
        handle.write(|backend| {
            backend.set_attribute(handle.id(), attr::UNIT, unit.map(Attribute::Text))?;
            Ok(())
        })
    }

    pub fn values(&self) -> Result<Vec<Value>> {
        self.handle()?
            .read(|_, record| Ok(record.values(attr::VALUES).to_vec()))
    }

    /// Replaces the values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if the values differ in data type.
    pub fn set_values(&self, values: Vec<Value>) -> Result<()> {
        check_values(&values)?;
        let handle = self.handle()?;
        handle.write(|backend| {
            backend.set_attribute(handle.id(), attr::VALUES, Some(Attribute::Values(values)))?;
            Ok(())
        })
    }

    pub fn value_count(&self) -> Result<usize> {
        self.handle()?
            .read(|_, record| Ok(record.values(attr::VALUES).len()))
    }

    pub fn data_type(&self) -> Result<DataType> {
        self.handle()?.read(|_, record| {
            Ok(record
                .values(attr::VALUES)
                .first()
                .map_or(DataType::Nothing, Value::data_type))
        })
    }

    /// Removes every value.
    pub fn delete_values(&self) -> Result<()> {
        self.set_values(Vec::new())
    }
}

/// Creates a property in the section `owner`.
pub(crate) fn create(owner: &Handle, name: &str, values: Vec<Value>) -> Result<Property> {
    check::check_name(name)?;
    check_values(&values)?;
    owner.write(|backend| {
        check::check_unique(backend, owner.id(), EntityKind::Property, name, None)?;
        let record = graph::timestamped(EntityKind::Property, owner.id())
            .with(attr::NAME, Attribute::Text(name.to_string()))
            .with(attr::VALUES, Attribute::Values(values));
        let id = record.id();
        backend.create(record)?;
        debug!(id:%, section:% = owner.id(), name; "Created property");
        Ok(Property::wrap(owner, id))
    })
}

pub(crate) fn check_values(values: &[Value]) -> Result<()> {
    let Some(first) = values.first() else {
        return Ok(());
    };
    if let Some(other) = values.iter().find(|v| v.data_type() != first.data_type()) {
        return Err(Error::invalid_value(format!(
            "property values must share one data type, got {} and {}",
            first.data_type(),
            other.data_type()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use dataweave_core::error::ErrorKind;

    use super::*;

    #[test]
    fn test_check_values() {
        assert!(check_values(&[]).is_ok());
        assert!(check_values(&[Value::from(1.0), Value::from(2.5)]).is_ok());

        let err = check_values(&[Value::from(1.0), Value::from("one")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }
}
