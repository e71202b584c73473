//! N-dimensional data with axis descriptors and calibration.

use dataweave_backend::{Attribute, Backend, EntityKind, Record, attr};
use dataweave_core::{
    dimension::Dimension,
    error::{Error, Result},
    identifier::Id,
    ndbuffer::NdBuffer,
    value::DataType,
};
use log::{debug, trace};

use crate::{
    check,
    entity::{EntityWithMetadata, EntityWithSources, NamedEntity, entity_type},
    handle::{HasHandle, record},
    multi_tag,
};

entity_type!(
    /// An n-dimensional array described by one [`Dimension`] per axis.
    ///
    /// The number of dimensions always equals the rank of the data. Values
    /// may be calibrated through a polynomial: reading calibrated data
    /// returns `sum(c[i] * (x - origin)^i)` for every stored `x`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dataweave::{File, NdBuffer, SampledDimension, config::Config};
    ///
    /// let file = File::create(Config::default()).unwrap();
    /// let block = file.create_block("session", "recording").unwrap();
    /// let dim = SampledDimension::new(0.5).unwrap().with_unit("ms").unwrap();
    /// let array = block
    ///     .create_data_array("lfp", "signal", NdBuffer::vector(vec![1.0, 2.0]), vec![dim.into()])
    ///     .unwrap();
    ///
    /// array.set_polynom_coefficients(Some(vec![0.0, 2.0])).unwrap();
    /// assert_eq!(array.read_calibrated().unwrap(), vec![2.0, 4.0]);
    /// ```
    DataArray,
    EntityKind::DataArray
);

impl NamedEntity for DataArray {}
impl EntityWithMetadata for DataArray {}
impl EntityWithSources for DataArray {}

impl DataArray {
    pub fn data_type(&self) -> Result<DataType> {
        self.handle()?.read(|_, record| Ok(stored(record)?.data_type()))
    }

    pub fn shape(&self) -> Result<Vec<usize>> {
        self.handle()?.read(|_, record| Ok(stored(record)?.shape().to_vec()))
    }

    pub fn rank(&self) -> Result<usize> {
        self.handle()?.read(|_, record| Ok(stored(record)?.rank()))
    }

    /// Returns a copy of the stored data.
    pub fn read(&self) -> Result<NdBuffer> {
        self.handle()?.read(|_, record| Ok(stored(record)?.clone()))
    }

    /// Returns the hyperslab at `offset` spanning `count` elements per axis.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRank`] if `offset` or `count` do not match the rank
    /// - [`Error::OutOfBounds`] if the hyperslab leaves the shape
    pub fn read_slice(&self, offset: &[usize], count: &[usize]) -> Result<NdBuffer> {
        self.handle()?
            .read(|_, record| stored(record)?.slice(offset, count))
    }

    /// Returns the data as numbers after applying the polynomial calibration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] for boolean or text data.
    pub fn read_calibrated(&self) -> Result<Vec<f64>> {
        self.handle()?.read(|_, record| {
            let raw = stored(record)?.to_f64_vec()?;
            let coefficients = record.numbers(attr::POLYNOM_COEFFICIENTS).unwrap_or_default();
            let origin = record.number(attr::EXPANSION_ORIGIN).unwrap_or(0.0);
            Ok(calibrate(&raw, coefficients, origin))
        })
    }

    /// Replaces the data.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRank`] if the rank differs from the dimension count
    /// - the errors of [`MultiTag::set_positions`](crate::MultiTag::set_positions)
    ///   if the array serves as positions or extents of a multi tag
    pub fn write(&self, data: NdBuffer) -> Result<()> {
        let handle = self.handle()?;
        handle.write(|backend| {
            let dims = record(backend, handle.id())?.dimensions(attr::DIMENSIONS).len();
            if data.rank() != dims {
                return Err(Error::invalid_rank(format!(
                    "data of rank {} does not fit {dims} dimensions",
                    data.rank()
                )));
            }
            check_region_users(backend, handle.id(), &data)?;
            debug!(id:% = handle.id(), shape:? = data.shape(); "Wrote data");
            backend.set_attribute(handle.id(), attr::DATA, Some(Attribute::Data(data)))?;
            Ok(())
        })
    }

    /// Grows the data along `axis` (0-based).
    ///
    /// # Errors
    ///
    /// The errors of [`NdBuffer::append`], plus those of [`DataArray::write`]
    /// when the grown data breaks a multi tag.
    pub fn append(&self, data: &NdBuffer, axis: usize) -> Result<()> {
        let handle = self.handle()?;
        handle.write(|backend| {
            let mut grown = stored(record(backend, handle.id())?)?.clone();
            grown.append(data, axis)?;
            check_region_users(backend, handle.id(), &grown)?;
            trace!(id:% = handle.id(), axis, shape:? = grown.shape(); "Appended data");
            backend.set_attribute(handle.id(), attr::DATA, Some(Attribute::Data(grown)))?;
            Ok(())
        })
    }

    // Dimensions

    pub fn dimensions(&self) -> Result<Vec<Dimension>> {
        self.handle()?
            .read(|_, record| Ok(record.dimensions(attr::DIMENSIONS).to_vec()))
    }

    /// Returns the dimension at the 1-based `index`.
    pub fn dimension(&self, index: usize) -> Result<Dimension> {
        self.handle()?.read(|_, record| {
            let dims = record.dimensions(attr::DIMENSIONS);
            index
                .checked_sub(1)
                .and_then(|i| dims.get(i))
                .cloned()
                .ok_or_else(|| {
                    Error::out_of_bounds(format!(
                        "dimension index {index} outside 1..={}",
                        dims.len()
                    ))
                })
        })
    }

    pub fn dimension_count(&self) -> Result<usize> {
        self.handle()?
            .read(|_, record| Ok(record.dimensions(attr::DIMENSIONS).len()))
    }

    /// Replaces the descriptor at the 1-based `index` with one of the same type.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfBounds`] for an index outside `1..=rank`
    /// - [`Error::InvalidDimension`] if the descriptor type differs
    pub fn set_dimension(&self, index: usize, dimension: Dimension) -> Result<()> {
        let handle = self.handle()?;
        handle.write(|backend| {
            let mut dims = record(backend, handle.id())?.dimensions(attr::DIMENSIONS).to_vec();
            let count = dims.len();
            let slot = index
                .checked_sub(1)
                .and_then(|i| dims.get_mut(i))
                .ok_or_else(|| Error::out_of_bounds(format!("dimension index {index} outside 1..={count}")))?;
            if slot.dimension_type() != dimension.dimension_type() {
                return Err(Error::invalid_dimension(format!(
                    "dimension {index} is of type {}, cannot replace it with {}",
                    slot.dimension_type(),
                    dimension.dimension_type()
                )));
            }
            *slot = dimension.with_index(index);
            backend.set_attribute(handle.id(), attr::DIMENSIONS, Some(Attribute::Dimensions(dims)))?;
            Ok(())
        })
    }

    // Calibration and annotations

    pub fn unit(&self) -> Result<Option<String>> {
        self.text(attr::UNIT)
    }

    /// Sets or clears the unit of the values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUnit`] unless the unit is an SI unit.
    pub fn set_unit(&self, unit: Option<&str>) -> Result<()> {
        let handle = self.handle()?;
        let unit = unit.map(|u| check::unit(handle.config(), u)).transpose()?;
        self.set_text(attr::UNIT, unit)
    }

    pub fn label(&self) -> Result<Option<String>> {
        self.text(attr::LABEL)
    }

    pub fn set_label(&self, label: Option<&str>) -> Result<()> {
        if let Some(label) = label {
            check::check_text("label", label)?;
        }
        self.set_text(attr::LABEL, label.map(str::to_string))
    }

    pub fn expansion_origin(&self) -> Result<Option<f64>> {
        self.handle()?
            .read(|_, record| Ok(record.number(attr::EXPANSION_ORIGIN)))
    }

    pub fn set_expansion_origin(&self, origin: Option<f64>) -> Result<()> {
        if let Some(origin) = origin {
            check::check_finite("expansion origin", &[origin])?;
        }
        let handle = self.handle()?;
        handle.write(|backend| {
            backend.set_attribute(handle.id(), attr::EXPANSION_ORIGIN, origin.map(Attribute::Number))?;
            Ok(())
        })
    }

    pub fn polynom_coefficients(&self) -> Result<Vec<f64>> {
        self.handle()?.read(|_, record| {
            Ok(record
                .numbers(attr::POLYNOM_COEFFICIENTS)
                .unwrap_or_default()
                .to_vec())
        })
    }

    /// Sets the calibration polynomial, lowest order first; `None` removes it.
    pub fn set_polynom_coefficients(&self, coefficients: Option<Vec<f64>>) -> Result<()> {
        if let Some(coefficients) = &coefficients {
            check::check_finite("polynom coefficients", coefficients)?;
        }
        let handle = self.handle()?;
        handle.write(|backend| {
            backend.set_attribute(
                handle.id(),
                attr::POLYNOM_COEFFICIENTS,
                coefficients.map(Attribute::Numbers),
            )?;
            Ok(())
        })
    }

    fn text(&self, key: &str) -> Result<Option<String>> {
        self.handle()?
            .read(|_, record| Ok(record.text(key).map(str::to_string)))
    }

    fn set_text(&self, key: &str, value: Option<String>) -> Result<()> {
        let handle = self.handle()?;
        handle.write(|backend| {
            backend.set_attribute(handle.id(), key, value.map(Attribute::Text))?;
            Ok(())
        })
    }
}

fn stored(record: &Record) -> Result<&NdBuffer> {
    record
        .data(attr::DATA)
        .ok_or_else(|| Error::missing_attribute(format!("data array {} has no data", record.id())))
}

/// Evaluates the calibration polynomial for every value.
fn calibrate(raw: &[f64], coefficients: &[f64], origin: f64) -> Vec<f64> {
    if coefficients.is_empty() {
        return raw.to_vec();
    }
    raw.iter()
        .map(|x| {
            let shifted = x - origin;
            // Horner
            coefficients.iter().rev().fold(0.0, |acc, c| acc * shifted + c)
        })
        .collect()
}

/// Ensures that multi tags using `array` as positions or extents stay valid
/// if it held `data`.
fn check_region_users(backend: &dyn Backend, array: Id, data: &NdBuffer) -> Result<()> {
    for tag in backend.records(EntityKind::MultiTag) {
        let Some(tag) = backend.get(tag) else {
            continue;
        };
        let is_positions = tag.reference(attr::POSITIONS) == Some(array);
        let is_extents = tag.reference(attr::EXTENTS) == Some(array);
        if is_positions || is_extents {
            multi_tag::check_layout(backend, tag.id(), array, data)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    #[test]
    fn test_calibrate() {
        assert_eq!(calibrate(&[1.0, 2.0], &[], 5.0), vec![1.0, 2.0]);

        let out = calibrate(&[1.0, 2.0, 3.0], &[1.0, 0.5, 0.25], 1.0);
        // 1 + 0.5 d + 0.25 d^2 for d = 0, 1, 2
        assert_approx_eq!(f64, out[0], 1.0);
        assert_approx_eq!(f64, out[1], 1.75);
        assert_approx_eq!(f64, out[2], 3.0);
    }
}
