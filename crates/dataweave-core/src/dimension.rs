//! Per-axis descriptors of a data array.
//!
//! A [`Dimension`] describes one axis and is one of three variants:
//! - [`SampledDimension`] - regular sampling, `position = offset + index * interval`
//! - [`RangeDimension`] - irregular sampling given by strictly ascending ticks
//! - [`SetDimension`] - categorical axis, one label per index
//!
//! The variant is fixed once a descriptor is attached to an array. Variant
//! specific fields are reached through [`Dimension::as_sampled`],
//! [`Dimension::as_range`] and [`Dimension::as_set`], which fail with
//! [`Error::InvalidDimension`] on the wrong variant.
//!
//! All lookups from a physical position to an index take a [`PositionMatch`]
//! policy. Lookups that cannot be satisfied return `None`.

use std::fmt;

use crate::{
    error::{Error, Result},
    units,
};

/// Two positions closer than this (in units of the sampling grid) are equal.
const TOLERANCE: f64 = 1.0e-9;

/// Variant tag of a [`Dimension`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionType {
    Sampled,
    Range,
    Set,
}

impl fmt::Display for DimensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionType::Sampled => write!(f, "sampled"),
            DimensionType::Range => write!(f, "range"),
            DimensionType::Set => write!(f, "set"),
        }
    }
}

/// Policy for mapping a position onto an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionMatch {
    /// Largest index whose position is strictly below the position.
    Less,
    /// Largest index whose position is at or below the position (floor).
    LessOrEqual,
    /// Only an index whose position equals the position.
    Equal,
    /// Smallest index whose position is at or above the position (ceiling).
    GreaterOrEqual,
    /// Smallest index whose position is strictly above the position.
    Greater,
}

impl PositionMatch {
    fn is_upper(&self) -> bool {
        matches!(self, PositionMatch::Greater | PositionMatch::GreaterOrEqual)
    }

    fn is_lower(&self) -> bool {
        matches!(self, PositionMatch::Less | PositionMatch::LessOrEqual)
    }
}

/// Whether the end of a range lookup is part of the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RangeMatch {
    #[default]
    Inclusive,
    Exclusive,
}

impl RangeMatch {
    fn end_match(&self) -> PositionMatch {
        match self {
            RangeMatch::Inclusive => PositionMatch::LessOrEqual,
            RangeMatch::Exclusive => PositionMatch::Less,
        }
    }
}

/// Location of a position relative to the ticks of a [`RangeDimension`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionInRange {
    NoRange,
    Less,
    InRange,
    Greater,
}

fn check_label(label: &str) -> Result<()> {
    if label.is_empty() {
        return Err(Error::empty_string("dimension label must not be empty"));
    }
    Ok(())
}

/// Combines two index lookups into a `(start, end)` pair if they are ordered.
fn ordered_pair(start: Option<usize>, end: Option<usize>) -> Option<(usize, usize)> {
    match (start, end) {
        (Some(s), Some(e)) if s <= e => Some((s, e)),
        _ => None,
    }
}

// =============================================================================
// Sampled
// =============================================================================

/// Regularly sampled axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledDimension {
    sampling_interval: f64,
    offset: Option<f64>,
    unit: Option<String>,
    label: Option<String>,
}

impl SampledDimension {
    /// Creates a sampled dimension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] unless `sampling_interval` is a
    /// finite number greater than zero.
    pub fn new(sampling_interval: f64) -> Result<Self> {
        check_interval(sampling_interval)?;
        Ok(Self {
            sampling_interval,
            offset: None,
            unit: None,
            label: None,
        })
    }

    pub fn with_offset(mut self, offset: f64) -> Result<Self> {
        self.set_offset(Some(offset))?;
        Ok(self)
    }

    pub fn with_unit(mut self, unit: &str) -> Result<Self> {
        self.set_unit(Some(unit))?;
        Ok(self)
    }

    pub fn with_label(mut self, label: &str) -> Result<Self> {
        self.set_label(Some(label))?;
        Ok(self)
    }

    pub fn sampling_interval(&self) -> f64 {
        self.sampling_interval
    }

    pub fn offset(&self) -> Option<f64> {
        self.offset
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_sampling_interval(&mut self, sampling_interval: f64) -> Result<()> {
        check_interval(sampling_interval)?;
        self.sampling_interval = sampling_interval;
        Ok(())
    }

    pub fn set_offset(&mut self, offset: Option<f64>) -> Result<()> {
        if let Some(offset) = offset
            && !offset.is_finite()
        {
            return Err(Error::invalid_dimension(format!(
                "offset must be finite, got {offset}"
            )));
        }
        self.offset = offset;
        Ok(())
    }

    pub fn set_unit(&mut self, unit: Option<&str>) -> Result<()> {
        if let Some(unit) = unit {
            units::check_unit(unit)?;
        }
        self.unit = unit.map(str::to_string);
        Ok(())
    }

    pub fn set_label(&mut self, label: Option<&str>) -> Result<()> {
        if let Some(label) = label {
            check_label(label)?;
        }
        self.label = label.map(str::to_string);
        Ok(())
    }

    /// Returns the position of sample `index`.
    pub fn position_at(&self, index: usize) -> f64 {
        self.offset.unwrap_or(0.0) + index as f64 * self.sampling_interval
    }

    /// Returns `count` positions starting at sample `start`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if the last sample index overflows.
    pub fn axis(&self, count: usize, start: usize) -> Result<Vec<f64>> {
        let end = start.checked_add(count).ok_or_else(|| {
            Error::out_of_bounds(format!("axis [{start}, {start} + {count}) overflows the index range"))
        })?;
        Ok((start..end).map(|i| self.position_at(i)).collect())
    }

    /// Maps a position onto a sample index.
    pub fn index_of(&self, position: f64, matching: PositionMatch) -> Option<usize> {
        let offset = self.offset.unwrap_or(0.0);
        if position < offset && !matching.is_upper() {
            return None;
        }

        let raw = (position - offset) / self.sampling_interval;
        let nearest = raw.round();
        let exact = (raw - nearest).abs() <= TOLERANCE;

        match matching {
            PositionMatch::GreaterOrEqual | PositionMatch::Greater => {
                let index = (if exact { nearest } else { raw.ceil() }).max(0.0) as usize;
                if matching == PositionMatch::Greater && exact && nearest >= 0.0 {
                    index.checked_add(1)
                } else {
                    Some(index)
                }
            }
            PositionMatch::LessOrEqual | PositionMatch::Less => {
                let index = (if exact { nearest } else { raw.floor() }).max(0.0) as usize;
                if matching == PositionMatch::Less && exact {
                    index.checked_sub(1)
                } else {
                    Some(index)
                }
            }
            PositionMatch::Equal => exact.then_some(nearest.max(0.0) as usize),
        }
    }

    /// Maps a `[start, end]` position range onto an index range.
    pub fn index_of_range(&self, start: f64, end: f64, matching: RangeMatch) -> Option<(usize, usize)> {
        if start > end {
            return None;
        }
        ordered_pair(
            self.index_of(start, PositionMatch::GreaterOrEqual),
            self.index_of(end, matching.end_match()),
        )
    }
}

fn check_interval(sampling_interval: f64) -> Result<()> {
    if !(sampling_interval.is_finite() && sampling_interval > 0.0) {
        return Err(Error::invalid_dimension(format!(
            "sampling interval must be larger than 0.0, got {sampling_interval}"
        )));
    }
    Ok(())
}

// =============================================================================
// Range
// =============================================================================

/// Irregularly sampled axis defined by explicit ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeDimension {
    ticks: Vec<f64>,
    unit: Option<String>,
    label: Option<String>,
}

impl RangeDimension {
    /// Creates a range dimension from strictly ascending ticks.
    ///
    /// ```
    /// # use dataweave_core::{dimension::RangeDimension, error::ErrorKind};
    /// assert!(RangeDimension::new(vec![1.0, 2.0, 3.0]).is_ok());
    /// let err = RangeDimension::new(vec![1.0, 2.0, 2.0]).unwrap_err();
    /// assert_eq!(err.kind(), ErrorKind::UnsortedTicks);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsortedTicks`] if the ticks are not strictly ascending
    /// and [`Error::InvalidDimension`] if there are none.
    pub fn new(ticks: Vec<f64>) -> Result<Self> {
        check_ticks(&ticks)?;
        Ok(Self {
            ticks,
            unit: None,
            label: None,
        })
    }

    pub fn with_unit(mut self, unit: &str) -> Result<Self> {
        self.set_unit(Some(unit))?;
        Ok(self)
    }

    pub fn with_label(mut self, label: &str) -> Result<Self> {
        self.set_label(Some(label))?;
        Ok(self)
    }

    pub fn ticks(&self) -> &[f64] {
        &self.ticks
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Replaces the ticks; the old ticks stay in place on failure.
    pub fn set_ticks(&mut self, ticks: Vec<f64>) -> Result<()> {
        check_ticks(&ticks)?;
        self.ticks = ticks;
        Ok(())
    }

    pub fn set_unit(&mut self, unit: Option<&str>) -> Result<()> {
        if let Some(unit) = unit {
            units::check_unit(unit)?;
        }
        self.unit = unit.map(str::to_string);
        Ok(())
    }

    pub fn set_label(&mut self, label: Option<&str>) -> Result<()> {
        if let Some(label) = label {
            check_label(label)?;
        }
        self.label = label.map(str::to_string);
        Ok(())
    }

    /// Returns the tick at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if there is no such tick.
    pub fn tick_at(&self, index: usize) -> Result<f64> {
        self.ticks.get(index).copied().ok_or_else(|| {
            Error::out_of_bounds(format!(
                "tick index {index} exceeds tick count {}",
                self.ticks.len()
            ))
        })
    }

    /// Returns `count` ticks starting at `start`.
    pub fn axis(&self, count: usize, start: usize) -> Result<Vec<f64>> {
        start
            .checked_add(count)
            .and_then(|end| self.ticks.get(start..end))
            .map(<[f64]>::to_vec)
            .ok_or_else(|| {
                Error::out_of_bounds(format!(
                    "axis [{start}, {start} + {count}) exceeds tick count {}",
                    self.ticks.len()
                ))
            })
    }

    pub fn position_in_range(&self, position: f64) -> PositionInRange {
        match (self.ticks.first(), self.ticks.last()) {
            (Some(first), _) if position < *first => PositionInRange::Less,
            (_, Some(last)) if position > *last => PositionInRange::Greater,
            (Some(_), Some(_)) => PositionInRange::InRange,
            _ => PositionInRange::NoRange,
        }
    }

    /// Maps a position onto a tick index using binary search.
    pub fn index_of(&self, position: f64, matching: PositionMatch) -> Option<usize> {
        let ticks = &self.ticks;
        let (first, last) = (*ticks.first()?, *ticks.last()?);

        if position < first {
            return matching.is_upper().then_some(0);
        }
        if position > last {
            return matching.is_lower().then_some(ticks.len() - 1);
        }

        // first tick >= position; exists because position <= last
        let lower = ticks.partition_point(|tick| *tick < position);
        let hit = ticks[lower] == position;

        match matching {
            PositionMatch::GreaterOrEqual => Some(lower),
            PositionMatch::Greater if hit => (lower + 1 < ticks.len()).then_some(lower + 1),
            PositionMatch::Greater => Some(lower),
            PositionMatch::LessOrEqual if hit => Some(lower),
            PositionMatch::LessOrEqual | PositionMatch::Less => lower.checked_sub(1),
            PositionMatch::Equal => hit.then_some(lower),
        }
    }

    /// Maps a `[start, end]` position range onto a tick index range.
    pub fn index_of_range(&self, start: f64, end: f64, matching: RangeMatch) -> Option<(usize, usize)> {
        if start > end {
            return None;
        }
        ordered_pair(
            self.index_of(start, PositionMatch::GreaterOrEqual),
            self.index_of(end, matching.end_match()),
        )
    }
}

fn check_ticks(ticks: &[f64]) -> Result<()> {
    if ticks.is_empty() {
        return Err(Error::invalid_dimension(
            "range dimension needs at least one tick",
        ));
    }
    if let Some(pos) = ticks.windows(2).position(|pair| !(pair[0] < pair[1])) {
        return Err(Error::unsorted_ticks(format!(
            "ticks must be strictly ascending; tick {} ({}) is not below tick {} ({})",
            pos,
            ticks[pos],
            pos + 1,
            ticks[pos + 1]
        )));
    }
    if let Some(bad) = ticks.iter().find(|tick| !tick.is_finite()) {
        return Err(Error::unsorted_ticks(format!("tick {bad} is not finite")));
    }
    Ok(())
}

// =============================================================================
// Set
// =============================================================================

/// Categorical axis with one label per index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetDimension {
    labels: Vec<String>,
}

impl SetDimension {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn set_labels<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
    }

    /// Maps a position onto a label index.
    ///
    /// Positions are label indices themselves; fractional positions are
    /// rounded according to `matching`. With labels present, lower matches
    /// clamp to the last label and upper matches beyond it fail.
    pub fn index_of(&self, position: f64, matching: PositionMatch) -> Option<usize> {
        if position < 0.0 && !matching.is_upper() {
            return None;
        }

        let nearest = position.round();
        let exact = (position - nearest).abs() <= TOLERANCE;
        let index = match matching {
            PositionMatch::GreaterOrEqual | PositionMatch::Greater => {
                let index = (if exact { nearest } else { position.ceil() }).max(0.0) as usize;
                if matching == PositionMatch::Greater && exact && nearest >= 0.0 {
                    index.checked_add(1)
                } else {
                    Some(index)
                }
            }
            PositionMatch::LessOrEqual | PositionMatch::Less => {
                let index = (if exact { nearest } else { position.floor() }) as usize;
                if matching == PositionMatch::Less && exact {
                    index.checked_sub(1)
                } else {
                    Some(index)
                }
            }
            PositionMatch::Equal => exact.then_some(nearest as usize),
        }?;

        let count = self.labels.len();
        if count > 0 && index > count - 1 {
            return matching.is_lower().then_some(count - 1);
        }
        Some(index)
    }

    pub fn index_of_range(&self, start: f64, end: f64, matching: RangeMatch) -> Option<(usize, usize)> {
        if start > end {
            return None;
        }
        ordered_pair(
            self.index_of(start, PositionMatch::GreaterOrEqual),
            self.index_of(end, matching.end_match()),
        )
    }
}

// =============================================================================
// Dimension
// =============================================================================

/// The variant payload of a [`Dimension`].
#[derive(Debug, Clone, PartialEq)]
pub enum DimensionKind {
    Sampled(SampledDimension),
    Range(RangeDimension),
    Set(SetDimension),
}

/// Descriptor of one axis together with its 1-based position in the array.
///
/// Descriptors that have not been attached to an array report index `0`.
///
/// # Examples
///
/// ```
/// use dataweave_core::dimension::{Dimension, DimensionType, SampledDimension};
///
/// let dim = Dimension::from(SampledDimension::new(0.5).unwrap());
/// assert_eq!(dim.dimension_type(), DimensionType::Sampled);
/// assert!(dim.as_range().is_err());
/// assert_eq!(dim.as_sampled().unwrap().position_at(4), 2.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    index: usize,
    kind: DimensionKind,
}

impl Dimension {
    pub fn new(kind: DimensionKind) -> Self {
        Self { index: 0, kind }
    }

    /// Returns a copy placed at the given 1-based axis.
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// 1-based axis of the owning array, `0` while unattached.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> &DimensionKind {
        &self.kind
    }

    pub fn dimension_type(&self) -> DimensionType {
        match self.kind {
            DimensionKind::Sampled(_) => DimensionType::Sampled,
            DimensionKind::Range(_) => DimensionType::Range,
            DimensionKind::Set(_) => DimensionType::Set,
        }
    }

    pub fn as_sampled(&self) -> Result<&SampledDimension> {
        match &self.kind {
            DimensionKind::Sampled(dim) => Ok(dim),
            _ => Err(self.wrong_variant(DimensionType::Sampled)),
        }
    }

    pub fn as_range(&self) -> Result<&RangeDimension> {
        match &self.kind {
            DimensionKind::Range(dim) => Ok(dim),
            _ => Err(self.wrong_variant(DimensionType::Range)),
        }
    }

    pub fn as_set(&self) -> Result<&SetDimension> {
        match &self.kind {
            DimensionKind::Set(dim) => Ok(dim),
            _ => Err(self.wrong_variant(DimensionType::Set)),
        }
    }

    pub fn as_sampled_mut(&mut self) -> Result<&mut SampledDimension> {
        let err = self.wrong_variant(DimensionType::Sampled);
        match &mut self.kind {
            DimensionKind::Sampled(dim) => Ok(dim),
            _ => Err(err),
        }
    }

    pub fn as_range_mut(&mut self) -> Result<&mut RangeDimension> {
        let err = self.wrong_variant(DimensionType::Range);
        match &mut self.kind {
            DimensionKind::Range(dim) => Ok(dim),
            _ => Err(err),
        }
    }

    pub fn as_set_mut(&mut self) -> Result<&mut SetDimension> {
        let err = self.wrong_variant(DimensionType::Set);
        match &mut self.kind {
            DimensionKind::Set(dim) => Ok(dim),
            _ => Err(err),
        }
    }

    fn wrong_variant(&self, expected: DimensionType) -> Error {
        Error::invalid_dimension(format!(
            "dimension {} is of type {}, not {expected}",
            self.index,
            self.dimension_type()
        ))
    }

    /// The unit of sampled and range dimensions.
    pub fn unit(&self) -> Option<&str> {
        match &self.kind {
            DimensionKind::Sampled(dim) => dim.unit(),
            DimensionKind::Range(dim) => dim.unit(),
            DimensionKind::Set(_) => None,
        }
    }

    /// Number of entries the descriptor itself defines, if any.
    ///
    /// Range dimensions define one entry per tick and set dimensions one per
    /// label; sampled dimensions are unbounded.
    pub fn defined_len(&self) -> Option<usize> {
        match &self.kind {
            DimensionKind::Sampled(_) => None,
            DimensionKind::Range(dim) => Some(dim.ticks().len()),
            DimensionKind::Set(dim) if dim.labels().is_empty() => None,
            DimensionKind::Set(dim) => Some(dim.labels().len()),
        }
    }

    pub fn index_of(&self, position: f64, matching: PositionMatch) -> Option<usize> {
        match &self.kind {
            DimensionKind::Sampled(dim) => dim.index_of(position, matching),
            DimensionKind::Range(dim) => dim.index_of(position, matching),
            DimensionKind::Set(dim) => dim.index_of(position, matching),
        }
    }

    pub fn index_of_range(&self, start: f64, end: f64, matching: RangeMatch) -> Option<(usize, usize)> {
        match &self.kind {
            DimensionKind::Sampled(dim) => dim.index_of_range(start, end, matching),
            DimensionKind::Range(dim) => dim.index_of_range(start, end, matching),
            DimensionKind::Set(dim) => dim.index_of_range(start, end, matching),
        }
    }

    /// Converts a position given in `unit` into an index on this axis.
    ///
    /// `unit` may be empty or `"none"` for a unitless position. The position
    /// is rescaled into the unit of the dimension before the lookup, which
    /// uses [`PositionMatch::GreaterOrEqual`].
    ///
    /// # Errors
    ///
    /// - [`Error::IncompatibleDimensions`] if the units cannot be combined
    /// - [`Error::OutOfBounds`] if the position maps onto no index
    pub fn position_to_index(&self, position: f64, unit: &str) -> Result<usize> {
        let scaled = match &self.kind {
            DimensionKind::Sampled(dim) => match dim.unit() {
                None if !units::is_unitless(unit) => {
                    return Err(Error::incompatible_dimensions(format!(
                        "position has unit `{unit}` but sampled dimension {} has none",
                        self.index
                    )));
                }
                Some(dim_unit) if !units::is_unitless(unit) => {
                    position * units::scaling(unit, dim_unit)?
                }
                _ => position,
            },
            DimensionKind::Range(dim) => match dim.unit() {
                Some(dim_unit) if !units::is_unitless(unit) => {
                    position * units::scaling(unit, dim_unit)?
                }
                _ => position,
            },
            DimensionKind::Set(dim) => {
                if !units::is_unitless(unit) {
                    return Err(Error::incompatible_dimensions(format!(
                        "cannot apply a position with unit `{unit}` to set dimension {}",
                        self.index
                    )));
                }
                if position < -0.5 {
                    return Err(Error::out_of_bounds(format!(
                        "position {position} lies before set dimension {}",
                        self.index
                    )));
                }
                let index = position.round() as usize;
                let count = dim.labels().len();
                if count > 0 && index > count {
                    return Err(Error::out_of_bounds(format!(
                        "position {position} exceeds the {count} labels of set dimension {}",
                        self.index
                    )));
                }
                return Ok(index);
            }
        };

        self.index_of(scaled, PositionMatch::GreaterOrEqual)
            .ok_or_else(|| {
                Error::out_of_bounds(format!(
                    "position {position} lies outside dimension {}",
                    self.index
                ))
            })
    }
}

impl From<SampledDimension> for Dimension {
    fn from(dim: SampledDimension) -> Self {
        Dimension::new(DimensionKind::Sampled(dim))
    }
}

impl From<RangeDimension> for Dimension {
    fn from(dim: RangeDimension) -> Self {
        Dimension::new(DimensionKind::Range(dim))
    }
}

impl From<SetDimension> for Dimension {
    fn from(dim: SetDimension) -> Self {
        Dimension::new(DimensionKind::Set(dim))
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::error::ErrorKind;

    fn sampled(interval: f64, offset: f64) -> SampledDimension {
        SampledDimension::new(interval)
            .and_then(|d| d.with_offset(offset))
            .expect("valid sampled dimension")
    }

    #[test]
    fn test_sampled_rejects_non_positive_interval() {
        for interval in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = SampledDimension::new(interval).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidDimension);
        }
    }

    #[test]
    fn test_sampled_position_and_axis() {
        let dim = sampled(0.5, 1.0);
        assert_approx_eq!(f64, dim.position_at(0), 1.0);
        assert_approx_eq!(f64, dim.position_at(4), 3.0);
        assert_eq!(dim.axis(3, 2).unwrap(), vec![2.0, 2.5, 3.0]);
    }

    #[test]
    fn test_sampled_index_of_policies() {
        let dim = sampled(1.0, 0.0);

        assert_eq!(dim.index_of(2.0, PositionMatch::Equal), Some(2));
        assert_eq!(dim.index_of(2.5, PositionMatch::Equal), None);
        assert_eq!(dim.index_of(2.5, PositionMatch::LessOrEqual), Some(2));
        assert_eq!(dim.index_of(2.5, PositionMatch::GreaterOrEqual), Some(3));
        assert_eq!(dim.index_of(2.0, PositionMatch::Less), Some(1));
        assert_eq!(dim.index_of(2.0, PositionMatch::Greater), Some(3));
        assert_eq!(dim.index_of(0.0, PositionMatch::Less), None);
        assert_eq!(dim.index_of(-1.0, PositionMatch::LessOrEqual), None);
        assert_eq!(dim.index_of(-1.0, PositionMatch::GreaterOrEqual), Some(0));
    }

    #[test]
    fn test_huge_positions_do_not_overflow() {
        let dim = sampled(1.0, 0.0);
        assert_eq!(dim.index_of(1e30, PositionMatch::Greater), None);
        assert_eq!(dim.index_of(1e30, PositionMatch::GreaterOrEqual), Some(usize::MAX));
        assert_eq!(dim.axis(2, usize::MAX).unwrap_err().kind(), ErrorKind::OutOfBounds);
        assert!(dim.axis(0, usize::MAX).unwrap().is_empty());

        let set = SetDimension::new(Vec::<String>::new());
        assert_eq!(set.index_of(1e30, PositionMatch::Greater), None);
    }

    #[test]
    fn test_sampled_index_tolerates_rounding() {
        let dim = sampled(0.1, 0.0);
        assert_eq!(dim.index_of(0.1 + 0.2, PositionMatch::GreaterOrEqual), Some(3));
        assert_eq!(dim.index_of(0.1 + 0.2, PositionMatch::Equal), Some(3));
    }

    #[test]
    fn test_sampled_index_of_range() {
        let dim = sampled(1.0, 0.0);
        assert_eq!(dim.index_of_range(1.2, 3.0, RangeMatch::Inclusive), Some((2, 3)));
        assert_eq!(dim.index_of_range(1.2, 3.0, RangeMatch::Exclusive), Some((2, 2)));
        assert_eq!(dim.index_of_range(3.0, 1.0, RangeMatch::Inclusive), None);
        assert_eq!(dim.index_of_range(1.2, 1.8, RangeMatch::Inclusive), None);
    }

    #[test]
    fn test_range_ticks_validation() {
        assert!(RangeDimension::new(vec![1.0, 2.0, 3.0]).is_ok());
        for ticks in [vec![1.0, 2.0, 2.0], vec![3.0, 1.0, 2.0], vec![0.0, f64::NAN]] {
            let err = RangeDimension::new(ticks).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsortedTicks);
        }
        let err = RangeDimension::new(vec![]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDimension);
    }

    #[test]
    fn test_range_set_ticks_is_atomic() {
        let mut dim = RangeDimension::new(vec![1.0, 2.0]).unwrap();
        assert!(dim.set_ticks(vec![5.0, 4.0]).is_err());
        assert_eq!(dim.ticks(), &[1.0, 2.0]);
        dim.set_ticks(vec![0.0, 10.0, 20.0]).unwrap();
        assert_eq!(dim.ticks(), &[0.0, 10.0, 20.0]);
    }

    #[test]
    fn test_range_index_of_policies() {
        let dim = RangeDimension::new(vec![1.0, 2.0, 4.0, 8.0]).unwrap();

        assert_eq!(dim.index_of(4.0, PositionMatch::Equal), Some(2));
        assert_eq!(dim.index_of(3.0, PositionMatch::Equal), None);
        assert_eq!(dim.index_of(3.0, PositionMatch::LessOrEqual), Some(1));
        assert_eq!(dim.index_of(3.0, PositionMatch::GreaterOrEqual), Some(2));
        assert_eq!(dim.index_of(4.0, PositionMatch::Less), Some(1));
        assert_eq!(dim.index_of(4.0, PositionMatch::Greater), Some(3));
        assert_eq!(dim.index_of(8.0, PositionMatch::Greater), None);
        assert_eq!(dim.index_of(1.0, PositionMatch::Less), None);
        assert_eq!(dim.index_of(0.0, PositionMatch::GreaterOrEqual), Some(0));
        assert_eq!(dim.index_of(0.0, PositionMatch::LessOrEqual), None);
        assert_eq!(dim.index_of(9.0, PositionMatch::LessOrEqual), Some(3));
        assert_eq!(dim.index_of(9.0, PositionMatch::GreaterOrEqual), None);
    }

    #[test]
    fn test_range_tick_at_and_axis() {
        let dim = RangeDimension::new(vec![1.0, 2.0, 4.0]).unwrap();
        assert_eq!(dim.tick_at(2).unwrap(), 4.0);
        assert_eq!(dim.tick_at(3).unwrap_err().kind(), ErrorKind::OutOfBounds);
        assert_eq!(dim.axis(2, 1).unwrap(), vec![2.0, 4.0]);
        assert_eq!(dim.axis(3, 1).unwrap_err().kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn test_position_in_range() {
        let dim = RangeDimension::new(vec![1.0, 2.0]).unwrap();
        assert_eq!(dim.position_in_range(0.5), PositionInRange::Less);
        assert_eq!(dim.position_in_range(1.5), PositionInRange::InRange);
        assert_eq!(dim.position_in_range(2.5), PositionInRange::Greater);
    }

    #[test]
    fn test_set_index_of() {
        let dim = SetDimension::new(["a", "b", "c"]);
        assert_eq!(dim.index_of(1.0, PositionMatch::Equal), Some(1));
        assert_eq!(dim.index_of(1.4, PositionMatch::GreaterOrEqual), Some(2));
        assert_eq!(dim.index_of(1.4, PositionMatch::LessOrEqual), Some(1));
        assert_eq!(dim.index_of(5.0, PositionMatch::LessOrEqual), Some(2));
        assert_eq!(dim.index_of(5.0, PositionMatch::GreaterOrEqual), None);
        assert_eq!(dim.index_of(-1.0, PositionMatch::Less), None);
    }

    #[test]
    fn test_variant_access() {
        let mut dim = Dimension::from(RangeDimension::new(vec![1.0]).unwrap()).with_index(2);
        assert_eq!(dim.index(), 2);
        assert_eq!(dim.dimension_type(), DimensionType::Range);
        assert!(dim.as_range().is_ok());
        assert_eq!(dim.as_sampled().unwrap_err().kind(), ErrorKind::InvalidDimension);
        assert_eq!(dim.as_set_mut().unwrap_err().kind(), ErrorKind::InvalidDimension);
        dim.as_range_mut().unwrap().set_ticks(vec![1.0, 2.0]).unwrap();
        assert_eq!(dim.defined_len(), Some(2));
    }

    #[test]
    fn test_units_are_validated() {
        let err = SampledDimension::new(1.0).unwrap().with_unit("parsec").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUnit);
        let err = RangeDimension::new(vec![1.0]).unwrap().with_unit("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyString);
        let err = SampledDimension::new(1.0).unwrap().with_label("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyString);
    }

    #[test]
    fn test_position_to_index_scales_units() {
        let dim = Dimension::from(sampled(1.0, 0.0).with_unit("ms").unwrap()).with_index(1);
        assert_eq!(dim.position_to_index(0.005, "s").unwrap(), 5);
        assert_eq!(dim.position_to_index(5.0, "none").unwrap(), 5);
        assert_eq!(
            dim.position_to_index(5.0, "mV").unwrap_err().kind(),
            ErrorKind::IncompatibleDimensions
        );

        let unitless = Dimension::from(sampled(1.0, 0.0));
        assert_eq!(
            unitless.position_to_index(5.0, "s").unwrap_err().kind(),
            ErrorKind::IncompatibleDimensions
        );
    }

    #[test]
    fn test_position_to_index_set_and_range() {
        let set = Dimension::from(SetDimension::new(["a", "b"]));
        assert_eq!(set.position_to_index(1.0, "").unwrap(), 1);
        assert_eq!(set.position_to_index(2.0, "").unwrap(), 2);
        assert_eq!(set.position_to_index(3.0, "").unwrap_err().kind(), ErrorKind::OutOfBounds);
        assert_eq!(
            set.position_to_index(1.0, "s").unwrap_err().kind(),
            ErrorKind::IncompatibleDimensions
        );

        let range = Dimension::from(RangeDimension::new(vec![0.0, 1.0, 3.0]).unwrap());
        assert_eq!(range.position_to_index(2.0, "none").unwrap(), 2);
        assert_eq!(range.position_to_index(4.0, "none").unwrap_err().kind(), ErrorKind::OutOfBounds);
    }
}

#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    // ===================
    // Strategies
    // ===================

    fn ascending_ticks_strategy() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(0.001f64..100.0, 1..50).prop_map(|steps| {
            steps
                .iter()
                .scan(-50.0, |acc, step| {
                    *acc += step;
                    Some(*acc)
                })
                .collect()
        })
    }

    fn position_strategy() -> impl Strategy<Value = f64> {
        -100.0f64..5000.0
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Floor and ceiling lookups bracket the position.
    fn check_range_lookup_brackets(ticks: Vec<f64>, position: f64) -> std::result::Result<(), TestCaseError> {
        let dim = RangeDimension::new(ticks.clone()).expect("ascending ticks");

        if let Some(floor) = dim.index_of(position, PositionMatch::LessOrEqual) {
            prop_assert!(ticks[floor] <= position || floor == ticks.len() - 1);
            prop_assert!(floor + 1 == ticks.len() || ticks[floor + 1] > position);
        }
        if let Some(ceil) = dim.index_of(position, PositionMatch::GreaterOrEqual) {
            prop_assert!(ticks[ceil] >= position || ceil == 0);
            prop_assert!(ceil == 0 || ticks[ceil - 1] < position);
        }
        Ok(())
    }

    /// Every tick is found exactly at its own index.
    fn check_range_exact_hits(ticks: Vec<f64>) -> std::result::Result<(), TestCaseError> {
        let dim = RangeDimension::new(ticks.clone()).expect("ascending ticks");
        for (i, tick) in ticks.iter().enumerate() {
            prop_assert_eq!(dim.index_of(*tick, PositionMatch::Equal), Some(i));
        }
        Ok(())
    }

    /// Swapping two distinct ticks always breaks the ordering check.
    fn check_swapped_ticks_rejected(mut ticks: Vec<f64>, a: usize, b: usize) -> std::result::Result<(), TestCaseError> {
        let (a, b) = (a % ticks.len(), b % ticks.len());
        prop_assume!(a != b);
        ticks.swap(a, b);
        prop_assert!(RangeDimension::new(ticks).is_err());
        Ok(())
    }

    /// Sample positions map back onto their own index.
    fn check_sampled_roundtrip(interval: f64, offset: f64, index: usize) -> std::result::Result<(), TestCaseError> {
        let dim = SampledDimension::new(interval)
            .and_then(|d| d.with_offset(offset))
            .expect("valid sampled dimension");
        let position = dim.position_at(index);
        prop_assert_eq!(dim.index_of(position, PositionMatch::Equal), Some(index));
        prop_assert_eq!(dim.index_of(position, PositionMatch::GreaterOrEqual), Some(index));
        prop_assert_eq!(dim.index_of(position, PositionMatch::LessOrEqual), Some(index));
        Ok(())
    }

    proptest! {
        #[test]
        fn range_lookup_brackets(ticks in ascending_ticks_strategy(), position in position_strategy()) {
            check_range_lookup_brackets(ticks, position)?;
        }

        #[test]
        fn range_exact_hits(ticks in ascending_ticks_strategy()) {
            check_range_exact_hits(ticks)?;
        }

        #[test]
        fn swapped_ticks_rejected(ticks in ascending_ticks_strategy(), a in 0usize..50, b in 0usize..50) {
            check_swapped_ticks_rejected(ticks, a, b)?;
        }

        #[test]
        fn sampled_roundtrip(interval in 0.01f64..10.0, offset in -100.0f64..100.0, index in 0usize..10_000) {
            check_sampled_roundtrip(interval, offset, index)?;
        }
    }
}
