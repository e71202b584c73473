//! Scalar values used as the atomic unit of metadata.
//!
//! A [`Value`] wraps a tagged [`Variant`] payload together with the optional
//! annotations a metadata field may carry (uncertainty, reference, ...).
//! Values are immutable; the `with_*` methods return modified copies.

use std::fmt;

/// Element type of a value or a data buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    Bool,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Double,
    String,
    /// No payload; used for empty properties.
    #[default]
    Nothing,
}

impl DataType {
    /// Returns `true` for the integer and floating point types.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Int32
                | DataType::UInt32
                | DataType::Int64
                | DataType::UInt64
                | DataType::Double
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int32 => "int32",
            DataType::UInt32 => "uint32",
            DataType::Int64 => "int64",
            DataType::UInt64 => "uint64",
            DataType::Double => "double",
            DataType::String => "string",
            DataType::Nothing => "nothing",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tagged scalar payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Variant {
    #[default]
    Nothing,
    Bool(bool),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    String(String),
}

impl Variant {
    /// Returns the [`DataType`] tag of the payload.
    pub fn data_type(&self) -> DataType {
        match self {
            Variant::Nothing => DataType::Nothing,
            Variant::Bool(_) => DataType::Bool,
            Variant::Int32(_) => DataType::Int32,
            Variant::UInt32(_) => DataType::UInt32,
            Variant::Int64(_) => DataType::Int64,
            Variant::UInt64(_) => DataType::UInt64,
            Variant::Double(_) => DataType::Double,
            Variant::String(_) => DataType::String,
        }
    }

    /// Converts numeric payloads to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Variant::Int32(v) => Some(f64::from(*v)),
            Variant::UInt32(v) => Some(f64::from(*v)),
            Variant::Int64(v) => Some(*v as f64),
            Variant::UInt64(v) => Some(*v as f64),
            Variant::Double(v) => Some(*v),
            Variant::Nothing | Variant::Bool(_) | Variant::String(_) => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Nothing => write!(f, "<nothing>"),
            Variant::Bool(v) => write!(f, "{v}"),
            Variant::Int32(v) => write!(f, "{v}"),
            Variant::UInt32(v) => write!(f, "{v}"),
            Variant::Int64(v) => write!(f, "{v}"),
            Variant::UInt64(v) => write!(f, "{v}"),
            Variant::Double(v) => write!(f, "{v}"),
            Variant::String(v) => write!(f, "{v:?}"),
        }
    }
}

/// A metadata scalar with its annotations.
///
/// # Examples
///
/// ```
/// use dataweave_core::value::{DataType, Value};
///
/// let v = Value::from(3.5).with_uncertainty(0.1);
/// assert_eq!(v.data_type(), DataType::Double);
/// assert_eq!(v.as_f64(), Some(3.5));
/// assert_eq!(v.uncertainty(), 0.1);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Value {
    variant: Variant,
    uncertainty: f64,
    reference: Option<String>,
    filename: Option<String>,
    encoder: Option<String>,
    checksum: Option<String>,
}

impl Value {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn data_type(&self) -> DataType {
        self.variant.data_type()
    }

    pub fn uncertainty(&self) -> f64 {
        self.uncertainty
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn encoder(&self) -> Option<&str> {
        self.encoder.as_deref()
    }

    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    pub fn with_uncertainty(mut self, uncertainty: f64) -> Self {
        self.uncertainty = uncertainty;
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_encoder(mut self, encoder: impl Into<String>) -> Self {
        self.encoder = Some(encoder.into());
        self
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.variant {
            Variant::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.variant {
            Variant::Int32(v) => Some(i64::from(v)),
            Variant::UInt32(v) => Some(i64::from(v)),
            Variant::Int64(v) => Some(v),
            Variant::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.variant.as_f64()
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.variant {
            Variant::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variant)?;
        if self.uncertainty != 0.0 {
            write!(f, " +/- {}", self.uncertainty)?;
        }
        Ok(())
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::new(Variant::$variant(v.into()))
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f64 => Double,
    String => String,
    &str => String,
}

impl From<Variant> for Value {
    fn from(variant: Variant) -> Self {
        Value::new(variant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        assert_eq!(Value::from(true).data_type(), DataType::Bool);
        assert_eq!(Value::from(1i32).data_type(), DataType::Int32);
        assert_eq!(Value::from(1u32).data_type(), DataType::UInt32);
        assert_eq!(Value::from(1i64).data_type(), DataType::Int64);
        assert_eq!(Value::from(1u64).data_type(), DataType::UInt64);
        assert_eq!(Value::from(1.0).data_type(), DataType::Double);
        assert_eq!(Value::from("abc").data_type(), DataType::String);
        assert_eq!(Value::default().data_type(), DataType::Nothing);
    }

    #[test]
    fn test_annotations_are_copies() {
        let base = Value::from("probe");
        let annotated = base
            .clone()
            .with_reference("ref")
            .with_filename("probe.txt")
            .with_encoder("utf-8")
            .with_checksum("abc123");

        assert_eq!(base.reference(), None);
        assert_eq!(annotated.reference(), Some("ref"));
        assert_eq!(annotated.filename(), Some("probe.txt"));
        assert_eq!(annotated.encoder(), Some("utf-8"));
        assert_eq!(annotated.checksum(), Some("abc123"));
        assert_eq!(annotated.as_str(), Some("probe"));
    }

    #[test]
    fn test_numeric_accessors() {
        assert_eq!(Value::from(7u64).as_i64(), Some(7));
        assert_eq!(Value::from(u64::MAX).as_i64(), None);
        assert_eq!(Value::from(-3i32).as_f64(), Some(-3.0));
        assert_eq!(Value::from("x").as_f64(), None);
        assert_eq!(Value::from(false).as_bool(), Some(false));
        assert!(DataType::UInt32.is_numeric());
        assert!(!DataType::String.is_numeric());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(2.5).with_uncertainty(0.5).to_string(), "2.5 +/- 0.5");
        assert_eq!(Value::from("a").to_string(), "\"a\"");
        assert_eq!(DataType::Double.to_string(), "double");
    }
}
