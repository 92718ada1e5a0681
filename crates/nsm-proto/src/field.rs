//! Field types and fixed-width scalar values.

use std::fmt;

use strum::{Display, EnumIter};

/// Type of a record field as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "UPPERCASE")]
pub enum FieldType {
    /// One byte, zero is `false`.
    Bool,
    /// One signed byte.
    Char,
    /// Two-byte signed integer.
    Short,
    /// Four-byte signed integer.
    Int,
    /// Eight-byte signed integer.
    Long,
    /// IEEE 754 single precision.
    Float,
    /// IEEE 754 double precision.
    Double,
    /// Length-prefixed string. Configuration records only.
    Text,
    /// Array of nested records.
    Object,
    /// Label table plus a selected label. Configuration records only.
    Enum,
}

impl FieldType {
    /// Numeric tag written on the wire.
    #[must_use]
    pub const fn tag(self) -> i32 {
        match self {
            Self::Bool => 1,
            Self::Char => 2,
            Self::Short => 3,
            Self::Int => 4,
            Self::Long => 5,
            Self::Float => 6,
            Self::Double => 7,
            Self::Text => 8,
            Self::Object => 9,
            Self::Enum => 10,
        }
    }

    /// Resolves a wire tag, returning `None` for unknown values.
    #[must_use]
    pub const fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            1 => Some(Self::Bool),
            2 => Some(Self::Char),
            3 => Some(Self::Short),
            4 => Some(Self::Int),
            5 => Some(Self::Long),
            6 => Some(Self::Float),
            7 => Some(Self::Double),
            8 => Some(Self::Text),
            9 => Some(Self::Object),
            10 => Some(Self::Enum),
            _ => None,
        }
    }

    /// Encoded width in bytes for fixed-width types.
    #[must_use]
    pub const fn width(self) -> Option<usize> {
        match self {
            Self::Bool | Self::Char => Some(1),
            Self::Short => Some(2),
            Self::Int | Self::Float => Some(4),
            Self::Long | Self::Double => Some(8),
            Self::Text | Self::Object | Self::Enum => None,
        }
    }

    /// Whether values of this type are fixed-width scalars.
    #[must_use]
    pub const fn is_scalar(self) -> bool {
        self.width().is_some()
    }
}

/// A single fixed-width value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    /// Boolean value.
    Bool(bool),
    /// Signed byte.
    Char(i8),
    /// 16-bit integer.
    Short(i16),
    /// 32-bit integer.
    Int(i32),
    /// 64-bit integer.
    Long(i64),
    /// Single precision float.
    Float(f32),
    /// Double precision float.
    Double(f64),
}

impl Scalar {
    /// Zero value of a scalar type, or `None` for composite types.
    #[must_use]
    pub const fn zero(field_type: FieldType) -> Option<Self> {
        match field_type {
            FieldType::Bool => Some(Self::Bool(false)),
            FieldType::Char => Some(Self::Char(0)),
            FieldType::Short => Some(Self::Short(0)),
            FieldType::Int => Some(Self::Int(0)),
            FieldType::Long => Some(Self::Long(0)),
            FieldType::Float => Some(Self::Float(0.0)),
            FieldType::Double => Some(Self::Double(0.0)),
            FieldType::Text | FieldType::Object | FieldType::Enum => None,
        }
    }

    /// Type of this value.
    #[must_use]
    pub const fn field_type(self) -> FieldType {
        match self {
            Self::Bool(_) => FieldType::Bool,
            Self::Char(_) => FieldType::Char,
            Self::Short(_) => FieldType::Short,
            Self::Int(_) => FieldType::Int,
            Self::Long(_) => FieldType::Long,
            Self::Float(_) => FieldType::Float,
            Self::Double(_) => FieldType::Double,
        }
    }

    /// Converts the value to another scalar type.
    ///
    /// Integer narrowing wraps and float-to-integer conversion saturates,
    /// matching Rust's `as` semantics. Returns `None` for composite targets.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "narrowing casts between wire types are part of the record contract"
    )]
    pub fn cast(self, target: FieldType) -> Option<Self> {
        if target == self.field_type() {
            return Some(self);
        }
        let cast = match target {
            FieldType::Bool => Self::Bool(self.is_truthy()),
            FieldType::Char => Self::Char(self.as_i64() as i8),
            FieldType::Short => Self::Short(self.as_i64() as i16),
            FieldType::Int => Self::Int(self.as_i64() as i32),
            FieldType::Long => Self::Long(self.as_i64()),
            FieldType::Float => Self::Float(self.as_f64() as f32),
            FieldType::Double => Self::Double(self.as_f64()),
            FieldType::Text | FieldType::Object | FieldType::Enum => return None,
        };
        Some(cast)
    }

    /// Whether the value is non-zero.
    #[must_use]
    pub fn is_truthy(self) -> bool {
        match self {
            Self::Bool(value) => value,
            Self::Float(value) => value != 0.0,
            Self::Double(value) => value != 0.0,
            other => other.as_i64() != 0,
        }
    }

    /// The value widened to a 64-bit integer.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "float to integer conversion saturates by definition"
    )]
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Bool(value) => i64::from(value),
            Self::Char(value) => i64::from(value),
            Self::Short(value) => i64::from(value),
            Self::Int(value) => i64::from(value),
            Self::Long(value) => value,
            Self::Float(value) => value as i64,
            Self::Double(value) => value as i64,
        }
    }

    /// The value widened to a double.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "64-bit integers above 2^53 lose precision as doubles"
    )]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Bool(value) => f64::from(u8::from(value)),
            Self::Char(value) => f64::from(value),
            Self::Short(value) => f64::from(value),
            Self::Int(value) => f64::from(value),
            Self::Long(value) => value as f64,
            Self::Float(value) => f64::from(value),
            Self::Double(value) => value,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => value.fmt(formatter),
            Self::Char(value) => value.fmt(formatter),
            Self::Short(value) => value.fmt(formatter),
            Self::Int(value) => value.fmt(formatter),
            Self::Long(value) => value.fmt(formatter),
            Self::Float(value) => value.fmt(formatter),
            Self::Double(value) => value.fmt(formatter),
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

scalar_from! {
    bool => Bool,
    i8 => Char,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    #[rstest]
    fn tags_resolve_back_to_their_type() {
        for field_type in FieldType::iter() {
            assert_eq!(FieldType::from_tag(field_type.tag()), Some(field_type));
        }
        assert_eq!(FieldType::from_tag(0), None);
        assert_eq!(FieldType::from_tag(11), None);
    }

    #[rstest]
    #[case(FieldType::Bool, Some(1))]
    #[case(FieldType::Short, Some(2))]
    #[case(FieldType::Float, Some(4))]
    #[case(FieldType::Long, Some(8))]
    #[case(FieldType::Text, None)]
    #[case(FieldType::Object, None)]
    fn reports_fixed_widths(#[case] field_type: FieldType, #[case] width: Option<usize>) {
        assert_eq!(field_type.width(), width);
    }

    #[rstest]
    #[case(Scalar::Double(3.9), FieldType::Int, Scalar::Int(3))]
    #[case(Scalar::Int(300), FieldType::Char, Scalar::Char(44))]
    #[case(Scalar::Short(-2), FieldType::Bool, Scalar::Bool(true))]
    #[case(Scalar::Bool(true), FieldType::Float, Scalar::Float(1.0))]
    #[case(Scalar::Long(7), FieldType::Long, Scalar::Long(7))]
    fn casts_between_types(#[case] value: Scalar, #[case] target: FieldType, #[case] expected: Scalar) {
        assert_eq!(value.cast(target), Some(expected));
    }

    #[rstest]
    fn composite_types_have_no_zero() {
        assert_eq!(Scalar::zero(FieldType::Enum), None);
        assert_eq!(Scalar::zero(FieldType::Int), Some(Scalar::Int(0)));
        assert_eq!(Scalar::Int(1).cast(FieldType::Text), None);
    }

    #[rstest]
    #[case(Scalar::Bool(false), "false")]
    #[case(Scalar::Char(-3), "-3")]
    #[case(Scalar::Long(1 << 40), "1099511627776")]
    #[case(Scalar::Float(0.5), "0.5")]
    fn scalars_display_their_value(#[case] value: Scalar, #[case] expected: &str) {
        assert_eq!(value.to_string(), expected);
    }
}
