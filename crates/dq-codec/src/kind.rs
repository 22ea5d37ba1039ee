//! The `Kind` tag identifying a value buffer's element type, and the
//! mapping from `Kind` to one of the ~10 concrete wire shapes.

use dq_core::{DqError, DqResult};

/// The type tag carried in field 1 of every value buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Kind {
    String = 2,
    Int32 = 3,
    Int64 = 4,
    Uint32 = 5,
    Uint64 = 6,
    Double = 7,
    Float = 8,
    Bool = 9,
    Bytes = 10,
    Date = 12,
    Time = 13,
    DateTime = 14,
    Numeric = 15,
    Inet4 = 16,
    Inet6 = 17,
    Mac = 18,
    GeoData = 19,
}

impl Kind {
    pub fn from_u32(v: u32) -> DqResult<Kind> {
        Ok(match v {
            2 => Kind::String,
            3 => Kind::Int32,
            4 => Kind::Int64,
            5 => Kind::Uint32,
            6 => Kind::Uint64,
            7 => Kind::Double,
            8 => Kind::Float,
            9 => Kind::Bool,
            10 => Kind::Bytes,
            12 => Kind::Date,
            13 => Kind::Time,
            14 => Kind::DateTime,
            15 => Kind::Numeric,
            16 => Kind::Inet4,
            17 => Kind::Inet6,
            18 => Kind::Mac,
            19 => Kind::GeoData,
            other => return Err(DqError::parse_failure(format!("unrecognized kind {}", other))),
        })
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Which of the concrete wire shapes a value array of this kind is
    /// encoded with. DATE/TIME use the fixed-length variant of the
    /// length-delimited family; every other non-numeric, non-bytes kind
    /// falls back to plain strings.
    pub(crate) fn wire_shape(self) -> WireShape {
        match self {
            Kind::Int32 => WireShape::Int32,
            Kind::Int64 => WireShape::Int64,
            Kind::Uint32 => WireShape::Uint32,
            Kind::Uint64 => WireShape::Uint64,
            Kind::Double => WireShape::Double,
            Kind::Float => WireShape::Float,
            Kind::Bool => WireShape::Bool,
            Kind::Bytes => WireShape::Bytes,
            Kind::Date => WireShape::FixedLen(8),
            Kind::Time => WireShape::FixedLen(6),
            Kind::String
            | Kind::DateTime
            | Kind::Numeric
            | Kind::Inet4
            | Kind::Inet6
            | Kind::Mac
            | Kind::GeoData => WireShape::String,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WireShape {
    String,
    Bytes,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Double,
    Float,
    Bool,
    /// A string/bytes-like array whose items are never longer than the
    /// given fixed length (date: 8, time: 6).
    FixedLen(usize),
}

impl WireShape {
    /// Field tag `(field_number << 3) | wire_type` for this shape's value
    /// array. `FixedLen` reuses the STRING field number: a one-byte length
    /// prefix under 128 is already a valid single-byte varint, so the
    /// generic length-delimited reader parses it without modification.
    pub(crate) fn field_tag(self) -> u32 {
        match self {
            WireShape::String | WireShape::FixedLen(_) => (2 << 3) + 2,
            WireShape::Int32 => (3 << 3) + 2,
            WireShape::Int64 => (4 << 3) + 2,
            WireShape::Uint32 => (5 << 3) + 2,
            WireShape::Uint64 => (6 << 3) + 2,
            WireShape::Double => (7 << 3) + 2,
            WireShape::Float => (8 << 3) + 2,
            WireShape::Bool => (9 << 3) + 2,
            WireShape::Bytes => (10 << 3) + 2,
        }
    }
}

pub(crate) const KIND_TAG: u32 = 1 << 3;
pub(crate) const NULLS_TAG: u32 = (11 << 3) + 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_discriminant() {
        for k in [
            Kind::String,
            Kind::Int32,
            Kind::Int64,
            Kind::Uint32,
            Kind::Uint64,
            Kind::Double,
            Kind::Float,
            Kind::Bool,
            Kind::Bytes,
            Kind::Date,
            Kind::Time,
            Kind::DateTime,
            Kind::Numeric,
            Kind::Inet4,
            Kind::Inet6,
            Kind::Mac,
            Kind::GeoData,
        ] {
            assert_eq!(Kind::from_u32(k.as_u32()).unwrap(), k);
        }
    }

    #[test]
    fn rejects_reserved_and_out_of_range_values() {
        assert!(Kind::from_u32(0).is_err());
        assert!(Kind::from_u32(11).is_err());
        assert!(Kind::from_u32(20).is_err());
    }

    #[test]
    fn date_and_time_share_the_string_field_tag() {
        assert_eq!(Kind::Date.wire_shape().field_tag(), Kind::String.wire_shape().field_tag());
        assert_eq!(Kind::Time.wire_shape().field_tag(), Kind::String.wire_shape().field_tag());
    }
}
