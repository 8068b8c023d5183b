//! TLV entry types
//!
//! Header byte layout:
//!
//! ```text
//!  7 6   5    4 3    2 1 0
//! +---+-----+-----+-------+
//! |typ| id  | len | len   |
//! |   |width|type | value |
//! +---+-----+-----+-------+
//! ```
//!
//! - type: `00` object instance, `01` resource instance, `10` multiple
//!   resource, `11` resource with value
//! - id width: `0` one byte, `1` two bytes
//! - length type: `00` length held in bits 2-0, `01`/`10`/`11` one, two or
//!   three length bytes follow the identifier

use lwm2m_core::{Lwm2mError, Lwm2mResult};

/// Largest length a three-byte length field can carry
pub const MAX_LENGTH: usize = 0xFF_FFFF;

const ID_WIDTH_BIT: u8 = 0b0010_0000;

/// Entry type held in the two high bits of the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TlvType {
    ObjectInstance = 0b00,
    ResourceInstance = 0b01,
    MultipleResource = 0b10,
    ResourceValue = 0b11,
}

impl TlvType {
    /// Get type from the two header bits
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => TlvType::ObjectInstance,
            0b01 => TlvType::ResourceInstance,
            0b10 => TlvType::MultipleResource,
            _ => TlvType::ResourceValue,
        }
    }

    pub fn to_bits(self) -> u8 {
        self as u8
    }

    /// Whether entries of this type hold nested entries instead of a value
    pub fn is_container(self) -> bool {
        matches!(self, TlvType::ObjectInstance | TlvType::MultipleResource)
    }

    /// Whether an entry of type `child` may appear directly inside this one
    pub fn accepts_child(self, child: TlvType) -> bool {
        match self {
            TlvType::ObjectInstance => {
                matches!(child, TlvType::ResourceValue | TlvType::MultipleResource)
            }
            TlvType::MultipleResource => child == TlvType::ResourceInstance,
            TlvType::ResourceInstance | TlvType::ResourceValue => false,
        }
    }
}

/// Length field selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthEncoding {
    /// Length ≤ 7, held in the header's low bits
    Embedded(u8),
    OneByte,
    TwoBytes,
    ThreeBytes,
}

impl LengthEncoding {
    /// Smallest encoding able to carry `length`
    pub fn for_length(length: usize) -> Lwm2mResult<Self> {
        match length {
            0..=7 => Ok(LengthEncoding::Embedded(length as u8)),
            8..=0xFF => Ok(LengthEncoding::OneByte),
            0x100..=0xFFFF => Ok(LengthEncoding::TwoBytes),
            0x1_0000..=MAX_LENGTH => Ok(LengthEncoding::ThreeBytes),
            _ => Err(Lwm2mError::InvalidData(format!(
                "TLV value of {} bytes exceeds the maximum of {}",
                length, MAX_LENGTH
            ))),
        }
    }

    /// Number of explicit length bytes following the identifier
    pub fn field_width(self) -> usize {
        match self {
            LengthEncoding::Embedded(_) => 0,
            LengthEncoding::OneByte => 1,
            LengthEncoding::TwoBytes => 2,
            LengthEncoding::ThreeBytes => 3,
        }
    }

    fn header_bits(self) -> u8 {
        match self {
            LengthEncoding::Embedded(len) => len & 0b111,
            LengthEncoding::OneByte => 0b01 << 3,
            LengthEncoding::TwoBytes => 0b10 << 3,
            LengthEncoding::ThreeBytes => 0b11 << 3,
        }
    }

    fn from_header(header: u8) -> Self {
        match (header >> 3) & 0b11 {
            0b00 => LengthEncoding::Embedded(header & 0b111),
            0b01 => LengthEncoding::OneByte,
            0b10 => LengthEncoding::TwoBytes,
            _ => LengthEncoding::ThreeBytes,
        }
    }
}

/// Decoded header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvHeader {
    pub kind: TlvType,
    pub wide_identifier: bool,
    pub length: LengthEncoding,
}

impl TlvHeader {
    pub fn new(kind: TlvType, identifier: u16, length: usize) -> Lwm2mResult<Self> {
        Ok(Self {
            kind,
            wide_identifier: identifier > 0xFF,
            length: LengthEncoding::for_length(length)?,
        })
    }

    pub fn to_u8(self) -> u8 {
        let mut byte = self.kind.to_bits() << 6;
        if self.wide_identifier {
            byte |= ID_WIDTH_BIT;
        }
        byte | self.length.header_bits()
    }

    pub fn from_u8(byte: u8) -> Self {
        Self {
            kind: TlvType::from_bits(byte >> 6),
            wide_identifier: byte & ID_WIDTH_BIT != 0,
            length: LengthEncoding::from_header(byte),
        }
    }

    pub fn identifier_width(self) -> usize {
        if self.wide_identifier { 2 } else { 1 }
    }
}

/// Payload of an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlvContent {
    /// Value bytes of a leaf entry
    Value(Vec<u8>),
    /// Nested entries of an object instance or multiple resource
    Children(Vec<Tlv>),
}

/// One TLV entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    pub kind: TlvType,
    pub identifier: u16,
    pub content: TlvContent,
}

impl Tlv {
    /// Create a resource entry holding a value
    pub fn resource_value(identifier: u16, value: Vec<u8>) -> Self {
        Self {
            kind: TlvType::ResourceValue,
            identifier,
            content: TlvContent::Value(value),
        }
    }

    /// Create a resource instance entry
    pub fn resource_instance(identifier: u16, value: Vec<u8>) -> Self {
        Self {
            kind: TlvType::ResourceInstance,
            identifier,
            content: TlvContent::Value(value),
        }
    }

    /// Create a multiple resource entry
    pub fn multiple_resource(identifier: u16, instances: Vec<Tlv>) -> Self {
        Self {
            kind: TlvType::MultipleResource,
            identifier,
            content: TlvContent::Children(instances),
        }
    }

    /// Create an object instance entry
    pub fn object_instance(identifier: u16, resources: Vec<Tlv>) -> Self {
        Self {
            kind: TlvType::ObjectInstance,
            identifier,
            content: TlvContent::Children(resources),
        }
    }

    pub fn value(&self) -> Option<&[u8]> {
        match &self.content {
            TlvContent::Value(v) => Some(v),
            TlvContent::Children(_) => None,
        }
    }

    pub fn children(&self) -> Option<&[Tlv]> {
        match &self.content {
            TlvContent::Children(c) => Some(c),
            TlvContent::Value(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_encoding_selection() {
        assert_eq!(LengthEncoding::for_length(0).unwrap(), LengthEncoding::Embedded(0));
        assert_eq!(LengthEncoding::for_length(7).unwrap(), LengthEncoding::Embedded(7));
        assert_eq!(LengthEncoding::for_length(8).unwrap(), LengthEncoding::OneByte);
        assert_eq!(LengthEncoding::for_length(256).unwrap(), LengthEncoding::TwoBytes);
        assert_eq!(LengthEncoding::for_length(0x10000).unwrap(), LengthEncoding::ThreeBytes);
        assert!(LengthEncoding::for_length(MAX_LENGTH + 1).is_err());
    }

    #[test]
    fn test_header_byte() {
        // resource value, 1-byte id, length 5 embedded
        let header = TlvHeader::new(TlvType::ResourceValue, 14, 5).unwrap();
        assert_eq!(header.to_u8(), 0b1100_0101);

        // object instance, 2-byte id, one length byte
        let header = TlvHeader::new(TlvType::ObjectInstance, 300, 20).unwrap();
        assert_eq!(header.to_u8(), 0b0010_1000);

        let parsed = TlvHeader::from_u8(0b1000_1000);
        assert_eq!(parsed.kind, TlvType::MultipleResource);
        assert!(!parsed.wide_identifier);
        assert_eq!(parsed.length, LengthEncoding::OneByte);
    }

    #[test]
    fn test_nesting_rules() {
        assert!(TlvType::ObjectInstance.accepts_child(TlvType::ResourceValue));
        assert!(TlvType::ObjectInstance.accepts_child(TlvType::MultipleResource));
        assert!(!TlvType::ObjectInstance.accepts_child(TlvType::ResourceInstance));
        assert!(TlvType::MultipleResource.accepts_child(TlvType::ResourceInstance));
        assert!(!TlvType::MultipleResource.accepts_child(TlvType::ResourceValue));
        assert!(!TlvType::ResourceValue.accepts_child(TlvType::ResourceInstance));
    }
}
