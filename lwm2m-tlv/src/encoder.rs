//! TLV encoder

use crate::types::{LengthEncoding, Tlv, TlvContent, TlvHeader};
use bytes::{BufMut, Bytes, BytesMut};
use lwm2m_core::{Lwm2mError, Lwm2mResult};

/// TLV encoder writing entries into a growable buffer
///
/// Output is deterministic: identifiers use one byte when they fit, and the
/// length field uses the smallest of the four available forms.
pub struct TlvEncoder {
    buffer: BytesMut,
}

impl TlvEncoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Create a new encoder with initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Encode a list of entries, in order
    pub fn encode_all(&mut self, entries: &[Tlv]) -> Lwm2mResult<()> {
        for entry in entries {
            self.encode(entry)?;
        }
        Ok(())
    }

    /// Encode one entry, recursing into nested entries
    pub fn encode(&mut self, entry: &Tlv) -> Lwm2mResult<()> {
        match &entry.content {
            TlvContent::Value(value) => {
                if entry.kind.is_container() {
                    return Err(Lwm2mError::InvalidData(format!(
                        "{:?} entry {} cannot hold a value",
                        entry.kind, entry.identifier
                    )));
                }
                self.write_entry(entry, value)
            }
            TlvContent::Children(children) => {
                for child in children {
                    if !entry.kind.accepts_child(child.kind) {
                        return Err(Lwm2mError::InvalidData(format!(
                            "{:?} entry {} cannot contain a {:?} entry",
                            entry.kind, entry.identifier, child.kind
                        )));
                    }
                }
                let mut nested = TlvEncoder::new();
                nested.encode_all(children)?;
                self.write_entry(entry, &nested.buffer)
            }
        }
    }

    fn write_entry(&mut self, entry: &Tlv, payload: &[u8]) -> Lwm2mResult<()> {
        let header = TlvHeader::new(entry.kind, entry.identifier, payload.len())?;
        self.buffer.reserve(1 + header.identifier_width() + header.length.field_width() + payload.len());
        self.buffer.put_u8(header.to_u8());

        if header.wide_identifier {
            self.buffer.put_u16(entry.identifier);
        } else {
            self.buffer.put_u8(entry.identifier as u8);
        }

        let length = payload.len();
        match header.length {
            LengthEncoding::Embedded(_) => {}
            LengthEncoding::OneByte => self.buffer.put_u8(length as u8),
            LengthEncoding::TwoBytes => self.buffer.put_u16(length as u16),
            LengthEncoding::ThreeBytes => {
                self.buffer.put_u8((length >> 16) as u8);
                self.buffer.put_u16(length as u16);
            }
        }

        self.buffer.put_slice(payload);
        Ok(())
    }

    /// Get the encoded bytes
    pub fn into_bytes(self) -> Bytes {
        self.buffer.freeze()
    }

    /// Get the encoded bytes as a vector
    pub fn into_vec(self) -> Vec<u8> {
        self.buffer.to_vec()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for TlvEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_resource_value() {
        let mut encoder = TlvEncoder::new();
        encoder.encode(&Tlv::resource_value(14, b"value".to_vec())).unwrap();
        assert_eq!(encoder.into_vec(), vec![0xC5, 0x0E, b'v', b'a', b'l', b'u', b'e']);
    }

    #[test]
    fn test_encode_wide_identifier_and_length_byte() {
        let mut encoder = TlvEncoder::new();
        encoder.encode(&Tlv::resource_value(300, vec![0xAA; 10])).unwrap();
        let bytes = encoder.into_vec();
        assert_eq!(&bytes[..4], &[0xE8, 0x01, 0x2C, 0x0A]);
        assert_eq!(bytes.len(), 4 + 10);
    }

    #[test]
    fn test_encode_three_byte_length() {
        let mut encoder = TlvEncoder::new();
        encoder.encode(&Tlv::resource_value(0, vec![0; 0x10000])).unwrap();
        let bytes = encoder.into_vec();
        assert_eq!(&bytes[..5], &[0xD8, 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_encode_multiple_resource() {
        let entry = Tlv::multiple_resource(
            6,
            vec![
                Tlv::resource_instance(0, vec![0x01]),
                Tlv::resource_instance(1, vec![0x05]),
            ],
        );
        let mut encoder = TlvEncoder::new();
        encoder.encode(&entry).unwrap();
        assert_eq!(encoder.into_vec(), vec![0x86, 0x06, 0x41, 0x00, 0x01, 0x41, 0x01, 0x05]);
    }

    #[test]
    fn test_reject_invalid_nesting() {
        let entry = Tlv::object_instance(0, vec![Tlv::resource_instance(0, vec![1])]);
        assert!(TlvEncoder::new().encode(&entry).is_err());

        let entry = Tlv {
            kind: crate::types::TlvType::ObjectInstance,
            identifier: 0,
            content: TlvContent::Value(vec![1]),
        };
        assert!(TlvEncoder::new().encode(&entry).is_err());
    }
}
