//! TLV decoder

use crate::types::{LengthEncoding, Tlv, TlvContent, TlvHeader, TlvType};
use lwm2m_core::{Lwm2mError, Lwm2mResult};

/// TLV decoder reading entries from a byte slice
///
/// Every declared length is checked against the bytes actually remaining,
/// and nested entries are checked against the type of their parent, so a
/// resource instance outside a multiple resource is rejected.
pub struct TlvDecoder<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> TlvDecoder<'a> {
    /// Create a new decoder
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Decode a whole top-level payload
    pub fn decode(buffer: &'a [u8]) -> Lwm2mResult<Vec<Tlv>> {
        let mut decoder = Self::new(buffer);
        let entries = decoder.decode_all()?;
        for entry in &entries {
            if entry.kind == TlvType::ResourceInstance {
                return Err(Lwm2mError::malformed(format!(
                    "resource instance {} outside of a multiple resource",
                    entry.identifier
                )));
            }
        }
        Ok(entries)
    }

    /// Decode entries until the buffer is exhausted
    pub fn decode_all(&mut self) -> Lwm2mResult<Vec<Tlv>> {
        self.decode_children_of(None)
    }

    /// Decode the next entry
    pub fn decode_entry(&mut self) -> Lwm2mResult<Tlv> {
        self.decode_entry_in(None)
    }

    fn decode_children_of(&mut self, parent: Option<(TlvType, u16)>) -> Lwm2mResult<Vec<Tlv>> {
        let mut entries = Vec::new();
        while self.remaining() > 0 {
            entries.push(self.decode_entry_in(parent)?);
        }
        Ok(entries)
    }

    /// Decode the next entry, checking its type against the parent container
    /// before looking at its contents
    fn decode_entry_in(&mut self, parent: Option<(TlvType, u16)>) -> Lwm2mResult<Tlv> {
        let start = self.position;
        let header = TlvHeader::from_u8(self.read_byte()?);
        if let Some((parent_kind, parent_id)) = parent {
            if !parent_kind.accepts_child(header.kind) {
                return Err(Lwm2mError::malformed(format!(
                    "{:?} {} cannot contain {:?} at offset {}",
                    parent_kind, parent_id, header.kind, start
                )));
            }
        }

        let identifier = if header.wide_identifier {
            let bytes = self.read_bytes(2).map_err(|_| {
                Lwm2mError::malformed(format!("entry at offset {} declares a 2-byte identifier past the end", start))
            })?;
            u16::from_be_bytes([bytes[0], bytes[1]])
        } else {
            u16::from(self.read_byte()?)
        };

        let length = match header.length {
            LengthEncoding::Embedded(len) => usize::from(len),
            LengthEncoding::OneByte => usize::from(self.read_byte()?),
            LengthEncoding::TwoBytes => {
                let bytes = self.read_bytes(2)?;
                usize::from(u16::from_be_bytes([bytes[0], bytes[1]]))
            }
            LengthEncoding::ThreeBytes => {
                let bytes = self.read_bytes(3)?;
                (usize::from(bytes[0]) << 16) | (usize::from(bytes[1]) << 8) | usize::from(bytes[2])
            }
        };

        if length > self.remaining() {
            return Err(Lwm2mError::malformed(format!(
                "entry {} declares {} bytes but only {} remain",
                identifier,
                length,
                self.remaining()
            )));
        }
        let payload = self.read_bytes(length)?;

        let content = if header.kind.is_container() {
            let children = TlvDecoder::new(payload).decode_children_of(Some((header.kind, identifier)))?;
            TlvContent::Children(children)
        } else {
            TlvContent::Value(payload.to_vec())
        };

        Ok(Tlv {
            kind: header.kind,
            identifier,
            content,
        })
    }

    fn read_byte(&mut self) -> Lwm2mResult<u8> {
        let byte = *self.buffer.get(self.position).ok_or_else(|| {
            Lwm2mError::malformed(format!("unexpected end of TLV data at offset {}", self.position))
        })?;
        self.position += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, len: usize) -> Lwm2mResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(Lwm2mError::malformed(format!(
                "need {} bytes at offset {}, only {} remain",
                len,
                self.position,
                self.remaining()
            )));
        }
        let bytes = &self.buffer[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    /// Get remaining bytes count
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Get current position
    pub fn position(&self) -> usize {
        self.position
    }
}
