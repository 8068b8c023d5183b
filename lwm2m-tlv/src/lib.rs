//! TLV processing for the LwM2M resource tree
//!
//! The codec is split in two layers:
//!
//! - the raw layer ([`TlvEncoder`], [`TlvDecoder`], [`Tlv`]) reads and writes
//!   entries (header byte, identifier, length, value or nested entries) and
//!   enforces the structural rules of the format;
//! - the node layer ([`encode_node`], [`decode_node`]) maps entries to and
//!   from [`lwm2m_core::Lwm2mNode`] values, typing leaf values with the
//!   object model since TLV carries no value type on the wire.

pub mod types;
pub mod encoder;
pub mod decoder;
pub mod value;
pub mod node;

pub use types::{LengthEncoding, Tlv, TlvContent, TlvType};
pub use encoder::TlvEncoder;
pub use decoder::TlvDecoder;
pub use node::{decode_node, encode_node};
