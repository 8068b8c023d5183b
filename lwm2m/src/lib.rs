//! lwm2m_rs - Rust implementation of an LwM2M device-management server
//!
//! Devices register with the server over a datagram request/response
//! transport and expose a tree of Objects, Instances and Resources. The
//! server reads, writes, executes, creates, deletes, discovers and observes
//! nodes of that tree.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `lwm2m-core`: Errors, response codes, paths, the resource tree model,
//!   content formats, link format, observe attributes and object metadata
//! - `lwm2m-tlv`: TLV encoding/decoding
//! - `lwm2m-transport`: Transport contract (wire messages, tokens, endpoints)
//! - `lwm2m-server`: Client registry, registration handling, observations
//!   and request dispatch
//!
//! # Implementation Status
//!
//! ## ✅ 已完成
//! - 资源树模型（Object / ObjectInstance / Resource）
//! - TLV 编码/解码
//! - 客户端注册表（注册、更新、注销、过期清理）
//! - 观察注册表
//! - 请求分发（Read, Discover, Write, WriteAttributes, Execute, Create, Delete, Observe）
//!
//! ## 📋 待实现
//! - JSON 内容格式
//!
//! # Usage
//!
//! ```no_run
//! use lwm2m::server::{DownlinkRequest, Lwm2mServer};
//! use lwm2m::Lwm2mPath;
//! ```

// Re-export core types
pub use lwm2m_core::*;

// Re-export TLV codec
pub mod tlv {
    pub use lwm2m_tlv::*;
}

// Re-export transport contract
pub mod transport {
    pub use lwm2m_transport::*;
}

// Re-export server API
pub mod server {
    pub use lwm2m_server::*;
}
