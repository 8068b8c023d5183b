//! Translation of downlink operations into wire requests

use super::request::DownlinkRequest;
use crate::content;
use crate::registry::Client;
use lwm2m_core::{ContentFormat, Lwm2mNode, Lwm2mResult};
use lwm2m_tlv::encode_node;
use lwm2m_transport::{Method, Token, WireRequest};

/// Build the wire request for `request` addressed at `client`
///
/// # Errors
///
/// Returns `Lwm2mError::InvalidData` if the operation does not fit its
/// target path or its payload cannot be encoded in the requested format.
pub fn build_wire_request(request: &DownlinkRequest, client: &Client, token: Token) -> Lwm2mResult<WireRequest> {
    request.validate()?;
    let uri_path = request.path().with_root(&client.root_path);
    let method = match request {
        DownlinkRequest::Read { .. } | DownlinkRequest::Discover { .. } | DownlinkRequest::Observe { .. } => {
            Method::Get
        }
        DownlinkRequest::Write { replace: true, .. } | DownlinkRequest::WriteAttributes { .. } => Method::Put,
        DownlinkRequest::Write { replace: false, .. }
        | DownlinkRequest::Execute { .. }
        | DownlinkRequest::Create { .. } => Method::Post,
        DownlinkRequest::Delete { .. } => Method::Delete,
    };
    let mut wire = WireRequest::new(token, method, client.address, uri_path);

    match request {
        DownlinkRequest::Read { format, .. } => wire.accept = *format,
        DownlinkRequest::Discover { .. } => wire.accept = Some(ContentFormat::Link),
        DownlinkRequest::Observe { format, .. } => {
            wire.accept = *format;
            wire.observe = true;
        }
        DownlinkRequest::Write { node, format, .. } => {
            wire.content_format = Some(*format);
            wire.payload = content::encode(node, *format)?;
        }
        DownlinkRequest::WriteAttributes { attributes, .. } => {
            wire.uri_query = attributes.to_query_params();
        }
        DownlinkRequest::Execute { arguments, .. } => {
            if let Some(arguments) = arguments {
                wire.content_format = Some(ContentFormat::Text);
                wire.payload = arguments.clone().into_bytes();
            }
        }
        DownlinkRequest::Create { resources, format, .. } => {
            wire.content_format = Some(*format);
            wire.payload = match format {
                ContentFormat::Tlv => {
                    let mut payload = Vec::new();
                    for resource in resources {
                        payload.extend(encode_node(&Lwm2mNode::Resource(resource.clone()))?);
                    }
                    payload
                }
                other => match resources.as_slice() {
                    [resource] => content::encode(&Lwm2mNode::Resource(resource.clone()), *other)?,
                    _ => {
                        return Err(lwm2m_core::Lwm2mError::InvalidData(format!(
                            "{} payload can only carry one resource",
                            other
                        )));
                    }
                },
            };
        }
        DownlinkRequest::Delete { .. } => {}
    }
    Ok(wire)
}
