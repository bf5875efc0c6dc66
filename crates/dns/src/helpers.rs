use bytes::{Bytes, BytesMut};

use crate::domain_name::DomainName;

/// Returns a copy of an answer in wire form, addressed back to the query it answers.
///
/// The transaction id is replaced. When the first question name equals `qname` ignoring ASCII
/// case, its bytes are replaced by `qname` so the requester sees its own spelling. Every other
/// byte is left untouched, so an answer that was not decoded keeps its exact encoding.
pub fn readdress_answer(data: &[u8], transaction_id: u16, qname: &DomainName) -> anyhow::Result<Bytes> {
    anyhow::ensure!(data.len() >= 12, "dns message too short: {} bytes", data.len());
    let mut bytes = BytesMut::from(data);
    bytes[..2].copy_from_slice(&transaction_id.to_be_bytes());

    let questions = u16::from_be_bytes([data[4], data[5]]);
    let wire = qname.wire();
    if questions > 0 {
        // The first name of a message can not be compressed.
        if let Some(echoed) = bytes.get_mut(12..12 + wire.len()) {
            if echoed.eq_ignore_ascii_case(wire) {
                echoed.copy_from_slice(wire);
            }
        }
    }

    Ok(bytes.freeze())
}
