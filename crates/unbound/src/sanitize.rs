use bytes::Bytes;
use dnsgate_dns::{DnsMessage, DnsQuestion, RecordType, helpers::readdress_answer};

use crate::pool::Answer;

/// Prepare an engine answer for the requester of `question`.
///
/// The engine always asks with DNSSEC OK, so its answers carry an OPT record and signatures.
/// A requester that did not set DO gets the answer without the first OPT record and without
/// DNSSEC-only records, except the ones it asked for by type. A requester that set DO gets the
/// engine's bytes as they are. Either way the answer carries the requester's transaction id and
/// its spelling of the question name.
pub fn sanitize(answer: Answer, question: &DnsQuestion, query_id: u16, dnssec_ok: bool) -> anyhow::Result<Bytes> {
    if dnssec_ok {
        return readdress_answer(&answer.raw, query_id, &question.qname);
    }

    let mut message = answer.message;
    strip_dnssec(&mut message, question.qtype);
    message.restore_question(question);
    message.id = query_id;
    message.encode()
}

/// Remove the first OPT record and the DNSSEC-only records not matching `qtype`.
pub fn strip_dnssec(message: &mut DnsMessage, qtype: RecordType) {
    message.remove_first_opt();
    message.retain_records(|r| !r.record_type.is_dnssec_only() || r.record_type == qtype);
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod sanitize_tests;
