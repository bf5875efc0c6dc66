//! Metrics emitted by the unbound plugin, recorded through the `metrics` facade.
//!
//! Installing an exporter is left to the application.

use std::time::Duration;

use dnsgate_dns::DnsResponseCode;
use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;

/// Time spent resolving a query, per server.
pub const REQUEST_DURATION_SECONDS: &str = "unbound_request_duration_seconds";
/// Answered queries, per server and response code.
pub const RESPONSE_RCODE_COUNT_TOTAL: &str = "unbound_response_rcode_count_total";
/// Answers that failed DNSSEC validation, enforced or not.
pub const BOGUS_TOTAL: &str = "unbound_bogus_total";

static DESCRIBED: OnceCell<()> = OnceCell::new();

/// Register metric descriptions with the installed recorder. Only the first call has an effect.
pub fn describe() {
    DESCRIBED.get_or_init(|| {
        describe_histogram!(
            REQUEST_DURATION_SECONDS,
            Unit::Seconds,
            "Histogram of the time each request took."
        );
        describe_counter!(
            RESPONSE_RCODE_COUNT_TOTAL,
            Unit::Count,
            "Counter of rcodes made per request."
        );
        describe_counter!(
            BOGUS_TOTAL,
            Unit::Count,
            "Counter of answers that failed DNSSEC validation."
        );
    });
}

/// Record a resolved query.
#[inline]
pub fn record_request(server: &str, response_code: DnsResponseCode, rtt: Duration) {
    counter!(
        RESPONSE_RCODE_COUNT_TOTAL,
        "server" => server.to_string(),
        "rcode" => response_code.to_string()
    )
    .increment(1);
    histogram!(REQUEST_DURATION_SECONDS, "server" => server.to_string()).record(rtt.as_secs_f64());
}

/// Record a bogus answer.
#[inline]
pub fn record_bogus(server: &str) {
    counter!(BOGUS_TOTAL, "server" => server.to_string()).increment(1);
}
