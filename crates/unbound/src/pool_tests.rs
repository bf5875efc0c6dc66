use std::path::PathBuf;

use dnsgate_dns::{ClassType, DnsQuestion, DnsResponseCode, RecordType};
use dnsgate_resolver::Resolution;

use super::*;
use crate::mock::{self, Call, MockEngine, Scripted, TCP, UDP};

fn question(qname: &str) -> DnsQuestion {
    DnsQuestion::new(mock::name(qname), RecordType::A, ClassType::IN)
}

#[test]
fn test_new_pool_configures_both_contexts() {
    let engine = MockEngine::new();
    let pool = ResolverPool::new(&engine).unwrap();

    assert_eq!(
        engine.calls(UDP),
        vec![
            Call::SetOption("msg-cache-size:".into(), "0".into()),
            Call::SetOption("rrset-cache-size:".into(), "0".into()),
        ]
    );
    assert_eq!(
        engine.calls(TCP),
        vec![
            Call::SetOption("tcp-upstream:".into(), "yes".into()),
            Call::SetOption("msg-cache-size:".into(), "0".into()),
            Call::SetOption("rrset-cache-size:".into(), "0".into()),
        ]
    );
    assert!(!pool.is_strict());
    assert_eq!(pool.options().len(), 2);
}

#[test]
fn test_default_option_failure_is_not_fatal() {
    let engine = MockEngine::new();
    engine.fail_on(None, "msg-cache-size");

    let pool = ResolverPool::new(&engine).unwrap();

    assert!(!pool.options().contains_key("msg-cache-size:"));
    assert_eq!(pool.options().get("rrset-cache-size:").map(String::as_str), Some("0"));
}

#[test]
fn test_context_creation_failure() {
    let engine = MockEngine::new();
    engine.fail_create();

    let err = ResolverPool::new(&engine).err().unwrap();
    assert!(matches!(err, PoolError::CreateContext { transport: Transport::Udp, .. }));
}

#[test]
fn test_tcp_upstream_failure_is_fatal() {
    let engine = MockEngine::new();
    engine.fail_on(Some(TCP), "tcp-upstream");

    let err = ResolverPool::new(&engine).err().unwrap();
    assert!(matches!(err, PoolError::SetOption { transport: Transport::Tcp, .. }));
}

#[test]
fn test_set_option_appends_colon() {
    let engine = MockEngine::new();
    let mut pool = ResolverPool::new(&engine).unwrap();

    pool.set_option("verbosity", "2").unwrap();
    pool.set_option("num-threads:", "4").unwrap();

    for ctx in [UDP, TCP] {
        let calls = engine.calls(ctx);
        assert!(calls.contains(&Call::SetOption("verbosity:".into(), "2".into())));
        assert!(calls.contains(&Call::SetOption("num-threads:".into(), "4".into())));
    }
    assert_eq!(pool.options().get("verbosity:").map(String::as_str), Some("2"));
}

#[test]
fn test_udp_failure_stops_before_tcp() {
    let engine = MockEngine::new();
    let mut pool = ResolverPool::new(&engine).unwrap();
    engine.fail_on(Some(UDP), "bad.conf");

    let err = pool.load_config("/etc/unbound/bad.conf").unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("/etc/unbound/bad.conf"), "{msg}");
    assert!(msg.contains("UDP"), "{msg}");
    assert!(msg.contains("syntax error"), "{msg}");
    assert!(!engine.calls(TCP).iter().any(|c| matches!(c, Call::LoadConfig(_))));
    assert!(pool.config_files().is_empty());
}

#[test]
fn test_tcp_failure_names_tcp_context() {
    let engine = MockEngine::new();
    let mut pool = ResolverPool::new(&engine).unwrap();
    engine.fail_on(Some(TCP), "root.key");

    let err = pool.load_trust_anchor("/var/lib/unbound/root.key").unwrap_err();

    match &err {
        PoolError::LoadTrustAnchor { path, transport, .. } => {
            assert_eq!(path, &PathBuf::from("/var/lib/unbound/root.key"));
            assert_eq!(*transport, Transport::Tcp);
        }
        other => panic!("unexpected error: {other}"),
    }
    // No rollback of the UDP context, and no strict mode either.
    assert!(engine.calls(UDP).contains(&Call::AddTrustAnchor("/var/lib/unbound/root.key".into())));
    assert!(!pool.is_strict());
}

#[test]
fn test_set_option_error_names_option() {
    let engine = MockEngine::new();
    let mut pool = ResolverPool::new(&engine).unwrap();
    engine.fail_on(None, "so-rcvbuf");

    let msg = pool.set_option("so-rcvbuf", "4m").unwrap_err().to_string();
    assert!(msg.contains("so-rcvbuf:"), "{msg}");
    assert!(msg.contains("4m"), "{msg}");
    assert!(msg.contains("UDP context"), "{msg}");
}

#[test]
fn test_trust_anchor_enables_strict_mode() {
    let engine = MockEngine::new();
    let mut pool = ResolverPool::new(&engine).unwrap();

    pool.load_trust_anchor("root.key").unwrap();

    assert!(pool.is_strict());
    for ctx in [UDP, TCP] {
        assert!(engine.calls(ctx).contains(&Call::AddTrustAnchor("root.key".into())));
    }
}

#[test]
fn test_repeated_loads_are_idempotent() {
    let engine = MockEngine::new();
    let mut pool = ResolverPool::new(&engine).unwrap();

    for _ in 0..3 {
        pool.set_option("verbosity", "1").unwrap();
        pool.load_config("unbound.conf").unwrap();
        pool.load_trust_anchor("root.key").unwrap();
    }

    assert_eq!(pool.options().len(), 3);
    assert_eq!(pool.config_files().len(), 1);
    assert_eq!(pool.trust_anchors().len(), 1);
    assert!(pool.is_strict());
}

#[tokio::test]
async fn test_resolve_selects_context_by_transport() {
    let engine = MockEngine::new();
    engine.script(
        "example.org",
        Scripted::Answer(mock::resolution(mock::answer_packet(
            "example.org",
            RecordType::A,
            DnsResponseCode::NoError,
        ))),
    );
    let pool = ResolverPool::new(&engine).unwrap();

    pool.resolve(Transport::Udp, &question("example.org")).await;
    pool.resolve(Transport::Tcp, &question("example.org")).await;
    pool.resolve(Transport::Tcp, &question("example.org")).await;

    assert_eq!(engine.resolve_calls(UDP), 1);
    assert_eq!(engine.resolve_calls(TCP), 2);
}

#[tokio::test]
async fn test_resolve_decodes_answer() {
    let engine = MockEngine::new();
    let resolution = mock::resolution(
        mock::answer_packet("example.org", RecordType::A, DnsResponseCode::NxDomain),
    )
    .bogus("signature expired");
    engine.script("example.org", Scripted::Answer(resolution.clone()));
    let pool = ResolverPool::new(&engine).unwrap();

    let outcome = pool.resolve(Transport::Udp, &question("example.org")).await;

    assert!(outcome.error.is_none());
    let answer = outcome.answer.as_ref().unwrap();
    assert_eq!(answer.raw, resolution.packet);
    assert_eq!(answer.message.questions().len(), 1);
    assert_eq!(answer.message.response_code(), DnsResponseCode::NxDomain);
    assert_eq!(outcome.rtt, resolution.rtt);
    assert!(outcome.bogus);
    assert_eq!(outcome.why_bogus.as_deref(), Some("signature expired"));
}

#[tokio::test]
async fn test_resolve_error_is_servfail() {
    let engine = MockEngine::new();
    engine.script("example.org", Scripted::Error("network unreachable".into()));
    let pool = ResolverPool::new(&engine).unwrap();

    let outcome = pool.resolve(Transport::Tcp, &question("example.org")).await;

    assert!(outcome.answer.is_none());
    assert!(outcome.error.unwrap().to_string().contains("network unreachable"));
}

#[tokio::test]
async fn test_undecodable_answer_is_engine_error() {
    let engine = MockEngine::new();
    engine.script(
        "example.org",
        Scripted::Answer(Resolution::new(Bytes::from_static(&[0, 1, 2]), Duration::from_millis(3))),
    );
    let pool = ResolverPool::new(&engine).unwrap();

    let outcome = pool.resolve(Transport::Udp, &question("example.org")).await;

    assert!(outcome.answer.is_none());
    assert_eq!(outcome.rtt, Duration::from_millis(3));
    assert!(format!("{:#}", outcome.error.unwrap()).contains("malformed answer"));
}

#[test]
fn test_shutdown_destroys_once() {
    let engine = MockEngine::new();
    let pool = ResolverPool::new(&engine).unwrap();

    pool.shutdown();
    pool.shutdown();

    assert!(pool.is_shut_down());
    assert_eq!(engine.destroy_calls(UDP), 1);
    assert_eq!(engine.destroy_calls(TCP), 1);
}

#[test]
fn test_transport_from_request_type() {
    assert_eq!(Transport::from(RequestType::UDP), Transport::Udp);
    assert_eq!(Transport::from(RequestType::TCP), Transport::Tcp);
    assert_eq!(Transport::from(RequestType::DOH), Transport::Tcp);
}
