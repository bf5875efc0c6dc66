//! Scriptable resolver engine for tests.

use std::{
    collections::HashMap,
    net::Ipv4Addr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use dnsgate_dns::{
    ClassType, DnsFlags, DnsMessageBuilder, DnsOpcode, DnsQuestion, DnsRecord, DnsRecordData, DnsResponseCode,
    DomainName, Edns, RecordType,
};
use dnsgate_resolver::{Resolution, ResolverContext, ResolverEngine};
use parking_lot::Mutex;

/// Index of the context in creation order. The pool creates UDP first.
pub const UDP: usize = 0;
pub const TCP: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetOption(String, String),
    LoadConfig(PathBuf),
    AddTrustAnchor(PathBuf),
    Resolve(String, RecordType, ClassType),
    Destroy,
}

#[derive(Debug, Clone)]
pub enum Scripted {
    Answer(Resolution),
    Error(String),
}

#[derive(Debug, Default)]
struct Shared {
    created: usize,
    fail_create: bool,
    calls: Vec<(usize, Call)>,
    /// Context index (or any when `None`) and the option key or file name that fails.
    failures: Vec<(Option<usize>, String)>,
    scripts: HashMap<String, Scripted>,
}

#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    shared: Arc<Mutex<Shared>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make configuration calls whose key or path contains `needle` fail, on `ctx` or on both.
    pub fn fail_on(&self, ctx: Option<usize>, needle: &str) {
        self.shared.lock().failures.push((ctx, needle.to_string()));
    }

    pub fn fail_create(&self) {
        self.shared.lock().fail_create = true;
    }

    pub fn script(&self, qname: &str, scripted: Scripted) {
        self.shared.lock().scripts.insert(qname.to_string(), scripted);
    }

    pub fn calls(&self, ctx: usize) -> Vec<Call> {
        self.shared
            .lock()
            .calls
            .iter()
            .filter(|(i, _)| *i == ctx)
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn resolve_calls(&self, ctx: usize) -> usize {
        self.calls(ctx).iter().filter(|c| matches!(c, Call::Resolve(..))).count()
    }

    pub fn destroy_calls(&self, ctx: usize) -> usize {
        self.calls(ctx).iter().filter(|c| **c == Call::Destroy).count()
    }
}

impl ResolverEngine for MockEngine {
    type Context = MockContext;

    fn create_context(&self) -> anyhow::Result<MockContext> {
        let mut shared = self.shared.lock();
        anyhow::ensure!(!shared.fail_create, "out of memory");
        let index = shared.created;
        shared.created += 1;
        Ok(MockContext {
            index,
            shared: self.shared.clone(),
        })
    }
}

#[derive(Debug)]
pub struct MockContext {
    index: usize,
    shared: Arc<Mutex<Shared>>,
}

impl MockContext {
    fn record(&self, call: Call, subject: &str) -> anyhow::Result<()> {
        let mut shared = self.shared.lock();
        shared.calls.push((self.index, call));
        let failing = shared
            .failures
            .iter()
            .any(|(ctx, needle)| ctx.is_none_or(|c| c == self.index) && subject.contains(needle.as_str()));
        anyhow::ensure!(!failing, "syntax error");
        Ok(())
    }
}

#[async_trait]
impl ResolverContext for MockContext {
    fn set_option(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.record(Call::SetOption(key.to_string(), value.to_string()), key)
    }

    fn load_config(&mut self, path: &Path) -> anyhow::Result<()> {
        self.record(Call::LoadConfig(path.to_path_buf()), &path.to_string_lossy())
    }

    fn add_trust_anchor_file(&mut self, path: &Path) -> anyhow::Result<()> {
        self.record(Call::AddTrustAnchor(path.to_path_buf()), &path.to_string_lossy())
    }

    async fn resolve(&self, name: &DomainName, qtype: RecordType, qclass: ClassType) -> anyhow::Result<Resolution> {
        let scripted = {
            let mut shared = self.shared.lock();
            shared
                .calls
                .push((self.index, Call::Resolve(name.to_string(), qtype, qclass)));
            shared.scripts.get(&name.to_ascii_lowercase()).cloned()
        };

        match scripted {
            Some(Scripted::Answer(resolution)) => Ok(resolution),
            Some(Scripted::Error(e)) => Err(anyhow::anyhow!(e)),
            None => anyhow::bail!("no answer scripted for {}", name),
        }
    }

    fn destroy(&self) {
        self.shared.lock().calls.push((self.index, Call::Destroy));
    }
}

pub fn name(s: &str) -> DomainName {
    DomainName::from_ascii(s).unwrap()
}

pub fn a_record(owner: &str, ip: [u8; 4]) -> DnsRecord {
    DnsRecord::new(name(owner), RecordType::A, ClassType::IN, 300, DnsRecordData::Ipv4(Ipv4Addr::from(ip)))
}

pub fn rrsig_record(owner: &str) -> DnsRecord {
    DnsRecord::new(
        name(owner),
        RecordType::RRSIG,
        ClassType::IN,
        300,
        DnsRecordData::Raw(vec![0, 1, 8, 2, 0, 0, 1, 44]),
    )
}

pub fn nsec_record(owner: &str) -> DnsRecord {
    DnsRecord::new(
        name(owner),
        RecordType::NSEC,
        ClassType::IN,
        300,
        DnsRecordData::Raw(vec![0, 0, 6, 0x40, 0, 0, 0, 3]),
    )
}

pub fn dnssec_ok_edns() -> Edns {
    let mut edns = Edns::default();
    edns.set_do_bit(true);
    edns
}

/// Engine style answer with id 0 and the question echoed. Records are added by the caller.
pub fn answer_packet(qname: &str, qtype: RecordType, rcode: DnsResponseCode) -> DnsMessageBuilder {
    DnsMessageBuilder::new()
        .with_flags(DnsFlags::new(true, DnsOpcode::Query, false, false, true, true, false, false))
        .add_question(DnsQuestion::new(name(qname), qtype, ClassType::IN))
        .with_response(rcode)
}

pub fn resolution(packet: DnsMessageBuilder) -> Resolution {
    Resolution::new(packet.build().encode().unwrap(), Duration::from_millis(12))
}

/// Wire query for `qname`/`qtype`, with an OPT record carrying DO when `dnssec_ok` is set.
pub fn query(id: u16, qname: &str, qtype: RecordType, dnssec_ok: Option<bool>) -> Bytes {
    let mut builder = DnsMessageBuilder::new()
        .with_id(id)
        .add_question(DnsQuestion::new(name(qname), qtype, ClassType::IN));
    if let Some(dnssec_ok) = dnssec_ok {
        let mut edns = Edns::default();
        edns.set_do_bit(dnssec_ok);
        builder = builder.with_edns(edns);
    }
    builder.build().encode().unwrap()
}
