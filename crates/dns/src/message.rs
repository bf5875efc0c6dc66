use std::{
    fmt,
    net::{Ipv4Addr, Ipv6Addr},
};

use bytes::Bytes;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    domain_name::DomainName,
    reader::{DnsMessageReader, DnsReadable},
    writer::{DnsMessageWriter, DnsWritable},
};

/// Largest message we are willing to encode (TCP framing limit).
const MAX_MESSAGE_LEN: usize = u16::MAX as usize;

/// Represents a DNS message.
///
/// OPT pseudo records stay in the additional section, in wire order, so a decoded message
/// re-encodes with the same records it arrived with.
#[derive(Debug, Clone, PartialEq)]
pub struct DnsMessage {
    /// Transaction id
    pub id: u16,
    /// Flags
    pub flags: DnsFlags,
    /// Questions in the DNS message
    pub(crate) questions: Vec<DnsQuestion>,
    /// Answers in the DNS message
    pub(crate) answers: Vec<DnsRecord>,
    /// Authority records in the DNS message
    pub(crate) authority_records: Vec<DnsRecord>,
    /// Additional records in the DNS message, OPT included
    pub(crate) additional_records: Vec<DnsRecord>,
}

impl DnsMessage {
    pub fn new(
        id: u16,
        flags: DnsFlags,
        questions: Vec<DnsQuestion>,
        answers: Vec<DnsRecord>,
        authority_records: Vec<DnsRecord>,
        additional_records: Vec<DnsRecord>,
    ) -> Self {
        Self {
            id,
            flags,
            questions,
            answers,
            authority_records,
            additional_records,
        }
    }

    pub fn decode(data: &[u8]) -> anyhow::Result<Self> {
        let mut reader = DnsMessageReader::new(data);

        let id = reader.read_u16()?;
        let flags = DnsFlags::read_from(&mut reader)?;

        let number_of_questions = reader.read_u16()?; // QDCOUNT
        let number_of_answers = reader.read_u16()?; // ANCOUNT
        let number_of_authority_records = reader.read_u16()?; // NSCOUNT
        let number_of_additional_records = reader.read_u16()?; // ARCOUNT

        let questions = (0..number_of_questions)
            .map(|_| DnsQuestion::read_from(&mut reader))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let answers = read_records(&mut reader, number_of_answers)?;
        let authority_records = read_records(&mut reader, number_of_authority_records)?;
        let additional_records = read_records(&mut reader, number_of_additional_records)?;

        Ok(Self {
            id,
            flags,
            questions,
            answers,
            authority_records,
            additional_records,
        })
    }

    pub fn encode(&self) -> anyhow::Result<Bytes> {
        let mut writer = DnsMessageWriter::new_with_max(MAX_MESSAGE_LEN);

        writer.write_u16(self.id)?;
        self.flags.write_to(&mut writer)?;

        writer.write_u16(self.questions.len() as u16)?; // QDCOUNT
        writer.write_u16(self.answers.len() as u16)?; // ANCOUNT
        writer.write_u16(self.authority_records.len() as u16)?; // NSCOUNT
        writer.write_u16(self.additional_records.len() as u16)?; // ARCOUNT

        for question in &self.questions {
            question.write_to(&mut writer)?;
        }

        for record in self
            .answers
            .iter()
            .chain(&self.authority_records)
            .chain(&self.additional_records)
        {
            record.write_to(&mut writer)?;
        }

        Ok(writer.into_bytes())
    }

    /// Questions
    pub fn questions(&self) -> &[DnsQuestion] {
        &self.questions
    }

    /// Answers
    pub fn answers(&self) -> &[DnsRecord] {
        &self.answers
    }

    /// Authority records
    pub fn authority_records(&self) -> &[DnsRecord] {
        &self.authority_records
    }

    /// Additional records, OPT records included.
    pub fn additional_records(&self) -> &[DnsRecord] {
        &self.additional_records
    }

    /// EDNS data of the first OPT record, if any.
    pub fn edns(&self) -> Option<&Edns> {
        self.additional_records.iter().find_map(|r| match &r.data {
            DnsRecordData::Opt(edns) => Some(edns),
            _ => None,
        })
    }

    fn edns_mut(&mut self) -> Option<&mut Edns> {
        self.additional_records.iter_mut().find_map(|r| match &mut r.data {
            DnsRecordData::Opt(edns) => Some(edns),
            _ => None,
        })
    }

    /// Whether the sender set the DNSSEC OK bit. Requires an OPT record.
    pub fn do_bit(&self) -> bool {
        self.edns().is_some_and(Edns::do_bit)
    }

    /// Remove the first OPT record of the additional section and return it.
    ///
    /// Later OPT records, which a well formed message never carries, are left in place.
    pub fn remove_first_opt(&mut self) -> Option<DnsRecord> {
        let idx = self
            .additional_records
            .iter()
            .position(|r| r.record_type == RecordType::OPT)?;
        Some(self.additional_records.remove(idx))
    }

    /// Put `question` in place of the first question when it asks for the same thing, so the
    /// name is spelled exactly as in `question`. Returns whether it was replaced.
    pub fn restore_question(&mut self, question: &DnsQuestion) -> bool {
        match self.questions.first_mut() {
            Some(first) if first == question => {
                first.qname = question.qname.clone();
                true
            }
            _ => false,
        }
    }

    /// Keep only the answer, authority and additional records for which `keep` returns true.
    pub fn retain_records<F>(&mut self, mut keep: F)
    where
        F: FnMut(&DnsRecord) -> bool,
    {
        self.answers.retain(&mut keep);
        self.authority_records.retain(&mut keep);
        self.additional_records.retain(&mut keep);
    }

    /// Set the response code. Codes above 15 need an OPT record, which is added when missing.
    pub fn set_response_code(&mut self, response_code: DnsResponseCode) {
        let full = response_code.to_u16();
        self.flags.rcode_low = (full & 0x0F) as u8;

        let high = (full >> 4) as u8;
        match self.edns_mut() {
            Some(edns) => edns.extended_rcode = high,
            None if high > 0 => {
                let edns = Edns {
                    extended_rcode: high,
                    ..Edns::default()
                };
                self.additional_records.push(DnsRecord::opt(edns));
            }
            None => {}
        }
    }

    /// Response code, including the extended bits carried by the OPT record.
    pub fn response_code(&self) -> DnsResponseCode {
        let low = self.flags.rcode_low as u16;
        let high = self.edns().map(|e| e.extended_rcode).unwrap_or(0) as u16;
        DnsResponseCode::from((high << 4) | low)
    }
}

fn read_records(reader: &mut DnsMessageReader, count: u16) -> anyhow::Result<Vec<DnsRecord>> {
    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        records.push(DnsRecord::read_from(reader)?);
    }
    Ok(records)
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct DnsFlags {
    /// Query or Response
    pub response: bool,
    /// Opcode
    pub opcode: DnsOpcode,
    /// Authoritative Answer
    pub authorative_answer: bool,
    /// Truncated, indicates that this message was truncated due to length greater than 512 bytes
    pub truncated: bool,
    /// Recursion Desired, indicates that the client desires recursive resolution
    pub recursion_desired: bool,
    /// Recursion Available, indicates that the server supports recursive resolution
    pub recursion_available: bool,
    /// Z flag, reserved for future use, must be zero in all queries and responses
    pub(crate) z: bool,
    /// Authentic Data, indicates that the response is authentic
    pub authentic_data: bool,
    /// Checking Disabled, indicates that the server is not performing DNSSEC validation
    pub checking_disabled: bool,
    /// Lower part of the response code.
    pub(crate) rcode_low: u8,
}

impl DnsFlags {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        response: bool,
        opcode: DnsOpcode,
        authorative_answer: bool,
        truncated: bool,
        recursion_desired: bool,
        recursion_available: bool,
        authentic_data: bool,
        checking_disabled: bool,
    ) -> Self {
        Self {
            response,
            opcode,
            authorative_answer,
            truncated,
            recursion_desired,
            recursion_available,
            z: false,
            authentic_data,
            checking_disabled,
            rcode_low: 0,
        }
    }
}

impl DnsReadable for DnsFlags {
    fn read_from(reader: &mut DnsMessageReader) -> anyhow::Result<Self> {
        let bytes = reader.read_u16()?;
        Ok(Self {
            response: (bytes >> 15) & 0x1 != 0,
            opcode: DnsOpcode::try_from(((bytes >> 11) & 0xF) as u8)?,
            authorative_answer: (bytes >> 10) & 0x1 != 0,
            truncated: (bytes >> 9) & 0x1 != 0,
            recursion_desired: (bytes >> 8) & 0x1 != 0,
            recursion_available: (bytes >> 7) & 0x1 != 0,
            z: (bytes >> 6) & 0x1 != 0,
            authentic_data: (bytes >> 5) & 0x1 != 0,
            checking_disabled: (bytes >> 4) & 0x1 != 0,
            rcode_low: (bytes & 0x0F) as u8,
        })
    }
}

impl DnsWritable for DnsFlags {
    fn write_to(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()> {
        let opcode: u8 = self.opcode.into();
        writer.write_u16(
            ((self.response as u16) << 15)
                | ((opcode as u16) << 11)
                | ((self.authorative_answer as u16) << 10)
                | ((self.truncated as u16) << 9)
                | ((self.recursion_desired as u16) << 8)
                | ((self.recursion_available as u16) << 7)
                | ((self.z as u16) << 6)
                | ((self.authentic_data as u16) << 5)
                | ((self.checking_disabled as u16) << 4)
                | (self.rcode_low & 0x0F) as u16,
        )?;
        Ok(())
    }
}

crate::u16_enum_with_unknown! {
    /// Dns response code
    ///
    /// Based on: https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-6
    pub enum DnsResponseCode {
        /// No error, the request was successful
        NoError = 0,
        /// Format error, the request was malformed
        FormatError = 1,
        /// Server failure, the server encountered an error while processing the request
        ServerFailure = 2,
        /// Non-existent domain, the requested domain does not exist
        NxDomain = 3,
        /// Not Implemented
        NotImp = 4,
        /// Query refused
        Refused = 5,
        /// Name Exists when it should not
        YXDomain = 6,
        /// RR Set Exists when it should not
        YXRRSet = 7,
        /// RR Set that should exist does not
        NXRRSet = 8,
        /// Server Not Authoritative for zone
        NotAuth = 9,
        /// Name not contained in zone
        NotZone = 10,
        /// DSO-TYPE Not Implemented
        DSOTYPENI = 11,
        /// Bad OPT Version
        BADVERS = 16,
        /// Key not recognized
        BADKEY = 17,
        /// Signature out of time window
        BADTIME = 18,
        /// Bad TKEY Mode
        BADMODE = 19,
        /// Duplicate key name
        BADNAME = 20,
        /// Algorithm not supported
        BADALG = 21,
        /// Bad Truncation
        BADTRUNC = 22,
        /// Bad/missing Server Cookie
        BADCOOKIE = 23,
    }
}

impl Default for DnsResponseCode {
    fn default() -> Self {
        Self::NoError
    }
}

impl DnsResponseCode {
    /// Mnemonic used in zone files and logs, e.g. `SERVFAIL`.
    pub fn mnemonic(self) -> Option<&'static str> {
        Some(match self {
            Self::NoError => "NOERROR",
            Self::FormatError => "FORMERR",
            Self::ServerFailure => "SERVFAIL",
            Self::NxDomain => "NXDOMAIN",
            Self::NotImp => "NOTIMP",
            Self::Refused => "REFUSED",
            Self::YXDomain => "YXDOMAIN",
            Self::YXRRSet => "YXRRSET",
            Self::NXRRSet => "NXRRSET",
            Self::NotAuth => "NOTAUTH",
            Self::NotZone => "NOTZONE",
            Self::DSOTYPENI => "DSOTYPENI",
            Self::BADVERS => "BADVERS",
            Self::BADKEY => "BADKEY",
            Self::BADTIME => "BADTIME",
            Self::BADMODE => "BADMODE",
            Self::BADNAME => "BADNAME",
            Self::BADALG => "BADALG",
            Self::BADTRUNC => "BADTRUNC",
            Self::BADCOOKIE => "BADCOOKIE",
            Self::Unknown(_) => return None,
        })
    }
}

impl fmt::Display for DnsResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mnemonic() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.to_u16()),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum DnsOpcode {
    /// Standard query
    #[default]
    Query = 0,
    /// Inverse query, obsolete
    IQuery = 1,
    /// Server status request, obsolete
    Status = 2,
    /// Zone change notification
    Notify = 4,
    /// Dynamic update
    Update = 5,
    /// DNS stateful operations
    Dso = 6,
}

/// Represents a DNS question in a DNS message.
#[derive(Debug, Clone, PartialEq)]
pub struct DnsQuestion {
    /// The domain name being queried
    pub qname: DomainName,
    /// The type of the query (e.g., A, AAAA, CNAME)
    pub qtype: RecordType,
    /// The class of the query (e.g., IN for Internet)
    pub qclass: ClassType,
}

impl DnsQuestion {
    pub fn new(qname: DomainName, qtype: RecordType, qclass: ClassType) -> Self {
        Self { qname, qtype, qclass }
    }
}

impl DnsReadable for DnsQuestion {
    fn read_from(reader: &mut DnsMessageReader) -> anyhow::Result<Self> {
        let qname = reader.read_qname()?;
        let qtype = RecordType::from(reader.read_u16()?);
        let qclass = ClassType::from(reader.read_u16()?);

        Ok(Self { qname, qtype, qclass })
    }
}

impl DnsWritable for DnsQuestion {
    fn write_to(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()> {
        writer.write_qname(&self.qname)?;
        writer.write_u16(self.qtype.to_u16())?;
        writer.write_u16(self.qclass.to_u16())?;
        Ok(())
    }
}

crate::u16_enum_with_unknown! {
    /// DNS record types.
    ///
    /// Based on: https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-4
    pub enum RecordType {
        /// IPv4
        A = 1,
        /// Name server
        NS = 2,
        /// Canonical name
        CNAME = 5,
        /// Start of authority
        SOA = 6,
        /// Null
        NULL = 10,
        /// Pointer (for reverse DNS)
        PTR = 12,
        /// HINFO
        HINFO = 13,
        /// Mail exchange
        MX = 15,
        /// Text strings
        TXT = 16,
        /// for Responsible Person
        RP = 17,
        /// for AFS Data Base location
        AFSDB = 18,
        /// for security signature
        SIG = 24,
        /// for security key
        KEY = 25,
        /// IPv6
        AAAA = 28,
        /// Location Information
        LOC = 29,
        /// Service locator
        SRV = 33,
        /// Naming Authority Pointer
        NAPTR = 35,
        /// Key Exchanger
        KX = 36,
        /// CERT
        CERT = 37,
        /// DNAME
        DNAME = 39,
        /// OPT, only used by additional records (EDNS)
        OPT = 41,
        /// APL
        APL = 42,
        /// Delegation Signer
        DS = 43,
        /// SSH Key Fingerprint
        SSHFP = 44,
        /// IP SEC KEY
        IPSECKEY = 45,
        /// RRSIG
        RRSIG = 46,
        /// NSEC
        NSEC = 47,
        /// DNS KEY
        DNSKEY = 48,
        /// DHCID
        DHCID = 49,
        /// NSEC3
        NSEC3 = 50,
        /// NSEC3PARAM
        NSEC3PARAM = 51,
        /// TLSA
        TLSA = 52,
        /// S/MIME cert association
        SMIMEA = 53,
        /// Host Identity Protocol
        HIP = 55,
        /// Child DS
        CDS = 59,
        /// DNSKEY(s) the Child wants reflected in DS
        CDNSKEY = 60,
        /// OpenPGP Key
        OPENPGPKEY = 61,
        /// Child-To-Parent Synchronization
        CSYNC = 62,
        /// Message Digest Over Zone Data
        ZONEMD = 63,
        /// General-purpose service binding
        SVCB = 64,
        /// SVCB-compatible type for use with HTTP
        HTTPS = 65,
        /// SPF
        SPF = 99,
        /// an EUI-48 address
        EUI48 = 108,
        /// an EUI-64 address
        EUI64 = 109,
        /// Transaction Key
        TKEY = 249,
        /// Transaction Signature
        TSIG = 250,
        /// Incremental transfer
        IXFR = 251,
        /// transfer of an entire zone
        AXFR = 252,
        /// All records
        ANY = 255,
        /// URI
        URI = 256,
        /// Certification Authority Restriction
        CAA = 257,
    }
}

impl RecordType {
    /// Types that only carry DNSSEC validation material: signatures and authenticated denial.
    pub fn is_dnssec_only(self) -> bool {
        matches!(self, Self::RRSIG | Self::SIG | Self::NSEC | Self::NSEC3)
    }
}

crate::u16_enum_with_unknown! {
    /// DNS class types.
    pub enum ClassType {
        /// Internet
        IN = 1,
        /// Chaosnet
        CH = 3,
        /// Hesoid (MIT Athena)
        HS = 4,
        /// None (dynamic update)
        NONE = 254,
        /// Any
        ANY = 255,
    }
}

/// Associated data for a DNS record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsRecordData {
    Raw(Vec<u8>),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    DomainName(DomainName),

    SOA {
        /// Primary nameserver.
        mname: DomainName,
        /// Contact email
        rname: DomainName,
        /// Serial
        serial: u32,
        /// Refresh
        refresh: u32,
        /// Retry
        retry: u32,
        /// Expire
        expire: u32,
        /// Minimum
        minimum: u32,
    },
    MX {
        priority: u16,
        host: DomainName,
    },
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: DomainName,
    },
    /// EDNS pseudo record.
    Opt(Edns),
}

impl DnsRecordData {
    /// Write the DNS record data to the DNS message.
    pub fn write(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()> {
        match self {
            DnsRecordData::Raw(data) => writer.write_bytes(data),
            DnsRecordData::Ipv4(addr) => writer.write_bytes(&addr.octets()),
            DnsRecordData::Ipv6(addr) => writer.write_bytes(&addr.octets()),
            DnsRecordData::DomainName(name) => writer.write_qname(name),
            DnsRecordData::SOA {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => {
                writer.write_qname(mname)?;
                writer.write_qname(rname)?;
                writer.write_u32(*serial)?;
                writer.write_u32(*refresh)?;
                writer.write_u32(*retry)?;
                writer.write_u32(*expire)?;
                writer.write_u32(*minimum)
            }
            DnsRecordData::MX { priority, host } => {
                writer.write_u16(*priority)?;
                writer.write_qname(host)
            }
            DnsRecordData::SRV {
                priority,
                weight,
                port,
                target,
            } => {
                writer.write_u16(*priority)?;
                writer.write_u16(*weight)?;
                writer.write_u16(*port)?;
                writer.write_qname(target)
            }
            DnsRecordData::Opt(edns) => {
                for option in &edns.options {
                    writer.write_u16(option.code)?;
                    writer.write_u16(option.data.len() as u16)?;
                    writer.write_bytes(&option.data)?;
                }
                Ok(())
            }
        }
    }

    /// Decode record data based on the provided `record_type`.
    ///
    /// Types without a typed representation, and typed ones with an unexpected length, are kept raw.
    pub fn read_from_record_type(
        reader: &mut DnsMessageReader,
        record_type: RecordType,
        data_length: usize,
    ) -> anyhow::Result<DnsRecordData> {
        Ok(match record_type {
            RecordType::CNAME | RecordType::PTR | RecordType::NS | RecordType::DNAME if data_length > 0 => {
                DnsRecordData::DomainName(reader.read_qname()?)
            }
            RecordType::A if data_length == 4 => {
                let raw = reader.read_bytes(4)?;
                DnsRecordData::Ipv4(Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3]))
            }
            RecordType::AAAA if data_length == 16 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(reader.read_bytes(16)?);
                DnsRecordData::Ipv6(Ipv6Addr::from(octets))
            }
            RecordType::SOA if data_length > 0 => DnsRecordData::SOA {
                mname: reader.read_qname()?,
                rname: reader.read_qname()?,
                serial: reader.read_u32()?,
                refresh: reader.read_u32()?,
                retry: reader.read_u32()?,
                expire: reader.read_u32()?,
                minimum: reader.read_u32()?,
            },
            RecordType::MX if data_length > 0 => DnsRecordData::MX {
                priority: reader.read_u16()?,
                host: reader.read_qname()?,
            },
            RecordType::SRV if data_length > 0 => DnsRecordData::SRV {
                priority: reader.read_u16()?,
                weight: reader.read_u16()?,
                port: reader.read_u16()?,
                target: reader.read_qname()?,
            },
            _ => DnsRecordData::Raw(reader.read_bytes(data_length)?.to_vec()),
        })
    }
}

/// Represents a DNS record in a DNS message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    pub name: DomainName,
    pub record_type: RecordType,
    pub class: ClassType,
    pub ttl: u32,
    pub data: DnsRecordData,
}

impl DnsRecord {
    pub fn new(name: DomainName, record_type: RecordType, class: ClassType, ttl: u32, data: DnsRecordData) -> Self {
        Self {
            name,
            record_type,
            class,
            ttl,
            data,
        }
    }

    /// OPT pseudo record carrying `edns`. Class and TTL mirror the EDNS header fields.
    pub fn opt(edns: Edns) -> Self {
        Self {
            name: DomainName::root(),
            record_type: RecordType::OPT,
            class: ClassType::from(edns.udp_payload_size),
            ttl: edns.packed_ttl(),
            data: DnsRecordData::Opt(edns),
        }
    }

    /// Get the name of the DNS record.
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Get the type of the DNS record.
    pub fn record_type(&self) -> RecordType {
        self.record_type
    }
    /// Get the class of the DNS record.
    pub fn class(&self) -> ClassType {
        self.class
    }
    /// Get the TTL (Time to Live) of the DNS record.
    pub fn ttl(&self) -> u32 {
        self.ttl
    }
    /// Get the data of the DNS record.
    pub fn data(&self) -> &DnsRecordData {
        &self.data
    }
}

impl DnsReadable for DnsRecord {
    fn read_from(reader: &mut DnsMessageReader) -> anyhow::Result<Self> {
        let name = reader.read_qname()?;
        let record_type = RecordType::from(reader.read_u16()?);
        let class = reader.read_u16()?;
        let ttl = reader.read_u32()?;
        let data_length = reader.read_u16()? as usize;

        anyhow::ensure!(
            data_length <= reader.remaining(),
            "record data overruns message: rdlen={} remaining={}",
            data_length,
            reader.remaining()
        );
        let end = reader.position() + data_length;

        let data = if record_type == RecordType::OPT {
            DnsRecordData::Opt(Edns::read_rdata(reader, class, ttl, end)?)
        } else {
            DnsRecordData::read_from_record_type(reader, record_type, data_length)?
        };

        anyhow::ensure!(
            reader.position() <= end,
            "{:?} record data longer than rdlen {}",
            record_type,
            data_length
        );
        reader.seek(end)?;

        Ok(Self {
            name,
            record_type,
            class: ClassType::from(class),
            ttl,
            data,
        })
    }
}

impl DnsWritable for DnsRecord {
    fn write_to(&self, writer: &mut DnsMessageWriter) -> anyhow::Result<()> {
        writer.write_qname(&self.name)?;
        writer.write_u16(self.record_type.to_u16())?;

        match &self.data {
            DnsRecordData::Opt(edns) => {
                writer.write_u16(edns.udp_payload_size)?;
                writer.write_u32(edns.packed_ttl())?;
            }
            _ => {
                writer.write_u16(self.class.to_u16())?;
                writer.write_u32(self.ttl)?;
            }
        }

        let rdlen_pos = writer.position();

        // Reserve rdlen so we can go back once we know the size.
        writer.write_u16(0)?;

        let before = writer.position();
        self.data.write(writer)?;
        let rdlen = (writer.position() - before) as u16;

        writer.overwrite_bytes(rdlen_pos, &rdlen.to_be_bytes())?;

        Ok(())
    }
}

/// EDNS (Extension Mechanisms for DNS) information carried by an OPT record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edns {
    /// Max UDP payload size sender can handle
    pub udp_payload_size: u16,
    /// High bits of RCODE (ttl[31:24])
    extended_rcode: u8,
    /// EDNS version - must be 0.
    pub version: u8,
    /// Z flags
    z_flags: u16,
    /// Edns options
    pub options: Vec<EdnsOption>,
}

impl Default for Edns {
    fn default() -> Self {
        Self {
            udp_payload_size: 4096,
            extended_rcode: 0,
            version: 0,
            z_flags: 0,
            options: vec![],
        }
    }
}

impl Edns {
    /// Get the do bit
    pub fn do_bit(&self) -> bool {
        self.z_flags & 0x8000 != 0
    }

    /// Set the do bit
    pub fn set_do_bit(&mut self, v: bool) {
        if v {
            self.z_flags |= 0x8000;
        } else {
            self.z_flags &= !0x8000
        }
    }

    /// High bits of the response code.
    pub fn extended_rcode(&self) -> u8 {
        self.extended_rcode
    }

    /// TTL field of the OPT record: ext_rcode | version | z_flags
    fn packed_ttl(&self) -> u32 {
        ((self.extended_rcode as u32) << 24) | ((self.version as u32) << 16) | self.z_flags as u32
    }

    fn read_rdata(reader: &mut DnsMessageReader, class: u16, ttl: u32, end: usize) -> anyhow::Result<Self> {
        let mut options = Vec::new();

        while reader.position() < end {
            let code = reader.read_u16()?;
            let len = reader.read_u16()? as usize;
            anyhow::ensure!(
                reader.position() + len <= end,
                "EDNS option {} overruns OPT record",
                code
            );
            options.push(EdnsOption {
                code,
                data: reader.read_bytes(len)?.to_vec(),
            });
        }

        Ok(Self {
            udp_payload_size: class,
            extended_rcode: ((ttl >> 24) & 0xFF) as u8,
            version: ((ttl >> 16) & 0xFF) as u8,
            z_flags: (ttl & 0xFFFF) as u16,
            options,
        })
    }
}

/// EDNS option, kept as opaque code and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdnsOption {
    /// EDNS option code
    pub code: u16,
    /// EDNS option data
    pub data: Vec<u8>,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod message_tests;
