use std::fmt::{Display, Formatter, Write};
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use anyhow::{bail, ensure};
use idna::AsciiDenyList;

/// A domain name as it appeared on the wire.
///
/// Label bytes and their case are kept exactly. Comparison and hashing ignore ASCII case.
/// The text form is presentation format without the trailing dot: `.` and `\` inside a label are
/// escaped with a backslash, bytes outside printable ASCII as `\DDD`.
#[derive(Debug, Clone)]
pub struct DomainName {
    text: Arc<str>,
    /// Uncompressed wire encoding, terminating zero label included.
    wire: Arc<[u8]>,
}

impl DomainName {
    /// The root name, `.`.
    pub fn root() -> Self {
        Self {
            text: Arc::from("."),
            wire: Arc::from([0u8].as_slice()),
        }
    }

    /// Parse a name in presentation format. A trailing dot is optional.
    ///
    /// Lengths are validated according to RFC 1035. Unicode input is taken byte for byte; use
    /// [`DomainName::from_user`] for IDNA conversion.
    pub fn from_ascii(s: impl AsRef<str>) -> anyhow::Result<Self> {
        let input = s.as_ref().trim();
        if input == "." || input.is_empty() {
            return Ok(Self::root());
        }

        let labels = parse_presentation(input)?;
        Self::from_labels(labels.iter().map(Vec::as_slice))
    }

    /// Build a name from raw labels, leftmost first. No labels gives the root.
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a [u8]>) -> anyhow::Result<Self> {
        let mut wire = Vec::new();
        let mut text = String::new();

        for label in labels {
            ensure!(!label.is_empty(), "empty domain label");
            ensure!(label.len() <= 63, "domain label too long: {} bytes", label.len());
            wire.push(label.len() as u8);
            wire.extend_from_slice(label);
            if !text.is_empty() {
                text.push('.');
            }
            push_escaped(&mut text, label);
        }

        if wire.is_empty() {
            return Ok(Self::root());
        }
        wire.push(0);
        ensure!(wire.len() <= 255, "domain name too long ({} bytes): {}", wire.len(), text);

        Ok(Self {
            text: Arc::from(text),
            wire: Arc::from(wire),
        })
    }

    /// Create a new domain name from a user input string.
    /// This function supports Unicode domain names and performs IDNA conversion.
    pub fn from_user(s: impl AsRef<str>) -> anyhow::Result<Self> {
        let input = s.as_ref().trim();

        if input == "." {
            return Ok(Self::root());
        }

        let name = input.strip_suffix('.').unwrap_or(input);

        let ascii = idna::domain_to_ascii_cow(name.as_bytes(), AsciiDenyList::URL)
            .map_err(|_| anyhow::anyhow!("invalid IDNA domain: {}", input))?;

        Self::from_ascii(&ascii)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Uncompressed wire form.
    pub fn wire(&self) -> &[u8] {
        &self.wire
    }

    pub fn is_root(&self) -> bool {
        self.wire.len() == 1
    }

    /// Absolute form with the trailing dot, e.g. `example.org.`.
    pub fn to_fqdn(&self) -> String {
        if self.is_root() {
            ".".to_string()
        } else {
            format!("{}.", self.text)
        }
    }

    /// Raw labels, leftmost first.
    pub fn labels(&self) -> impl Iterator<Item = &[u8]> {
        let wire = &self.wire[..];
        let mut pos = 0;
        std::iter::from_fn(move || {
            let len = usize::from(*wire.get(pos)?);
            if len == 0 {
                return None;
            }
            let label = wire.get(pos + 1..pos + 1 + len)?;
            pos += 1 + len;
            Some(label)
        })
    }

    /// Whether `self` is equal to `zone` or below it, compared label by label.
    pub fn is_subdomain_of(&self, zone: &DomainName) -> bool {
        let name: Vec<_> = self.labels().collect();
        let zone: Vec<_> = zone.labels().collect();
        zone.len() <= name.len()
            && name
                .iter()
                .rev()
                .zip(zone.iter().rev())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

fn parse_presentation(input: &str) -> anyhow::Result<Vec<Vec<u8>>> {
    let mut labels = Vec::new();
    let mut label = Vec::new();
    let mut bytes = input.bytes();

    while let Some(b) = bytes.next() {
        match b {
            b'.' => {
                ensure!(!label.is_empty(), "empty domain label in: {}", input);
                labels.push(std::mem::take(&mut label));
            }
            b'\\' => match bytes.next() {
                Some(d) if d.is_ascii_digit() => {
                    let (Some(d2), Some(d3)) = (bytes.next(), bytes.next()) else {
                        bail!("truncated \\DDD escape in: {}", input);
                    };
                    ensure!(
                        d2.is_ascii_digit() && d3.is_ascii_digit(),
                        "malformed \\DDD escape in: {}",
                        input
                    );
                    let value = u32::from(d - b'0') * 100 + u32::from(d2 - b'0') * 10 + u32::from(d3 - b'0');
                    let Ok(value) = u8::try_from(value) else {
                        bail!("escape \\{} out of range in: {}", value, input);
                    };
                    label.push(value);
                }
                Some(c) => label.push(c),
                None => bail!("dangling escape in: {}", input),
            },
            _ => label.push(b),
        }
    }
    if !label.is_empty() {
        labels.push(label);
    }

    Ok(labels)
}

fn push_escaped(text: &mut String, label: &[u8]) {
    for &b in label {
        match b {
            b'.' | b'\\' => {
                text.push('\\');
                text.push(char::from(b));
            }
            0x21..=0x7E => text.push(char::from(b)),
            _ => {
                let _ = write!(text, "\\{:03}", b);
            }
        }
    }
}

impl PartialEq for DomainName {
    fn eq(&self, other: &Self) -> bool {
        self.wire.eq_ignore_ascii_case(&other.wire)
    }
}

impl Eq for DomainName {}

impl Hash for DomainName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.wire.iter() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl Deref for DomainName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.text
    }
}

impl Display for DomainName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
