use anyhow::{bail, ensure};

use crate::domain_name::DomainName;

/// Cursor over a wire-format message.
///
/// Failed reads leave the cursor where it was.
pub struct DnsMessageReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> DnsMessageReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Move the cursor to an absolute offset. The end of the buffer is a valid target.
    pub fn seek(&mut self, pos: usize) -> anyhow::Result<()> {
        ensure!(pos <= self.buffer.len(), "seek to {} past end of {}-byte message", pos, self.buffer.len());
        self.position = pos;
        Ok(())
    }

    fn take(&mut self, len: usize, what: &str) -> anyhow::Result<&'a [u8]> {
        ensure!(
            len <= self.remaining(),
            "truncated {} at offset {}: {} bytes wanted, {} left",
            what,
            self.position,
            len,
            self.remaining()
        );
        let start = self.position;
        self.position += len;
        Ok(&self.buffer[start..self.position])
    }

    fn take_array<const N: usize>(&mut self, what: &str) -> anyhow::Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> anyhow::Result<u8> {
        self.take_array::<1>("u8").map(|[b]| b)
    }

    pub fn read_u16(&mut self) -> anyhow::Result<u16> {
        self.take_array("u16").map(u16::from_be_bytes)
    }

    pub fn read_u32(&mut self) -> anyhow::Result<u32> {
        self.take_array("u32").map(u32::from_be_bytes)
    }

    pub fn read_bytes(&mut self, length: usize) -> anyhow::Result<&'a [u8]> {
        self.take(length, "raw bytes")
    }

    /// Read a name, following compression pointers.
    ///
    /// Pointers must point strictly backwards, which also rules out loops. The cursor ends up
    /// after the first pointer, or after the terminating zero label when there is none.
    pub fn read_qname(&mut self) -> anyhow::Result<DomainName> {
        let buf = self.buffer;
        let mut labels: Vec<&'a [u8]> = Vec::new();
        let mut pos = self.position;
        let mut resume = None;

        loop {
            let Some(&len) = buf.get(pos) else {
                bail!("name runs past end of message at offset {}", pos);
            };

            match len & 0xC0 {
                0xC0 => {
                    let Some(&low) = buf.get(pos + 1) else {
                        bail!("truncated compression pointer at offset {}", pos);
                    };
                    let target = usize::from(len & 0x3F) << 8 | usize::from(low);
                    ensure!(
                        target < pos,
                        "compression pointer at offset {} does not point backwards (target {})",
                        pos,
                        target
                    );
                    resume.get_or_insert(pos + 2);
                    pos = target;
                }
                0x00 if len == 0 => {
                    resume.get_or_insert(pos + 1);
                    break;
                }
                0x00 => {
                    let start = pos + 1;
                    let end = start + usize::from(len);
                    let Some(label) = buf.get(start..end) else {
                        bail!("label at offset {} runs past end of message", pos);
                    };
                    labels.push(label);
                    pos = end;
                }
                other => bail!("unsupported label type {:#04x} at offset {}", other, pos),
            }
        }

        let name = DomainName::from_labels(labels)?;
        if let Some(next) = resume {
            self.position = next;
        }
        Ok(name)
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }
}

/// Types decoded straight off the wire.
pub trait DnsReadable: Sized {
    fn read_from(reader: &mut DnsMessageReader) -> anyhow::Result<Self>;
}
