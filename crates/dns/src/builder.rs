use super::message::{DnsFlags, DnsMessage, DnsQuestion, DnsRecord, DnsResponseCode, Edns};

/// Assembles a [`DnsMessage`] section by section.
///
/// Starts out as a recursive query with id 0 and empty sections.
#[derive(Debug, Clone)]
pub struct DnsMessageBuilder {
    message: DnsMessage,
}

impl Default for DnsMessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsMessageBuilder {
    pub fn new() -> Self {
        let flags = DnsFlags {
            recursion_desired: true,
            ..Default::default()
        };
        Self {
            message: DnsMessage::new(0, flags, Vec::new(), Vec::new(), Vec::new(), Vec::new()),
        }
    }

    pub fn with_id(mut self, id: u16) -> Self {
        self.message.id = id;
        self
    }

    /// Replace the flags wholesale. A response code set earlier is kept.
    pub fn with_flags(mut self, flags: DnsFlags) -> Self {
        let rcode_low = self.message.flags.rcode_low;
        self.message.flags = DnsFlags { rcode_low, ..flags };
        self
    }

    pub fn with_questions(mut self, questions: Vec<DnsQuestion>) -> Self {
        self.message.questions = questions;
        self
    }

    pub fn add_question(mut self, question: DnsQuestion) -> Self {
        self.message.questions.push(question);
        self
    }

    pub fn add_answer(mut self, answer: DnsRecord) -> Self {
        self.message.answers.push(answer);
        self
    }

    pub fn add_authority_record(mut self, record: DnsRecord) -> Self {
        self.message.authority_records.push(record);
        self
    }

    pub fn add_additional_record(mut self, record: DnsRecord) -> Self {
        self.message.additional_records.push(record);
        self
    }

    /// Append an OPT record carrying `edns` to the additional section.
    pub fn with_edns(self, edns: Edns) -> Self {
        self.add_additional_record(DnsRecord::opt(edns))
    }

    /// Turn the message into a response carrying `response_code`.
    ///
    /// Extended codes land in the OPT record, which is created when missing.
    pub fn with_response(mut self, response_code: DnsResponseCode) -> Self {
        self.message.flags.response = true;
        self.message.set_response_code(response_code);
        self
    }

    pub fn build(self) -> DnsMessage {
        self.message
    }
}
