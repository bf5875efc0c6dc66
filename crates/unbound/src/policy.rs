use dnsgate_dns::DnsResponseCode;

use crate::{
    error::UnboundError,
    pool::{Answer, ResolutionOutcome},
};

/// What to do with a resolution outcome.
#[derive(Debug)]
pub enum Verdict {
    /// Send the answer, which carries `response_code`.
    Accept {
        answer: Answer,
        response_code: DnsResponseCode,
    },
    /// Answer SERVFAIL and report the error.
    Reject(UnboundError),
}

impl Verdict {
    /// Response code the requester ends up with.
    pub fn response_code(&self) -> DnsResponseCode {
        match self {
            Verdict::Accept { response_code, .. } => *response_code,
            Verdict::Reject(_) => DnsResponseCode::ServerFailure,
        }
    }
}

/// Maps engine outcomes to response codes and enforces DNSSEC validation in strict mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailurePolicy {
    strict: bool,
}

impl FailurePolicy {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn evaluate(&self, outcome: ResolutionOutcome) -> Verdict {
        if let Some(e) = outcome.error {
            return Verdict::Reject(UnboundError::Resolve(e));
        }
        let Some(answer) = outcome.answer else {
            return Verdict::Reject(UnboundError::NoAnswer);
        };
        if answer.message.questions().is_empty() {
            return Verdict::Reject(UnboundError::NoQuestion);
        }

        if outcome.bogus {
            let reason = outcome
                .why_bogus
                .unwrap_or_else(|| "answer failed DNSSEC validation".to_string());
            if self.strict {
                return Verdict::Reject(UnboundError::Bogus(reason));
            }
            tracing::debug!("bogus answer not enforced: {}", reason);
        }

        let response_code = answer.message.response_code();
        Verdict::Accept { answer, response_code }
    }
}
