use dnsgate_dns::DomainName;

use crate::error::ConfigError;

/// Decides which query names the plugin answers.
///
/// A name is in scope when it is equal to or below one of the `included` zones and not equal
/// to or below any of the `excluded` zones. Exclusion always wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainMatcher {
    included: Vec<DomainName>,
    excluded: Vec<DomainName>,
}

impl DomainMatcher {
    pub fn new(included: Vec<DomainName>, excluded: Vec<DomainName>) -> Self {
        Self { included, excluded }
    }

    /// Build a matcher from zones as written in the configuration.
    ///
    /// When `from` is empty the server's own zones are used instead.
    pub fn from_zones<F, X, Z>(from: &[F], except: &[X], server_zones: &[Z]) -> Result<Self, ConfigError>
    where
        F: AsRef<str>,
        X: AsRef<str>,
        Z: AsRef<str>,
    {
        let included = if from.is_empty() {
            normalize_zones("from", server_zones)?
        } else {
            normalize_zones("from", from)?
        };
        let excluded = normalize_zones("except", except)?;

        Ok(Self::new(included, excluded))
    }

    pub fn in_scope(&self, name: &DomainName) -> bool {
        if !self.included.iter().any(|zone| name.is_subdomain_of(zone)) {
            return false;
        }
        !self.excluded.iter().any(|zone| name.is_subdomain_of(zone))
    }

    pub fn included(&self) -> &[DomainName] {
        &self.included
    }

    pub fn excluded(&self) -> &[DomainName] {
        &self.excluded
    }
}

fn normalize_zones<S: AsRef<str>>(field: &'static str, zones: &[S]) -> Result<Vec<DomainName>, ConfigError> {
    zones.iter().map(|z| normalize_zone(field, z.as_ref())).collect()
}

/// Normalize a zone as written in a server block key or plugin argument.
///
/// Accepts `example.org`, `example.org.`, `example.org:53` and `dns://example.org:53`.
pub fn normalize_zone(field: &'static str, value: &str) -> Result<DomainName, ConfigError> {
    let invalid = || ConfigError::InvalidZone {
        field,
        value: value.to_string(),
    };

    let host = value.trim();
    let host = host.strip_prefix("dns://").unwrap_or(host);
    let host = match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    };

    if host.is_empty() || host.contains(['/', ':', ' ']) {
        return Err(invalid());
    }

    DomainName::from_user(host).map_err(|_| invalid())
}
