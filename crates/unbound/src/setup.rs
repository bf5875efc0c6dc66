use dnsgate_resolver::ResolverEngine;

use crate::{
    config::{Setting, UnboundConfig},
    directive,
    error::ConfigError,
    matcher::DomainMatcher,
    pool::ResolverPool,
    router::Unbound,
};

/// Build the plugin for a server block answering for `server_zones`.
///
/// Zones are validated before any context is created. Settings are applied in order and the
/// first failing one aborts the setup.
pub fn setup<E, S>(engine: &E, config: &UnboundConfig, server_zones: &[S]) -> Result<Unbound<E::Context>, ConfigError>
where
    E: ResolverEngine,
    S: AsRef<str>,
{
    let matcher = DomainMatcher::from_zones(&config.from, &config.except, server_zones)?;

    let mut pool = ResolverPool::new(engine)?;
    for setting in &config.settings {
        match setting {
            Setting::Option { key, value } => pool.set_option(key, value)?,
            Setting::Config { path } => pool.load_config(path)?,
            Setting::Anchor { path } => pool.load_trust_anchor(path)?,
        }
    }

    tracing::info!(
        "unbound answering for {:?}, except {:?}, strict: {}",
        matcher.included().iter().map(|z| z.to_fqdn()).collect::<Vec<_>>(),
        matcher.excluded().iter().map(|z| z.to_fqdn()).collect::<Vec<_>>(),
        pool.is_strict()
    );

    Ok(Unbound::new(matcher, pool))
}

/// Parse the `unbound` directive out of a server block body and build the plugin.
pub fn setup_from_directive<E, S>(engine: &E, block: &str, server_zones: &[S]) -> Result<Unbound<E::Context>, ConfigError>
where
    E: ResolverEngine,
    S: AsRef<str>,
{
    let config = directive::parse(block)?;
    setup(engine, &config, server_zones)
}
