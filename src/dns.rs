use std::net::IpAddr;

use anyhow::{anyhow, Context, Result};
use hickory_resolver::TokioResolver;

/// Resolve the destination argument to a single IP address.
///
/// Literal IPs pass through without a lookup. Hostnames are resolved
/// once, up front; the first address returned is used for the rest of
/// the run. Failure here aborts before any probing.
pub async fn resolve_destination(host: &str) -> Result<IpAddr> {
	if let Ok(ip) = host.parse::<IpAddr>() {
		return Ok(ip);
	}

	let resolver = TokioResolver::builder_tokio()
		.context("failed to read system resolver configuration")?
		.build();
	let lookup = resolver
		.lookup_ip(host)
		.await
		.with_context(|| format!("failed to resolve '{}'", host))?;
	lookup
		.iter()
		.next()
		.ok_or_else(|| anyhow!("no addresses found for '{}'", host))
}
