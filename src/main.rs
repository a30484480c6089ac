mod cli;
mod cluster;
mod dns;
mod orchestrate;
mod probe;
mod report;
mod resolve;

use std::sync::Arc;

use clap::Parser;

use crate::cli::Cli;
use crate::cluster::{KubeClusterClient, NoCluster};
use crate::orchestrate::RunOptions;
use crate::probe::TracerouteProber;
use crate::resolve::ResolveError;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	if let Err(err) = run(cli).await {
		eprintln!("error: {:#}", err);
		std::process::exit(exit_code(&err));
	}
}

/// An explicit resolution failure exits 2; anything unexpected exits 1.
fn exit_code(err: &anyhow::Error) -> i32 {
	match err.downcast_ref::<ResolveError>() {
		Some(ResolveError::ServiceNotFound) => 2,
		_ => 1,
	}
}

async fn run(cli: Cli) -> anyhow::Result<()> {
	let destination = dns::resolve_destination(&cli.destination).await?;

	let opts = RunOptions {
		destination,
		proto: cli.proto,
		port: cli.port,
		hop_timeout_secs: cli.hop_timeout,
		namespace: cli.namespace,
		service_hint: cli.service,
		auto: cli.auto,
		recurse: cli.recurse,
		concurrency: cli.concurrency,
	};

	let prober = Arc::new(TracerouteProber);
	if opts.wants_service_context() {
		let client = KubeClusterClient::connect(cli.kubeconfig.as_deref()).await?;
		orchestrate::run(&client, prober, &opts).await?;
	} else {
		// No service context requested: only the primary probe runs and
		// no cluster client is needed.
		orchestrate::run(&NoCluster, prober, &opts).await?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use anyhow::anyhow;

	#[test]
	fn test_not_found_maps_to_exit_2() {
		let err = anyhow::Error::from(ResolveError::ServiceNotFound);
		assert_eq!(exit_code(&err), 2);
	}

	#[test]
	fn test_query_failure_maps_to_exit_1() {
		let err = anyhow::Error::from(ResolveError::Query(anyhow!("connection refused")));
		assert_eq!(exit_code(&err), 1);
	}

	#[test]
	fn test_plain_error_maps_to_exit_1() {
		assert_eq!(exit_code(&anyhow!("lookup failed")), 1);
	}
}
