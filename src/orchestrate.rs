use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::cluster::{ClusterClient, EndpointRecord, ServiceRecord};
use crate::probe::{ProbeRequest, ProbeResult, Prober, Protocol};
use crate::report;
use crate::resolve::{self, ResolveError};

/// Everything one diagnostic pass needs beyond the client and prober.
#[derive(Debug, Clone)]
pub struct RunOptions {
	pub destination: IpAddr,
	pub proto: Protocol,
	pub port: u16,
	pub hop_timeout_secs: u64,
	pub namespace: String,
	pub service_hint: Option<String>,
	pub auto: bool,
	pub recurse: bool,
	pub concurrency: usize,
}

impl RunOptions {
	pub fn wants_service_context(&self) -> bool {
		self.service_hint.is_some() || self.auto
	}

	fn request(&self, host: String, labeled: bool) -> ProbeRequest {
		ProbeRequest {
			host,
			proto: self.proto,
			port: self.port,
			hop_timeout_secs: self.hop_timeout_secs,
			labeled,
		}
	}
}

/// Structured outcome of a full run. The report layer renders pieces of
/// it as they become available; tests inspect it directly.
#[derive(Debug)]
#[allow(dead_code)]
pub struct RunSummary {
	pub primary: ProbeResult,
	pub service: Option<ServiceRecord>,
	pub endpoints: Vec<EndpointRecord>,
	pub fanout: Vec<(EndpointRecord, ProbeResult)>,
}

/// Drive one full diagnostic pass.
///
/// The primary probe always runs first and is reported before any
/// fan-out output. Resolution failure ends the run; an individual probe
/// failure only marks its own result and never cancels siblings.
pub async fn run<C, P>(
	client: &C,
	prober: Arc<P>,
	opts: &RunOptions,
) -> Result<RunSummary, ResolveError>
where
	C: ClusterClient + ?Sized,
	P: Prober + 'static,
{
	// Probe the raw destination synchronously before anything else.
	let primary = prober
		.probe(&opts.request(opts.destination.to_string(), false))
		.await;
	report::print_probe_result(&opts.destination.to_string(), &primary);

	if !opts.wants_service_context() {
		return Ok(RunSummary {
			primary,
			service: None,
			endpoints: Vec::new(),
			fanout: Vec::new(),
		});
	}

	let service = resolve::resolve_service(
		client,
		&opts.namespace,
		opts.service_hint.as_deref(),
		opts.destination,
	)
	.await?;
	report::print_service(&service);

	// The endpoint listing has standalone diagnostic value, so it is
	// emitted whether or not recursion was requested.
	let endpoints = resolve::expand_endpoints(client, &service, &opts.namespace).await?;
	report::print_endpoints(&endpoints);

	let mut fanout = Vec::new();
	if opts.recurse && !endpoints.is_empty() {
		let semaphore = Arc::new(Semaphore::new(opts.concurrency.max(1)));
		let mut handles = Vec::new();
		for endpoint in &endpoints {
			let sem = semaphore.clone();
			let prober = prober.clone();
			let req = opts.request(endpoint.pod_ip.clone(), true);
			let endpoint = endpoint.clone();

			handles.push(tokio::spawn(async move {
				let _permit = sem.acquire().await.unwrap();
				let result = prober.probe(&req).await;
				(endpoint, result)
			}));
		}

		// Awaiting every handle is the join barrier: the run must not
		// return while any probe is still in flight.
		for handle in handles {
			match handle.await {
				Ok((endpoint, result)) => {
					let target = format!("{} ({})", endpoint.name, endpoint.pod_ip);
					report::print_probe_result(&target, &result);
					fanout.push((endpoint, result));
				}
				Err(err) => {
					eprintln!("warning: probe task failed: {}", err);
				}
			}
		}
	}

	Ok(RunSummary {
		primary,
		service: Some(service),
		endpoints,
		fanout,
	})
}
