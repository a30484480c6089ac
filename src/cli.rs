use std::path::PathBuf;

use clap::Parser;

use crate::probe::Protocol;

/// Kubernetes service path tracer
#[derive(Parser, Debug)]
#[command(name = "kubetrace")]
#[command(about = "Trace the network path to a Kubernetes service and the pods behind it")]
pub struct Cli {
	/// Destination to trace (hostname or IP)
	pub destination: String,

	/// Protocol to probe with
	#[arg(long = "proto", value_enum, default_value_t = Protocol::Udp)]
	pub proto: Protocol,

	/// Destination port
	#[arg(short = 'p', long = "port", default_value = "80")]
	pub port: u16,

	/// Path to the kubeconfig (defaults to KUBECONFIG, ~/.kube/config, or in-cluster)
	#[arg(long = "kubeconfig")]
	pub kubeconfig: Option<PathBuf>,

	/// Namespace the service resides in (seeks into all namespaces by default)
	#[arg(short = 'n', long = "namespace", default_value = "")]
	pub namespace: String,

	/// Partial name of the service to look up
	#[arg(long = "service")]
	pub service: Option<String>,

	/// Find the service automatically by matching its cluster IP
	#[arg(long = "auto")]
	pub auto: bool,

	/// Also trace every pod found behind the service
	#[arg(long = "recurse")]
	pub recurse: bool,

	/// Per-hop probe timeout in seconds
	#[arg(long = "hop-timeout", default_value = "1")]
	pub hop_timeout: u64,

	/// Maximum concurrent pod traces
	#[arg(short = 'c', long = "concurrency", default_value = "16")]
	pub concurrency: usize,
}
