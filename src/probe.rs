use async_trait::async_trait;
use clap::ValueEnum;
use tokio::process::Command;

/// Probe protocol, mapped to traceroute's mode flag.
///
/// Plain UDP is the default, as it is for traceroute itself.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
	Tcp,
	Icmp,
	Udp,
}

impl Protocol {
	pub fn flag(self) -> &'static str {
		match self {
			Protocol::Tcp => "-T",
			Protocol::Icmp => "-I",
			Protocol::Udp => "-U",
		}
	}
}

/// One path probe against a single target host.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct ProbeRequest {
	pub host: String,
	pub proto: Protocol,
	pub port: u16,
	pub hop_timeout_secs: u64,
	/// True when this probe belongs to the per-pod fan-out set rather
	/// than being the primary probe against the raw destination.
	pub labeled: bool,
}

/// Outcome of one probe: the raw trace output, or the failure with a
/// remediation hint. Never both.
#[derive(Debug, Clone)]
pub enum ProbeResult {
	Trace(String),
	Failed { error: String, hint: &'static str },
}

impl ProbeResult {
	#[allow(dead_code)]
	pub fn is_failure(&self) -> bool {
		matches!(self, ProbeResult::Failed { .. })
	}
}

/// Fixed remediation hint attached to every failed probe invocation.
pub const PROBE_HINT: &str =
	"check that traceroute is installed (the inetutils variant is not capable enough) \
	 and that your firewall rules allow the probes";

const TRACE_BIN: &str = "traceroute";

/// Build the traceroute argument list for a request: a short per-hop
/// timeout and a single query per hop keep individual probes fast.
pub fn trace_args(req: &ProbeRequest) -> Vec<String> {
	vec![
		"-w".to_string(),
		req.hop_timeout_secs.to_string(),
		"-q".to_string(),
		"1".to_string(),
		req.proto.flag().to_string(),
		"-p".to_string(),
		req.port.to_string(),
		req.host.clone(),
	]
}

/// Run one probe by invoking the external traceroute binary.
///
/// A missing tool, a permission failure, or a non-zero exit all become a
/// failure result carrying the remediation hint; the caller is never
/// aborted. Successful output is relayed verbatim, with no parsing.
pub async fn run_probe(req: &ProbeRequest) -> ProbeResult {
	run_probe_with(TRACE_BIN, req).await
}

async fn run_probe_with(bin: &str, req: &ProbeRequest) -> ProbeResult {
	match Command::new(bin).args(trace_args(req)).output().await {
		Ok(out) if out.status.success() => {
			ProbeResult::Trace(String::from_utf8_lossy(&out.stdout).into_owned())
		}
		Ok(out) => ProbeResult::Failed {
			error: format!(
				"{} exited with {}: {}",
				bin,
				out.status,
				String::from_utf8_lossy(&out.stderr).trim(),
			),
			hint: PROBE_HINT,
		},
		Err(err) => ProbeResult::Failed {
			error: format!("failed to run {}: {}", bin, err),
			hint: PROBE_HINT,
		},
	}
}

/// Seam over the external probe capability so the orchestrator can be
/// exercised without a real traceroute binary.
#[async_trait]
pub trait Prober: Send + Sync {
	async fn probe(&self, req: &ProbeRequest) -> ProbeResult;
}

/// Prober backed by the real traceroute invocation.
pub struct TracerouteProber;

#[async_trait]
impl Prober for TracerouteProber {
	async fn probe(&self, req: &ProbeRequest) -> ProbeResult {
		run_probe(req).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn request(proto: Protocol) -> ProbeRequest {
		ProbeRequest {
			host: "10.1.2.3".to_string(),
			proto,
			port: 443,
			hop_timeout_secs: 1,
			labeled: false,
		}
	}

	#[test]
	fn test_protocol_flags() {
		assert_eq!(Protocol::Tcp.flag(), "-T");
		assert_eq!(Protocol::Icmp.flag(), "-I");
		assert_eq!(Protocol::Udp.flag(), "-U");
	}

	#[test]
	fn test_trace_args_shape() {
		let args = trace_args(&request(Protocol::Tcp));
		assert_eq!(
			args,
			vec!["-w", "1", "-q", "1", "-T", "-p", "443", "10.1.2.3"],
		);
	}

	#[test]
	fn test_trace_args_hop_timeout() {
		let mut req = request(Protocol::Udp);
		req.hop_timeout_secs = 3;
		let args = trace_args(&req);
		assert_eq!(args[1], "3");
	}

	#[tokio::test]
	async fn test_missing_tool_is_a_failure_result() {
		let result = run_probe_with(
			"kubetrace-no-such-binary",
			&request(Protocol::Udp),
		).await;
		match result {
			ProbeResult::Failed { error, hint } => {
				assert!(error.contains("failed to run"));
				assert_eq!(hint, PROBE_HINT);
			}
			ProbeResult::Trace(_) => panic!("expected a failure result"),
		}
	}
}
