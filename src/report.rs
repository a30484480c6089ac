use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use crate::cluster::{EndpointRecord, ServiceRecord};
use crate::probe::ProbeResult;

/// Announce the service chosen by resolution.
pub fn print_service(service: &ServiceRecord) {
	if service.namespace.is_empty() {
		println!("\nThe service reached ({}) serves the pods:", service.name);
	} else {
		println!(
			"\nThe service reached ({}/{}) serves the pods:",
			service.namespace, service.name,
		);
	}
}

/// Print the discovered endpoints as a table.
///
/// An empty set is reported explicitly; the listing has diagnostic
/// value on its own, with or without fan-out probing.
pub fn print_endpoints(endpoints: &[EndpointRecord]) {
	if endpoints.is_empty() {
		println!("  (no pods matched the service selector)");
		return;
	}

	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(vec!["Pod", "Pod IP", "Node IP"]);
	for endpoint in endpoints {
		table.add_row(vec![
			endpoint.name.clone(),
			endpoint.pod_ip.clone(),
			endpoint.host_ip.clone(),
		]);
	}
	println!("{table}");
}

/// Print one probe outcome. Successful traces are relayed verbatim;
/// failures carry the underlying error and the remediation hint.
pub fn print_probe_result(target: &str, result: &ProbeResult) {
	match result {
		ProbeResult::Trace(output) => {
			println!("\nTrace to {}:", target);
			print!("{}", output);
		}
		ProbeResult::Failed { error, hint } => {
			eprintln!("\nTrace to {} failed: {}", target, error);
			eprintln!("  {}", hint);
		}
	}
}
