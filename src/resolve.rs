use std::collections::BTreeMap;
use std::net::IpAddr;

use thiserror::Error;

use crate::cluster::{ClusterClient, EndpointRecord, ServiceRecord};

/// Failure modes of service resolution and endpoint expansion.
///
/// A missing service is an explicit, expected outcome and maps to its
/// own exit code; a failed cluster query is plumbing trouble.
#[derive(Debug, Error)]
pub enum ResolveError {
	#[error("cannot find a service matching the destination")]
	ServiceNotFound,
	#[error(transparent)]
	Query(#[from] anyhow::Error),
}

/// Pick the service whose name contains the hint as a substring.
///
/// Substring rather than exact match is intentional: operators often know
/// only part of a generated deployment name. Candidates are sorted by
/// name first so the tie-break between multiple matches is deterministic
/// instead of depending on API listing order.
pub fn match_by_name(mut services: Vec<ServiceRecord>, hint: &str) -> Option<ServiceRecord> {
	services.sort_by(|a, b| a.name.cmp(&b.name));
	services.into_iter().find(|svc| svc.name.contains(hint))
}

/// Pick the service whose cluster IP equals the destination exactly.
pub fn match_by_cluster_ip(
	mut services: Vec<ServiceRecord>,
	destination: IpAddr,
) -> Option<ServiceRecord> {
	let target = destination.to_string();
	services.sort_by(|a, b| a.name.cmp(&b.name));
	services
		.into_iter()
		.find(|svc| svc.cluster_ip.as_deref() == Some(target.as_str()))
}

/// Resolve the destination to exactly one service.
///
/// An empty namespace searches all namespaces. A name hint takes
/// precedence over cluster-IP matching. Zero candidates is
/// `ServiceNotFound`, which ends the whole run.
pub async fn resolve_service<C>(
	client: &C,
	namespace: &str,
	hint: Option<&str>,
	destination: IpAddr,
) -> Result<ServiceRecord, ResolveError>
where
	C: ClusterClient + ?Sized,
{
	let services = client.list_services(namespace).await?;
	let matched = match hint {
		Some(hint) => match_by_name(services, hint),
		None => match_by_cluster_ip(services, destination),
	};
	matched.ok_or(ResolveError::ServiceNotFound)
}

/// Render a selector mapping as a label-equality selector string.
///
/// BTreeMap iteration is key-ordered, so the rendering is stable for any
/// insertion order; selection semantics are a set intersection either way.
pub fn selector_string(selector: &BTreeMap<String, String>) -> String {
	selector
		.iter()
		.map(|(k, v)| format!("{}={}", k, v))
		.collect::<Vec<_>>()
		.join(",")
}

/// Expand a resolved service into the pods its selector matches.
///
/// Pods are returned in the order the API lists them; zero endpoints is
/// a valid outcome. A selectorless service selects nothing and expands
/// to an empty list without querying (an empty selector string would
/// match every pod in scope).
pub async fn expand_endpoints<C>(
	client: &C,
	service: &ServiceRecord,
	namespace: &str,
) -> Result<Vec<EndpointRecord>, ResolveError>
where
	C: ClusterClient + ?Sized,
{
	if service.selector.is_empty() {
		return Ok(Vec::new());
	}
	let selector = selector_string(&service.selector);
	Ok(client.list_pods(namespace, &selector).await?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use anyhow::Result;
	use async_trait::async_trait;

	struct FakeCluster {
		services: Vec<ServiceRecord>,
		pods: Vec<EndpointRecord>,
	}

	#[async_trait]
	impl ClusterClient for FakeCluster {
		async fn list_services(&self, _namespace: &str) -> Result<Vec<ServiceRecord>> {
			Ok(self.services.clone())
		}

		async fn list_pods(
			&self,
			_namespace: &str,
			_selector: &str,
		) -> Result<Vec<EndpointRecord>> {
			Ok(self.pods.clone())
		}
	}

	fn svc(name: &str, cluster_ip: &str) -> ServiceRecord {
		ServiceRecord {
			name: name.to_string(),
			namespace: "default".to_string(),
			cluster_ip: Some(cluster_ip.to_string()),
			selector: BTreeMap::from([("app".to_string(), name.to_string())]),
		}
	}

	fn pod(name: &str, ip: &str) -> EndpointRecord {
		EndpointRecord {
			name: name.to_string(),
			pod_ip: ip.to_string(),
			host_ip: "192.168.1.10".to_string(),
		}
	}

	#[test]
	fn test_match_by_cluster_ip_exact() {
		let services = vec![svc("a", "10.96.0.1"), svc("b", "10.96.0.2")];
		let found = match_by_cluster_ip(services, "10.96.0.2".parse().unwrap()).unwrap();
		assert_eq!(found.name, "b");
	}

	#[test]
	fn test_match_by_cluster_ip_never_differs() {
		let services = vec![svc("a", "10.96.0.1")];
		assert!(match_by_cluster_ip(services, "10.0.0.5".parse().unwrap()).is_none());
	}

	#[test]
	fn test_match_by_name_substring() {
		let services = vec![svc("frontend", "10.96.0.1"), svc("checkout-svc", "10.96.0.2")];
		let found = match_by_name(services, "checkout").unwrap();
		assert_eq!(found.name, "checkout-svc");
	}

	#[test]
	fn test_match_by_name_tie_break_is_sorted() {
		// Listing order is v2 before v1; the sorted tie-break must still
		// pick payments-v1.
		let services = vec![
			svc("payments-v2", "10.96.0.2"),
			svc("payments-v1", "10.96.0.1"),
		];
		let found = match_by_name(services, "pay").unwrap();
		assert_eq!(found.name, "payments-v1");
	}

	#[test]
	fn test_match_by_name_no_candidate() {
		let services = vec![svc("frontend", "10.96.0.1")];
		assert!(match_by_name(services, "pay").is_none());
	}

	#[test]
	fn test_selector_string_is_key_ordered() {
		let selector = BTreeMap::from([
			("tier".to_string(), "web".to_string()),
			("app".to_string(), "checkout".to_string()),
		]);
		assert_eq!(selector_string(&selector), "app=checkout,tier=web");
	}

	#[tokio::test]
	async fn test_resolve_not_found_is_terminal() {
		let cluster = FakeCluster { services: vec![], pods: vec![] };
		let err = resolve_service(&cluster, "", None, "10.0.0.5".parse().unwrap())
			.await
			.unwrap_err();
		assert!(matches!(err, ResolveError::ServiceNotFound));
	}

	#[tokio::test]
	async fn test_resolve_hint_takes_precedence_over_ip() {
		let cluster = FakeCluster {
			services: vec![svc("frontend", "10.96.0.9"), svc("checkout-svc", "10.96.0.2")],
			pods: vec![],
		};
		// Destination IP matches frontend, but the hint names checkout.
		let found = resolve_service(&cluster, "", Some("checkout"), "10.96.0.9".parse().unwrap())
			.await
			.unwrap();
		assert_eq!(found.name, "checkout-svc");
	}

	#[tokio::test]
	async fn test_expand_returns_pod_set() {
		let cluster = FakeCluster {
			services: vec![],
			pods: vec![pod("c-1", "10.244.0.1"), pod("c-2", "10.244.0.2"), pod("c-3", "10.244.0.3")],
		};
		let service = svc("checkout", "10.96.0.2");

		let mut first = expand_endpoints(&cluster, &service, "").await.unwrap();
		let mut second = expand_endpoints(&cluster, &service, "").await.unwrap();
		assert_eq!(first.len(), 3);

		// Idempotent as a set; ordering from the API is not guaranteed.
		first.sort();
		second.sort();
		assert_eq!(first, second);
	}

	#[tokio::test]
	async fn test_expand_selectorless_service_is_empty() {
		// Pods exist in scope, but a service without a selector must not
		// match them.
		let cluster = FakeCluster {
			services: vec![],
			pods: vec![pod("stray", "10.244.0.9")],
		};
		let service = ServiceRecord {
			name: "external".to_string(),
			namespace: "default".to_string(),
			cluster_ip: None,
			selector: BTreeMap::new(),
		};
		let endpoints = expand_endpoints(&cluster, &service, "").await.unwrap();
		assert!(endpoints.is_empty());
	}
}
