use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::api::{Api, ListParams};
use kube::config::{Config, KubeConfigOptions, Kubeconfig};
use kube::Client;

/// Snapshot of a cluster service: identity, virtual address, and the
/// label selector binding it to its pods. Copied out of the API response
/// and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ServiceRecord {
	pub name: String,
	pub namespace: String,
	/// Cluster-internal IP. None for headless services (ClusterIP "None").
	pub cluster_ip: Option<String>,
	pub selector: BTreeMap<String, String>,
}

/// Snapshot of one pod backing a service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EndpointRecord {
	pub name: String,
	pub pod_ip: String,
	pub host_ip: String,
}

impl From<&Service> for ServiceRecord {
	fn from(svc: &Service) -> Self {
		let spec = svc.spec.as_ref();
		ServiceRecord {
			name: svc.metadata.name.clone().unwrap_or_default(),
			namespace: svc.metadata.namespace.clone().unwrap_or_default(),
			cluster_ip: spec
				.and_then(|s| s.cluster_ip.clone())
				.filter(|ip| !ip.is_empty() && ip != "None"),
			selector: spec.and_then(|s| s.selector.clone()).unwrap_or_default(),
		}
	}
}

impl From<&Pod> for EndpointRecord {
	fn from(pod: &Pod) -> Self {
		let status = pod.status.as_ref();
		EndpointRecord {
			name: pod.metadata.name.clone().unwrap_or_default(),
			pod_ip: status.and_then(|s| s.pod_ip.clone()).unwrap_or_default(),
			host_ip: status.and_then(|s| s.host_ip.clone()).unwrap_or_default(),
		}
	}
}

/// Thin query surface over the orchestration API. Implemented by the
/// real kube client here and by in-memory fakes in tests.
#[async_trait]
pub trait ClusterClient {
	/// List services in a namespace; an empty namespace means all namespaces.
	async fn list_services(&self, namespace: &str) -> Result<Vec<ServiceRecord>>;

	/// List pods in a namespace matching a label-equality selector string.
	async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<EndpointRecord>>;
}

/// Cluster client backed by the Kubernetes API.
pub struct KubeClusterClient {
	client: Client,
}

impl KubeClusterClient {
	/// Connect using an explicit kubeconfig path, or the standard
	/// discovery chain (KUBECONFIG, ~/.kube/config, in-cluster) when
	/// no path is given.
	pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self> {
		let client = match kubeconfig {
			Some(path) => {
				let kubeconfig = Kubeconfig::read_from(path).with_context(|| {
					format!("failed to read kubeconfig at {}", path.display())
				})?;
				let config = Config::from_custom_kubeconfig(
					kubeconfig,
					&KubeConfigOptions::default(),
				)
				.await
				.context("failed to build client config from kubeconfig")?;
				Client::try_from(config)?
			}
			None => Client::try_default()
				.await
				.context("failed to build cluster client")?,
		};
		Ok(KubeClusterClient { client })
	}

	fn services(&self, namespace: &str) -> Api<Service> {
		if namespace.is_empty() {
			Api::all(self.client.clone())
		} else {
			Api::namespaced(self.client.clone(), namespace)
		}
	}

	fn pods(&self, namespace: &str) -> Api<Pod> {
		if namespace.is_empty() {
			Api::all(self.client.clone())
		} else {
			Api::namespaced(self.client.clone(), namespace)
		}
	}
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
	async fn list_services(&self, namespace: &str) -> Result<Vec<ServiceRecord>> {
		let list = self
			.services(namespace)
			.list(&ListParams::default())
			.await
			.context("failed to list services")?;
		Ok(list.items.iter().map(ServiceRecord::from).collect())
	}

	async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<EndpointRecord>> {
		let params = ListParams::default().labels(selector);
		let list = self
			.pods(namespace)
			.list(&params)
			.await
			.context("failed to list pods")?;
		Ok(list.items.iter().map(EndpointRecord::from).collect())
	}
}

/// Client for runs that never request service context. Reaching a query
/// here means the orchestrator's guard is broken.
pub struct NoCluster;

#[async_trait]
impl ClusterClient for NoCluster {
	async fn list_services(&self, _namespace: &str) -> Result<Vec<ServiceRecord>> {
		bail!("no cluster client configured")
	}

	async fn list_pods(&self, _namespace: &str, _selector: &str) -> Result<Vec<EndpointRecord>> {
		bail!("no cluster client configured")
	}
}
