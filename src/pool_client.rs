//! Cluster-management REST client.
//!
//! Unique responsibility: talk to the control-plane API for clusters, machine
//! pools, node pools and the catalog data pool creation depends on.
//!
//! API base: `{POOLCTL_API_URL}/api/clusters_mgmt/v1`
//! - Header: Authorization: Bearer <token>
//!
//! This module encapsulates:
//! - [`RestTransport`]: JSON requests with retry on idempotent calls
//! - [`ControlPlane`]: the operations the pool workflows need
//! - [`HttpControlPlane`]: the HTTP implementation of that trait

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::pool_api::{
    ClusterRecord, Flavour, InstanceTypeAvailability, InstanceTypeInquiry, InstanceTypeList, ItemList,
    MachinePool, NamedConfig, NodePool, NodePoolUpgradePolicy, ObjectRef, VersionRecord,
};
use crate::pool_config::ApiConfig;
use crate::pool_model::Cluster;

// ============================================================================
// Error type
// ============================================================================

/// Error type for API client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Missing required environment variable.
    #[error("missing required env var: {0}")]
    MissingEnv(&'static str),

    /// Invalid environment variable value.
    #[error("invalid env var {key}={value}: {reason}")]
    InvalidEnv {
        /// The environment variable key.
        key: &'static str,
        /// The rejected value.
        value: String,
        /// The reason for invalidity.
        reason: &'static str,
    },

    /// URL could not be built.
    #[error("invalid url: {0}")]
    Url(String),

    /// HTTP client error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(String),

    /// Inquiry returned nothing for the requested object.
    #[error("{0}")]
    NotFound(String),

    /// API error response.
    #[error("api error: status={status}, {message}")]
    Api {
        /// HTTP status code.
        status: StatusCode,
        /// Reason reported by the server, or the raw body.
        message: String,
    },
}

impl ClientError {
    /// Build an [`ClientError::Api`] from a response body, preferring the server's `reason`.
    #[must_use]
    pub fn api(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("reason").and_then(|r| r.as_str()).map(str::to_string))
            .unwrap_or_else(|| body.trim().to_string());
        Self::Api { status, message }
    }
}

// ============================================================================
// Transport
// ============================================================================

/// JSON-over-HTTP transport with bearer auth and retries.
#[derive(Clone)]
pub struct RestTransport {
    cfg: ApiConfig,
    base: String,
    http: reqwest::Client,
}

impl RestTransport {
    /// Create a new transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(cfg: ApiConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .user_agent(cfg.user_agent.clone())
            .build()?;
        let base = cfg.clusters_mgmt_url();

        Ok(Self { cfg, base, http })
    }

    /// Get a reference to the current configuration.
    #[must_use]
    pub const fn config(&self) -> &ApiConfig {
        &self.cfg
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ClientError> {
        let raw = format!("{}/{}", self.base, path.trim_start_matches('/'));
        let parsed = if query.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, query)
        };
        parsed.map_err(|e| ClientError::Url(format!("{raw}: {e}")))
    }

    /// GET a JSON document.
    ///
    /// # Errors
    ///
    /// Transport, status or decoding failures.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ClientError> {
        let url = self.url(path, query)?;
        let body = self.execute(Method::GET, url, None, true).await?;
        decode(&body)
    }

    /// GET a JSON document; 404 yields `None`.
    ///
    /// # Errors
    ///
    /// Transport, non-404 status or decoding failures.
    pub async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ClientError> {
        let url = self.url(path, &[])?;
        match self.execute(Method::GET, url, None, true).await {
            Ok(body) => decode(&body).map(Some),
            Err(ClientError::Api { status, .. }) if status == StatusCode::NOT_FOUND => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// POST a JSON body and decode the response. Never retried.
    ///
    /// # Errors
    ///
    /// Transport, status or decoding failures.
    pub async fn post<B: Serialize + Sync, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ClientError> {
        let url = self.url(path, &[])?;
        let payload = serde_json::to_value(body).map_err(|e| ClientError::Json(e.to_string()))?;
        let text = self.execute(Method::POST, url, Some(payload), false).await?;
        decode(&text)
    }

    /// POST a read-only inquiry. Retried like a GET.
    ///
    /// # Errors
    ///
    /// Transport, status or decoding failures.
    pub async fn inquire<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.url(path, &[])?;
        let payload = serde_json::to_value(body).map_err(|e| ClientError::Json(e.to_string()))?;
        let text = self.execute(Method::POST, url, Some(payload), true).await?;
        decode(&text)
    }

    /// DELETE a resource. Never retried.
    ///
    /// # Errors
    ///
    /// Transport or status failures.
    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let url = self.url(path, &[])?;
        self.execute(Method::DELETE, url, None, false).await.map(|_| ())
    }

    /// Send a request, retrying transient failures when `idempotent`.
    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
        idempotent: bool,
    ) -> Result<String, ClientError> {
        let mut attempt: u32 = 0;
        let mut backoff = Duration::from_millis(self.cfg.retry_backoff_ms);

        loop {
            attempt = attempt.saturating_add(1);
            log::debug!("{method} {url} (attempt {attempt})");

            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .bearer_auth(&self.cfg.api_token);
            if let Some(body) = &body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp.text().await.map_err(ClientError::Http);
                    }

                    let text = resp.text().await.unwrap_or_default();
                    if idempotent && attempt <= self.cfg.retry_max && is_retryable_status(status) {
                        log::debug!("{method} {url} returned {status}, retrying in {backoff:?}");
                        tokio::time::sleep(backoff).await;
                        backoff = next_backoff(backoff);
                        continue;
                    }
                    return Err(ClientError::api(status, &text));
                }
                Err(e) => {
                    if idempotent && attempt <= self.cfg.retry_max && is_retryable_reqwest(&e) {
                        log::debug!("{method} {url} failed: {e}, retrying in {backoff:?}");
                        tokio::time::sleep(backoff).await;
                        backoff = next_backoff(backoff);
                        continue;
                    }
                    return Err(ClientError::Http(e));
                }
            }
        }
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ClientError> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|e| ClientError::Json(e.to_string()))
}

// ============================================================================
// Control plane
// ============================================================================

/// Control-plane operations used by the pool workflows.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Find a cluster by ID or name.
    async fn find_cluster(&self, key: &str) -> Result<Option<Cluster>, ClientError>;

    /// Machine pools of a classic cluster.
    async fn list_machine_pools(&self, cluster_id: &str) -> Result<Vec<MachinePool>, ClientError>;

    /// One machine pool, `None` when it does not exist.
    async fn get_machine_pool(&self, cluster_id: &str, pool_id: &str) -> Result<Option<MachinePool>, ClientError>;

    /// Create a machine pool and return the server's view of it.
    async fn create_machine_pool(&self, cluster_id: &str, pool: &MachinePool) -> Result<MachinePool, ClientError>;

    /// Delete a machine pool.
    async fn delete_machine_pool(&self, cluster_id: &str, pool_id: &str) -> Result<(), ClientError>;

    /// Node pools of a hosted cluster.
    async fn list_node_pools(&self, cluster_id: &str) -> Result<Vec<NodePool>, ClientError>;

    /// One node pool, `None` when it does not exist.
    async fn get_node_pool(&self, cluster_id: &str, pool_id: &str) -> Result<Option<NodePool>, ClientError>;

    /// Create a node pool and return the server's view of it.
    async fn create_node_pool(&self, cluster_id: &str, pool: &NodePool) -> Result<NodePool, ClientError>;

    /// Delete a node pool.
    async fn delete_node_pool(&self, cluster_id: &str, pool_id: &str) -> Result<(), ClientError>;

    /// Scheduled upgrade of a node pool, if any.
    async fn node_pool_upgrade(
        &self,
        cluster_id: &str,
        pool_id: &str,
    ) -> Result<Option<NodePoolUpgradePolicy>, ClientError>;

    /// Default compute root disk size of a flavour, in GiB.
    async fn default_root_disk_size(&self, flavour_id: &str) -> Result<Option<u64>, ClientError>;

    /// Instance types usable in `region` across `zones`.
    async fn available_instance_types(
        &self,
        region: &str,
        zones: &[String],
        role_arn: Option<&str>,
    ) -> Result<InstanceTypeList, ClientError>;

    /// Names of the tuning configs defined on a cluster.
    async fn tuning_config_names(&self, cluster_id: &str) -> Result<Vec<String>, ClientError>;

    /// Names of the kubelet configs defined on a cluster.
    async fn kubelet_config_names(&self, cluster_id: &str) -> Result<Vec<String>, ClientError>;

    /// Raw IDs of the enabled versions in a channel group.
    async fn versions(&self, channel_group: &str) -> Result<Vec<String>, ClientError>;
}

/// HTTP implementation of [`ControlPlane`].
#[derive(Clone)]
pub struct HttpControlPlane {
    rest: RestTransport,
}

impl HttpControlPlane {
    /// Create a control-plane client over a transport.
    #[must_use]
    pub const fn new(rest: RestTransport) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn find_cluster(&self, key: &str) -> Result<Option<Cluster>, ClientError> {
        let search = format!("id = '{key}' or name = '{key}' or external_id = '{key}'");
        let list: ItemList<ClusterRecord> = self.rest.get("clusters", &[("search", search.as_str())]).await?;
        Ok(list.items.into_iter().next().map(Cluster::from))
    }

    async fn list_machine_pools(&self, cluster_id: &str) -> Result<Vec<MachinePool>, ClientError> {
        let list: ItemList<MachinePool> = self
            .rest
            .get(&format!("clusters/{cluster_id}/machine_pools"), &[])
            .await?;
        Ok(list.items)
    }

    async fn get_machine_pool(&self, cluster_id: &str, pool_id: &str) -> Result<Option<MachinePool>, ClientError> {
        self.rest
            .get_optional(&format!("clusters/{cluster_id}/machine_pools/{pool_id}"))
            .await
    }

    async fn create_machine_pool(&self, cluster_id: &str, pool: &MachinePool) -> Result<MachinePool, ClientError> {
        self.rest
            .post(&format!("clusters/{cluster_id}/machine_pools"), pool)
            .await
    }

    async fn delete_machine_pool(&self, cluster_id: &str, pool_id: &str) -> Result<(), ClientError> {
        self.rest
            .delete(&format!("clusters/{cluster_id}/machine_pools/{pool_id}"))
            .await
    }

    async fn list_node_pools(&self, cluster_id: &str) -> Result<Vec<NodePool>, ClientError> {
        let list: ItemList<NodePool> = self
            .rest
            .get(&format!("clusters/{cluster_id}/node_pools"), &[])
            .await?;
        Ok(list.items)
    }

    async fn get_node_pool(&self, cluster_id: &str, pool_id: &str) -> Result<Option<NodePool>, ClientError> {
        self.rest
            .get_optional(&format!("clusters/{cluster_id}/node_pools/{pool_id}"))
            .await
    }

    async fn create_node_pool(&self, cluster_id: &str, pool: &NodePool) -> Result<NodePool, ClientError> {
        self.rest
            .post(&format!("clusters/{cluster_id}/node_pools"), pool)
            .await
    }

    async fn delete_node_pool(&self, cluster_id: &str, pool_id: &str) -> Result<(), ClientError> {
        self.rest
            .delete(&format!("clusters/{cluster_id}/node_pools/{pool_id}"))
            .await
    }

    async fn node_pool_upgrade(
        &self,
        cluster_id: &str,
        pool_id: &str,
    ) -> Result<Option<NodePoolUpgradePolicy>, ClientError> {
        let list: Option<ItemList<NodePoolUpgradePolicy>> = self
            .rest
            .get_optional(&format!("clusters/{cluster_id}/node_pools/{pool_id}/upgrade_policies"))
            .await?;
        Ok(list.and_then(|l| l.items.into_iter().find(NodePoolUpgradePolicy::is_scheduled)))
    }

    async fn default_root_disk_size(&self, flavour_id: &str) -> Result<Option<u64>, ClientError> {
        if flavour_id.is_empty() {
            return Ok(None);
        }
        let flavour: Option<Flavour> = self.rest.get_optional(&format!("flavours/{flavour_id}")).await?;
        Ok(flavour.and_then(|f| f.default_root_disk_size_gib()))
    }

    async fn available_instance_types(
        &self,
        region: &str,
        zones: &[String],
        role_arn: Option<&str>,
    ) -> Result<InstanceTypeList, ClientError> {
        let inquiry = InstanceTypeInquiry {
            region: ObjectRef { id: region.to_string() },
            availability_zones: zones.to_vec(),
            role_arn: role_arn.map(str::to_string),
        };
        let list: ItemList<InstanceTypeAvailability> =
            self.rest.inquire("aws_inquiries/machine_types", &inquiry).await?;
        Ok(InstanceTypeList { items: list.items })
    }

    async fn tuning_config_names(&self, cluster_id: &str) -> Result<Vec<String>, ClientError> {
        let list: ItemList<NamedConfig> = self
            .rest
            .get(&format!("clusters/{cluster_id}/tuning_configs"), &[])
            .await?;
        Ok(list.items.into_iter().map(|c| c.name).collect())
    }

    async fn kubelet_config_names(&self, cluster_id: &str) -> Result<Vec<String>, ClientError> {
        let list: ItemList<NamedConfig> = self
            .rest
            .get(&format!("clusters/{cluster_id}/kubelet_configs"), &[])
            .await?;
        Ok(list.items.into_iter().map(|c| c.name).collect())
    }

    async fn versions(&self, channel_group: &str) -> Result<Vec<String>, ClientError> {
        let search = format!("enabled = 't' and channel_group = '{channel_group}'");
        let list: ItemList<VersionRecord> = self
            .rest
            .get("versions", &[("search", search.as_str()), ("order", "default desc"), ("size", "-1")])
            .await?;
        Ok(list
            .items
            .into_iter()
            .filter(|v| v.enabled && !v.raw_id.is_empty())
            .map(|v| v.raw_id)
            .collect())
    }
}

// ============================================================================
// Helper functions
// ============================================================================

#[inline]
const fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 409 | 425 | 429 | 500 | 502 | 503 | 504)
}

#[inline]
fn is_retryable_reqwest(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request()
}

#[inline]
fn next_backoff(current: Duration) -> Duration {
    let next = current.saturating_mul(2);
    next.min(Duration::from_secs(10))
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener};
    use std::thread;

    use super::*;

    fn transport() -> RestTransport {
        transport_at("http://localhost:9/")
    }

    fn transport_at(url: &str) -> RestTransport {
        let cfg = ApiConfig::from_lookup(|key| match key {
            "POOLCTL_API_TOKEN" => Some("token".to_string()),
            "POOLCTL_API_URL" => Some(url.to_string()),
            _ => None,
        })
        .unwrap();
        RestTransport::new(cfg).unwrap()
    }

    /// Serve one canned response on a local port, after reading the request head.
    fn serve_once(response: &'static str) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut head = Vec::new();
                let mut chunk = [0_u8; 1024];
                while let Ok(n) = stream.read(&mut chunk) {
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&chunk[..n]);
                    if head.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let _ = stream.write_all(response.as_bytes());
            }
        });
        addr
    }

    #[test]
    fn urls_are_rooted_at_clusters_mgmt() {
        let rest = transport();
        assert_eq!(
            rest.url("/clusters/abc/machine_pools", &[]).unwrap().as_str(),
            "http://localhost:9/api/clusters_mgmt/v1/clusters/abc/machine_pools"
        );
        let with_query = rest.url("clusters", &[("search", "name = 'demo'")]).unwrap();
        assert_eq!(with_query.query(), Some("search=name+%3D+%27demo%27"));
    }

    #[test]
    fn api_errors_prefer_server_reason() {
        let err = ClientError::api(
            StatusCode::BAD_REQUEST,
            r#"{"kind":"Error","reason":"Machine pool name is taken"}"#,
        );
        assert_eq!(err.to_string(), "api error: status=400 Bad Request, Machine pool name is taken");

        let raw = ClientError::api(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(raw.to_string(), "api error: status=502 Bad Gateway, upstream down");
    }

    #[test]
    fn retry_policy() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert_eq!(next_backoff(Duration::from_millis(500)), Duration::from_secs(1));
        assert_eq!(next_backoff(Duration::from_secs(8)), Duration::from_secs(10));
    }

    #[test]
    fn empty_bodies_decode_as_null() {
        let value: Option<MachinePool> = decode("").unwrap();
        assert!(value.is_none());
        assert!(decode::<MachinePool>("{not json").is_err());
    }

    #[tokio::test]
    async fn truncated_success_body_is_a_transport_error() {
        let addr = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 64\r\nConnection: close\r\n\r\n{\"id\":",
        );
        let rest = transport_at(&format!("http://{addr}/"));

        let err = rest.get::<serde_json::Value>("clusters/abc", &[]).await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)), "{err}");
    }

    #[tokio::test]
    async fn complete_success_body_is_decoded() {
        let addr = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 10\r\nConnection: close\r\n\r\n{\"id\":\"a\"}",
        );
        let rest = transport_at(&format!("http://{addr}/"));

        let value: serde_json::Value = rest.get("clusters/abc", &[]).await.unwrap();
        assert_eq!(value["id"], "a");
    }
}
