//! HTTP client for the cluster-api service
//!
//! Every call carries a short-lived bearer token signed with the shared
//! cluster-api secret, and is bounded by the configured timeout.

use crate::auth::create_token;
use crate::cluster::{ClusterAgent, ClusterError, ClusterHealth};
use crate::config::ClusterApiConfig;
use crate::domain::{Environment, RequestOperation, ResourceKind};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Subject of the tokens this service signs for the cluster api
const CLUSTER_API_SUBJECT: &str = "clusterflow";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplyBody<'a> {
    operation: RequestOperation,
    bootstrap_servers: &'a str,
    protocol: &'a str,
    config: &'a Value,
}

#[derive(Deserialize)]
struct StatusBody {
    status: String,
}

pub struct HttpClusterAgent {
    client: reqwest::Client,
    base_url: Url,
    secret: String,
}

impl HttpClusterAgent {
    pub fn new(config: &ClusterApiConfig) -> Result<Self, ClusterError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClusterError::Unreachable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            secret: config.secret.clone(),
        })
    }

    /// `{base}/clusters/{cluster}/{segments...}` with each segment escaped
    fn endpoint(&self, env: &Environment, segments: &[&str]) -> Result<Url, ClusterError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ClusterError::Unreachable(format!("Invalid cluster api url {}", self.base_url)))?;
            path.pop_if_empty()
                .push("clusters")
                .push(&env.cluster.identification());
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn token(&self) -> Result<String, ClusterError> {
        create_token(CLUSTER_API_SUBJECT, &self.secret)
            .map_err(|e| ClusterError::Auth(e.to_string()))
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response, ClusterError> {
        let response = request
            .bearer_auth(self.token()?)
            .send()
            .await
            .map_err(|e| {
                warn!("Cluster api request failed for {}: {}", what, e);
                ClusterError::Unreachable(format!("{}: {}", what, e))
            })?;

        let status = response.status();
        if status.is_success() {
            debug!("Cluster api {} -> {}", what, status);
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!("Cluster api returned {} for {}", status, what);
        Err(status_error(status, what, &body))
    }
}

/// Map a non-success status onto the agent's typed failures
fn status_error(status: StatusCode, what: &str, body: &str) -> ClusterError {
    let detail = if body.is_empty() {
        format!("{} ({})", what, status)
    } else {
        format!("{} ({}): {}", what, status, body)
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClusterError::Auth(detail),
        StatusCode::NOT_FOUND => ClusterError::NotFound(detail),
        StatusCode::CONFLICT => ClusterError::Conflict(detail),
        _ => ClusterError::Unreachable(detail),
    }
}

/// Deleting a resource the cluster no longer has is a success.
fn apply_outcome(
    operation: RequestOperation,
    result: Result<(), ClusterError>,
    what: &str,
) -> Result<(), ClusterError> {
    match (operation, result) {
        (RequestOperation::Delete, Err(ClusterError::NotFound(_))) => {
            debug!("{}: already absent", what);
            Ok(())
        }
        (_, result) => result,
    }
}

fn decode_error(what: &str, err: reqwest::Error) -> ClusterError {
    ClusterError::Unreachable(format!("Malformed response for {}: {}", what, err))
}

#[async_trait]
impl ClusterAgent for HttpClusterAgent {
    async fn list_resources(
        &self,
        env: &Environment,
        kind: ResourceKind,
    ) -> Result<Vec<String>, ClusterError> {
        let url = self.endpoint(env, &[kind.as_str()])?;
        let what = format!("list {} on {}", kind, env.name);
        let response = self
            .send(
                self.client
                    .get(url)
                    .query(&[("bootstrapServers", env.cluster.bootstrap_servers.as_str())]),
                &what,
            )
            .await?;
        response.json().await.map_err(|e| decode_error(&what, e))
    }

    async fn get_resource_config(
        &self,
        env: &Environment,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Value, ClusterError> {
        let url = self.endpoint(env, &[kind.as_str(), name])?;
        let what = format!("get {} '{}' on {}", kind, name, env.name);
        let response = self
            .send(
                self.client
                    .get(url)
                    .query(&[("bootstrapServers", env.cluster.bootstrap_servers.as_str())]),
                &what,
            )
            .await?;
        response.json().await.map_err(|e| decode_error(&what, e))
    }

    async fn apply_resource(
        &self,
        env: &Environment,
        kind: ResourceKind,
        name: &str,
        config: &Value,
        operation: RequestOperation,
    ) -> Result<(), ClusterError> {
        let url = self.endpoint(env, &[kind.as_str(), name])?;
        let what = format!("{} {} '{}' on {}", operation, kind, name, env.name);
        let body = ApplyBody {
            operation,
            bootstrap_servers: &env.cluster.bootstrap_servers,
            protocol: &env.cluster.protocol,
            config,
        };
        let result = self.send(self.client.post(url).json(&body), &what).await;
        apply_outcome(operation, result.map(|_| ()), &what)
    }

    async fn probe_status(&self, env: &Environment) -> Result<ClusterHealth, ClusterError> {
        let url = self.endpoint(env, &["status"])?;
        let what = format!("status of {}", env.name);
        let response = self
            .send(
                self.client
                    .get(url)
                    .query(&[("bootstrapServers", env.cluster.bootstrap_servers.as_str())]),
                &what,
            )
            .await?;
        let body: StatusBody = response.json().await.map_err(|e| decode_error(&what, e))?;

        if body.status.eq_ignore_ascii_case("online") {
            Ok(ClusterHealth::online(env))
        } else {
            Ok(ClusterHealth::offline(env, body.status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::env;

    fn agent(base: &str) -> HttpClusterAgent {
        HttpClusterAgent::new(&ClusterApiConfig {
            url: Url::parse(base).unwrap(),
            secret: "cluster-secret".into(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(status_error(StatusCode::UNAUTHORIZED, "x", ""), ClusterError::Auth(_)));
        assert!(matches!(status_error(StatusCode::FORBIDDEN, "x", ""), ClusterError::Auth(_)));
        assert!(matches!(status_error(StatusCode::NOT_FOUND, "x", ""), ClusterError::NotFound(_)));
        assert!(matches!(status_error(StatusCode::CONFLICT, "x", ""), ClusterError::Conflict(_)));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "x", "down"),
            ClusterError::Unreachable(_)
        ));
    }

    #[test]
    fn test_delete_of_absent_resource_succeeds() {
        let missing = || Err(ClusterError::NotFound("gone".into()));
        assert!(apply_outcome(RequestOperation::Delete, missing(), "x").is_ok());
        assert!(matches!(
            apply_outcome(RequestOperation::Update, missing(), "x"),
            Err(ClusterError::NotFound(_))
        ));
        assert!(matches!(
            apply_outcome(
                RequestOperation::Delete,
                Err(ClusterError::Unreachable("down".into())),
                "x"
            ),
            Err(ClusterError::Unreachable(_))
        ));
    }

    #[test]
    fn test_endpoint_escapes_acl_names() {
        let agent = agent("http://cluster-api:9343/api/");
        let url = agent
            .endpoint(&env("1"), &["acl", "PRODUCER:orders:CN=a b"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://cluster-api:9343/api/clusters/dev1/acl/PRODUCER:orders:CN=a%20b"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_typed() {
        // port 9 (discard) on localhost refuses connections
        let agent = agent("http://127.0.0.1:9");
        let result = agent.list_resources(&env("1"), ResourceKind::Topic).await;
        assert!(matches!(result, Err(ClusterError::Unreachable(_))));
    }
}
