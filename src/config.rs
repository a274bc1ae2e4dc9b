use anyhow::Context;
use tracing::debug;

use crate::http::Endpoint;

pub const DEFAULT_NAMESPACE: &str = "default";

pub struct ClusterConfig {
    pub endpoint: Endpoint,
    /// Namespace of the active kubeconfig context, or `default`.
    pub default_namespace: String,
}

impl ClusterConfig {
    /// `--server` wins; otherwise fall back on whatever kubeconfig points at.
    pub async fn resolve(server: Option<&str>) -> anyhow::Result<Self> {
        let inferred = match kube::Config::infer().await {
            Ok(config) => Some((config.cluster_url.to_string(), config.default_namespace)),
            Err(err) => {
                debug!(%err, "no kubeconfig to fall back on");
                None
            }
        };
        Self::from_parts(server, inferred)
    }

    fn from_parts(server: Option<&str>, inferred: Option<(String, String)>) -> anyhow::Result<Self> {
        let (inferred_url, inferred_ns) = match inferred {
            Some((url, ns)) => (Some(url), Some(ns)),
            None => (None, None),
        };
        let server = server
            .map(str::to_string)
            .or(inferred_url)
            .context("no --server given and no kubeconfig cluster to fall back on")?;
        let endpoint = server
            .parse()
            .with_context(|| format!("invalid server address {server}"))?;
        Ok(Self {
            endpoint,
            default_namespace: inferred_ns.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_server_wins_over_kubeconfig() {
        let config = ClusterConfig::from_parts(
            Some("https://192.168.64.3:8443"),
            Some(("https://other:6443/".into(), "team".into())),
        )
        .unwrap();
        assert_eq!(config.endpoint.host, "192.168.64.3");
        assert_eq!(config.endpoint.port, 8443);
        assert_eq!(config.default_namespace, "team");
    }

    #[test]
    fn kubeconfig_fills_the_gaps() {
        let config = ClusterConfig::from_parts(None, Some(("https://other:6443/".into(), "team".into()))).unwrap();
        assert_eq!(config.endpoint.to_string(), "https://other:6443");

        let config = ClusterConfig::from_parts(Some("http://localhost:8080"), None).unwrap();
        assert_eq!(config.default_namespace, DEFAULT_NAMESPACE);
    }

    #[test]
    fn nothing_to_connect_to() {
        assert!(ClusterConfig::from_parts(None, None).is_err());
        assert!(ClusterConfig::from_parts(Some("::nope"), None).is_err());
    }
}
