//! Kubernetes client construction from a kubeconfig file.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;
use tracing::debug;

/// Builds a cluster client from a kubeconfig path.
///
/// The resolver only depends on this trait, so tests can inject a factory
/// that succeeds or fails without touching a cluster.
pub trait ClientFactory {
    type Client;

    fn client_from_kubeconfig(&self, path: &Path) -> Result<Self::Client>;
}

/// Factory producing `kube::Client` instances.
///
/// Resolution is synchronous; the borrowed runtime is only used to load the
/// kubeconfig and to spawn the client's background service. It must outlive
/// every client produced.
#[derive(Debug, Clone, Copy)]
pub struct KubeClientFactory<'a> {
    runtime: &'a Runtime,
}

impl<'a> KubeClientFactory<'a> {
    pub fn new(runtime: &'a Runtime) -> Self {
        Self { runtime }
    }
}

impl ClientFactory for KubeClientFactory<'_> {
    type Client = kube::Client;

    fn client_from_kubeconfig(&self, path: &Path) -> Result<kube::Client> {
        debug!("Loading kubeconfig from {}", path.display());
        let kubeconfig = kube::config::Kubeconfig::read_from(path)
            .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;

        let current_context = kubeconfig
            .current_context
            .clone()
            .unwrap_or_else(|| "unknown".to_string());

        let config = self
            .runtime
            .block_on(kube::Config::from_custom_kubeconfig(
                kubeconfig,
                &kube::config::KubeConfigOptions::default(),
            ))
            .context("failed to load client configuration")?;

        let _guard = self.runtime.enter();
        let client =
            kube::Client::try_from(config).context("failed to build Kubernetes client")?;

        debug!(
            "Created Kubernetes client for context {} from {}",
            current_context,
            path.display()
        );
        Ok(client)
    }
}
