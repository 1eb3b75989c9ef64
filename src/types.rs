//! Value types shared by the flag, file and resolved configuration layers.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::duration;

/// Image pull policy for control plane images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
pub enum ImagePullPolicy {
    #[value(name = "Always")]
    Always,
    #[value(name = "IfNotPresent")]
    IfNotPresent,
    #[value(name = "Never")]
    Never,
}

impl ImagePullPolicy {
    pub const VARIANTS: &'static [&'static str] = &["Always", "IfNotPresent", "Never"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "Always",
            Self::IfNotPresent => "IfNotPresent",
            Self::Never => "Never",
        }
    }
}

impl fmt::Display for ImagePullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImagePullPolicy {
    type Err = String;

    /// Exact, case-sensitive match as in the Kubernetes API.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Always" => Ok(Self::Always),
            "IfNotPresent" => Ok(Self::IfNotPresent),
            "Never" => Ok(Self::Never),
            _ => Err(format!(
                "supported values: {}",
                Self::VARIANTS.join(", ")
            )),
        }
    }
}

/// Named timeouts handed to the upgrade execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutSet {
    #[serde(serialize_with = "duration::serialize")]
    pub discovery: Duration,
    #[serde(serialize_with = "duration::serialize")]
    pub control_plane_component_health_check: Duration,
    #[serde(serialize_with = "duration::serialize")]
    pub kubelet_health_check: Duration,
    #[serde(rename = "kubernetesAPICall", serialize_with = "duration::serialize")]
    pub kubernetes_api_call: Duration,
    #[serde(rename = "etcdAPICall", serialize_with = "duration::serialize")]
    pub etcd_api_call: Duration,
    #[serde(serialize_with = "duration::serialize")]
    pub tls_bootstrap: Duration,
    #[serde(serialize_with = "duration::serialize")]
    pub upgrade_manifests: Duration,
}

impl TimeoutSet {
    /// Built-in kubeadm timeouts.
    pub fn kubeadm() -> Self {
        Self {
            discovery: Duration::from_secs(5 * 60),
            control_plane_component_health_check: Duration::from_secs(4 * 60),
            kubelet_health_check: Duration::from_secs(4 * 60),
            kubernetes_api_call: Duration::from_secs(60),
            etcd_api_call: Duration::from_secs(2 * 60),
            tls_bootstrap: Duration::from_secs(5 * 60),
            upgrade_manifests: Duration::from_secs(5 * 60),
        }
    }
}

impl Default for TimeoutSet {
    fn default() -> Self {
        Self::kubeadm()
    }
}

/// Timeouts present in a configuration file; `None` keeps the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeoutOverrides {
    pub discovery: Option<Duration>,
    pub control_plane_component_health_check: Option<Duration>,
    pub kubelet_health_check: Option<Duration>,
    pub kubernetes_api_call: Option<Duration>,
    pub etcd_api_call: Option<Duration>,
    pub tls_bootstrap: Option<Duration>,
    pub upgrade_manifests: Option<Duration>,
}
