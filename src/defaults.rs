//! Built-in defaults, the registry of known preflight checks and the known
//! feature gates.
//!
//! Everything here is constructed explicitly and passed into the resolver,
//! so tests can substitute their own registry.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{ImagePullPolicy, TimeoutSet};

/// Default kubeconfig used by `kubeadm upgrade apply`.
pub const ADMIN_KUBECONFIG: &str = "/etc/kubernetes/admin.conf";

/// API group of kubeadm configuration documents.
pub const KUBEADM_API_GROUP: &str = "kubeadm.k8s.io";

/// Kind of the upgrade configuration document.
pub const UPGRADE_CONFIGURATION_KIND: &str = "UpgradeConfiguration";

/// Special skip-list entry that ignores every preflight check.
pub const SKIP_ALL_CHECKS: &str = "all";

/// Preflight checks run by the upgrade flow.
const KUBEADM_UPGRADE_CHECKS: &[&str] = &[
    "IsPrivilegedUser",
    "ImagePull",
    "CreateJob",
    "ControlPlaneNodesReady",
    "StaticPodManifest",
    "CoreDNSUnsupportedPlugins",
    "CoreDNSMigration",
    "KubeletVersion",
    "KubernetesVersion",
    "SystemVerification",
    "Swap",
    "NumCPU",
    "Mem",
];

/// Feature gates understood by kubeadm, with their default state.
const KUBEADM_FEATURE_GATES: &[(&str, bool)] = &[
    ("ControlPlaneKubeletLocalMode", false),
    ("EtcdLearnerMode", true),
    ("NodeLocalCRISocket", false),
    ("PublicKeysECDSA", false),
    ("RootlessControlPlane", false),
    ("WaitForAllControlPlaneComponents", false),
];

/// Immutable lookup table of defaults consulted by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    known_checks: BTreeSet<String>,
    supported_api_versions: Vec<String>,
    known_feature_gates: BTreeMap<String, bool>,
    pub timeouts: TimeoutSet,
    pub etcd_upgrade: bool,
    pub certificate_renewal: bool,
    pub image_pull_policy: ImagePullPolicy,
    pub image_pull_serial: bool,
}

impl Defaults {
    /// Defaults matching kubeadm `v1beta4`.
    pub fn kubeadm() -> Self {
        Self {
            known_checks: KUBEADM_UPGRADE_CHECKS
                .iter()
                .map(|c| c.to_lowercase())
                .collect(),
            supported_api_versions: vec![format!("{}/v1beta4", KUBEADM_API_GROUP)],
            known_feature_gates: KUBEADM_FEATURE_GATES
                .iter()
                .map(|(name, enabled)| (name.to_string(), *enabled))
                .collect(),
            timeouts: TimeoutSet::kubeadm(),
            etcd_upgrade: true,
            certificate_renewal: true,
            image_pull_policy: ImagePullPolicy::IfNotPresent,
            image_pull_serial: true,
        }
    }

    /// Replace the preflight check registry.
    pub fn with_known_checks<I, S>(mut self, checks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.known_checks = checks
            .into_iter()
            .map(|c| c.as_ref().to_lowercase())
            .collect();
        self
    }

    /// Replace the built-in timeouts.
    pub fn with_timeouts(mut self, timeouts: TimeoutSet) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Replace the accepted `apiVersion` values.
    pub fn with_supported_api_versions<I, S>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_api_versions = versions.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the known feature gates. Every gate defaults to disabled.
    pub fn with_known_feature_gates<I, S>(mut self, gates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_feature_gates = gates.into_iter().map(|g| (g.into(), false)).collect();
        self
    }

    /// Default state of a known gate, `None` for unknown names. Feature gate
    /// names are case-sensitive.
    pub fn feature_gate_default(&self, name: &str) -> Option<bool> {
        self.known_feature_gates.get(name).copied()
    }

    /// Case-insensitive registry lookup.
    pub fn is_known_check(&self, name: &str) -> bool {
        self.known_checks.contains(&name.to_lowercase())
    }

    pub fn supports_api_version(&self, api_version: &str) -> bool {
        self.supported_api_versions.iter().any(|v| v == api_version)
    }

    pub fn supported_api_versions(&self) -> &[String] {
        &self.supported_api_versions
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self::kubeadm()
    }
}
