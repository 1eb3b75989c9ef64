//! `UpgradeConfiguration` document: file format, loader and validation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::defaults::{Defaults, KUBEADM_API_GROUP, UPGRADE_CONFIGURATION_KIND};
use crate::duration::parse_duration;
use crate::error::ApplyError;
use crate::types::{ImagePullPolicy, TimeoutOverrides};
use crate::version::parse_target_version;

/// Versioned upgrade configuration document.
///
/// Every setting is optional so that an explicit `false` in the file can be
/// told apart from an absent key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpgradeConfigurationDocument {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub apply: Option<ApplySection>,
    #[serde(default)]
    pub node: Option<NodeSection>,
    #[serde(default)]
    pub plan: Option<PlanSection>,
    #[serde(default)]
    pub diff: Option<DiffSection>,
    #[serde(default)]
    pub timeouts: Option<TimeoutsSection>,
}

/// Settings for `upgrade apply`.
///
/// `kubernetesVersion`, `patches` and `skipPhases` are validated but the
/// target version always comes from the command line.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApplySection {
    pub kubernetes_version: Option<String>,
    pub certificate_renewal: Option<bool>,
    pub etcd_upgrade: Option<bool>,
    pub image_pull_policy: Option<String>,
    pub image_pull_serial: Option<bool>,
    pub dry_run: Option<bool>,
    pub force_upgrade: Option<bool>,
    pub ignore_preflight_errors: Option<Vec<String>>,
    pub allow_experimental_upgrades: Option<bool>,
    #[serde(rename = "allowRCUpgrades")]
    pub allow_rc_upgrades: Option<bool>,
    pub print_config: Option<bool>,
    pub patches: Option<PatchesSection>,
    pub skip_phases: Option<Vec<String>>,
}

/// Settings for `upgrade node`. Validated but not consumed by apply.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NodeSection {
    pub certificate_renewal: Option<bool>,
    pub etcd_upgrade: Option<bool>,
    pub image_pull_policy: Option<String>,
    pub image_pull_serial: Option<bool>,
    pub dry_run: Option<bool>,
    pub ignore_preflight_errors: Option<Vec<String>>,
    pub patches: Option<PatchesSection>,
    pub skip_phases: Option<Vec<String>>,
}

/// Settings for `upgrade plan`. Validated but not consumed by apply.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PlanSection {
    pub kubernetes_version: Option<String>,
    pub allow_experimental_upgrades: Option<bool>,
    #[serde(rename = "allowRCUpgrades")]
    pub allow_rc_upgrades: Option<bool>,
    pub dry_run: Option<bool>,
    pub ignore_preflight_errors: Option<Vec<String>>,
    pub print_config: Option<bool>,
}

/// Settings for `upgrade diff`. Validated but not consumed by apply.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DiffSection {
    pub kubernetes_version: Option<String>,
    pub context_lines: Option<i64>,
}

/// Location of component manifest patches.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PatchesSection {
    pub directory: Option<String>,
}

/// Timeouts as written in the file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TimeoutsSection {
    pub discovery: Option<String>,
    pub control_plane_component_health_check: Option<String>,
    pub kubelet_health_check: Option<String>,
    #[serde(rename = "kubernetesAPICall")]
    pub kubernetes_api_call: Option<String>,
    #[serde(rename = "etcdAPICall")]
    pub etcd_api_call: Option<String>,
    pub tls_bootstrap: Option<String>,
    pub upgrade_manifests: Option<String>,
}

/// Typed, validated values contributed by the file to `upgrade apply`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileLayer {
    pub certificate_renewal: Option<bool>,
    pub etcd_upgrade: Option<bool>,
    pub image_pull_policy: Option<ImagePullPolicy>,
    pub image_pull_serial: Option<bool>,
    pub dry_run: Option<bool>,
    pub force: Option<bool>,
    pub ignore_preflight_errors: Vec<String>,
    pub allow_experimental_upgrades: Option<bool>,
    pub allow_rc_upgrades: Option<bool>,
    pub print_config: Option<bool>,
    pub timeouts: TimeoutOverrides,
}

/// Read `path` and decode its `UpgradeConfiguration` document.
///
/// The file may carry several YAML documents; other kinds are skipped. A
/// kubeadm document with an API version outside `defaults` is rejected.
pub fn load_upgrade_configuration(
    path: &Path,
    defaults: &Defaults,
) -> Result<UpgradeConfigurationDocument, ApplyError> {
    let content = fs::read_to_string(path).map_err(|source| ApplyError::ConfigFileRead {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Read config file {} ({} bytes)", path.display(), content.len());

    decode_upgrade_configuration(&content, path, defaults)
}

/// Decode configuration content already read from `path`.
pub fn decode_upgrade_configuration(
    content: &str,
    path: &Path,
    defaults: &Defaults,
) -> Result<UpgradeConfigurationDocument, ApplyError> {
    let decode_err = |reason: String| ApplyError::ConfigDecode {
        path: path.to_path_buf(),
        reason,
    };
    let invalid = |reason: String| ApplyError::InvalidDocument {
        path: path.to_path_buf(),
        reason,
    };

    let mut found: Vec<UpgradeConfigurationDocument> = Vec::new();

    for (index, doc) in serde_yaml::Deserializer::from_str(content).enumerate() {
        let value = serde_yaml::Value::deserialize(doc).map_err(|e| decode_err(e.to_string()))?;
        if value.is_null() {
            continue;
        }

        let api_version = value
            .get("apiVersion")
            .and_then(serde_yaml::Value::as_str)
            .ok_or_else(|| invalid(format!("document {}: missing apiVersion", index + 1)))?
            .to_string();
        let kind = value
            .get("kind")
            .and_then(serde_yaml::Value::as_str)
            .ok_or_else(|| invalid(format!("document {}: missing kind", index + 1)))?
            .to_string();

        let is_kubeadm_group = api_version
            .split_once('/')
            .is_some_and(|(group, _)| group == KUBEADM_API_GROUP);

        if (kind == UPGRADE_CONFIGURATION_KIND || is_kubeadm_group)
            && !defaults.supports_api_version(&api_version)
        {
            return Err(ApplyError::UnsupportedApiVersion {
                path: path.to_path_buf(),
                api_version,
                supported: defaults.supported_api_versions().join(", "),
            });
        }

        if kind != UPGRADE_CONFIGURATION_KIND {
            warn!(
                "Ignoring {} document ({}) in {}",
                kind,
                api_version,
                path.display()
            );
            continue;
        }

        let document: UpgradeConfigurationDocument =
            serde_yaml::from_value(value).map_err(|e| decode_err(e.to_string()))?;
        found.push(document);
    }

    match found.len() {
        0 => Err(invalid(format!(
            "no {} document found",
            UPGRADE_CONFIGURATION_KIND
        ))),
        1 => Ok(found.remove(0)),
        n => Err(invalid(format!(
            "found {} {} documents, expected exactly one",
            n, UPGRADE_CONFIGURATION_KIND
        ))),
    }
}

impl UpgradeConfigurationDocument {
    /// Validate the document and extract the values relevant to `upgrade apply`.
    ///
    /// The `node`, `plan` and `diff` sections are validated too, even though
    /// apply ignores them.
    pub fn apply_layer(&self, path: &Path) -> Result<FileLayer, ApplyError> {
        let timeouts = match &self.timeouts {
            Some(section) => section.overrides(path)?,
            None => TimeoutOverrides::default(),
        };

        if let Some(node) = &self.node {
            parse_image_pull_policy("node.imagePullPolicy", node.image_pull_policy.as_deref())?;
        }
        if let Some(plan) = &self.plan {
            check_kubernetes_version("plan.kubernetesVersion", plan.kubernetes_version.as_deref())?;
        }
        if let Some(diff) = &self.diff {
            check_kubernetes_version("diff.kubernetesVersion", diff.kubernetes_version.as_deref())?;
            if let Some(lines) = diff.context_lines.filter(|n| *n < 0) {
                return Err(ApplyError::InvalidValue {
                    field: "diff.contextLines".to_string(),
                    value: lines.to_string(),
                    reason: "must be greater than or equal to 0".to_string(),
                });
            }
        }

        let Some(apply) = &self.apply else {
            return Ok(FileLayer {
                timeouts,
                ..Default::default()
            });
        };

        check_kubernetes_version("apply.kubernetesVersion", apply.kubernetes_version.as_deref())?;

        Ok(FileLayer {
            certificate_renewal: apply.certificate_renewal,
            etcd_upgrade: apply.etcd_upgrade,
            image_pull_policy: parse_image_pull_policy(
                "apply.imagePullPolicy",
                apply.image_pull_policy.as_deref(),
            )?,
            image_pull_serial: apply.image_pull_serial,
            dry_run: apply.dry_run,
            force: apply.force_upgrade,
            ignore_preflight_errors: apply.ignore_preflight_errors.clone().unwrap_or_default(),
            allow_experimental_upgrades: apply.allow_experimental_upgrades,
            allow_rc_upgrades: apply.allow_rc_upgrades,
            print_config: apply.print_config,
            timeouts,
        })
    }
}

impl TimeoutsSection {
    fn overrides(&self, path: &Path) -> Result<TimeoutOverrides, ApplyError> {
        let parse = |field: &str, value: &Option<String>| -> Result<Option<Duration>, ApplyError> {
            value
                .as_deref()
                .map(|raw| {
                    parse_duration(raw).map_err(|reason| ApplyError::InvalidDocument {
                        path: path.to_path_buf(),
                        reason: format!("timeouts.{}: {}", field, reason),
                    })
                })
                .transpose()
        };

        Ok(TimeoutOverrides {
            discovery: parse("discovery", &self.discovery)?,
            control_plane_component_health_check: parse(
                "controlPlaneComponentHealthCheck",
                &self.control_plane_component_health_check,
            )?,
            kubelet_health_check: parse("kubeletHealthCheck", &self.kubelet_health_check)?,
            kubernetes_api_call: parse("kubernetesAPICall", &self.kubernetes_api_call)?,
            etcd_api_call: parse("etcdAPICall", &self.etcd_api_call)?,
            tls_bootstrap: parse("tlsBootstrap", &self.tls_bootstrap)?,
            upgrade_manifests: parse("upgradeManifests", &self.upgrade_manifests)?,
        })
    }
}

fn parse_image_pull_policy(
    field: &str,
    raw: Option<&str>,
) -> Result<Option<ImagePullPolicy>, ApplyError> {
    raw.map(|value| {
        value
            .parse::<ImagePullPolicy>()
            .map_err(|reason| ApplyError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
                reason,
            })
    })
    .transpose()
}

fn check_kubernetes_version(field: &str, raw: Option<&str>) -> Result<(), ApplyError> {
    match raw {
        Some(value) => parse_target_version(value)
            .map(|_| ())
            .map_err(|e| ApplyError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
                reason: match e {
                    ApplyError::InvalidVersion(_, reason) => reason,
                    other => other.to_string(),
                },
            }),
        None => Ok(()),
    }
}
