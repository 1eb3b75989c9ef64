//! Merges positional arguments, flags and the config file into the
//! configuration consumed by the upgrade.
//!
//! Stages run in a fixed order and stop at the first failure:
//! arguments, config file, field validation, client construction.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::ApplyFlags;
use crate::defaults::Defaults;
use crate::document::{FileLayer, load_upgrade_configuration};
use crate::error::ApplyError;
use crate::features::parse_feature_gates;
use crate::interactive::session_is_interactive;
use crate::k8s::client::ClientFactory;
use crate::preflight::{merge_skip_list, validate_skip_list};
use crate::types::{ImagePullPolicy, TimeoutOverrides, TimeoutSet};
use crate::version;

/// Layer a resolved value was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Flag,
    File,
    Default,
}

/// Pick a value with precedence explicit flag > file > default.
pub fn layer<T>(flag: Option<T>, file: Option<T>, default: T) -> (T, Source) {
    match (flag, file) {
        (Some(value), _) => (value, Source::Flag),
        (None, Some(value)) => (value, Source::File),
        (None, None) => (default, Source::Default),
    }
}

fn pick<T: Debug>(setting: &str, flag: Option<T>, file: Option<T>, default: T) -> T {
    let (value, source) = layer(flag, file, default);
    debug!(setting, ?source, ?value, "Resolved setting");
    value
}

/// Every resolved setting apart from the client handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplySettings {
    pub target_version: String,
    pub non_interactive_mode: bool,
    pub dry_run: bool,
    pub force: bool,
    pub config_file_path: Option<PathBuf>,
    pub kubeconfig_path: PathBuf,
    pub preflight_skip_list: BTreeSet<String>,
    pub etcd_upgrade: bool,
    pub certificate_renewal: bool,
    pub image_pull_policy: ImagePullPolicy,
    pub image_pull_serial: bool,
    pub allow_experimental_upgrades: bool,
    #[serde(rename = "allowRCUpgrades")]
    pub allow_rc_upgrades: bool,
    pub print_config: bool,
    pub feature_gates: BTreeMap<String, bool>,
    pub timeouts: TimeoutSet,
}

impl ApplySettings {
    /// Whether confirmation prompts may be shown. Evaluated on every call.
    pub fn session_is_interactive(&self) -> bool {
        session_is_interactive(self.non_interactive_mode, self.dry_run, self.force)
    }

    /// True if every preflight check is skipped.
    pub fn skips_all_preflight_checks(&self) -> bool {
        self.preflight_skip_list
            .contains(crate::defaults::SKIP_ALL_CHECKS)
    }
}

/// Fully validated configuration together with its cluster client.
#[derive(Debug)]
pub struct ResolvedApplyConfig<C> {
    settings: ApplySettings,
    client: C,
}

impl<C> ResolvedApplyConfig<C> {
    pub fn settings(&self) -> &ApplySettings {
        &self.settings
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_parts(self) -> (ApplySettings, C) {
        (self.settings, self.client)
    }

    pub fn session_is_interactive(&self) -> bool {
        self.settings.session_is_interactive()
    }
}

/// Resolve the `upgrade apply` configuration.
///
/// No partial configuration is returned: either every field is valid and a
/// client exists, or the error of the first failing stage is returned.
pub fn resolve_apply_config<F: ClientFactory>(
    args: &[String],
    flags: &ApplyFlags,
    defaults: &Defaults,
    factory: &F,
) -> Result<ResolvedApplyConfig<F::Client>, ApplyError> {
    // Arguments
    let target = match args {
        [] => return Err(ApplyError::MissingVersion),
        [version] => version::parse_target_version(version)?,
        _ => {
            return Err(ApplyError::TooManyArguments(args.len(), args.join(" ")));
        }
    };
    debug!("Target version: {}", version::normalize(&target));

    // Config file
    let file = match &flags.config_path {
        Some(path) => {
            let document = load_upgrade_configuration(path, defaults)?;
            let file = document.apply_layer(path)?;
            info!("Loaded UpgradeConfiguration from {}", path.display());
            file
        }
        None => FileLayer::default(),
    };

    // Field validation
    let preflight_skip_list = merge_skip_list(
        flags
            .ignore_preflight_errors
            .iter()
            .chain(file.ignore_preflight_errors.iter())
            .map(String::as_str),
    );
    let preflight_skip_list = validate_skip_list(&preflight_skip_list, defaults)?;

    let feature_gates = match &flags.feature_gates {
        Some(raw) => parse_feature_gates(raw, defaults)?,
        None => BTreeMap::new(),
    };

    let allow_experimental_upgrades = pick(
        "allowExperimentalUpgrades",
        flags.allow_experimental_upgrades,
        file.allow_experimental_upgrades,
        false,
    );
    let allow_rc_upgrades = pick(
        "allowRCUpgrades",
        flags.allow_rc_upgrades,
        file.allow_rc_upgrades,
        false,
    );
    version::enforce_channel_policy(&target, allow_experimental_upgrades, allow_rc_upgrades)?;

    let settings = ApplySettings {
        target_version: version::normalize(&target),
        non_interactive_mode: flags.non_interactive,
        dry_run: pick("dryRun", flags.dry_run, file.dry_run, false),
        force: pick("forceUpgrade", flags.force, file.force, false),
        config_file_path: flags.config_path.clone(),
        kubeconfig_path: flags.kubeconfig.clone(),
        preflight_skip_list,
        etcd_upgrade: pick(
            "etcdUpgrade",
            flags.etcd_upgrade,
            file.etcd_upgrade,
            defaults.etcd_upgrade,
        ),
        certificate_renewal: pick(
            "certificateRenewal",
            flags.certificate_renewal,
            file.certificate_renewal,
            defaults.certificate_renewal,
        ),
        image_pull_policy: pick(
            "imagePullPolicy",
            flags.image_pull_policy,
            file.image_pull_policy,
            defaults.image_pull_policy,
        ),
        image_pull_serial: pick(
            "imagePullSerial",
            flags.image_pull_serial,
            file.image_pull_serial,
            defaults.image_pull_serial,
        ),
        allow_experimental_upgrades,
        allow_rc_upgrades,
        print_config: pick("printConfig", flags.print_config, file.print_config, false),
        feature_gates,
        timeouts: overlay_timeouts(&defaults.timeouts, &file.timeouts),
    };

    // Client
    let client = factory
        .client_from_kubeconfig(&settings.kubeconfig_path)
        .map_err(|e| ApplyError::ClientCreate {
            path: settings.kubeconfig_path.clone(),
            reason: format!("{:#}", e),
        })?;

    info!(
        "Resolved upgrade apply configuration for {} (dry_run: {}, force: {})",
        settings.target_version, settings.dry_run, settings.force
    );

    Ok(ResolvedApplyConfig { settings, client })
}

/// Apply file-provided timeouts on top of the built-in ones.
pub fn overlay_timeouts(defaults: &TimeoutSet, file: &TimeoutOverrides) -> TimeoutSet {
    TimeoutSet {
        discovery: layer(None, file.discovery, defaults.discovery).0,
        control_plane_component_health_check: layer(
            None,
            file.control_plane_component_health_check,
            defaults.control_plane_component_health_check,
        )
        .0,
        kubelet_health_check: layer(None, file.kubelet_health_check, defaults.kubelet_health_check)
            .0,
        kubernetes_api_call: layer(None, file.kubernetes_api_call, defaults.kubernetes_api_call).0,
        etcd_api_call: layer(None, file.etcd_api_call, defaults.etcd_api_call).0,
        tls_bootstrap: layer(None, file.tls_bootstrap, defaults.tls_bootstrap).0,
        upgrade_manifests: layer(None, file.upgrade_manifests, defaults.upgrade_manifests).0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::cell::Cell;
    use std::path::Path;
    use std::time::Duration;

    /// Factory that counts calls and optionally fails.
    struct FakeFactory {
        fail: bool,
        calls: Cell<usize>,
    }

    impl FakeFactory {
        fn ok() -> Self {
            Self {
                fail: false,
                calls: Cell::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                calls: Cell::new(0),
            }
        }
    }

    impl ClientFactory for FakeFactory {
        type Client = usize;

        fn client_from_kubeconfig(&self, path: &Path) -> anyhow::Result<usize> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                anyhow::bail!("no such file: {}", path.display());
            }
            Ok(self.calls.get())
        }
    }

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_layer_precedence() {
        assert_eq!(layer(Some(false), Some(true), true), (false, Source::Flag));
        assert_eq!(layer(None, Some(false), true), (false, Source::File));
        assert_eq!(layer::<bool>(None, None, true), (true, Source::Default));
    }

    #[test]
    fn test_overlay_timeouts_keeps_absent_defaults() {
        let overrides = TimeoutOverrides {
            discovery: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        let merged = overlay_timeouts(&TimeoutSet::kubeadm(), &overrides);
        assert_eq!(merged.discovery, Duration::from_secs(30));
        assert_eq!(merged.upgrade_manifests, TimeoutSet::kubeadm().upgrade_manifests);
    }

    #[test]
    fn test_missing_version() {
        let factory = FakeFactory::ok();
        let err = resolve_apply_config(&[], &ApplyFlags::default(), &Defaults::kubeadm(), &factory)
            .unwrap_err();
        assert!(err.to_string().contains("version"));
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(factory.calls.get(), 0);
    }

    #[test]
    fn test_too_many_arguments() {
        let err = resolve_apply_config(
            &args(&["v1.31.0", "v1.32.0"]),
            &ApplyFlags::default(),
            &Defaults::kubeadm(),
            &FakeFactory::ok(),
        )
        .unwrap_err();
        assert!(matches!(err, ApplyError::TooManyArguments(2, _)));
    }

    #[test]
    fn test_defaults_without_file() {
        let resolved = resolve_apply_config(
            &args(&["1.31.2"]),
            &ApplyFlags::default(),
            &Defaults::kubeadm(),
            &FakeFactory::ok(),
        )
        .unwrap();
        let settings = resolved.settings();
        assert_eq!(settings.target_version, "v1.31.2");
        assert!(settings.etcd_upgrade);
        assert!(settings.certificate_renewal);
        assert!(settings.image_pull_serial);
        assert_eq!(settings.image_pull_policy, ImagePullPolicy::IfNotPresent);
        assert_eq!(settings.timeouts, TimeoutSet::kubeadm());
        assert!(settings.preflight_skip_list.is_empty());
        assert!(resolved.session_is_interactive());
        assert_eq!(*resolved.client(), 1);
    }

    #[test]
    fn test_flags_override_defaults() {
        let flags = ApplyFlags {
            etcd_upgrade: Some(false),
            image_pull_policy: Some(ImagePullPolicy::Always),
            dry_run: Some(true),
            ..Default::default()
        };
        let resolved = resolve_apply_config(
            &args(&["v1.31.2"]),
            &flags,
            &Defaults::kubeadm(),
            &FakeFactory::ok(),
        )
        .unwrap();
        assert!(!resolved.settings().etcd_upgrade);
        assert_eq!(resolved.settings().image_pull_policy, ImagePullPolicy::Always);
        assert!(!resolved.session_is_interactive());
    }

    #[test]
    fn test_invalid_preflight_check_skips_client() {
        let flags = ApplyFlags {
            ignore_preflight_errors: args(&["all,Something-Else"]),
            ..Default::default()
        };
        let factory = FakeFactory::ok();
        let err = resolve_apply_config(&args(&["v1.1.0"]), &flags, &Defaults::kubeadm(), &factory)
            .unwrap_err();
        assert!(err.to_string().contains("\"Something-Else\""));
        assert_eq!(factory.calls.get(), 0);
    }

    #[test]
    fn test_client_failure_is_connectivity_error() {
        let flags = ApplyFlags {
            kubeconfig: PathBuf::from("invalid-kubeconfig-path"),
            ..Default::default()
        };
        let err = resolve_apply_config(
            &args(&["v1.1.0"]),
            &flags,
            &Defaults::kubeadm(),
            &FakeFactory::failing(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connectivity);
        assert!(
            err.to_string()
                .contains("couldn't create a Kubernetes client from file")
        );
        assert!(err.to_string().contains("invalid-kubeconfig-path"));
    }

    #[test]
    fn test_rc_target_requires_allow_flag() {
        let factory = FakeFactory::ok();
        let err = resolve_apply_config(
            &args(&["v1.32.0-rc.1"]),
            &ApplyFlags::default(),
            &Defaults::kubeadm(),
            &factory,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let flags = ApplyFlags {
            allow_rc_upgrades: Some(true),
            ..Default::default()
        };
        let resolved =
            resolve_apply_config(&args(&["v1.32.0-rc.1"]), &flags, &Defaults::kubeadm(), &factory)
                .unwrap();
        assert!(resolved.settings().allow_rc_upgrades);
    }

    #[test]
    fn test_skip_all_preflight_checks() {
        let flags = ApplyFlags {
            ignore_preflight_errors: args(&["All"]),
            ..Default::default()
        };
        let resolved = resolve_apply_config(
            &args(&["v1.31.2"]),
            &flags,
            &Defaults::kubeadm(),
            &FakeFactory::ok(),
        )
        .unwrap();
        assert!(resolved.settings().skips_all_preflight_checks());
    }

    #[test]
    fn test_feature_gates_resolved_from_flag() {
        let flags = ApplyFlags {
            feature_gates: Some("EtcdLearnerMode=false,PublicKeysECDSA=true".to_string()),
            ..Default::default()
        };
        let resolved = resolve_apply_config(
            &args(&["v1.31.2"]),
            &flags,
            &Defaults::kubeadm(),
            &FakeFactory::ok(),
        )
        .unwrap();
        let gates = &resolved.settings().feature_gates;
        assert_eq!(gates.get("EtcdLearnerMode"), Some(&false));
        assert_eq!(gates.get("PublicKeysECDSA"), Some(&true));
    }

    #[test]
    fn test_malformed_feature_gate_skips_client() {
        let flags = ApplyFlags {
            feature_gates: Some("EtcdLearnerMode".to_string()),
            ..Default::default()
        };
        let factory = FakeFactory::ok();
        let err = resolve_apply_config(&args(&["v1.31.2"]), &flags, &Defaults::kubeadm(), &factory)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("missing bool value"));
        assert_eq!(factory.calls.get(), 0);
    }

    #[test]
    fn test_unknown_feature_gate_rejected() {
        let flags = ApplyFlags {
            feature_gates: Some("NoSuchGate=true".to_string()),
            ..Default::default()
        };
        let factory = FakeFactory::ok();
        let err = resolve_apply_config(&args(&["v1.31.2"]), &flags, &Defaults::kubeadm(), &factory)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("NoSuchGate"));
        assert_eq!(factory.calls.get(), 0);
    }

    #[test]
    fn test_into_parts_hands_over_settings_and_client() {
        let flags = ApplyFlags {
            non_interactive: true,
            ..Default::default()
        };
        let resolved = resolve_apply_config(
            &args(&["v1.31.2"]),
            &flags,
            &Defaults::kubeadm(),
            &FakeFactory::ok(),
        )
        .unwrap();
        let (settings, client) = resolved.into_parts();
        assert_eq!(settings.target_version, "v1.31.2");
        assert!(settings.non_interactive_mode);
        assert!(!settings.session_is_interactive());
        assert!(settings.feature_gates.is_empty());
        assert_eq!(client, 1);
    }

    #[test]
    fn test_settings_print_as_yaml() {
        let resolved = resolve_apply_config(
            &args(&["v1.31.2"]),
            &ApplyFlags::default(),
            &Defaults::kubeadm(),
            &FakeFactory::ok(),
        )
        .unwrap();
        let yaml = serde_yaml::to_string(resolved.settings()).unwrap();
        assert!(yaml.contains("targetVersion: v1.31.2"));
        assert!(yaml.contains("imagePullPolicy: IfNotPresent"));
        assert!(yaml.contains("upgradeManifests: 5m0s"));
    }
}
