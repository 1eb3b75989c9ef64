//! CLI configuration and argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::defaults::ADMIN_KUBECONFIG;
use crate::types::ImagePullPolicy;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const COMMIT: &str = env!("BUILD_COMMIT");
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Resolve and validate the configuration for a control plane upgrade.
///
/// Merges the target version, command-line flags and an optional
/// UpgradeConfiguration file, then builds a client from the kubeconfig.
#[derive(Parser, Debug, Clone)]
#[command(name = "kua")]
#[command(about = "Kubernetes control plane upgrade apply tool")]
#[command(version = const_format::formatcp!(
    "{} (commit: {}, build date: {})",
    VERSION, COMMIT, BUILD_DATE
))]
pub struct Args {
    /// Target Kubernetes version (e.g., v1.31.2)
    #[arg(value_name = "VERSION")]
    pub args: Vec<String>,

    #[command(flatten)]
    pub flags: ApplyFlags,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "KUA_LOG_LEVEL")]
    pub log_level: String,
}

/// Flags of `upgrade apply`.
///
/// Settings that a config file can also provide are `Option`s: `None` means
/// the flag was not given on the command line. Boolean flags accept a bare
/// `--flag` (true) or `--flag=false`.
#[derive(clap::Args, Debug, Clone)]
pub struct ApplyFlags {
    /// Path to an UpgradeConfiguration file
    #[arg(long = "config", value_name = "PATH")]
    pub config_path: Option<PathBuf>,

    /// Kubeconfig file used to talk to the cluster
    #[arg(long, value_name = "PATH", default_value = ADMIN_KUBECONFIG)]
    pub kubeconfig: PathBuf,

    /// Preflight checks whose errors are shown as warnings (e.g. 'ImagePull,Swap'). 'all' ignores every check.
    #[arg(long, value_name = "CHECKS")]
    pub ignore_preflight_errors: Vec<String>,

    /// Perform the upgrade without prompting for confirmation
    #[arg(short = 'y', long = "yes", default_value = "false")]
    pub non_interactive: bool,

    /// Do not change any state, just output what actions would be performed
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub dry_run: Option<bool>,

    /// Force upgrading although some requirements might not be met
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub force: Option<bool>,

    /// Upgrade etcd [default: true]
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub etcd_upgrade: Option<bool>,

    /// Renew certificates during the upgrade [default: true]
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub certificate_renewal: Option<bool>,

    /// Image pull policy for control plane images [default: IfNotPresent]
    #[arg(long, value_enum, value_name = "POLICY")]
    pub image_pull_policy: Option<ImagePullPolicy>,

    /// Pull images one at a time [default: true]
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub image_pull_serial: Option<bool>,

    /// Allow upgrading to alpha/beta versions
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub allow_experimental_upgrades: Option<bool>,

    /// Allow upgrading to release candidate versions
    #[arg(
        long = "allow-release-candidate-upgrades",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub allow_rc_upgrades: Option<bool>,

    /// Print the resolved configuration as YAML
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub print_config: Option<bool>,

    /// Feature gates as key=value pairs (e.g. 'ControlPlaneKubeletLocalMode=true,EtcdLearnerMode=false')
    #[arg(long, value_name = "GATES")]
    pub feature_gates: Option<String>,
}

impl Default for ApplyFlags {
    fn default() -> Self {
        Self {
            config_path: None,
            kubeconfig: PathBuf::from(ADMIN_KUBECONFIG),
            ignore_preflight_errors: Vec::new(),
            non_interactive: false,
            dry_run: None,
            force: None,
            etcd_upgrade: None,
            certificate_renewal: None,
            image_pull_policy: None,
            image_pull_serial: None,
            allow_experimental_upgrades: None,
            allow_rc_upgrades: None,
            print_config: None,
            feature_gates: None,
        }
    }
}
