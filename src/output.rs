//! Console rendering of the resolved configuration.

use colored::Colorize;

use crate::duration::format_duration;
use crate::resolve::ApplySettings;

/// Print a short summary of the resolved configuration.
pub fn print_settings_summary(settings: &ApplySettings) {
    println!();
    println!(
        "{} {}",
        "Upgrade apply configuration:".bold(),
        settings.target_version.cyan().bold()
    );
    println!("{}", "-".repeat(40));

    let source = settings
        .config_file_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(flags only)".to_string());
    println!("  Config file:          {}", source);
    println!(
        "  Kubeconfig:           {}",
        settings.kubeconfig_path.display()
    );
    println!("  Etcd upgrade:         {}", on_off(settings.etcd_upgrade));
    println!(
        "  Certificate renewal:  {}",
        on_off(settings.certificate_renewal)
    );
    println!(
        "  Image pull:           {} ({})",
        settings.image_pull_policy,
        if settings.image_pull_serial {
            "serial"
        } else {
            "parallel"
        }
    );

    if settings.preflight_skip_list.is_empty() {
        println!("  Skipped preflight:    none");
    } else {
        let names: Vec<&str> = settings
            .preflight_skip_list
            .iter()
            .map(String::as_str)
            .collect();
        println!("  Skipped preflight:    {}", names.join(", ").yellow());
    }

    if !settings.feature_gates.is_empty() {
        let gates: Vec<String> = settings
            .feature_gates
            .iter()
            .map(|(name, enabled)| format!("{}={}", name, enabled))
            .collect();
        println!("  Feature gates:        {}", gates.join(","));
    }

    let t = &settings.timeouts;
    println!(
        "  Timeouts:             discovery={} upgradeManifests={} kubernetesAPICall={} etcdAPICall={}",
        format_duration(t.discovery),
        format_duration(t.upgrade_manifests),
        format_duration(t.kubernetes_api_call),
        format_duration(t.etcd_api_call),
    );

    if settings.dry_run {
        println!("{}", "[DRY RUN] No changes will be made.".yellow());
    }
    if settings.force {
        println!("{}", "[FORCE] Upgrade requirements will not be enforced.".yellow());
    }
}

fn on_off(enabled: bool) -> colored::ColoredString {
    if enabled {
        "enabled".green()
    } else {
        "disabled".red()
    }
}
