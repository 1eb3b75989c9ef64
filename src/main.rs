//! kua - Kubernetes control plane upgrade apply tool.
//!
//! Resolves the upgrade configuration from the target version, flags and an
//! optional UpgradeConfiguration file, then asks for confirmation when the
//! session is interactive.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use dialoguer::Confirm;
use tracing::{debug, error, info};

use kua::config::Args;
use kua::defaults::Defaults;
use kua::k8s::client::KubeClientFactory;
use kua::output::print_settings_summary;
use kua::resolve_apply_config;

fn main() {
    let args = Args::parse();

    if let Err(e) = init_tracing(&args.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    debug!("Starting kua - Kubernetes Upgrade Apply");

    if let Err(e) = run(&args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Main application logic.
fn run(args: &Args) -> Result<()> {
    // Only needed to construct the Kubernetes client.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let factory = KubeClientFactory::new(&runtime);
    let defaults = Defaults::kubeadm();

    let resolved = resolve_apply_config(&args.args, &args.flags, &defaults, &factory)?;
    let settings = resolved.settings();

    if settings.print_config {
        println!("{}", "[upgrade/config] Resolved configuration:".bold());
        print!("{}", serde_yaml::to_string(settings)?);
    } else {
        print_settings_summary(settings);
    }

    if resolved.session_is_interactive() {
        let proceed = Confirm::new()
            .with_prompt(format!(
                "Are you sure you want to proceed with the upgrade to {}?",
                settings.target_version
            ))
            .default(false)
            .interact()?;
        if !proceed {
            anyhow::bail!("upgrade apply cancelled by user");
        }
    }

    info!(
        "Configuration for {} is ready for the upgrade engine",
        settings.target_version
    );
    println!(
        "{}",
        format!(
            "[upgrade] Configuration for {} validated.",
            settings.target_version
        )
        .green()
        .bold()
    );

    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(log_level: &str) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to initialize log filter: {}", e))?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}
