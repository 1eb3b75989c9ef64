//! kua - configuration resolver for Kubernetes control plane `upgrade apply`.
//!
//! Reconciles the target version argument, command-line flags and an
//! optional UpgradeConfiguration file into a validated configuration, and
//! decides whether the command may prompt the operator.

pub mod config;
pub mod defaults;
pub mod document;
pub mod duration;
pub mod error;
pub mod features;
pub mod interactive;
pub mod k8s;
pub mod output;
pub mod preflight;
pub mod resolve;
pub mod types;
pub mod version;

pub use error::{ApplyError, ErrorKind};
pub use interactive::session_is_interactive;
pub use resolve::{ApplySettings, ResolvedApplyConfig, resolve_apply_config};
