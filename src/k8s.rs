//! Kubernetes client construction.

pub mod client;
