//! Parsing of the `--feature-gates` flag.

use std::collections::BTreeMap;

use tracing::debug;

use crate::defaults::Defaults;
use crate::error::ApplyError;

const FIELD: &str = "feature-gates";

/// Parse `Gate=true,Other=false` into a map of explicitly set gates.
///
/// Every pair must carry a boolean and name a gate known to `defaults`.
/// Empty entries are ignored; a repeated gate keeps its last value.
pub fn parse_feature_gates(
    raw: &str,
    defaults: &Defaults,
) -> Result<BTreeMap<String, bool>, ApplyError> {
    let mut gates = BTreeMap::new();

    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let invalid = |reason: &str| ApplyError::InvalidValue {
            field: FIELD.to_string(),
            value: pair.to_string(),
            reason: reason.to_string(),
        };

        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| invalid("missing bool value"))?;
        let name = name.trim();
        let enabled = parse_bool(value.trim()).ok_or_else(|| invalid("invalid bool value"))?;

        match defaults.feature_gate_default(name) {
            None => return Err(invalid("unrecognized feature gate")),
            Some(default) if default == enabled => {
                debug!("Feature gate {} is already {} by default", name, enabled)
            }
            Some(_) => {}
        }
        gates.insert(name.to_string(), enabled);
    }

    debug!("Feature gates set on the command line: {:?}", gates);
    Ok(gates)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_gates() {
        let gates = parse_feature_gates(
            "EtcdLearnerMode=false, ControlPlaneKubeletLocalMode=true,",
            &Defaults::kubeadm(),
        )
        .unwrap();
        assert_eq!(gates.len(), 2);
        assert!(!gates["EtcdLearnerMode"]);
        assert!(gates["ControlPlaneKubeletLocalMode"]);
    }

    #[test]
    fn test_empty_value_sets_nothing() {
        assert!(parse_feature_gates("", &Defaults::kubeadm()).unwrap().is_empty());
        assert!(parse_feature_gates(" , ", &Defaults::kubeadm()).unwrap().is_empty());
    }

    #[test]
    fn test_last_value_wins() {
        let gates =
            parse_feature_gates("PublicKeysECDSA=true,PublicKeysECDSA=False", &Defaults::kubeadm())
                .unwrap();
        assert!(!gates["PublicKeysECDSA"]);
    }

    #[test]
    fn test_pair_without_value_is_rejected() {
        let err = parse_feature_gates("EtcdLearnerMode", &Defaults::kubeadm()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "feature-gates: Invalid value: \"EtcdLearnerMode\": missing bool value"
        );
    }

    #[test]
    fn test_non_bool_value_is_rejected() {
        let err = parse_feature_gates("EtcdLearnerMode=yes", &Defaults::kubeadm()).unwrap_err();
        assert!(err.to_string().contains("invalid bool value"));
        assert!(err.to_string().contains("EtcdLearnerMode=yes"));
    }

    #[test]
    fn test_unknown_gate_is_rejected() {
        let err = parse_feature_gates("EtcdLearnerMode=true,NoSuchGate=true", &Defaults::kubeadm())
            .unwrap_err();
        assert!(matches!(err, ApplyError::InvalidValue { .. }));
        assert!(err.to_string().contains("NoSuchGate=true"));
        assert!(err.to_string().contains("unrecognized feature gate"));
    }

    #[test]
    fn test_gate_names_are_case_sensitive() {
        assert!(parse_feature_gates("etcdlearnermode=true", &Defaults::kubeadm()).is_err());
    }
}
