//! Target version parsing and release channel policy.

use semver::Version;

use crate::error::ApplyError;

/// Release channel of a target version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseChannel {
    Stable,
    ReleaseCandidate,
    Experimental,
}

/// Parse a Kubernetes version such as `v1.31.2` or `1.32.0-rc.1`.
pub fn parse_target_version(raw: &str) -> Result<Version, ApplyError> {
    let trimmed = raw.trim();
    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(bare).map_err(|e| ApplyError::InvalidVersion(raw.to_string(), e.to_string()))
}

/// Canonical form with a leading `v`.
pub fn normalize(version: &Version) -> String {
    format!("v{}", version)
}

pub fn release_channel(version: &Version) -> ReleaseChannel {
    if version.pre.is_empty() {
        ReleaseChannel::Stable
    } else if version.pre.as_str().starts_with("rc") {
        ReleaseChannel::ReleaseCandidate
    } else {
        ReleaseChannel::Experimental
    }
}

/// Reject pre-release targets unless the matching allow setting is on.
pub fn enforce_channel_policy(
    version: &Version,
    allow_experimental: bool,
    allow_rc: bool,
) -> Result<(), ApplyError> {
    match release_channel(version) {
        ReleaseChannel::Stable => Ok(()),
        ReleaseChannel::ReleaseCandidate if allow_rc || allow_experimental => Ok(()),
        ReleaseChannel::ReleaseCandidate => Err(ApplyError::VersionPolicy(format!(
            "specified version to upgrade to \"{}\" is a release candidate version, but --allow-release-candidate-upgrades is not set",
            normalize(version)
        ))),
        ReleaseChannel::Experimental if allow_experimental => Ok(()),
        ReleaseChannel::Experimental => Err(ApplyError::VersionPolicy(format!(
            "specified version to upgrade to \"{}\" is an unstable version, but --allow-experimental-upgrades is not set",
            normalize(version)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_with_and_without_prefix() {
        assert_eq!(normalize(&parse_target_version("v1.31.2").unwrap()), "v1.31.2");
        assert_eq!(normalize(&parse_target_version("1.31.2").unwrap()), "v1.31.2");
        assert_eq!(
            normalize(&parse_target_version("v1.32.0-rc.1").unwrap()),
            "v1.32.0-rc.1"
        );
    }

    #[test]
    fn test_parse_invalid() {
        for raw in ["", "latest", "v1.31", "1.x.0"] {
            let err = parse_target_version(raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Argument, "{raw}");
        }
    }

    #[test]
    fn test_release_channel() {
        let channel = |raw: &str| release_channel(&parse_target_version(raw).unwrap());
        assert_eq!(channel("v1.31.0"), ReleaseChannel::Stable);
        assert_eq!(channel("v1.32.0-rc.0"), ReleaseChannel::ReleaseCandidate);
        assert_eq!(channel("v1.32.0-alpha.2"), ReleaseChannel::Experimental);
        assert_eq!(channel("v1.32.0-beta.1"), ReleaseChannel::Experimental);
    }

    #[test]
    fn test_channel_policy() {
        let rc = parse_target_version("v1.32.0-rc.1").unwrap();
        assert!(enforce_channel_policy(&rc, false, false).is_err());
        assert!(enforce_channel_policy(&rc, false, true).is_ok());
        assert!(enforce_channel_policy(&rc, true, false).is_ok());

        let alpha = parse_target_version("v1.32.0-alpha.1").unwrap();
        let err = enforce_channel_policy(&alpha, false, true).unwrap_err();
        assert!(err.to_string().contains("--allow-experimental-upgrades"));
        assert!(enforce_channel_policy(&alpha, true, false).is_ok());

        let stable = parse_target_version("v1.31.2").unwrap();
        assert!(enforce_channel_policy(&stable, false, false).is_ok());
    }
}
