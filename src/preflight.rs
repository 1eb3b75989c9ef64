//! Validation of the preflight skip list (`--ignore-preflight-errors`).

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::defaults::{Defaults, SKIP_ALL_CHECKS};
use crate::error::ApplyError;

/// Skip-list entries keyed by lowercased name, valued by the first spelling seen.
pub type SkipList = BTreeMap<String, String>;

/// Merge skip-list entries from the flag and the config file.
///
/// Entries may themselves be comma separated. Names are trimmed; empty
/// entries are dropped.
pub fn merge_skip_list<'a, I>(sources: I) -> SkipList
where
    I: IntoIterator<Item = &'a str>,
{
    let mut merged = SkipList::new();
    for name in sources.into_iter().flat_map(|entry| entry.split(',')) {
        let raw = name.trim();
        if raw.is_empty() {
            continue;
        }
        merged
            .entry(raw.to_lowercase())
            .or_insert_with(|| raw.to_string());
    }
    merged
}

/// Check every skip-list entry against the registry of known checks.
///
/// Returns the normalized names. All unknown names are reported together,
/// spelled as given.
pub fn validate_skip_list(
    skip_list: &SkipList,
    defaults: &Defaults,
) -> Result<BTreeSet<String>, ApplyError> {
    let unknown: Vec<String> = skip_list
        .iter()
        .filter(|(key, _)| key.as_str() != SKIP_ALL_CHECKS && !defaults.is_known_check(key))
        .map(|(_, raw)| raw.clone())
        .collect();

    if !unknown.is_empty() {
        return Err(ApplyError::InvalidPreflightChecks(unknown));
    }

    let names: BTreeSet<String> = skip_list.keys().cloned().collect();
    debug!("Preflight checks to skip: {:?}", names);
    Ok(names)
}
