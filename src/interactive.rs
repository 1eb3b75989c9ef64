//! Decides whether the command may prompt the operator.

/// Returns true when the session may ask for confirmation.
///
/// Any of `--yes`, `--dry-run` or `--force` turns prompts off.
pub fn session_is_interactive(non_interactive_mode: bool, dry_run: bool, force: bool) -> bool {
    !(non_interactive_mode || dry_run || force)
}
