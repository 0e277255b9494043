//! Path helpers

use std::path::{Path, PathBuf};

/// Expand environment variables in a path string.
///
/// Supports `$VAR`, `${VAR}` and a leading `~`. Unresolvable input is
/// returned unchanged.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Resolve `reference` against the directory of `base_file`.
///
/// Absolute references, or a missing base file, leave `reference` as-is.
pub fn resolve_relative_to(reference: &str, base_file: Option<&Path>) -> PathBuf {
    let reference = Path::new(reference);
    match base_file {
        Some(base) if !reference.is_absolute() => base
            .parent()
            .map(|dir| dir.join(reference))
            .unwrap_or_else(|| reference.to_path_buf()),
        _ => reference.to_path_buf(),
    }
}

/// Last `/`-separated segment of a path string.
pub fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_to() {
        assert_eq!(
            resolve_relative_to("a.json", Some(Path::new("/etc/cfg/main.json"))),
            PathBuf::from("/etc/cfg/a.json")
        );
        assert_eq!(
            resolve_relative_to("/abs/a.json", Some(Path::new("/etc/cfg/main.json"))),
            PathBuf::from("/abs/a.json")
        );
        assert_eq!(resolve_relative_to("a.json", None), PathBuf::from("a.json"));
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("./dir/schema.json"), "schema.json");
        assert_eq!(last_segment("schema.json"), "schema.json");
    }
}
