use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "tierback.yaml";
pub const CONFIG_ENV: &str = "TIERBACK_CONFIG";

/// Resolve the configuration file.
///
/// Priority:
/// 1. `--config` flag / `TIERBACK_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `tierback.yaml`
/// 3. Fall back to `cwd/tierback.yaml`
pub fn resolve_config(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let mut dir = Some(cwd);
    while let Some(d) = dir {
        let candidate = d.join(CONFIG_FILE);
        if candidate.is_file() {
            return candidate;
        }
        dir = d.parent();
    }

    cwd.join(CONFIG_FILE)
}

/// Resolve a path from the config file relative to the config's directory.
pub fn relative_to(config_path: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        return value.to_path_buf();
    }
    match config_path.parent() {
        Some(base) => base.join(value),
        None => value.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_wins() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("elsewhere.yaml");
        assert_eq!(resolve_config(Some(&explicit), dir.path()), explicit);
    }

    #[test]
    fn finds_config_in_ancestor() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "version: 1\n").unwrap();
        let deep = dir.path().join("a/b");
        std::fs::create_dir_all(&deep).unwrap();
        assert_eq!(resolve_config(None, &deep), dir.path().join(CONFIG_FILE));
    }

    #[test]
    fn falls_back_to_cwd() {
        let dir = TempDir::new().unwrap();
        let deep = dir.path().join("nothing/here");
        std::fs::create_dir_all(&deep).unwrap();
        // An ancestor outside the temp dir could hold a config; only the
        // fallback shape is checked when nothing is found inside it.
        let resolved = resolve_config(None, &deep);
        assert!(resolved.ends_with(CONFIG_FILE));
    }

    #[test]
    fn relative_paths_follow_config() {
        let cfg = Path::new("/srv/backup/tierback.yaml");
        assert_eq!(
            relative_to(cfg, Path::new("tiers/30m")),
            PathBuf::from("/srv/backup/tiers/30m")
        );
        assert_eq!(
            relative_to(cfg, Path::new("/abs/1d")),
            PathBuf::from("/abs/1d")
        );
    }
}
