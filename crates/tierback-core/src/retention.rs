//! Tiered retention: promotion of the oldest artifact up the chain, then
//! per-tier rotation down to the keep count.
//!
//! Everything here is best-effort. Per-file failures become
//! [`RetentionEvent::Failed`] entries and the sweep carries on; the next
//! cycle picks up whatever was left behind.

use crate::artifact;
use crate::config::Config;
use crate::error::{Result, TierbackError};
use crate::level::BackupLevel;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RetentionEvent {
    /// Oldest artifact moved to the next coarser tier.
    Promoted {
        from: BackupLevel,
        to: BackupLevel,
        name: String,
    },
    /// The next tier already held the same name; the source was deleted.
    Superseded {
        from: BackupLevel,
        to: BackupLevel,
        name: String,
    },
    /// Surplus artifact removed by rotation.
    Deleted { level: BackupLevel, name: String },
    /// Rotation found nothing over the keep count.
    WithinLimit {
        level: BackupLevel,
        count: usize,
        keep: usize,
    },
    Failed { level: BackupLevel, error: String },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RetentionReport {
    pub dry_run: bool,
    pub events: Vec<RetentionEvent>,
}

impl RetentionReport {
    pub fn failures(&self) -> impl Iterator<Item = &RetentionEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, RetentionEvent::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

// ---------------------------------------------------------------------------
// TierStore
// ---------------------------------------------------------------------------

/// The filesystem operations retention needs.
pub trait TierStore {
    fn ensure_dir(&mut self, dir: &Path) -> Result<()>;
    /// Artifact names in `dir`, oldest first.
    fn list(&mut self, dir: &Path) -> Result<Vec<String>>;
    fn exists(&mut self, dir: &Path, name: &str) -> Result<bool>;
    fn rename(&mut self, from_dir: &Path, to_dir: &Path, name: &str) -> Result<()>;
    fn remove(&mut self, dir: &Path, name: &str) -> Result<()>;
}

/// Acts on the real filesystem.
pub struct DiskStore {
    suffix: String,
}

impl DiskStore {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

impl TierStore for DiskStore {
    fn ensure_dir(&mut self, dir: &Path) -> Result<()> {
        artifact::ensure_tier_dir(dir)
    }

    fn list(&mut self, dir: &Path) -> Result<Vec<String>> {
        artifact::list_names(dir, &self.suffix)
    }

    fn exists(&mut self, dir: &Path, name: &str) -> Result<bool> {
        Ok(dir.join(name).exists())
    }

    fn rename(&mut self, from_dir: &Path, to_dir: &Path, name: &str) -> Result<()> {
        let from = from_dir.join(name);
        let to = to_dir.join(name);
        std::fs::rename(&from, &to)
            .map_err(|source| TierbackError::ArtifactMove { from, to, source })
    }

    fn remove(&mut self, dir: &Path, name: &str) -> Result<()> {
        let path = dir.join(name);
        std::fs::remove_file(&path).map_err(|source| TierbackError::ArtifactDelete { path, source })
    }
}

/// Reads the real filesystem once per directory, then applies every change
/// to an in-memory copy. Nothing on disk is touched.
pub struct DryRunStore {
    suffix: String,
    dirs: HashMap<PathBuf, BTreeSet<String>>,
}

impl DryRunStore {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            dirs: HashMap::new(),
        }
    }

    fn dir(&mut self, dir: &Path) -> Result<&mut BTreeSet<String>> {
        Ok(match self.dirs.entry(dir.to_path_buf()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(v) => {
                let names = artifact::list_names(dir, &self.suffix)?;
                v.insert(names.into_iter().collect())
            }
        })
    }
}

impl TierStore for DryRunStore {
    fn ensure_dir(&mut self, dir: &Path) -> Result<()> {
        self.dir(dir).map(|_| ())
    }

    fn list(&mut self, dir: &Path) -> Result<Vec<String>> {
        Ok(self.dir(dir)?.iter().cloned().collect())
    }

    fn exists(&mut self, dir: &Path, name: &str) -> Result<bool> {
        Ok(self.dir(dir)?.contains(name))
    }

    fn rename(&mut self, from_dir: &Path, to_dir: &Path, name: &str) -> Result<()> {
        self.dir(from_dir)?.remove(name);
        self.dir(to_dir)?.insert(name.to_string());
        Ok(())
    }

    fn remove(&mut self, dir: &Path, name: &str) -> Result<()> {
        self.dir(dir)?.remove(name);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Promotion
// ---------------------------------------------------------------------------

/// For each adjacent pair in `levels`, move the oldest artifact of the finer
/// tier into the coarser one once the finer tier holds at least its keep
/// count. Never fails as a whole; problems are reported as events.
pub fn promote_with(
    store: &mut dyn TierStore,
    config: &Config,
    levels: &[BackupLevel],
) -> Vec<RetentionEvent> {
    let mut events = Vec::new();

    for pair in levels.windows(2) {
        let (current, next) = (pair[0], pair[1]);
        let cur_dir = config.tier_dir(current);
        let next_dir = config.tier_dir(next);
        let failed = |e: TierbackError| RetentionEvent::Failed {
            level: current,
            error: e.to_string(),
        };

        if let Err(e) = store.ensure_dir(next_dir) {
            events.push(failed(e));
            continue;
        }

        let names = match store.list(cur_dir) {
            Ok(names) => names,
            Err(e) => {
                events.push(failed(e));
                continue;
            }
        };

        let Some(oldest) = names.first() else {
            continue;
        };
        if names.len() < config.keep(current) {
            continue;
        }

        let outcome = match store.exists(next_dir, oldest) {
            Ok(true) => store
                .remove(cur_dir, oldest)
                .map(|()| RetentionEvent::Superseded {
                    from: current,
                    to: next,
                    name: oldest.clone(),
                }),
            Ok(false) => store
                .rename(cur_dir, next_dir, oldest)
                .map(|()| RetentionEvent::Promoted {
                    from: current,
                    to: next,
                    name: oldest.clone(),
                }),
            Err(e) => Err(e),
        };
        events.push(outcome.unwrap_or_else(failed));
    }

    events
}

/// Promote across `levels` on the real filesystem.
pub fn promote(config: &Config, levels: &[BackupLevel]) -> Vec<RetentionEvent> {
    promote_with(&mut DiskStore::new(&config.artifact_suffix), config, levels)
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Delete the oldest artifacts of `level` beyond its keep count.
///
/// Fails only when the tier directory cannot be created or listed. Individual
/// delete failures are reported and the remaining deletions still run.
pub fn rotate_with(
    store: &mut dyn TierStore,
    config: &Config,
    level: BackupLevel,
) -> Result<Vec<RetentionEvent>> {
    let dir = config.tier_dir(level);
    let keep = config.keep(level);

    store.ensure_dir(dir)?;
    let names = store.list(dir)?;

    if names.len() <= keep {
        return Ok(vec![RetentionEvent::WithinLimit {
            level,
            count: names.len(),
            keep,
        }]);
    }

    let surplus = names.len() - keep;
    let events = names[..surplus]
        .iter()
        .map(|name| match store.remove(dir, name) {
            Ok(()) => RetentionEvent::Deleted {
                level,
                name: name.clone(),
            },
            Err(e) => RetentionEvent::Failed {
                level,
                error: e.to_string(),
            },
        })
        .collect();
    Ok(events)
}

/// Rotate one tier on the real filesystem.
pub fn rotate(config: &Config, level: BackupLevel) -> Result<Vec<RetentionEvent>> {
    rotate_with(&mut DiskStore::new(&config.artifact_suffix), config, level)
}

// ---------------------------------------------------------------------------
// Full sweep
// ---------------------------------------------------------------------------

/// Promote across the whole chain, then rotate every tier.
///
/// Promotion for all tiers completes before any tier is rotated, so an
/// artifact due for promotion is never deleted first.
pub fn retain_with(store: &mut dyn TierStore, config: &Config) -> Vec<RetentionEvent> {
    let levels = BackupLevel::all();
    let mut events = promote_with(store, config, levels);
    for level in levels {
        match rotate_with(store, config, *level) {
            Ok(mut rotated) => events.append(&mut rotated),
            Err(e) => events.push(RetentionEvent::Failed {
                level: *level,
                error: e.to_string(),
            }),
        }
    }
    events
}

/// Full sweep; with `dry_run` the events describe what would happen.
/// Nothing is touched when the config has validation errors.
pub fn retain(config: &Config, dry_run: bool) -> Result<RetentionReport> {
    config.ensure_valid()?;
    let events = if dry_run {
        retain_with(&mut DryRunStore::new(&config.artifact_suffix), config)
    } else {
        retain_with(&mut DiskStore::new(&config.artifact_suffix), config)
    };
    Ok(RetentionReport { dry_run, events })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn name(seq: u64) -> String {
        format!("{seq:06}_20261019_0930.vhdx")
    }

    fn fill(config: &Config, level: BackupLevel, seqs: impl IntoIterator<Item = u64>) {
        let dir = config.tier_dir(level);
        std::fs::create_dir_all(dir).unwrap();
        for seq in seqs {
            std::fs::write(dir.join(name(seq)), b"x").unwrap();
        }
    }

    fn names(config: &Config, level: BackupLevel) -> Vec<String> {
        artifact::list_names(config.tier_dir(level), ".vhdx").unwrap()
    }

    /// In-memory tiers; `rename` and `remove` fail for the listed names.
    #[derive(Default)]
    struct FlakyStore {
        dirs: HashMap<PathBuf, BTreeSet<String>>,
        fail_rename: Vec<String>,
        fail_remove: Vec<String>,
    }

    impl FlakyStore {
        fn seed(&mut self, dir: &Path, seqs: impl IntoIterator<Item = u64>) {
            self.dirs
                .entry(dir.to_path_buf())
                .or_default()
                .extend(seqs.into_iter().map(name));
        }

        fn names(&self, dir: &Path) -> Vec<String> {
            self.dirs
                .get(dir)
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default()
        }
    }

    fn denied() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")
    }

    impl TierStore for FlakyStore {
        fn ensure_dir(&mut self, dir: &Path) -> Result<()> {
            self.dirs.entry(dir.to_path_buf()).or_default();
            Ok(())
        }

        fn list(&mut self, dir: &Path) -> Result<Vec<String>> {
            Ok(self.names(dir))
        }

        fn exists(&mut self, dir: &Path, name: &str) -> Result<bool> {
            Ok(self.dirs.get(dir).is_some_and(|s| s.contains(name)))
        }

        fn rename(&mut self, from_dir: &Path, to_dir: &Path, name: &str) -> Result<()> {
            if self.fail_rename.iter().any(|n| n == name) {
                return Err(TierbackError::ArtifactMove {
                    from: from_dir.join(name),
                    to: to_dir.join(name),
                    source: denied(),
                });
            }
            self.dirs.entry(from_dir.to_path_buf()).or_default().remove(name);
            self.dirs
                .entry(to_dir.to_path_buf())
                .or_default()
                .insert(name.to_string());
            Ok(())
        }

        fn remove(&mut self, dir: &Path, name: &str) -> Result<()> {
            if self.fail_remove.iter().any(|n| n == name) {
                return Err(TierbackError::ArtifactDelete {
                    path: dir.join(name),
                    source: denied(),
                });
            }
            self.dirs.entry(dir.to_path_buf()).or_default().remove(name);
            Ok(())
        }
    }

    #[test]
    fn rotate_keeps_newest() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::new(dir.path());
        fill(&cfg, BackupLevel::Daily, 1..=8);

        let events = rotate(&cfg, BackupLevel::Daily).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            RetentionEvent::Deleted {
                level: BackupLevel::Daily,
                name: name(1)
            }
        );
        assert_eq!(
            names(&cfg, BackupLevel::Daily),
            (4..=8).map(name).collect::<Vec<_>>()
        );
    }

    #[test]
    fn rotate_continues_after_failed_delete() {
        let cfg = Config::new(Path::new("/srv/backup"));
        let dir = cfg.tier_dir(BackupLevel::Daily);
        let mut store = FlakyStore {
            fail_remove: vec![name(1)],
            ..Default::default()
        };
        store.seed(dir, 1..=8);

        let events = rotate_with(&mut store, &cfg, BackupLevel::Daily).unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            RetentionEvent::Failed { level: BackupLevel::Daily, error } if error.contains("000001")
        ));
        assert_eq!(
            events[1..],
            [
                RetentionEvent::Deleted {
                    level: BackupLevel::Daily,
                    name: name(2)
                },
                RetentionEvent::Deleted {
                    level: BackupLevel::Daily,
                    name: name(3)
                },
            ]
        );
        let mut left = vec![name(1)];
        left.extend((4..=8).map(name));
        assert_eq!(store.names(dir), left);
    }

    #[test]
    fn promote_continues_after_failed_move() {
        let cfg = Config::new(Path::new("/srv/backup"));
        let mut store = FlakyStore {
            fail_rename: vec![name(1)],
            ..Default::default()
        };
        store.seed(cfg.tier_dir(BackupLevel::HalfHourly), 1..=5);
        store.seed(cfg.tier_dir(BackupLevel::SixHourly), [20, 21]);

        let events = promote_with(&mut store, &cfg, BackupLevel::all());
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            RetentionEvent::Failed {
                level: BackupLevel::HalfHourly,
                ..
            }
        ));
        assert_eq!(
            events[1],
            RetentionEvent::Promoted {
                from: BackupLevel::SixHourly,
                to: BackupLevel::TwelveHourly,
                name: name(20)
            }
        );
        assert_eq!(store.names(cfg.tier_dir(BackupLevel::HalfHourly)).len(), 5);
        assert_eq!(
            store.names(cfg.tier_dir(BackupLevel::TwelveHourly)),
            vec![name(20)]
        );
    }

    #[test]
    fn retain_refuses_shared_tier_directory() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new(dir.path());
        cfg.tiers.get_mut(BackupLevel::ThreeHourly).dir =
            cfg.tier_dir(BackupLevel::HalfHourly).to_path_buf();
        fill(&cfg, BackupLevel::HalfHourly, 1..=5);

        for dry_run in [false, true] {
            match retain(&cfg, dry_run) {
                Err(TierbackError::InvalidConfig(errors)) => {
                    assert!(errors.iter().any(|e| e.contains("share the directory")))
                }
                other => panic!("expected InvalidConfig, got {other:?}"),
            }
        }
        assert_eq!(
            names(&cfg, BackupLevel::HalfHourly),
            (1..=5).map(name).collect::<Vec<_>>()
        );
    }

    #[test]
    fn rotate_creates_missing_dir() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::new(dir.path());
        let events = rotate(&cfg, BackupLevel::SixHourly).unwrap();
        assert!(cfg.tier_dir(BackupLevel::SixHourly).is_dir());
        assert_eq!(
            events,
            vec![RetentionEvent::WithinLimit {
                level: BackupLevel::SixHourly,
                count: 0,
                keep: 2
            }]
        );
    }

    #[test]
    fn rotate_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::new(dir.path());
        fill(&cfg, BackupLevel::ThreeHourly, 1..=3);
        let notes = cfg.tier_dir(BackupLevel::ThreeHourly).join("README.txt");
        std::fs::write(&notes, "keep me").unwrap();

        rotate(&cfg, BackupLevel::ThreeHourly).unwrap();
        assert!(notes.exists());
        assert_eq!(names(&cfg, BackupLevel::ThreeHourly), vec![name(2), name(3)]);
    }

    #[test]
    fn rotate_unlistable_dir_is_directory_access() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new(dir.path());
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        cfg.tiers.get_mut(BackupLevel::Daily).dir = blocker.join("1d");
        assert!(matches!(
            rotate(&cfg, BackupLevel::Daily),
            Err(TierbackError::DirectoryAccess { .. })
        ));
    }

    #[test]
    fn promote_at_keep_count_moves_oldest() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::new(dir.path());
        fill(&cfg, BackupLevel::HalfHourly, 1..=5);

        let events = promote(&cfg, BackupLevel::all());
        assert_eq!(
            events,
            vec![RetentionEvent::Promoted {
                from: BackupLevel::HalfHourly,
                to: BackupLevel::ThreeHourly,
                name: name(1)
            }]
        );
        assert_eq!(names(&cfg, BackupLevel::HalfHourly).len(), 4);
        assert_eq!(names(&cfg, BackupLevel::ThreeHourly), vec![name(1)]);
        // Every coarser directory now exists.
        for level in &BackupLevel::all()[1..] {
            assert!(cfg.tier_dir(*level).is_dir());
        }
    }

    #[test]
    fn promote_below_keep_count_does_nothing() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::new(dir.path());
        fill(&cfg, BackupLevel::HalfHourly, 1..=4);
        assert!(promote(&cfg, BackupLevel::all()).is_empty());
        assert_eq!(names(&cfg, BackupLevel::HalfHourly).len(), 4);
    }

    #[test]
    fn promote_collision_deletes_source() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::new(dir.path());
        fill(&cfg, BackupLevel::ThreeHourly, [7, 8]);
        fill(&cfg, BackupLevel::SixHourly, [7]);
        std::fs::write(cfg.tier_dir(BackupLevel::SixHourly).join(name(7)), b"promoted").unwrap();

        let events = promote(&cfg, BackupLevel::all());
        assert!(events.contains(&RetentionEvent::Superseded {
            from: BackupLevel::ThreeHourly,
            to: BackupLevel::SixHourly,
            name: name(7)
        }));
        assert_eq!(names(&cfg, BackupLevel::ThreeHourly), vec![name(8)]);
        let kept = std::fs::read(cfg.tier_dir(BackupLevel::SixHourly).join(name(7))).unwrap();
        assert_eq!(kept, b"promoted");
    }

    #[test]
    fn promote_moves_one_per_pair_and_never_out_of_daily() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::new(dir.path());
        fill(&cfg, BackupLevel::HalfHourly, 10..=16);
        fill(&cfg, BackupLevel::TwelveHourly, [3, 4]);
        fill(&cfg, BackupLevel::Daily, [1, 2, 5, 6, 9]);

        let events = promote(&cfg, BackupLevel::all());
        assert_eq!(events.len(), 2);
        assert_eq!(names(&cfg, BackupLevel::HalfHourly).len(), 6);
        assert_eq!(names(&cfg, BackupLevel::ThreeHourly), vec![name(10)]);
        assert_eq!(names(&cfg, BackupLevel::TwelveHourly), vec![name(4)]);
        assert_eq!(names(&cfg, BackupLevel::Daily).len(), 6);
    }

    #[test]
    fn promote_then_rotate_never_deletes_the_promoted_artifact() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::new(dir.path());
        fill(&cfg, BackupLevel::HalfHourly, 1..=5);

        let report = retain(&cfg, false).unwrap();
        assert!(!report.has_failures());
        assert!(!report
            .events
            .iter()
            .any(|e| matches!(e, RetentionEvent::Deleted { .. })));
        assert_eq!(names(&cfg, BackupLevel::ThreeHourly), vec![name(1)]);
        assert_eq!(
            names(&cfg, BackupLevel::HalfHourly),
            (2..=5).map(name).collect::<Vec<_>>()
        );
    }

    #[test]
    fn repeated_cycles_build_a_pyramid() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::new(dir.path());
        for seq in 1..=40 {
            retain(&cfg, false).unwrap();
            fill(&cfg, BackupLevel::HalfHourly, [seq]);
        }
        // Every tier is populated and none exceeds its keep count.
        for level in BackupLevel::all() {
            let count = names(&cfg, *level).len();
            assert!(count > 0, "{level} empty");
            assert!(count <= cfg.keep(*level), "{level} holds {count}");
        }
        assert_eq!(names(&cfg, BackupLevel::HalfHourly).last(), Some(&name(40)));
    }

    #[test]
    fn dry_run_simulates_without_touching_disk() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::new(dir.path());
        fill(&cfg, BackupLevel::HalfHourly, 1..=7);

        let report = retain(&cfg, true).unwrap();
        assert!(report.dry_run);
        assert!(report.events.contains(&RetentionEvent::Promoted {
            from: BackupLevel::HalfHourly,
            to: BackupLevel::ThreeHourly,
            name: name(1)
        }));
        // 7 - 1 promoted = 6, one over the keep count of 5.
        assert!(report.events.contains(&RetentionEvent::Deleted {
            level: BackupLevel::HalfHourly,
            name: name(2)
        }));
        assert_eq!(names(&cfg, BackupLevel::HalfHourly).len(), 7);
        assert!(!cfg.tier_dir(BackupLevel::ThreeHourly).exists());
    }

    #[test]
    fn failed_pair_does_not_block_other_pairs() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new(dir.path());
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        cfg.tiers.get_mut(BackupLevel::ThreeHourly).dir = blocker.join("3h");
        fill(&cfg, BackupLevel::HalfHourly, 1..=5);
        fill(&cfg, BackupLevel::SixHourly, [20, 21]);

        let report = retain(&cfg, false).unwrap();
        assert!(report.has_failures());
        assert_eq!(names(&cfg, BackupLevel::TwelveHourly), vec![name(20)]);
        assert_eq!(names(&cfg, BackupLevel::HalfHourly).len(), 5);
    }
}
