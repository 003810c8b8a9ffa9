use crate::error::{Result, TierbackError};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const STAMP_FORMAT: &str = "%Y%m%d_%H%M";

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// A backup file named `{seq:06}_{YYYYMMDD}_{HHMM}{suffix}`.
///
/// The zero-padded sequence prefix makes name order equal creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<NaiveDateTime>,
}

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| {
        Regex::new(r"^(?P<seq>\d{6,})_(?P<stamp>\d{8}_\d{4})").expect("artifact name pattern")
    })
}

impl Artifact {
    pub fn file_name(sequence: u64, at: &DateTime<FixedOffset>, suffix: &str) -> String {
        format!("{sequence:06}_{}{suffix}", at.format(STAMP_FORMAT))
    }

    /// Parse a listed name. Names outside the convention keep only `name`.
    pub fn parse(name: &str) -> Self {
        let caps = name_re().captures(name);
        let sequence = caps
            .as_ref()
            .and_then(|c| c.name("seq"))
            .and_then(|m| m.as_str().parse().ok());
        let created = caps
            .as_ref()
            .and_then(|c| c.name("stamp"))
            .and_then(|m| NaiveDateTime::parse_from_str(m.as_str(), STAMP_FORMAT).ok());
        Self {
            name: name.to_string(),
            sequence,
            created,
        }
    }
}

// ---------------------------------------------------------------------------
// Directory helpers
// ---------------------------------------------------------------------------

fn dir_error(path: &Path) -> impl FnOnce(std::io::Error) -> TierbackError + '_ {
    move |source| TierbackError::DirectoryAccess {
        path: path.to_path_buf(),
        source,
    }
}

/// Create `dir` if absent.
pub fn ensure_tier_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(dir_error(dir))
}

/// Names in `dir` ending in `suffix`, oldest first. A missing directory
/// lists as empty.
pub fn list_names(dir: &Path, suffix: &str) -> Result<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(dir_error(dir)(e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(dir_error(dir))?;
        if !entry.file_type().map_err(dir_error(dir))?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(suffix) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

pub fn list(dir: &Path, suffix: &str) -> Result<Vec<Artifact>> {
    Ok(list_names(dir, suffix)?
        .iter()
        .map(|n| Artifact::parse(n))
        .collect())
}

/// Copy `source` into `tier_dir` as `name`. Returns the destination path.
pub fn save(source: &Path, tier_dir: &Path, name: &str) -> Result<PathBuf> {
    ensure_tier_dir(tier_dir)?;
    let dest = tier_dir.join(name);
    std::fs::copy(source, &dest)?;
    Ok(dest)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::parse_timestamp;
    use tempfile::TempDir;

    #[test]
    fn file_name_is_padded_and_stamped() {
        let at = parse_timestamp("2026-10-19T09:30:41+09:00").unwrap();
        assert_eq!(
            Artifact::file_name(42, &at, ".vhdx"),
            "000042_20261019_0930.vhdx"
        );
    }

    #[test]
    fn parse_recovers_fields() {
        let a = Artifact::parse("000042_20261019_0930.vhdx");
        assert_eq!(a.sequence, Some(42));
        assert_eq!(
            a.created.unwrap().format("%Y-%m-%d %H:%M").to_string(),
            "2026-10-19 09:30"
        );

        let odd = Artifact::parse("manual-copy.vhdx");
        assert_eq!(odd.sequence, None);
        assert_eq!(odd.created, None);
    }

    #[test]
    fn list_filters_suffix_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in [
            "000003_20261019_1000.vhdx",
            "000001_20261019_0900.vhdx",
            "notes.txt",
            "000002_20261019_0930.vhdx",
        ] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("000000_dir.vhdx")).unwrap();

        let names = list_names(dir.path(), ".vhdx").unwrap();
        assert_eq!(
            names,
            vec![
                "000001_20261019_0900.vhdx",
                "000002_20261019_0930.vhdx",
                "000003_20261019_1000.vhdx",
            ]
        );
    }

    #[test]
    fn list_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(list(&dir.path().join("absent"), ".vhdx").unwrap().is_empty());
    }

    #[test]
    fn save_copies_into_tier() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("image.vhdx");
        std::fs::write(&source, b"disk").unwrap();
        let dest = save(&source, &dir.path().join("30m"), "000001_20261019_0930.vhdx").unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"disk");
        assert!(source.exists());
    }
}
