use crate::error::{Result, TierbackError};
use std::path::{Path, PathBuf};

/// Monotonic artifact counter persisted as a zero-padded number.
#[derive(Debug, Clone)]
pub struct SequenceCounter {
    path: PathBuf,
}

impl SequenceCounter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last issued id; 0 when the file is missing or empty.
    pub fn current(&self) -> Result<u64> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let first = data.lines().next().unwrap_or("").trim();
        if first.is_empty() {
            return Ok(0);
        }
        first.parse().map_err(|_| TierbackError::CorruptSequence {
            path: self.path.clone(),
            content: first.to_string(),
        })
    }

    /// The id `next` would issue, without writing anything.
    pub fn peek_next(&self) -> Result<u64> {
        let current = self.current()?;
        current
            .checked_add(1)
            .ok_or_else(|| TierbackError::CorruptSequence {
                path: self.path.clone(),
                content: current.to_string(),
            })
    }

    /// Issue and persist the next id.
    pub fn next(&self) -> Result<u64> {
        let id = self.peek_next()?;
        crate::io::atomic_write(&self.path, format!("{id:06}\n").as_bytes())?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn starts_at_one_and_persists() {
        let dir = TempDir::new().unwrap();
        let counter = SequenceCounter::new(dir.path().join("state/last_id.txt"));
        assert_eq!(counter.peek_next().unwrap(), 1);
        assert_eq!(counter.next().unwrap(), 1);
        assert_eq!(counter.next().unwrap(), 2);
        assert_eq!(
            std::fs::read_to_string(counter.path()).unwrap(),
            "000002\n"
        );
    }

    #[test]
    fn peek_does_not_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last_id.txt");
        std::fs::write(&path, "000041\n").unwrap();
        let counter = SequenceCounter::new(&path);
        assert_eq!(counter.peek_next().unwrap(), 42);
        assert_eq!(counter.peek_next().unwrap(), 42);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "000041\n");
    }

    #[test]
    fn empty_file_reads_zero() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last_id.txt");
        std::fs::write(&path, "").unwrap();
        assert_eq!(SequenceCounter::new(&path).next().unwrap(), 1);
    }

    #[test]
    fn exhausted_counter_is_corrupt_sequence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last_id.txt");
        std::fs::write(&path, format!("{}\n", u64::MAX)).unwrap();
        let counter = SequenceCounter::new(&path);
        assert!(matches!(
            counter.peek_next(),
            Err(TierbackError::CorruptSequence { .. })
        ));
        assert!(counter.next().is_err());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!("{}\n", u64::MAX)
        );
    }

    #[test]
    fn garbage_is_corrupt_sequence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last_id.txt");
        std::fs::write(&path, "forty-two\n").unwrap();
        assert!(matches!(
            SequenceCounter::new(&path).next(),
            Err(TierbackError::CorruptSequence { .. })
        ));
    }
}
