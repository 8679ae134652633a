use crate::error::{GteamError, Result};
use crate::model::{AuthorRecord, Repository};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

const KEY_SEPARATOR: &str = "-_-";
const SNAPSHOT_SUFFIX: &str = ".stats.json";

/// One snapshot file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    pub key: String,
    pub timestamp: i64,
    pub path: PathBuf,
}

/// Latest author records per repository name.
#[derive(Debug, Clone, Default)]
pub struct Snapshots {
    by_repository: HashMap<String, Vec<AuthorRecord>>,
}

impl Snapshots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, repository: impl Into<String>, records: Vec<AuthorRecord>) {
        self.by_repository.insert(repository.into(), records);
    }

    pub fn get(&self, repository: &str) -> Option<&[AuthorRecord]> {
        self.by_repository.get(repository).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.by_repository.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_repository.is_empty()
    }
}

/// File name stem of a repository: anything outside `[A-Za-z0-9._-]`
/// becomes `_`.
pub fn repository_key(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn parse_snapshot_name(file_name: &str) -> Option<(String, i64)> {
    let stem = file_name.strip_suffix(SNAPSHOT_SUFFIX)?;
    let (key, timestamp) = stem.rsplit_once(KEY_SEPARATOR)?;
    let timestamp = timestamp.parse().ok()?;
    Some((key.to_string(), timestamp))
}

pub struct StatsStore {
    dir: PathBuf,
}

impl StatsStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_path(&self, repository: &str, timestamp: i64) -> PathBuf {
        self.dir.join(format!(
            "{}{KEY_SEPARATOR}{timestamp}{SNAPSHOT_SUFFIX}",
            repository_key(repository)
        ))
    }

    pub fn store_snapshot(&self, repository: &str, records: &[AuthorRecord]) -> Result<PathBuf> {
        self.store_snapshot_at(repository, Utc::now().timestamp_millis(), records)
    }

    /// Writes through a temporary file so readers never observe a partial
    /// snapshot.
    pub fn store_snapshot_at(
        &self,
        repository: &str,
        timestamp: i64,
        records: &[AuthorRecord],
    ) -> Result<PathBuf> {
        let path = self.snapshot_path(repository, timestamp);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(records)?)?;
        fs::rename(&tmp, &path)?;
        tracing::debug!(repository, records = records.len(), "stored snapshot {}", path.display());
        Ok(path)
    }

    /// All snapshot files, grouped by key, oldest first within each key.
    pub fn scan(&self) -> Result<BTreeMap<String, Vec<SnapshotFile>>> {
        let mut grouped: BTreeMap<String, Vec<SnapshotFile>> = BTreeMap::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some((key, timestamp)) = file_name.to_str().and_then(parse_snapshot_name) else {
                continue;
            };
            grouped.entry(key.clone()).or_default().push(SnapshotFile {
                key,
                timestamp,
                path: entry.path(),
            });
        }
        for files in grouped.values_mut() {
            files.sort_by_key(|f| f.timestamp);
        }
        Ok(grouped)
    }

    pub fn latest(&self, repository: &str) -> Result<Option<SnapshotFile>> {
        let key = repository_key(repository);
        Ok(self
            .scan()?
            .remove(&key)
            .and_then(|mut files| files.pop()))
    }

    pub fn get_snapshot(&self, repository: &str) -> Result<Option<Vec<AuthorRecord>>> {
        match self.latest(repository)? {
            Some(file) => Ok(Some(read_snapshot(&file.path)?)),
            None => Ok(None),
        }
    }

    /// Latest snapshot of every configured repository. Missing snapshots are
    /// skipped; unreadable ones are logged and skipped as well.
    pub fn get_snapshots(&self, repositories: &[Repository]) -> Result<Snapshots> {
        let mut grouped = self.scan()?;
        let mut snapshots = Snapshots::new();
        for repo in repositories {
            let Some(file) = grouped
                .remove(&repository_key(&repo.name))
                .and_then(|mut files| files.pop())
            else {
                tracing::debug!(repository = %repo.name, "no snapshot found");
                continue;
            };
            match read_snapshot(&file.path) {
                Ok(records) => snapshots.insert(repo.name.clone(), records),
                Err(e) => tracing::warn!(
                    repository = %repo.name,
                    "ignoring unreadable snapshot {}: {e}",
                    file.path.display()
                ),
            }
        }
        Ok(snapshots)
    }

    /// Snapshot files superseded by a newer one with the same key.
    pub fn stale(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .scan()?
            .into_values()
            .flat_map(|mut files| {
                files.pop();
                files.into_iter().map(|f| f.path)
            })
            .collect())
    }

    pub fn collect_garbage(&self) -> Result<Vec<PathBuf>> {
        let stale = self.stale()?;
        for path in &stale {
            fs::remove_file(path)?;
            tracing::debug!("removed stale snapshot {}", path.display());
        }
        Ok(stale)
    }
}

fn read_snapshot(path: &Path) -> Result<Vec<AuthorRecord>> {
    let content = fs::read(path)?;
    serde_json::from_slice(&content)
        .map_err(|e| GteamError::Snapshot(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn record(email: &str, lines: u64) -> AuthorRecord {
        let mut r = AuthorRecord::new(email, "x");
        r.add_commit("2024-01-01".into(), lines, 0, 1, "c");
        r
    }

    fn repo(name: &str) -> Repository {
        Repository {
            name: name.into(),
            url: String::new(),
            ..Default::default()
        }
    }

    #[test]
    fn snapshot_names_round_trip_through_parser() {
        let tmp = TempDir::new().unwrap();
        let store = StatsStore::new(tmp.path()).unwrap();
        let path = store.snapshot_path("org/api", 42);
        assert_eq!(path.file_name().unwrap(), "org_api-_-42.stats.json");
        assert_eq!(
            parse_snapshot_name("org_api-_-42.stats.json"),
            Some(("org_api".to_string(), 42))
        );
        assert_eq!(parse_snapshot_name("a-_-b-_-7.stats.json"), Some(("a-_-b".to_string(), 7)));
        assert_eq!(parse_snapshot_name("notes.txt"), None);
        assert_eq!(parse_snapshot_name("api-_-soon.stats.json"), None);
    }

    #[test]
    fn newest_snapshot_wins_and_older_ones_are_stale() {
        let tmp = TempDir::new().unwrap();
        let store = StatsStore::new(tmp.path()).unwrap();
        let old = store.store_snapshot_at("api", 100, &[record("old@x", 1)]).unwrap();
        let new = store.store_snapshot_at("api", 200, &[record("new@x", 2)]).unwrap();
        store.store_snapshot_at("web", 50, &[record("web@x", 3)]).unwrap();

        let loaded = store.get_snapshot("api").unwrap().unwrap();
        assert_eq!(loaded[0].email, "new@x");

        assert_eq!(store.stale().unwrap(), vec![old.clone()]);
        assert_eq!(store.collect_garbage().unwrap(), vec![old.clone()]);
        assert!(!old.exists());
        assert!(new.exists());
        assert!(store.stale().unwrap().is_empty());
    }

    #[test]
    fn missing_and_corrupt_snapshots_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let store = StatsStore::new(tmp.path()).unwrap();
        store.store_snapshot_at("api", 1, &[record("a@x", 1)]).unwrap();
        fs::write(store.snapshot_path("web", 5), "not json").unwrap();

        let snapshots = store
            .get_snapshots(&[repo("api"), repo("web"), repo("docs")])
            .unwrap();
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots.get("api").is_some());
        assert!(snapshots.get("web").is_none());
        assert!(snapshots.get("docs").is_none());
    }

    #[test]
    fn stored_snapshot_is_a_plain_json_array() {
        let tmp = TempDir::new().unwrap();
        let store = StatsStore::new(tmp.path()).unwrap();
        let path = store.store_snapshot_at("api", 9, &[record("a@x", 4)]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
        assert_eq!(value[0]["linesChanged"], 4);
        assert_eq!(value[0]["map"]["2024-01-01"]["linesAdded"], 4);
    }
}
