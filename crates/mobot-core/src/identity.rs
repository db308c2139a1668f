use std::{
    collections::HashSet,
    fs::{self, OpenOptions},
    io::{ErrorKind, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tracing::warn;

use crate::{domain::UserId, errors::Error, Result};

/// Durable set of requester ids.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Returns `true` if `id` was not yet recorded. Safe to call concurrently.
    async fn record_if_absent(&self, id: UserId) -> Result<bool>;

    /// Number of distinct recorded ids.
    async fn size(&self) -> Result<usize>;
}

/// One decimal id per line in a text file.
///
/// Every mutation re-reads the file, appends only when the id is absent, and
/// syncs before returning. The whole sequence runs on a blocking worker while
/// holding `lock`, so concurrent callers are serialized and a caller that is
/// cancelled mid-request cannot abandon a half-written update.
#[derive(Clone, Debug)]
pub struct FileIdentityStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileIdentityStore {
    /// Open the store. Never fails: an unreadable file only degrades tracking.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Some(reason) = unavailability(&path) {
            warn!(
                "user store {} is unavailable, tracking degraded: {reason}",
                path.display()
            );
        }
        Self {
            path,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn with_lock<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        let lock = Arc::clone(&self.lock);
        tokio::task::spawn_blocking(move || {
            let _guard = lock
                .lock()
                .map_err(|_| Error::External("user store lock poisoned".to_string()))?;
            op(&path)
        })
        .await
        .map_err(|e| Error::External(format!("user store worker failed: {e}")))?
    }
}

#[async_trait]
impl IdentityStore for FileIdentityStore {
    async fn record_if_absent(&self, id: UserId) -> Result<bool> {
        self.with_lock(move |path| append_if_absent(path, id)).await
    }

    async fn size(&self) -> Result<usize> {
        self.with_lock(|path| Ok(read_ids(path)?.len())).await
    }
}

fn append_if_absent(path: &Path, id: UserId) -> Result<bool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    if parse_ids(path, &contents).contains(&id) {
        return Ok(false);
    }

    let mut line = String::new();
    if !contents.is_empty() && !contents.ends_with('\n') {
        line.push('\n');
    }
    line.push_str(&format!("{id}\n"));

    file.seek(SeekFrom::End(0))?;
    file.write_all(line.as_bytes())?;
    file.sync_data()?;
    Ok(true)
}

fn read_ids(path: &Path) -> Result<HashSet<UserId>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(parse_ids(path, &contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashSet::new()),
        Err(e) => Err(e.into()),
    }
}

fn parse_ids(path: &Path, contents: &str) -> HashSet<UserId> {
    let mut out = HashSet::new();
    for (idx, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<i64>() {
            Ok(id) => {
                out.insert(UserId(id));
            }
            Err(_) => warn!(
                "skipping malformed line {} in {}: {line:?}",
                idx + 1,
                path.display()
            ),
        }
    }
    out
}

/// Why `path` cannot back the store, if it exists but is not a regular file.
fn unavailability(path: &Path) -> Option<String> {
    match fs::metadata(path) {
        Ok(md) if md.is_file() => None,
        Ok(md) if md.is_dir() => Some("path is a directory".to_string()),
        Ok(_) => Some("path is not a regular file".to_string()),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => Some(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> FileIdentityStore {
        FileIdentityStore::open(dir.path().join("users.txt"))
    }

    #[tokio::test]
    async fn starts_empty_without_backing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.size().await.unwrap(), 0);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn recording_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.record_if_absent(UserId(42)).await.unwrap());
        assert!(!store.record_if_absent(UserId(42)).await.unwrap());
        assert!(!store.record_if_absent(UserId(42)).await.unwrap());
        assert_eq!(store.size().await.unwrap(), 1);

        assert!(store.record_if_absent(UserId(-7)).await.unwrap());
        assert_eq!(store.size().await.unwrap(), 2);

        let on_disk = fs::read_to_string(store.path()).unwrap();
        assert_eq!(on_disk, "42\n-7\n");
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        store_in(&dir).record_if_absent(UserId(1)).await.unwrap();
        store_in(&dir).record_if_absent(UserId(2)).await.unwrap();

        let reopened = store_in(&dir);
        assert_eq!(reopened.size().await.unwrap(), 2);
        assert!(!reopened.record_if_absent(UserId(1)).await.unwrap());
    }

    #[tokio::test]
    async fn repairs_missing_newline_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.txt");
        fs::write(&path, "10\nnot-an-id\n\n11").unwrap();

        let store = FileIdentityStore::open(&path);
        assert_eq!(store.size().await.unwrap(), 2);
        assert!(store.record_if_absent(UserId(12)).await.unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "10\nnot-an-id\n\n11\n12\n");
        assert_eq!(store.size().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn creates_parent_directory_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIdentityStore::open(dir.path().join("data").join("users.txt"));
        assert!(store.record_if_absent(UserId(5)).await.unwrap());
        assert_eq!(store.size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unusable_path_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be.
        let store = FileIdentityStore::open(dir.path());
        assert!(store.record_if_absent(UserId(1)).await.is_err());
        assert!(store.size().await.is_err());
    }

    #[test]
    fn directory_in_place_of_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("users.txt");

        assert_eq!(unavailability(&file), None);
        fs::write(&file, "1\n").unwrap();
        assert_eq!(unavailability(&file), None);

        assert_eq!(
            unavailability(dir.path()).as_deref(),
            Some("path is a directory")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_keep_exactly_distinct_ids() {
        for round in 0..5u64 {
            let dir = tempfile::tempdir().unwrap();
            let store = Arc::new(store_in(&dir));

            let distinct = 17i64;
            let calls = 120i64;
            let mut handles = Vec::new();
            for n in 0..calls {
                let store = Arc::clone(&store);
                // Vary the id order per round to shuffle interleavings.
                let id = UserId((n * 7 + round as i64) % distinct);
                handles.push(tokio::spawn(
                    async move { store.record_if_absent(id).await },
                ));
            }

            let mut inserted = 0;
            for h in handles {
                if h.await.unwrap().unwrap() {
                    inserted += 1;
                }
            }

            assert_eq!(inserted, distinct as usize, "round {round}");
            assert_eq!(store.size().await.unwrap(), distinct as usize);
            let lines = fs::read_to_string(store.path()).unwrap().lines().count();
            assert_eq!(lines, distinct as usize, "duplicate lines in round {round}");
        }
    }
}
