use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

use fs2::FileExt as _;

use crate::error::Result;

/// Exclusive lock on one artifact, held while it is being stored.
///
/// Works across processes through an `fs2` lock file. `fs2` locks do not
/// exclude threads of the same process on Unix, so an in-process mutex per
/// lock path is held as well. Released on drop.
#[derive(Debug)]
pub struct ArtifactLock {
    file: File,
    path: PathBuf,
    _guard: MutexGuard<'static, ()>,
}

impl ArtifactLock {
    /// Blocks until the lock at `path` is available, creating the file if needed.
    pub fn acquire(path: &Path) -> Result<Self> {
        let guard = process_mutex(path)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;
        file.lock_exclusive()?;
        tracing::trace!(target: "anvil.cache", path = %path.display(), "acquired artifact lock");

        Ok(Self {
            file,
            path: path.to_path_buf(),
            _guard: guard,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ArtifactLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn process_mutex(path: &Path) -> &'static Mutex<()> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, &'static Mutex<()>>>> = OnceLock::new();
    let mut locks = LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *locks
        .entry(path.to_path_buf())
        .or_insert_with(|| &*Box::leak(Box::new(Mutex::new(()))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn lock_excludes_threads_of_one_process() {
        let dir = tempfile::tempdir().unwrap();
        let path = Arc::new(dir.path().join("artifact.lock"));
        let inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = Arc::clone(&path);
                let inside = Arc::clone(&inside);
                std::thread::spawn(move || {
                    let _lock = ArtifactLock::acquire(&path).unwrap();
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    std::thread::sleep(std::time::Duration::from_millis(10));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
